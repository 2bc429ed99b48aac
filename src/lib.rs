//! Maximum-entropy Markov model (MEMM) part-of-speech tagger
//!
//! This library trains a second-order MEMM on `word_tag` corpora with
//! L-BFGS and tags new sentences with a beam-pruned Viterbi search.
//!
//! # Examples
//!
//! ## Training
//!
//! ```no_run
//! use memm::train::{Trainer, TrainerConfig};
//! use memm::Corpus;
//!
//! let corpus = Corpus::read_tagged("train.wtag")?;
//! let mut trainer = Trainer::new(TrainerConfig::default());
//! trainer.append_corpus(&corpus)?;
//!
//! trainer.set("lambda", "0.2")?;
//! let (model, report) = trainer.train()?;
//! println!("final loss: {}", report.objective);
//! model.save("model.json")?;
//! # Ok::<(), memm::Error>(())
//! ```
//!
//! ## Tagging
//!
//! ```no_run
//! use memm::{Beam, Model};
//!
//! let model = Model::load("model.json")?;
//! let tagger = model.tagger(Beam::Width(5));
//! let tags = tagger.tag(&["The", "dog", "barked", "."])?;
//! # Ok::<(), memm::Error>(())
//! ```

mod corpus;
mod error;
mod evaluation;
pub mod history;
mod model;
mod tagger;
pub mod template;
pub mod vocabulary;

/// Training module containing all components for training MEMM taggers
pub mod train;

// Re-export main types
pub use self::corpus::{Corpus, Sentence, TAG_SEPARATOR};
pub use self::error::{Error, Result};
pub use self::evaluation::Evaluation;
pub use self::model::{Model, FORMAT_VERSION};
pub use self::tagger::{Beam, Tagger};
pub use self::template::{FeatureClass, FeatureClasses, FeatureKey, Template, TemplateVersion};
pub use self::vocabulary::{Threshold, ThresholdPolicy, Vocabulary};

// Re-export training types for convenience
pub use self::train::{Trainer, TrainerConfig};
