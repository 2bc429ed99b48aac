use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::context::TrainingContext;
use crate::corpus::{Corpus, Sentence};
use crate::error::{Error, Result};
use crate::model::Model;
use crate::template::Template;
use crate::vocabulary::{ClassStatistics, ThresholdPolicy, Vocabulary};

mod lbfgs;

pub use self::lbfgs::{LbfgsParams, LineSearchAlgorithm};

/// Starting point of the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightInit {
    /// All weights zero
    #[default]
    Zeros,
    /// Independent draws from `N(0, std_dev²)` with a seeded generator
    Normal { seed: u64, std_dev: f64 },
}

impl WeightInit {
    /// Initial weight vector of length `n`
    pub fn weights(&self, n: usize) -> Result<Vec<f64>> {
        match *self {
            WeightInit::Zeros => Ok(vec![0.0; n]),
            WeightInit::Normal { seed, std_dev } => {
                let normal = Normal::new(0.0, std_dev).map_err(|e| {
                    Error::invalid_parameter(format!("invalid initial std_dev {}: {}", std_dev, e))
                })?;
                let mut rng = StdRng::seed_from_u64(seed);
                Ok((0..n).map(|_| normal.sample(&mut rng)).collect())
            }
        }
    }
}

/// Everything that shapes a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub template: Template,
    pub thresholds: ThresholdPolicy,
    pub lbfgs: LbfgsParams,
    pub init: WeightInit,
}

impl TrainerConfig {
    /// Read a JSON configuration; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        let config: Self = serde_json::from_slice(&data)?;
        config.lbfgs.validate()?;
        Ok(config)
    }
}

/// One accepted optimizer iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub objective: f64,
    pub gradient_norm: f64,
    pub weight_norm: f64,
}

/// Outcome of a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Accepted iterations in order
    pub iterations: Vec<IterationRecord>,
    /// Number of objective evaluations, line search included
    pub evaluations: usize,
    /// Objective at the returned weights
    pub objective: f64,
    /// Whether the last accepted iterate passed the gradient or objective-delta test
    pub converged: bool,
}

impl TrainingReport {
    /// Objective values of the accepted iterations
    pub fn objective_history(&self) -> Vec<f64> {
        self.iterations.iter().map(|r| r.objective).collect()
    }
}

/// MEMM trainer
#[derive(Debug, Default)]
pub struct Trainer {
    /// Training sentences
    corpus: Corpus,
    config: TrainerConfig,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            corpus: Corpus::new(),
            config,
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Get training parameters
    pub fn params(&self) -> &LbfgsParams {
        &self.config.lbfgs
    }

    /// Get training parameters for mutation
    pub fn params_mut(&mut self) -> &mut LbfgsParams {
        &mut self.config.lbfgs
    }

    /// Set an optimizer parameter by name
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.config.lbfgs.set(name, value)
    }

    /// Get an optimizer parameter by name
    pub fn get(&self, name: &str) -> Result<String> {
        self.config.lbfgs.get(name)
    }

    /// Append one tagged sentence
    pub fn append<W, T>(&mut self, words: &[W], tags: &[T]) -> Result<()>
    where
        W: AsRef<str>,
        T: AsRef<str>,
    {
        self.corpus.push(Sentence::new(words, tags)?);
        Ok(())
    }

    /// Append every sentence of a tagged corpus
    pub fn append_corpus(&mut self, corpus: &Corpus) -> Result<()> {
        for sentence in corpus {
            self.append(&sentence.words, &sentence.tags)?;
        }
        Ok(())
    }

    pub fn num_sentences(&self) -> usize {
        self.corpus.len()
    }

    /// Clear all training data
    pub fn clear(&mut self) {
        self.corpus = Corpus::new();
    }

    /// Build the vocabulary, cache the activations and fit the weights
    pub fn train(&self) -> Result<(Model, TrainingReport)> {
        if self.corpus.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let config = &self.config;
        config.lbfgs.validate()?;

        log::info!(
            "Training on {} sentences ({} tokens), template {}",
            self.corpus.len(),
            self.corpus.num_tokens(),
            config.template.version
        );
        let statistics = ClassStatistics::collect(&self.corpus, &config.template)?;
        let vocabulary = Vocabulary::from_statistics(&statistics, &config.thresholds);
        if vocabulary.is_empty() {
            return Err(Error::NoFeatures);
        }
        let summaries = statistics.summarize(&vocabulary);
        for summary in &summaries {
            log::debug!(
                "class {}: {} observed, {} kept",
                summary.class,
                summary.observed,
                summary.kept
            );
        }
        log::info!(
            "Number of features: {}, number of tags: {}",
            vocabulary.len(),
            statistics.tags().len()
        );

        let context =
            TrainingContext::prepare(&self.corpus, &config.template, &vocabulary, statistics.tags())?;
        let mut weights = config.init.weights(vocabulary.len())?;
        let report = self::lbfgs::minimize(&context, &config.lbfgs, &mut weights)?;

        let model = Model::new(
            config.template,
            statistics.tags().to_vec(),
            summaries,
            vocabulary,
            weights,
        )?;
        Ok((model, report))
    }
}
