//! Error types for corpus parsing, training and decoding.

use std::io;

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while reading corpora, training or tagging.
#[derive(Error, Debug)]
pub enum Error {
    /// A token is not of the form `word_tag`.
    #[error("line {line}: malformed token {token:?}, expected word_tag")]
    MalformedToken {
        /// 1-based line number.
        line: usize,
        /// The offending token.
        token: String,
    },

    /// A corpus line is not valid UTF-8.
    #[error("line {line}: invalid UTF-8")]
    InvalidUtf8 {
        /// 1-based line number.
        line: usize,
    },

    /// Two tagged corpora that should be aligned differ in sentence count.
    #[error("sentence count mismatch: {gold} gold sentences, {predicted} predicted")]
    SentenceCountMismatch {
        /// Number of gold sentences.
        gold: usize,
        /// Number of predicted sentences.
        predicted: usize,
    },

    /// Two aligned sentences differ in token count.
    #[error("line {line}: token count mismatch: {gold} gold tokens, {predicted} predicted")]
    TokenCountMismatch {
        /// 1-based sentence number.
        line: usize,
        /// Number of gold tokens.
        gold: usize,
        /// Number of predicted tokens.
        predicted: usize,
    },

    /// Words and tags handed in together have different lengths.
    #[error("{words} words but {tags} tags")]
    LengthMismatch {
        /// Number of words.
        words: usize,
        /// Number of tags.
        tags: usize,
    },

    /// The weight vector does not fit the vocabulary it is paired with.
    #[error("weight vector has {weights} entries but the vocabulary has {features} features")]
    DimensionMismatch {
        /// Length of the weight vector.
        weights: usize,
        /// Size of the vocabulary.
        features: usize,
    },

    /// A feature key occurs more than once in a persisted vocabulary.
    #[error("feature {0} appears more than once in the vocabulary")]
    DuplicateFeature(String),

    /// The model artifact was written by an incompatible version.
    #[error("unsupported model format version {version}")]
    UnsupportedFormat {
        /// Version found in the artifact.
        version: u32,
    },

    /// The objective or its gradient stopped being finite.
    #[error("non-finite {what} encountered during training")]
    NonFinite {
        /// Which quantity degenerated.
        what: &'static str,
    },

    /// Training was started without any sentences.
    #[error("empty corpus")]
    EmptyCorpus,

    /// A sentence without tokens was given to the trainer or the decoder.
    #[error("empty sentence")]
    EmptySentence,

    /// Every feature instance was removed by the thresholds.
    #[error("no feature survived the thresholds")]
    NoFeatures,

    /// A configuration value is out of range or could not be parsed.
    #[error("{0}")]
    InvalidParameter(String),

    /// The optimizer stopped before accepting a single step.
    #[error("L-BFGS error: {0}")]
    Optimizer(String),

    /// I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Model (de)serialisation failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }
}
