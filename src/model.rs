use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::tagger::{Beam, Tagger};
use crate::template::Template;
use crate::vocabulary::{ClassSummary, Vocabulary};

/// Version written by [`Model::save`] and accepted by [`Model::load`].
pub const FORMAT_VERSION: u32 = 1;

/// The trained MEMM.
///
/// Holds the tag set with its per-class statistics, the feature vocabulary
/// and the weight vector. The three are only ever written and read together,
/// and a weight vector whose length differs from the vocabulary size is
/// rejected.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    format_version: u32,
    template: Template,
    tags: Vec<String>,
    class_summaries: Vec<ClassSummary>,
    vocabulary: Vocabulary,
    weights: Vec<f64>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("format_version", &self.format_version)
            .field("template", &self.template)
            .field("tags", &self.tags)
            .field("num_features", &self.vocabulary.len())
            .finish()
    }
}

impl Model {
    /// Assemble a model, checking that the pieces fit together
    pub fn new(
        template: Template,
        tags: Vec<String>,
        class_summaries: Vec<ClassSummary>,
        vocabulary: Vocabulary,
        weights: Vec<f64>,
    ) -> Result<Self> {
        let model = Self {
            format_version: FORMAT_VERSION,
            template,
            tags,
            class_summaries,
            vocabulary,
            weights,
        };
        model.check()?;
        Ok(model)
    }

    fn check(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(Error::UnsupportedFormat {
                version: self.format_version,
            });
        }
        if self.weights.len() != self.vocabulary.len() {
            return Err(Error::DimensionMismatch {
                weights: self.weights.len(),
                features: self.vocabulary.len(),
            });
        }
        if self.tags.is_empty() {
            return Err(Error::invalid_parameter("model has an empty tag set"));
        }
        if self.tags.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::invalid_parameter("model tag set is not sorted and unique"));
        }
        if self.weights.iter().any(|w| !w.is_finite()) {
            return Err(Error::NonFinite { what: "weight" });
        }
        Ok(())
    }

    /// Parse a model from its JSON form
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let model: Self = serde_json::from_slice(data)?;
        model.check()?;
        Ok(model)
    }

    /// Load a model written by [`save`](Self::save)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        let model = Self::from_slice(&data)?;
        log::info!(
            "Loaded model from {}: {} tags, {} features",
            path.as_ref().display(),
            model.tags.len(),
            model.vocabulary.len()
        );
        Ok(model)
    }

    /// Write the model to `path`.
    ///
    /// The data goes to a temporary file in the same directory first and is
    /// renamed into place, so a failed write never leaves a partial model.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| Error::Io(e.error))?;
        log::info!("Saved model to {}", path.display());
        Ok(())
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// The sorted tag set
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn num_tags(&self) -> usize {
        self.tags.len()
    }

    pub fn class_summaries(&self) -> &[ClassSummary] {
        &self.class_summaries
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Get a new tagger
    pub fn tagger(&self, beam: Beam) -> Tagger<'_> {
        Tagger::new(self, beam)
    }
}
