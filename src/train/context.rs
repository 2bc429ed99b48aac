use rayon::prelude::*;

use crate::corpus::{Corpus, Sentence};
use crate::error::{Error, Result};
use crate::history::{Observation, TagHistory};
use crate::template::{FeatureId, Template};
use crate::vocabulary::Vocabulary;

/// Cached feature activations of a training corpus.
///
/// For every position `i` and every candidate tag `y` it holds `A(i, y)`,
/// the features that fire when the tag at `i` is `y` and every other tag
/// keeps its gold value. Built once by [`TrainingContext::prepare`]; each
/// objective evaluation only re-sums the cached index sets.
#[derive(Debug, Clone)]
pub struct TrainingContext {
    num_tags: usize,
    num_features: usize,
    /// Concatenated `A(i, y)` for all positions, candidate tags in tag order
    features: Vec<FeatureId>,
    /// `features[offsets[i * num_tags + y]..offsets[i * num_tags + y + 1]]` is `A(i, y)`
    offsets: Vec<usize>,
    /// Gold tag index per position
    gold: Vec<usize>,
    /// Σ_i e_{A(i, y_i)}
    empirical: Vec<f64>,
}

/// Activations of one sentence, before concatenation
struct SentenceActivations {
    features: Vec<FeatureId>,
    lengths: Vec<usize>,
    gold: Vec<usize>,
}

impl TrainingContext {
    /// Compute `A(i, y)` for every position of `corpus` and every tag in `tags`.
    ///
    /// `tags` must be sorted; sentences are processed in parallel.
    pub fn prepare(
        corpus: &Corpus,
        template: &Template,
        vocabulary: &Vocabulary,
        tags: &[String],
    ) -> Result<Self> {
        if corpus.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let per_sentence = corpus
            .sentences()
            .par_iter()
            .map(|sentence| Self::activate_sentence(sentence, template, vocabulary, tags))
            .collect::<Result<Vec<_>>>()?;

        let num_tags = tags.len();
        let num_features = vocabulary.len();
        let num_positions: usize = per_sentence.iter().map(|s| s.gold.len()).sum();
        let total: usize = per_sentence.iter().map(|s| s.features.len()).sum();

        let mut features = Vec::with_capacity(total);
        let mut offsets = Vec::with_capacity(num_positions * num_tags + 1);
        let mut gold = Vec::with_capacity(num_positions);
        offsets.push(0);
        for sentence in per_sentence {
            features.extend_from_slice(&sentence.features);
            for len in sentence.lengths {
                offsets.push(offsets[offsets.len() - 1] + len);
            }
            gold.extend(sentence.gold);
        }

        let mut empirical = vec![0.0; num_features];
        for (i, &y) in gold.iter().enumerate() {
            let cell = i * num_tags + y;
            for &k in &features[offsets[cell]..offsets[cell + 1]] {
                empirical[k as usize] += 1.0;
            }
        }

        let context = Self {
            num_tags,
            num_features,
            features,
            offsets,
            gold,
            empirical,
        };
        log::info!(
            "training context: {} positions x {} tags, {} cached activations",
            context.num_positions(),
            num_tags,
            context.features.len()
        );
        Ok(context)
    }

    fn activate_sentence(
        sentence: &Sentence,
        template: &Template,
        vocabulary: &Vocabulary,
        tags: &[String],
    ) -> Result<SentenceActivations> {
        if sentence.is_empty() {
            return Err(Error::EmptySentence);
        }
        let mut features = Vec::new();
        let mut lengths = Vec::with_capacity(sentence.len() * tags.len());
        let mut gold = Vec::with_capacity(sentence.len());
        for k in 0..sentence.len() {
            let evidence = template.observe(Observation::at(&sentence.words, k));
            let history = TagHistory::at(&sentence.tags, k);
            let gold_index = tags
                .binary_search_by(|t| t.as_str().cmp(history.current))
                .map_err(|_| {
                    Error::invalid_parameter(format!(
                        "tag {:?} is not in the tag set",
                        history.current
                    ))
                })?;
            gold.push(gold_index);
            for candidate in tags {
                let start = features.len();
                template.activate_evidence(
                    &evidence,
                    history.with_current(candidate),
                    vocabulary,
                    &mut features,
                );
                lengths.push(features.len() - start);
            }
        }
        Ok(SentenceActivations {
            features,
            lengths,
            gold,
        })
    }

    pub fn num_positions(&self) -> usize {
        self.gold.len()
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// `A(i, y)`
    pub fn active(&self, position: usize, tag: usize) -> &[FeatureId] {
        let cell = position * self.num_tags + tag;
        &self.features[self.offsets[cell]..self.offsets[cell + 1]]
    }

    /// Empirical feature counts Σ_i e_{A(i, y_i)}
    pub fn empirical(&self) -> &[f64] {
        &self.empirical
    }

    /// Regularized negative log-likelihood and its gradient at `weights`
    pub fn objective_and_gradient(&self, weights: &[f64], lambda: f64) -> Result<(f64, Vec<f64>)> {
        let mut gradient = vec![0.0; self.num_features];
        let value = self.evaluate_into(weights, lambda, &mut gradient)?;
        Ok((value, gradient))
    }

    /// Like [`objective_and_gradient`](Self::objective_and_gradient), writing
    /// the gradient into `gradient`
    pub fn evaluate_into(&self, weights: &[f64], lambda: f64, gradient: &mut [f64]) -> Result<f64> {
        if weights.len() != self.num_features || gradient.len() != self.num_features {
            return Err(Error::DimensionMismatch {
                weights: weights.len(),
                features: self.num_features,
            });
        }
        gradient.fill(0.0);

        let mut log_likelihood = 0.0;
        let mut scores = vec![0.0; self.num_tags];
        for i in 0..self.num_positions() {
            for (y, score) in scores.iter_mut().enumerate() {
                *score = self
                    .active(i, y)
                    .iter()
                    .map(|&k| weights[k as usize])
                    .sum();
            }
            let log_z = logsumexp(&scores);
            log_likelihood += scores[self.gold[i]] - log_z;

            // Expected counts under the model
            for (y, &score) in scores.iter().enumerate() {
                let p = (score - log_z).exp();
                for &k in self.active(i, y) {
                    gradient[k as usize] += p;
                }
            }
        }

        let mut norm2 = 0.0;
        for ((g, &e), &w) in gradient.iter_mut().zip(&self.empirical).zip(weights) {
            *g += lambda * w - e;
            norm2 += w * w;
        }
        let value = -log_likelihood + 0.5 * lambda * norm2;

        if !value.is_finite() {
            return Err(Error::NonFinite { what: "objective" });
        }
        if gradient.iter().any(|g| !g.is_finite()) {
            return Err(Error::NonFinite { what: "gradient" });
        }
        Ok(value)
    }
}

/// Log-sum-exp trick for numerical stability.
///
/// Returns NEG_INFINITY for empty slices.
pub(crate) fn logsumexp(values: &[f64]) -> f64 {
    let max_val = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max_val.is_infinite() {
        return max_val;
    }
    let sum: f64 = values.iter().map(|&v| (v - max_val).exp()).sum();
    max_val + sum.ln()
}
