//! Accuracy and confusion counts between a gold and a predicted corpus.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::corpus::Corpus;
use crate::error::{Error, Result};

/// Number of gold tags shown by the `Display` table.
const DISPLAY_TAGS: usize = 10;

/// Token-level comparison of two aligned tagged corpora.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// `(gold, predicted)` -> count
    confusion: BTreeMap<(String, String), u64>,
    correct: u64,
    total: u64,
}

impl Evaluation {
    /// Compare `predicted` against `gold` sentence by sentence.
    ///
    /// Both corpora must have the same number of sentences and every pair of
    /// sentences the same number of tokens.
    pub fn compare(gold: &Corpus, predicted: &Corpus) -> Result<Self> {
        if gold.len() != predicted.len() {
            return Err(Error::SentenceCountMismatch {
                gold: gold.len(),
                predicted: predicted.len(),
            });
        }
        let mut evaluation = Self::default();
        for (i, (g, p)) in gold.iter().zip(predicted).enumerate() {
            if g.len() != p.len() {
                return Err(Error::TokenCountMismatch {
                    line: i + 1,
                    gold: g.len(),
                    predicted: p.len(),
                });
            }
            for (gold_tag, predicted_tag) in g.tags.iter().zip(&p.tags) {
                evaluation.add(gold_tag, predicted_tag);
            }
        }
        Ok(evaluation)
    }

    /// Record one token
    pub fn add(&mut self, gold: &str, predicted: &str) {
        *self
            .confusion
            .entry((gold.to_string(), predicted.to_string()))
            .or_insert(0) += 1;
        if gold == predicted {
            self.correct += 1;
        }
        self.total += 1;
    }

    /// Correct tokens over all tokens; zero for an empty comparison
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    pub fn correct(&self) -> u64 {
        self.correct
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// How often `gold` was tagged as `predicted`
    pub fn count(&self, gold: &str, predicted: &str) -> u64 {
        self.confusion
            .get(&(gold.to_string(), predicted.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn confusion(&self) -> &BTreeMap<(String, String), u64> {
        &self.confusion
    }

    /// Gold tags with the most mistakes, most first, ties by tag
    pub fn most_confused(&self, n: usize) -> Vec<(&str, u64)> {
        let mut mistakes: BTreeMap<&str, u64> = BTreeMap::new();
        for ((gold, predicted), &count) in &self.confusion {
            if gold != predicted {
                *mistakes.entry(gold.as_str()).or_insert(0) += count;
            }
        }
        let mut mistakes: Vec<_> = mistakes.into_iter().collect();
        mistakes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        mistakes.truncate(n);
        mistakes
    }
}

/// Accuracy line, then a predicted x gold table for the most confused gold tags
impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "accuracy: {:.4} ({}/{})",
            self.accuracy(),
            self.correct,
            self.total
        )?;
        let mut columns: Vec<&str> = self
            .most_confused(DISPLAY_TAGS)
            .into_iter()
            .map(|(tag, _)| tag)
            .collect();
        if columns.is_empty() {
            return Ok(());
        }
        columns.sort_unstable();
        let rows: BTreeSet<&str> = self.confusion.keys().map(|(_, p)| p.as_str()).collect();
        let width = columns
            .iter()
            .chain(rows.iter())
            .map(|t| t.len())
            .max()
            .unwrap_or(0)
            .max(6);

        write!(f, "{:>width$}", "pred\\gold", width = width.max(9))?;
        for column in &columns {
            write!(f, " {:>width$}", column, width = width)?;
        }
        writeln!(f)?;
        for row in rows {
            write!(f, "{:>width$}", row, width = width.max(9))?;
            for column in &columns {
                write!(f, " {:>width$}", self.count(column, row), width = width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
