use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Array3};
use rayon::prelude::*;

use crate::corpus::{Corpus, Sentence};
use crate::error::{Error, Result};
use crate::history::{Observation, TagHistory, START};
use crate::model::Model;
use crate::template::{Evidence, FeatureId};
use crate::train::logsumexp;

/// Tokens that are always tagged `:`.
const COLON_TOKENS: [&str; 2] = [";", "--"];
const COLON_TAG: &str = ":";

/// Number of `(u, v)` states kept after each position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beam {
    /// Keep the best `n` states
    Width(usize),
    /// Keep every reachable state
    Exhaustive,
}

impl Default for Beam {
    fn default() -> Self {
        Beam::Width(50)
    }
}

impl FromStr for Beam {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exhaustive" | "inf" => Ok(Beam::Exhaustive),
            other => match other.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Beam::Width(n)),
                _ => Err(Error::invalid_parameter(format!(
                    "beam must be a positive integer or \"exhaustive\", got {:?}",
                    s
                ))),
            },
        }
    }
}

impl fmt::Display for Beam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Beam::Width(n) => write!(f, "{}", n),
            Beam::Exhaustive => f.write_str("exhaustive"),
        }
    }
}

/// A frontier entry: the last two tags and the log score of the best path
/// ending in them.
#[derive(Debug, Clone, Copy)]
struct State {
    u: usize,
    v: usize,
    score: f64,
}

/// The tagger predicts tag sequences with a beam-pruned second-order Viterbi
/// search over the model's local distributions `q(v | t, u, k)`.
#[derive(Debug, Clone)]
pub struct Tagger<'a> {
    model: &'a Model,
    beam: Beam,
}

impl<'a> Tagger<'a> {
    pub(crate) fn new(model: &'a Model, beam: Beam) -> Self {
        Self { model, beam }
    }

    pub fn beam(&self) -> Beam {
        self.beam
    }

    /// Tag name for a state index, `START` being one past the last tag
    fn name(&self, index: usize) -> &'a str {
        self.model
            .tags()
            .get(index)
            .map(String::as_str)
            .unwrap_or(START)
    }

    fn start(&self) -> usize {
        self.model.num_tags()
    }

    /// `log q(· | t, u)` at the observed position, over the whole tag set
    fn log_q(
        &self,
        evidence: &Evidence<'_>,
        t: usize,
        u: usize,
        buffer: &mut Vec<FeatureId>,
    ) -> Vec<f64> {
        let template = self.model.template();
        let vocabulary = self.model.vocabulary();
        let weights = self.model.weights();
        let (prev_prev, prev) = (self.name(t), self.name(u));
        let mut scores: Vec<f64> = self
            .model
            .tags()
            .iter()
            .map(|tag| {
                buffer.clear();
                let history = TagHistory::new(prev_prev, prev, tag);
                template.activate_evidence(evidence, history, vocabulary, buffer);
                buffer.iter().map(|&k| weights[k as usize]).sum()
            })
            .collect();
        let log_z = logsumexp(&scores);
        for score in scores.iter_mut() {
            *score -= log_z;
        }
        scores
    }

    /// Predict the tag sequence for a sentence.
    ///
    /// The output has one tag per word; `;` and `--` are always tagged `:`.
    pub fn tag<S: AsRef<str>>(&self, words: &[S]) -> Result<Vec<&'a str>> {
        if words.is_empty() {
            return Err(Error::EmptySentence);
        }
        let width = match self.beam {
            Beam::Width(0) => return Err(Error::invalid_parameter("beam width must be positive")),
            Beam::Width(n) => n,
            Beam::Exhaustive => usize::MAX,
        };
        let template = self.model.template();
        let n = words.len();
        let num_tags = self.model.num_tags();
        let num_states = num_tags + 1;
        let start = self.start();

        // pi[k, u, v]: best log score of a path whose tags at k-1, k are u, v
        let mut pi = Array3::from_elem((n, num_states, num_states), f64::NEG_INFINITY);
        let mut backpointer = Array3::<u32>::zeros((n, num_states, num_states));
        let mut frontier = vec![State {
            u: start,
            v: start,
            score: 0.0,
        }];
        let mut buffer = Vec::new();

        for k in 0..n {
            let evidence = template.observe(Observation::at(words, k));
            let mut reached = Array2::from_elem((num_states, num_states), false);
            // Frontier states are distinct (t, u) pairs, so q runs once per pair
            for state in &frontier {
                let (t, u) = (state.u, state.v);
                let log_q = self.log_q(&evidence, t, u, &mut buffer);
                for (v, &lq) in log_q.iter().enumerate() {
                    let score = state.score + lq;
                    // Frontier order makes the first maximizing t win
                    if !reached[[u, v]] || score > pi[[k, u, v]] {
                        reached[[u, v]] = true;
                        pi[[k, u, v]] = score;
                        backpointer[[k, u, v]] = t as u32;
                    }
                }
            }

            let mut next: Vec<State> = reached
                .indexed_iter()
                .filter(|&(_, &hit)| hit)
                .map(|((u, v), _)| State {
                    u,
                    v,
                    score: pi[[k, u, v]],
                })
                .collect();
            next.sort_by(compare_states);
            next.truncate(width);
            frontier = next;
        }

        // The frontier is sorted, so its head is the best final state
        let best = frontier[0];
        let mut path = vec![0usize; n];
        path[n - 1] = best.v;
        if n >= 2 {
            path[n - 2] = best.u;
        }
        for k in (2..n).rev() {
            path[k - 2] = backpointer[[k, path[k - 1], path[k]]] as usize;
        }

        let tags = words
            .iter()
            .zip(path)
            .map(|(word, index)| {
                if COLON_TOKENS.contains(&word.as_ref()) {
                    COLON_TAG
                } else {
                    self.name(index)
                }
            })
            .collect();
        Ok(tags)
    }

    /// Tag every sentence of a corpus in parallel, keeping corpus order
    pub fn tag_corpus(&self, corpus: &Corpus) -> Result<Corpus> {
        let sentences = corpus
            .sentences()
            .par_iter()
            .map(|sentence| {
                let tags = self.tag(&sentence.words)?;
                Sentence::new(&sentence.words, &tags)
            })
            .collect::<Result<Vec<_>>>()?;
        log::info!("Tagged {} sentences (beam = {})", sentences.len(), self.beam);
        Ok(sentences.into_iter().collect())
    }

    /// `Σ_k log q(y_k | y_{k-2}, y_{k-1}, k)` for a given tagging
    pub fn sequence_log_probability<W, T>(&self, words: &[W], tags: &[T]) -> Result<f64>
    where
        W: AsRef<str>,
        T: AsRef<str>,
    {
        if words.len() != tags.len() {
            return Err(Error::LengthMismatch {
                words: words.len(),
                tags: tags.len(),
            });
        }
        if words.is_empty() {
            return Err(Error::EmptySentence);
        }
        let indices = tags
            .iter()
            .map(|tag| {
                let tag = tag.as_ref();
                self.model
                    .tags()
                    .binary_search_by(|t| t.as_str().cmp(tag))
                    .map_err(|_| Error::invalid_parameter(format!("unknown tag {:?}", tag)))
            })
            .collect::<Result<Vec<_>>>()?;

        let template = self.model.template();
        let start = self.start();
        let mut buffer = Vec::new();
        let mut total = 0.0;
        for k in 0..words.len() {
            let t = if k >= 2 { indices[k - 2] } else { start };
            let u = if k >= 1 { indices[k - 1] } else { start };
            let evidence = template.observe(Observation::at(words, k));
            total += self.log_q(&evidence, t, u, &mut buffer)[indices[k]];
        }
        Ok(total)
    }
}

/// Descending score, then ascending `(u, v)`
fn compare_states(a: &State, b: &State) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| (a.u, a.v).cmp(&(b.u, b.v)))
}
