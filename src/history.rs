//! Token histories: the context a feature sees at one sentence position.

/// Tag used for the two positions before the first token, and the word
/// before the first token.
pub const START: &str = "*";

/// Word used after the last token.
pub const STOP: &str = "STOP";

/// The tag-independent part of a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation<'a> {
    pub word: &'a str,
    /// Previous word, or [`START`] at position 0
    pub prev_word: &'a str,
    /// Next word, or [`STOP`] at the last position
    pub next_word: &'a str,
    /// 0-based position in the sentence
    pub position: usize,
}

impl<'a> Observation<'a> {
    /// The observation at position `k` of `words`.
    ///
    /// Panics if `k` is out of bounds.
    pub fn at<S: AsRef<str>>(words: &'a [S], k: usize) -> Self {
        let prev_word = if k == 0 {
            START
        } else {
            words[k - 1].as_ref()
        };
        let next_word = words.get(k + 1).map(AsRef::as_ref).unwrap_or(STOP);
        Self {
            word: words[k].as_ref(),
            prev_word,
            next_word,
            position: k,
        }
    }

    pub fn is_first(&self) -> bool {
        self.position == 0
    }
}

/// The two preceding tags and the current tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagHistory<'a> {
    pub prev_prev: &'a str,
    pub prev: &'a str,
    pub current: &'a str,
}

impl<'a> TagHistory<'a> {
    pub fn new(prev_prev: &'a str, prev: &'a str, current: &'a str) -> Self {
        Self {
            prev_prev,
            prev,
            current,
        }
    }

    /// Tags around position `k` of a tagged sentence
    pub fn at<S: AsRef<str>>(tags: &'a [S], k: usize) -> Self {
        let prev_prev = if k >= 2 { tags[k - 2].as_ref() } else { START };
        let prev = if k >= 1 { tags[k - 1].as_ref() } else { START };
        Self::new(prev_prev, prev, tags[k].as_ref())
    }

    /// Same history with the current tag replaced
    pub fn with_current(self, current: &'a str) -> Self {
        Self { current, ..self }
    }
}

/// A full token history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct History<'a> {
    pub observation: Observation<'a>,
    pub tags: TagHistory<'a>,
}

impl<'a> History<'a> {
    pub fn new(observation: Observation<'a>, tags: TagHistory<'a>) -> Self {
        Self { observation, tags }
    }

    /// History at position `k` of a tagged sentence
    pub fn from_tagged<W, T>(words: &'a [W], tags: &'a [T], k: usize) -> Self
    where
        W: AsRef<str>,
        T: AsRef<str>,
    {
        Self::new(Observation::at(words, k), TagHistory::at(tags, k))
    }
}
