//! The feature template: which feature instances fire for a token history.
//!
//! Feature extraction is split in two steps. [`Template::observe`] looks at
//! the words around a position once and records everything that does not
//! depend on the tags ([`Evidence`]). [`Evidence::instances`] then pairs that
//! evidence with a concrete tag history. Training and decoding both evaluate
//! many tag histories per position, so the word tests run once per token.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::history::{History, Observation, TagHistory};
use crate::vocabulary::Vocabulary;

pub mod rules;

use self::rules::{CapitalShape, CaseFallback, MorphShape, NumericShape, RuleSet};

/// Dense index of a feature in the weight vector
pub type FeatureId = u32;

/// Longest suffix or prefix considered
pub const MAX_AFFIX_LEN: usize = 7;

/// The feature classes, in index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureClass {
    /// (word, tag) with case fallback at lookup time
    WordTag,
    /// (suffix, tag) for suffixes of length 1 to 7
    Suffix,
    /// (prefix, tag) for prefixes of length 1 to 7
    Prefix,
    /// (tag two back, previous tag, tag)
    TagTrigram,
    /// (previous tag, tag)
    TagBigram,
    /// (tag)
    TagUnigram,
    /// (previous word, tag)
    PrevWord,
    /// (next word, tag)
    NextWord,
    Numeric,
    Capitalization,
    Morphology,
}

impl FeatureClass {
    pub const ALL: [FeatureClass; 11] = [
        Self::WordTag,
        Self::Suffix,
        Self::Prefix,
        Self::TagTrigram,
        Self::TagBigram,
        Self::TagUnigram,
        Self::PrevWord,
        Self::NextWord,
        Self::Numeric,
        Self::Capitalization,
        Self::Morphology,
    ];

    /// Numeric class identifier, 100 to 110
    pub fn id(self) -> u32 {
        100 + self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::WordTag => "word-tag",
            Self::Suffix => "suffix",
            Self::Prefix => "prefix",
            Self::TagTrigram => "tag-trigram",
            Self::TagBigram => "tag-bigram",
            Self::TagUnigram => "tag-unigram",
            Self::PrevWord => "prev-word",
            Self::NextWord => "next-word",
            Self::Numeric => "numeric",
            Self::Capitalization => "capitalization",
            Self::Morphology => "morphology",
        }
    }

    pub fn flag(self) -> FeatureClasses {
        FeatureClasses::from_bits_truncate(1 << self as u16)
    }
}

impl fmt::Display for FeatureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.name())
    }
}

bitflags! {
    /// Set of enabled feature classes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct FeatureClasses: u16 {
        const WORD_TAG = 1 << 0;
        const SUFFIX = 1 << 1;
        const PREFIX = 1 << 2;
        const TAG_TRIGRAM = 1 << 3;
        const TAG_BIGRAM = 1 << 4;
        const TAG_UNIGRAM = 1 << 5;
        const PREV_WORD = 1 << 6;
        const NEXT_WORD = 1 << 7;
        const NUMERIC = 1 << 8;
        const CAPITALIZATION = 1 << 9;
        const MORPHOLOGY = 1 << 10;
    }
}

impl Default for FeatureClasses {
    fn default() -> Self {
        Self::all()
    }
}

impl FeatureClasses {
    pub fn enabled(self, class: FeatureClass) -> bool {
        self.contains(class.flag())
    }
}

/// A concrete feature instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureKey {
    WordTag {
        word: String,
        tag: String,
    },
    Suffix {
        suffix: String,
        tag: String,
    },
    Prefix {
        prefix: String,
        tag: String,
    },
    TagTrigram {
        prev_prev: String,
        prev: String,
        tag: String,
    },
    TagBigram {
        prev: String,
        tag: String,
    },
    TagUnigram {
        tag: String,
    },
    PrevWord {
        word: String,
        tag: String,
    },
    NextWord {
        word: String,
        tag: String,
    },
    Numeric {
        shape: NumericShape,
        /// Only recorded by the catch-all shapes
        hyphens: Option<usize>,
        tag: String,
    },
    Capitalization {
        shape: CapitalShape,
        hyphens: Option<usize>,
        prev_tag: String,
        tag: String,
    },
    Morphology {
        shape: MorphShape,
        tag: String,
    },
}

impl FeatureKey {
    pub fn class(&self) -> FeatureClass {
        match self {
            Self::WordTag { .. } => FeatureClass::WordTag,
            Self::Suffix { .. } => FeatureClass::Suffix,
            Self::Prefix { .. } => FeatureClass::Prefix,
            Self::TagTrigram { .. } => FeatureClass::TagTrigram,
            Self::TagBigram { .. } => FeatureClass::TagBigram,
            Self::TagUnigram { .. } => FeatureClass::TagUnigram,
            Self::PrevWord { .. } => FeatureClass::PrevWord,
            Self::NextWord { .. } => FeatureClass::NextWord,
            Self::Numeric { .. } => FeatureClass::Numeric,
            Self::Capitalization { .. } => FeatureClass::Capitalization,
            Self::Morphology { .. } => FeatureClass::Morphology,
        }
    }

    /// The tag the feature predicts
    pub fn tag(&self) -> &str {
        match self {
            Self::WordTag { tag, .. }
            | Self::Suffix { tag, .. }
            | Self::Prefix { tag, .. }
            | Self::TagTrigram { tag, .. }
            | Self::TagBigram { tag, .. }
            | Self::TagUnigram { tag }
            | Self::PrevWord { tag, .. }
            | Self::NextWord { tag, .. }
            | Self::Numeric { tag, .. }
            | Self::Capitalization { tag, .. }
            | Self::Morphology { tag, .. } => tag,
        }
    }

    /// Affix length, for suffix and prefix keys
    pub fn affix_len(&self) -> Option<usize> {
        match self {
            Self::Suffix { suffix: s, .. } | Self::Prefix { prefix: s, .. } => {
                Some(s.chars().count())
            }
            _ => None,
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.class().id();
        match self {
            Self::WordTag { word: s, tag }
            | Self::Suffix { suffix: s, tag }
            | Self::Prefix { prefix: s, tag }
            | Self::PrevWord { word: s, tag }
            | Self::NextWord { word: s, tag }
            | Self::TagBigram { prev: s, tag } => write!(f, "({id}, {s}, {tag})"),
            Self::TagTrigram {
                prev_prev,
                prev,
                tag,
            } => write!(f, "({id}, {prev_prev}, {prev}, {tag})"),
            Self::TagUnigram { tag } => write!(f, "({id}, {tag})"),
            Self::Numeric {
                shape,
                hyphens: Some(n),
                tag,
            } => write!(f, "({}, {n}, {tag})", shape.id()),
            Self::Numeric { shape, tag, .. } => write!(f, "({}, {tag})", shape.id()),
            Self::Capitalization {
                shape,
                hyphens: Some(n),
                prev_tag,
                tag,
            } => write!(f, "({}, {n}, {prev_tag}, {tag})", shape.id()),
            Self::Capitalization {
                shape,
                prev_tag,
                tag,
                ..
            } => write!(f, "({}, {prev_tag}, {tag})", shape.id()),
            Self::Morphology { shape, tag } => write!(f, "({}, {tag})", shape.id()),
        }
    }
}

/// Which generation of the hand-written rules to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateVersion {
    /// First generation: wider foreign-word list and the earlier noun-shape rule
    Model1,
    /// Second generation morphology
    #[default]
    Model2,
}

impl TemplateVersion {
    pub fn rules(self) -> &'static RuleSet {
        match self {
            Self::Model1 => &rules::MODEL1,
            Self::Model2 => &rules::MODEL2,
        }
    }
}

impl FromStr for TemplateVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "model1" | "1" => Ok(Self::Model1),
            "model2" | "2" => Ok(Self::Model2),
            _ => Err(Error::invalid_parameter(format!(
                "unknown template version {s:?}, expected model1 or model2"
            ))),
        }
    }
}

impl fmt::Display for TemplateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model1 => f.write_str("model1"),
            Self::Model2 => f.write_str("model2"),
        }
    }
}

/// A feature template: a rule generation, the set of enabled classes and
/// the case fallback used for unseen words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Template {
    pub version: TemplateVersion,
    #[serde(default)]
    pub classes: FeatureClasses,
    #[serde(default)]
    pub case_fallback: CaseFallback,
}

impl Template {
    pub fn new(version: TemplateVersion) -> Self {
        Self {
            version,
            classes: FeatureClasses::all(),
            case_fallback: CaseFallback::default(),
        }
    }

    pub fn with_case_fallback(mut self, case_fallback: CaseFallback) -> Self {
        self.case_fallback = case_fallback;
        self
    }

    pub fn with_classes(mut self, classes: FeatureClasses) -> Self {
        self.classes = classes;
        self
    }

    /// Evaluate the tag-independent tests for one position
    pub fn observe<'a>(&self, observation: Observation<'a>) -> Evidence<'a> {
        let rules = self.version.rules();
        let word = observation.word;
        let mut evidence = Evidence {
            observation,
            classes: self.classes,
            suffixes: Vec::new(),
            prefixes: Vec::new(),
            hyphens: rules::hyphens(word),
            numeric: Vec::new(),
            capitalization: Vec::new(),
            morphology: Vec::new(),
        };
        let affixes = self.classes.intersects(FeatureClasses::SUFFIX | FeatureClasses::PREFIX);
        if affixes && !is_numeric_token(word) {
            let chars: Vec<(usize, char)> = word.char_indices().collect();
            let n = chars.len().saturating_sub(1).min(MAX_AFFIX_LEN);
            for len in 1..=n {
                let suffix = &word[chars[chars.len() - len].0..];
                if !is_all_digits(suffix) {
                    evidence.suffixes.push(suffix);
                }
                let prefix = &word[..chars[len].0];
                if !is_all_digits(prefix) {
                    evidence.prefixes.push(prefix);
                }
            }
        }
        if self.classes.enabled(FeatureClass::Numeric) {
            rules.numeric.apply(&observation, &mut evidence.numeric);
        }
        if self.classes.enabled(FeatureClass::Capitalization) {
            rules
                .capitalization
                .apply(&observation, &mut evidence.capitalization);
        }
        if self.classes.enabled(FeatureClass::Morphology) {
            rules.morphology.apply(&observation, &mut evidence.morphology);
        }
        evidence
    }

    /// Every feature instance that fires for `history`, in class order
    pub fn instances(&self, history: &History<'_>) -> Vec<FeatureKey> {
        self.observe(history.observation).instances(history.tags)
    }

    /// Indices of the vocabulary features that fire for `history`
    pub fn activate(&self, history: &History<'_>, vocabulary: &Vocabulary) -> Vec<FeatureId> {
        let mut active = Vec::new();
        self.activate_evidence(
            &self.observe(history.observation),
            history.tags,
            vocabulary,
            &mut active,
        );
        active
    }

    /// Append the indices of the vocabulary features that fire for the
    /// observed position under `tags`. Instances missing from the vocabulary
    /// are skipped; a missing word/tag pair is retried with the variants of
    /// the template's [`CaseFallback`], first hit wins.
    pub fn activate_evidence(
        &self,
        evidence: &Evidence<'_>,
        tags: TagHistory<'_>,
        vocabulary: &Vocabulary,
        active: &mut Vec<FeatureId>,
    ) {
        for key in evidence.instances(tags) {
            if let Some(id) = vocabulary.get(&key) {
                active.push(id);
            } else if let FeatureKey::WordTag { word, tag } = key {
                let fallback = self.case_fallback.variants().iter().find_map(|case| {
                    vocabulary.get(&FeatureKey::WordTag {
                        word: case.apply(&word),
                        tag: tag.clone(),
                    })
                });
                active.extend(fallback);
            }
        }
    }
}

/// Words that never produce affix features: digits with `-,.:`
/// separators, or `digits\/digits`.
fn is_numeric_token(word: &str) -> bool {
    let starts_digit = word.bytes().next().map_or(false, |b| b.is_ascii_digit());
    if !starts_digit {
        return false;
    }
    if word
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b',' | b'.' | b':'))
    {
        return true;
    }
    match word.split_once("\\/") {
        Some((a, b)) => is_all_digits(a) && is_all_digits(b),
        None => false,
    }
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Tag-independent results of the feature tests at one position.
#[derive(Debug, Clone)]
pub struct Evidence<'a> {
    observation: Observation<'a>,
    classes: FeatureClasses,
    suffixes: Vec<&'a str>,
    prefixes: Vec<&'a str>,
    hyphens: usize,
    numeric: Vec<NumericShape>,
    capitalization: Vec<CapitalShape>,
    morphology: Vec<MorphShape>,
}

impl<'a> Evidence<'a> {
    pub fn observation(&self) -> &Observation<'a> {
        &self.observation
    }

    /// Pair the evidence with a tag history
    pub fn instances(&self, tags: TagHistory<'_>) -> Vec<FeatureKey> {
        let obs = &self.observation;
        let tag = tags.current;
        let on = |class: FeatureClass| self.classes.enabled(class);
        let mut keys = Vec::with_capacity(
            8 + self.suffixes.len()
                + self.prefixes.len()
                + self.numeric.len()
                + self.capitalization.len()
                + self.morphology.len(),
        );

        if on(FeatureClass::WordTag) {
            keys.push(FeatureKey::WordTag {
                word: obs.word.to_string(),
                tag: tag.to_string(),
            });
        }
        if on(FeatureClass::Suffix) {
            keys.extend(self.suffixes.iter().map(|s| FeatureKey::Suffix {
                suffix: s.to_string(),
                tag: tag.to_string(),
            }));
        }
        if on(FeatureClass::Prefix) {
            keys.extend(self.prefixes.iter().map(|p| FeatureKey::Prefix {
                prefix: p.to_string(),
                tag: tag.to_string(),
            }));
        }
        if on(FeatureClass::TagTrigram) {
            keys.push(FeatureKey::TagTrigram {
                prev_prev: tags.prev_prev.to_string(),
                prev: tags.prev.to_string(),
                tag: tag.to_string(),
            });
        }
        if on(FeatureClass::TagBigram) {
            keys.push(FeatureKey::TagBigram {
                prev: tags.prev.to_string(),
                tag: tag.to_string(),
            });
        }
        if on(FeatureClass::TagUnigram) {
            keys.push(FeatureKey::TagUnigram {
                tag: tag.to_string(),
            });
        }
        if on(FeatureClass::PrevWord) {
            keys.push(FeatureKey::PrevWord {
                word: obs.prev_word.to_string(),
                tag: tag.to_string(),
            });
        }
        if on(FeatureClass::NextWord) {
            keys.push(FeatureKey::NextWord {
                word: obs.next_word.to_string(),
                tag: tag.to_string(),
            });
        }
        keys.extend(self.numeric.iter().map(|&shape| FeatureKey::Numeric {
            shape,
            hyphens: shape.counts_hyphens().then_some(self.hyphens),
            tag: tag.to_string(),
        }));
        keys.extend(
            self.capitalization
                .iter()
                .map(|&shape| FeatureKey::Capitalization {
                    shape,
                    hyphens: shape.counts_hyphens().then_some(self.hyphens),
                    prev_tag: tags.prev.to_string(),
                    tag: tag.to_string(),
                }),
        );
        keys.extend(self.morphology.iter().map(|&shape| FeatureKey::Morphology {
            shape,
            tag: tag.to_string(),
        }));
        keys
    }
}
