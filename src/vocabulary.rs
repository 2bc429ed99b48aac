//! Feature counting, per-class thresholds and the dense feature index.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::history::History;
use crate::template::{FeatureClass, FeatureId, FeatureKey, Template};

/// Occurrence counts of the instances of one feature class, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ClassCounts {
    /// Map from key to its position in `entries`
    index: HashMap<FeatureKey, usize>,
    /// Keys and counts, first-seen order
    entries: Vec<(FeatureKey, u64)>,
}

impl ClassCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `key`
    pub fn add(&mut self, key: FeatureKey) {
        if let Some(&i) = self.index.get(&key) {
            self.entries[i].1 += 1;
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, 1));
        }
    }

    pub fn count(&self, key: &FeatureKey) -> u64 {
        self.index.get(key).map_or(0, |&i| self.entries[i].1)
    }

    /// Number of distinct instances
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of occurrences
    pub fn occurrences(&self) -> u64 {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FeatureKey, u64)> + '_ {
        self.entries.iter().map(|(k, c)| (k, *c))
    }

    /// Instances whose count reaches `threshold`, in first-seen order
    pub fn select(&self, threshold: Threshold) -> impl Iterator<Item = &FeatureKey> + '_ {
        let cutoffs = self.cutoffs(threshold);
        self.entries
            .iter()
            .filter(move |(key, count)| {
                let cutoff = match threshold {
                    Threshold::MeanPerLength => cutoffs.get(&key.affix_len()).copied(),
                    _ => cutoffs.get(&None).copied(),
                };
                *count as f64 >= cutoff.unwrap_or(0.0)
            })
            .map(|(key, _)| key)
    }

    /// Minimum count per affix-length bucket (`None` for the whole class)
    fn cutoffs(&self, threshold: Threshold) -> HashMap<Option<usize>, f64> {
        let mut cutoffs = HashMap::new();
        match threshold {
            Threshold::Fixed(n) => {
                cutoffs.insert(None, n as f64);
            }
            Threshold::Mean => {
                if !self.entries.is_empty() {
                    let mean = self.occurrences() as f64 / self.entries.len() as f64;
                    cutoffs.insert(None, mean);
                }
            }
            Threshold::MeanPerLength => {
                let mut sums: HashMap<Option<usize>, (u64, usize)> = HashMap::new();
                for (key, count) in &self.entries {
                    let bucket = sums.entry(key.affix_len()).or_default();
                    bucket.0 += count;
                    bucket.1 += 1;
                }
                for (len, (total, n)) in sums {
                    cutoffs.insert(len, total as f64 / n as f64);
                }
            }
        }
        cutoffs
    }
}

/// Minimum occurrence count an instance needs to enter the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    /// A fixed minimum count
    Fixed(u64),
    /// The mean count over all instances of the class
    Mean,
    /// The mean count over the instances of the same affix length
    MeanPerLength,
}

impl Default for Threshold {
    fn default() -> Self {
        Self::Fixed(0)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{}", n),
            Self::Mean => f.write_str("mean"),
            Self::MeanPerLength => f.write_str("mean-per-length"),
        }
    }
}

/// One threshold per feature class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdPolicy {
    pub word_tag: Threshold,
    pub suffix: Threshold,
    pub prefix: Threshold,
    pub tag_trigram: Threshold,
    pub tag_bigram: Threshold,
    pub tag_unigram: Threshold,
    pub prev_word: Threshold,
    pub next_word: Threshold,
    pub numeric: Threshold,
    pub capitalization: Threshold,
    pub morphology: Threshold,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            word_tag: Threshold::Fixed(0),
            suffix: Threshold::Fixed(0),
            prefix: Threshold::MeanPerLength,
            tag_trigram: Threshold::Mean,
            tag_bigram: Threshold::Fixed(0),
            tag_unigram: Threshold::Fixed(0),
            prev_word: Threshold::Mean,
            next_word: Threshold::Mean,
            numeric: Threshold::Fixed(0),
            capitalization: Threshold::Fixed(0),
            morphology: Threshold::Fixed(0),
        }
    }
}

impl ThresholdPolicy {
    /// Keep every observed instance
    pub fn keep_all() -> Self {
        let mut policy = Self::default();
        for class in FeatureClass::ALL {
            policy.set(class, Threshold::Fixed(0));
        }
        policy
    }

    pub fn get(&self, class: FeatureClass) -> Threshold {
        match class {
            FeatureClass::WordTag => self.word_tag,
            FeatureClass::Suffix => self.suffix,
            FeatureClass::Prefix => self.prefix,
            FeatureClass::TagTrigram => self.tag_trigram,
            FeatureClass::TagBigram => self.tag_bigram,
            FeatureClass::TagUnigram => self.tag_unigram,
            FeatureClass::PrevWord => self.prev_word,
            FeatureClass::NextWord => self.next_word,
            FeatureClass::Numeric => self.numeric,
            FeatureClass::Capitalization => self.capitalization,
            FeatureClass::Morphology => self.morphology,
        }
    }

    pub fn set(&mut self, class: FeatureClass, threshold: Threshold) {
        let slot = match class {
            FeatureClass::WordTag => &mut self.word_tag,
            FeatureClass::Suffix => &mut self.suffix,
            FeatureClass::Prefix => &mut self.prefix,
            FeatureClass::TagTrigram => &mut self.tag_trigram,
            FeatureClass::TagBigram => &mut self.tag_bigram,
            FeatureClass::TagUnigram => &mut self.tag_unigram,
            FeatureClass::PrevWord => &mut self.prev_word,
            FeatureClass::NextWord => &mut self.next_word,
            FeatureClass::Numeric => &mut self.numeric,
            FeatureClass::Capitalization => &mut self.capitalization,
            FeatureClass::Morphology => &mut self.morphology,
        };
        *slot = threshold;
    }
}

/// Feature instances counted over a labeled corpus, plus its tag set.
#[derive(Debug, Clone)]
pub struct ClassStatistics {
    tags: Vec<String>,
    classes: Vec<ClassCounts>,
}

impl ClassStatistics {
    /// Count every instance the template fires on the gold histories of `corpus`
    pub fn collect(corpus: &Corpus, template: &Template) -> Result<Self> {
        if corpus.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let mut tags = BTreeSet::new();
        let mut classes = vec![ClassCounts::new(); FeatureClass::ALL.len()];
        for sentence in corpus {
            if sentence.is_empty() {
                return Err(Error::EmptySentence);
            }
            for k in 0..sentence.len() {
                tags.insert(sentence.tags[k].as_str());
                let history = History::from_tagged(&sentence.words, &sentence.tags, k);
                for key in template.instances(&history) {
                    classes[key.class() as usize].add(key);
                }
            }
        }
        Ok(Self {
            tags: tags.into_iter().map(String::from).collect(),
            classes,
        })
    }

    /// The sorted tag set
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn class(&self, class: FeatureClass) -> &ClassCounts {
        &self.classes[class as usize]
    }

    /// Per-class totals, with the number of instances kept by `vocabulary`
    pub fn summarize(&self, vocabulary: &Vocabulary) -> Vec<ClassSummary> {
        let kept = vocabulary.class_sizes();
        FeatureClass::ALL
            .iter()
            .map(|&class| {
                let counts = self.class(class);
                ClassSummary {
                    class,
                    observed: counts.len(),
                    occurrences: counts.occurrences(),
                    kept: kept[class as usize],
                }
            })
            .collect()
    }
}

/// Counts kept alongside a trained model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub class: FeatureClass,
    /// Distinct instances seen in training
    pub observed: usize,
    /// Total occurrences of those instances
    pub occurrences: u64,
    /// Instances that passed the threshold
    pub kept: usize,
}

/// The dense feature index.
///
/// Indices are contiguous, start at zero and follow class order, then
/// first-seen order within a class, so identical input always gives an
/// identical index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FeatureKey>", into = "Vec<FeatureKey>")]
pub struct Vocabulary {
    keys: Vec<FeatureKey>,
    index: HashMap<FeatureKey, FeatureId>,
}

impl Vocabulary {
    /// Count, threshold and index the features of a labeled corpus
    pub fn build(corpus: &Corpus, template: &Template, policy: &ThresholdPolicy) -> Result<Self> {
        let statistics = ClassStatistics::collect(corpus, template)?;
        Ok(Self::from_statistics(&statistics, policy))
    }

    /// Apply `policy` to collected counts
    pub fn from_statistics(statistics: &ClassStatistics, policy: &ThresholdPolicy) -> Self {
        let mut vocabulary = Self::default();
        for class in FeatureClass::ALL {
            let counts = statistics.class(class);
            let threshold = policy.get(class);
            let before = vocabulary.len();
            for key in counts.select(threshold) {
                vocabulary.insert(key.clone());
            }
            log::debug!(
                "f{} {}: {} of {} instances kept (threshold {})",
                class.id(),
                class.name(),
                vocabulary.len() - before,
                counts.len(),
                threshold
            );
        }
        log::info!(
            "vocabulary: {} features over {} tags",
            vocabulary.len(),
            statistics.tags().len()
        );
        vocabulary
    }

    fn insert(&mut self, key: FeatureKey) -> FeatureId {
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.keys.len() as FeatureId;
        self.index.insert(key.clone(), id);
        self.keys.push(key);
        id
    }

    pub fn get(&self, key: &FeatureKey) -> Option<FeatureId> {
        self.index.get(key).copied()
    }

    pub fn key(&self, id: FeatureId) -> Option<&FeatureKey> {
        self.keys.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in index order
    pub fn keys(&self) -> &[FeatureKey] {
        &self.keys
    }

    /// Number of features per class, indexed by class
    pub fn class_sizes(&self) -> [usize; 11] {
        let mut sizes = [0; 11];
        for key in &self.keys {
            sizes[key.class() as usize] += 1;
        }
        sizes
    }
}

impl TryFrom<Vec<FeatureKey>> for Vocabulary {
    type Error = Error;

    fn try_from(keys: Vec<FeatureKey>) -> Result<Self> {
        let mut index = HashMap::with_capacity(keys.len());
        for (id, key) in keys.iter().enumerate() {
            if index.insert(key.clone(), id as FeatureId).is_some() {
                return Err(Error::DuplicateFeature(key.to_string()));
            }
        }
        Ok(Self { keys, index })
    }
}

impl From<Vocabulary> for Vec<FeatureKey> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::FeatureClasses;

    fn corpus(text: &str) -> Corpus {
        Corpus::parse_tagged(text.as_bytes()).unwrap()
    }

    fn tag_bigram(prev: &str, tag: &str) -> FeatureKey {
        FeatureKey::TagBigram {
            prev: prev.to_string(),
            tag: tag.to_string(),
        }
    }

    #[test]
    fn test_counts_keep_first_seen_order() {
        let mut counts = ClassCounts::new();
        counts.add(tag_bigram("A", "B"));
        counts.add(tag_bigram("B", "A"));
        counts.add(tag_bigram("A", "B"));
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.occurrences(), 3);
        assert_eq!(counts.count(&tag_bigram("A", "B")), 2);
        let order: Vec<_> = counts.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(order, vec![tag_bigram("A", "B"), tag_bigram("B", "A")]);
    }

    #[test]
    fn test_mean_threshold() {
        let mut counts = ClassCounts::new();
        for _ in 0..3 {
            counts.add(tag_bigram("A", "B"));
        }
        counts.add(tag_bigram("B", "C"));
        counts.add(tag_bigram("C", "D"));
        // mean = 5 / 3
        let kept: Vec<_> = counts.select(Threshold::Mean).cloned().collect();
        assert_eq!(kept, vec![tag_bigram("A", "B")]);
        assert_eq!(counts.select(Threshold::Fixed(0)).count(), 3);
        assert_eq!(counts.select(Threshold::Fixed(2)).count(), 1);
    }

    #[test]
    fn test_mean_per_length_threshold() {
        let prefix = |p: &str| FeatureKey::Prefix {
            prefix: p.to_string(),
            tag: "NN".to_string(),
        };
        let mut counts = ClassCounts::new();
        // length 1: counts 1 and 1, mean 1; length 2: counts 3 and 1, mean 2
        counts.add(prefix("a"));
        counts.add(prefix("b"));
        for _ in 0..3 {
            counts.add(prefix("ab"));
        }
        counts.add(prefix("bc"));
        let kept: Vec<_> = counts.select(Threshold::MeanPerLength).cloned().collect();
        assert_eq!(kept, vec![prefix("a"), prefix("b"), prefix("ab")]);
    }

    #[test]
    fn test_vocabulary_is_contiguous_and_class_ordered() {
        let corpus = corpus("The_DT dog_NN barked_VBD ._.\nThe_DT cat_NN sat_VBD ._.\n");
        let template = Template::default();
        let vocabulary = Vocabulary::build(&corpus, &template, &ThresholdPolicy::keep_all()).unwrap();
        assert!(!vocabulary.is_empty());
        let mut last_class = FeatureClass::WordTag;
        for (i, key) in vocabulary.keys().iter().enumerate() {
            assert_eq!(vocabulary.get(key), Some(i as FeatureId));
            assert!(key.class() >= last_class);
            last_class = key.class();
        }
        assert_eq!(vocabulary.class_sizes().iter().sum::<usize>(), vocabulary.len());
    }

    #[test]
    fn test_build_is_reproducible() {
        let text = "The_DT dog_NN barked_VBD ._.\nA_DT IL-2_NN gene_NN in_FW vitro_FW ._.\n";
        let template = Template::default();
        let policy = ThresholdPolicy::default();
        let a = Vocabulary::build(&corpus(text), &template, &policy).unwrap();
        let b = Vocabulary::build(&corpus(text), &template, &policy).unwrap();
        assert_eq!(a.keys(), b.keys());
    }

    #[test]
    fn test_tag_set_is_sorted() {
        let corpus = corpus("The_DT dog_NN barked_VBD ._.\n");
        let stats = ClassStatistics::collect(&corpus, &Template::default()).unwrap();
        assert_eq!(stats.tags(), &[".", "DT", "NN", "VBD"]);
    }

    #[test]
    fn test_empty_corpus_is_rejected() {
        let result = ClassStatistics::collect(&Corpus::new(), &Template::default());
        assert!(matches!(result, Err(Error::EmptyCorpus)));
    }

    #[test]
    fn test_summary_counts_kept_features() {
        let corpus = corpus("The_DT dog_NN\nThe_DT cat_NN\n");
        let template = Template::default().with_classes(FeatureClasses::TAG_BIGRAM);
        let stats = ClassStatistics::collect(&corpus, &template).unwrap();
        let vocabulary = Vocabulary::from_statistics(&stats, &ThresholdPolicy::default());
        let summary = stats.summarize(&vocabulary);
        let bigram = &summary[FeatureClass::TagBigram as usize];
        assert_eq!(bigram.observed, 2);
        assert_eq!(bigram.occurrences, 4);
        assert_eq!(bigram.kept, 2);
        assert_eq!(summary[FeatureClass::WordTag as usize].observed, 0);
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let keys = vec![tag_bigram("A", "B"), tag_bigram("A", "B")];
        assert!(matches!(
            Vocabulary::try_from(keys),
            Err(Error::DuplicateFeature(_))
        ));
    }
}
