//! Ordered rule tables for the shape-based feature classes.
//!
//! Each class is a [`RuleTable`]: a precondition on the word followed by
//! stages of `(guard, shapes)` rules. A [`Stage::FirstOf`] stage stops at the
//! first rule whose guard holds, even when none of its shapes then apply,
//! which is how the nested `if`/`else` chains of the hand-written template
//! behave. The two template generations are two sets of tables.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::history::Observation;

/// A test on the tag-independent part of a history.
pub type Predicate = fn(&Observation<'_>) -> bool;

/// A shape emitted when its own predicate holds.
#[derive(Debug, Clone, Copy)]
pub struct Emit<S> {
    pub shape: S,
    pub when: Predicate,
}

/// A guarded group of shapes.
#[derive(Debug, Clone, Copy)]
pub struct Rule<S: 'static> {
    pub when: Predicate,
    pub emit: &'static [Emit<S>],
}

impl<S: Copy> Rule<S> {
    fn emit_into(&self, obs: &Observation<'_>, out: &mut Vec<S>) {
        for e in self.emit {
            if (e.when)(obs) {
                out.push(e.shape);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Stage<S: 'static> {
    /// Only the first rule whose guard holds is considered
    FirstOf(&'static [Rule<S>]),
    /// Every rule whose guard holds is considered
    Each(&'static [Rule<S>]),
    /// Like `FirstOf`, but only when no earlier stage emitted anything
    Fallback(&'static [Rule<S>]),
}

#[derive(Debug, Clone, Copy)]
pub struct RuleTable<S: 'static> {
    pub precondition: Predicate,
    pub stages: &'static [Stage<S>],
}

impl<S: Copy> RuleTable<S> {
    /// Append every shape that fires for `obs`, in table order
    pub fn apply(&self, obs: &Observation<'_>, out: &mut Vec<S>) {
        if !(self.precondition)(obs) {
            return;
        }
        let start = out.len();
        for stage in self.stages {
            match *stage {
                Stage::FirstOf(rules) => first_of(rules, obs, out),
                Stage::Each(rules) => {
                    for rule in rules.iter().filter(|r| (r.when)(obs)) {
                        rule.emit_into(obs, out);
                    }
                }
                Stage::Fallback(rules) => {
                    if out.len() == start {
                        first_of(rules, obs, out);
                    }
                }
            }
        }
    }
}

fn first_of<S: Copy>(rules: &[Rule<S>], obs: &Observation<'_>, out: &mut Vec<S>) {
    if let Some(rule) = rules.iter().find(|r| (r.when)(obs)) {
        rule.emit_into(obs, out);
    }
}

/// Sub-categories of the numeric class (108).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NumericShape {
    /// Digits separated only by `-,.:\/%` (108.1)
    Number,
    /// Letters and numbers alternating over several hyphens, ending in letters (108.21)
    LettersNumbersLetters,
    /// Letters and numbers alternating over several hyphens (108.22)
    LettersNumbers,
    /// `word-number` starting with a lowercase letter (108.31)
    LowerWordNumber,
    /// `word-number` otherwise (108.32)
    WordNumber,
    /// Numbers and letters alternating over several hyphens (108.4)
    NumbersLetters,
    /// `number-word` (108.5)
    NumberWord,
    /// Year-like token such as `1980s`, `mid-1980` or `'80s` (108.6)
    Year,
    /// Anything else with digits whose last hyphen part is alphabetic (108.7)
    OtherWordEnd,
    /// Anything else with digits (108.8)
    Other,
}

impl NumericShape {
    pub fn id(self) -> &'static str {
        match self {
            Self::Number => "108.1",
            Self::LettersNumbersLetters => "108.21",
            Self::LettersNumbers => "108.22",
            Self::LowerWordNumber => "108.31",
            Self::WordNumber => "108.32",
            Self::NumbersLetters => "108.4",
            Self::NumberWord => "108.5",
            Self::Year => "108.6",
            Self::OtherWordEnd => "108.7",
            Self::Other => "108.8",
        }
    }

    /// Whether the feature key also records the hyphen count
    pub fn counts_hyphens(self) -> bool {
        matches!(self, Self::OtherWordEnd | Self::Other)
    }
}

/// Sub-categories of the capitalization class (109).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CapitalShape {
    /// Capitalized with inner `-`/`.`, between capitalized words (109.1)
    InnerPunctBetweenCapitals,
    /// Capitalized with inner `-`/`.`, after a capitalized word (109.2)
    InnerPunctAfterCapital,
    /// Capitalized with inner `-`/`.` (109.3)
    InnerPunct,
    /// Capitalized between capitalized words (109.4)
    CapitalRun,
    /// Sentence-initial variants (109.5 - 109.8)
    StartInnerPunctBetweenCapitals,
    StartInnerPunctBeforeCapital,
    StartInnerPunct,
    StartCapitalRun,
    /// All-caps between all-caps words (109.9)
    AcronymRun,
    /// All-caps before an all-caps word (109.11)
    AcronymBeforeAcronym,
    /// All-caps (109.12)
    Acronym,
    /// Contains an uppercase letter (109.13)
    HasCapital,
    /// Lowercase letter later followed by an uppercase one (109.14)
    CamelCase,
}

impl CapitalShape {
    pub fn id(self) -> &'static str {
        match self {
            Self::InnerPunctBetweenCapitals => "109.1",
            Self::InnerPunctAfterCapital => "109.2",
            Self::InnerPunct => "109.3",
            Self::CapitalRun => "109.4",
            Self::StartInnerPunctBetweenCapitals => "109.5",
            Self::StartInnerPunctBeforeCapital => "109.6",
            Self::StartInnerPunct => "109.7",
            Self::StartCapitalRun => "109.8",
            Self::AcronymRun => "109.9",
            Self::AcronymBeforeAcronym => "109.11",
            Self::Acronym => "109.12",
            Self::HasCapital => "109.13",
            Self::CamelCase => "109.14",
        }
    }

    pub fn counts_hyphens(self) -> bool {
        self == Self::HasCapital
    }
}

/// Sub-categories of the morphology class (110).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MorphShape {
    /// Long word (110.1)
    Long,
    /// Long word ending in `s` (110.2)
    LongPlural,
    /// Long word ending in `ing` (110.11)
    LongGerund,
    /// Long word ending in `ally`, `ely` or `tly` (110.12)
    LongAdverb,
    /// Long word with an adjective suffix (110.13)
    LongAdjective,
    /// Long word ending in `ed` (110.14)
    LongPast,
    /// Numeral-like token (110.3)
    Cardinal,
    /// Hyphenated adjective pattern (110.4)
    HyphenAdjective,
    /// Upper-case run ending in `s` (110.5)
    PluralAcronym,
    /// Acronym or noun-like shape (110.6)
    NounShape,
    /// `number-word` (110.7)
    NumberHyphenWord,
    /// `word-number` (110.8)
    WordHyphenNumber,
    /// Ends with a period (110.9)
    TrailingPeriod,
    /// Latin or foreign token (110.92)
    Foreign,
    /// Roman list marker (110.93)
    ListMarker,
}

impl MorphShape {
    pub fn id(self) -> &'static str {
        match self {
            Self::Long => "110.1",
            Self::LongPlural => "110.2",
            Self::LongGerund => "110.11",
            Self::LongAdverb => "110.12",
            Self::LongAdjective => "110.13",
            Self::LongPast => "110.14",
            Self::Cardinal => "110.3",
            Self::HyphenAdjective => "110.4",
            Self::PluralAcronym => "110.5",
            Self::NounShape => "110.6",
            Self::NumberHyphenWord => "110.7",
            Self::WordHyphenNumber => "110.8",
            Self::TrailingPeriod => "110.9",
            Self::Foreign => "110.92",
            Self::ListMarker => "110.93",
        }
    }
}

/// The shape tables of one template generation.
#[derive(Debug, Clone, Copy)]
pub struct RuleSet {
    pub numeric: &'static RuleTable<NumericShape>,
    pub capitalization: &'static RuleTable<CapitalShape>,
    pub morphology: &'static RuleTable<MorphShape>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseVariant {
    Lower,
    Upper,
    /// First character upper-cased, the rest lower-cased
    Title,
}

impl CaseVariant {
    pub fn apply(self, word: &str) -> String {
        match self {
            Self::Lower => word.to_lowercase(),
            Self::Upper => word.to_uppercase(),
            Self::Title => {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.as_str().to_lowercase().chars())
                        .collect(),
                    None => String::new(),
                }
            }
        }
    }
}

/// Which re-cased forms of an unseen word are looked up for the word/tag class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFallback {
    /// Lower, then upper, then title case
    #[default]
    Full,
    /// Title case only
    TitleOnly,
}

impl CaseFallback {
    /// Variants in lookup order; the first one found in the vocabulary wins
    pub fn variants(self) -> &'static [CaseVariant] {
        match self {
            Self::Full => &[CaseVariant::Lower, CaseVariant::Upper, CaseVariant::Title],
            Self::TitleOnly => &[CaseVariant::Title],
        }
    }
}

pub static MODEL1: RuleSet = RuleSet {
    numeric: &NUMERIC,
    capitalization: &CAPITALIZATION,
    morphology: &MORPHOLOGY_MODEL1,
};

pub static MODEL2: RuleSet = RuleSet {
    numeric: &NUMERIC,
    capitalization: &CAPITALIZATION,
    morphology: &MORPHOLOGY_MODEL2,
};

// Word predicates

fn always(_: &Observation<'_>) -> bool {
    true
}

/// Pure-ASCII alphabetic, non-empty
fn is_alpha(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphabetic())
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// At least one non-empty piece, and every non-empty piece is digits.
fn digit_groups(s: &str, separators: &[char]) -> bool {
    let mut any = false;
    for piece in s.split(separators).filter(|p| !p.is_empty()) {
        if !is_digits(piece) {
            return false;
        }
        any = true;
    }
    any
}

const NUMBER_SEPARATORS: &[char] = &['-', ',', '.', ':', '\\', '/', '%'];
const GROUP_SEPARATORS: &[char] = &[',', ':', '\\', '/', '%'];

/// Hyphen-separated parts alternate letters, numbers, letters, ...
fn letters_numbers(word: &str) -> bool {
    word.split('-').enumerate().all(|(i, part)| {
        part.is_empty()
            || if i % 2 == 0 {
                is_alpha(part)
            } else {
                digit_groups(part, GROUP_SEPARATORS)
            }
    })
}

/// Hyphen-separated parts alternate numbers, letters, numbers, ...
fn numbers_letters(word: &str) -> bool {
    word.split('-').enumerate().all(|(i, part)| {
        part.is_empty()
            || if i % 2 == 0 {
                digit_groups(part, GROUP_SEPARATORS)
            } else {
                is_alpha(part)
            }
    })
}

pub(crate) fn hyphens(word: &str) -> usize {
    word.matches('-').count()
}

fn last_part_alpha(word: &str) -> bool {
    word.rsplit('-').next().map_or(false, is_alpha)
}

fn starts_upper(s: &str) -> bool {
    s.chars().next().map_or(false, |c| c.is_ascii_uppercase())
}

fn all_caps(s: &str) -> bool {
    s.len() >= 2 && s.bytes().all(|b| b.is_ascii_uppercase())
}

/// Capitalized with `-` or `.` somewhere after the first character
fn capital_with_inner_punct(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => chars.any(|c| c == '-' || c == '.'),
        _ => false,
    }
}

static YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-zA-Z]*-?[0-9]{4}s?|'[0-9]{2}s)$").expect("valid year regex")
});

mod numeric {
    use super::*;

    pub fn has_digit(o: &Observation<'_>) -> bool {
        o.word.bytes().any(|b| b.is_ascii_digit())
    }

    pub fn number(o: &Observation<'_>) -> bool {
        digit_groups(o.word, NUMBER_SEPARATORS)
    }

    pub fn letters_numbers_run(o: &Observation<'_>) -> bool {
        hyphens(o.word) > 1 && letters_numbers(o.word) && !o.word.starts_with("mid")
    }

    pub fn word_number(o: &Observation<'_>) -> bool {
        hyphens(o.word) == 1 && letters_numbers(o.word)
    }

    pub fn numbers_letters_run(o: &Observation<'_>) -> bool {
        hyphens(o.word) > 1 && numbers_letters(o.word)
    }

    pub fn number_word(o: &Observation<'_>) -> bool {
        hyphens(o.word) == 1 && numbers_letters(o.word)
    }

    pub fn year(o: &Observation<'_>) -> bool {
        YEAR.is_match(o.word)
    }

    pub fn ends_alpha(o: &Observation<'_>) -> bool {
        last_part_alpha(o.word)
    }

    pub fn ends_non_alpha(o: &Observation<'_>) -> bool {
        !last_part_alpha(o.word)
    }

    pub fn starts_lower(o: &Observation<'_>) -> bool {
        o.word.chars().next().map_or(false, |c| c.is_ascii_lowercase())
    }

    pub fn starts_non_lower(o: &Observation<'_>) -> bool {
        !starts_lower(o)
    }
}

const NUMERIC_CATEGORIES: &[Rule<NumericShape>] = &[
    Rule {
        when: numeric::number,
        emit: &[Emit { shape: NumericShape::Number, when: always }],
    },
    Rule {
        when: numeric::letters_numbers_run,
        emit: &[
            Emit {
                shape: NumericShape::LettersNumbersLetters,
                when: numeric::ends_alpha,
            },
            Emit {
                shape: NumericShape::LettersNumbers,
                when: numeric::ends_non_alpha,
            },
        ],
    },
    Rule {
        when: numeric::word_number,
        emit: &[
            Emit {
                shape: NumericShape::LowerWordNumber,
                when: numeric::starts_lower,
            },
            Emit {
                shape: NumericShape::WordNumber,
                when: numeric::starts_non_lower,
            },
        ],
    },
    Rule {
        when: numeric::numbers_letters_run,
        emit: &[Emit { shape: NumericShape::NumbersLetters, when: always }],
    },
    Rule {
        when: numeric::number_word,
        emit: &[Emit { shape: NumericShape::NumberWord, when: always }],
    },
];

const NUMERIC_YEAR: &[Rule<NumericShape>] = &[Rule {
    when: numeric::year,
    emit: &[Emit { shape: NumericShape::Year, when: always }],
}];

const NUMERIC_FALLBACK: &[Rule<NumericShape>] = &[
    Rule {
        when: numeric::ends_alpha,
        emit: &[Emit { shape: NumericShape::OtherWordEnd, when: always }],
    },
    Rule {
        when: always,
        emit: &[Emit { shape: NumericShape::Other, when: always }],
    },
];

pub static NUMERIC: RuleTable<NumericShape> = RuleTable {
    precondition: numeric::has_digit,
    stages: &[
        Stage::FirstOf(NUMERIC_CATEGORIES),
        Stage::Each(NUMERIC_YEAR),
        Stage::Fallback(NUMERIC_FALLBACK),
    ],
};

static LOWER_THEN_UPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z].*[A-Z]").expect("valid camel-case regex"));

mod capital {
    use super::*;

    fn sentence_start(o: &Observation<'_>) -> bool {
        o.is_first() || o.prev_word == "``" || o.prev_word == "."
    }

    fn neighbours_upper(o: &Observation<'_>) -> bool {
        starts_upper(o.next_word) && starts_upper(o.prev_word)
    }

    pub fn inner_between_capitals(o: &Observation<'_>) -> bool {
        !o.is_first() && capital_with_inner_punct(o.word) && neighbours_upper(o)
    }

    pub fn inner_after_capital(o: &Observation<'_>) -> bool {
        !o.is_first() && capital_with_inner_punct(o.word) && starts_upper(o.prev_word)
    }

    pub fn inner(o: &Observation<'_>) -> bool {
        !o.is_first() && capital_with_inner_punct(o.word)
    }

    pub fn capital_run(o: &Observation<'_>) -> bool {
        !o.is_first() && starts_upper(o.word) && neighbours_upper(o)
    }

    pub fn at_sentence_start(o: &Observation<'_>) -> bool {
        sentence_start(o)
    }

    pub fn start_inner_between(o: &Observation<'_>) -> bool {
        capital_with_inner_punct(o.word) && neighbours_upper(o)
    }

    pub fn acronym_run(o: &Observation<'_>) -> bool {
        all_caps(o.word) && all_caps(o.next_word) && all_caps(o.prev_word)
    }

    pub fn acronym_before_acronym(o: &Observation<'_>) -> bool {
        all_caps(o.word) && all_caps(o.next_word)
    }

    pub fn acronym(o: &Observation<'_>) -> bool {
        all_caps(o.word)
    }

    pub fn has_capital(o: &Observation<'_>) -> bool {
        o.word.bytes().any(|b| b.is_ascii_uppercase())
    }

    pub fn camel_case(o: &Observation<'_>) -> bool {
        LOWER_THEN_UPPER.is_match(o.word)
    }
}

// 109.6 - 109.8 share the sentence-start guard of 109.5, so they never fire.
const CAPITAL_CATEGORIES: &[Rule<CapitalShape>] = &[
    Rule {
        when: capital::inner_between_capitals,
        emit: &[Emit {
            shape: CapitalShape::InnerPunctBetweenCapitals,
            when: always,
        }],
    },
    Rule {
        when: capital::inner_after_capital,
        emit: &[Emit { shape: CapitalShape::InnerPunctAfterCapital, when: always }],
    },
    Rule {
        when: capital::inner,
        emit: &[Emit { shape: CapitalShape::InnerPunct, when: always }],
    },
    Rule {
        when: capital::capital_run,
        emit: &[Emit { shape: CapitalShape::CapitalRun, when: always }],
    },
    Rule {
        when: capital::at_sentence_start,
        emit: &[Emit {
            shape: CapitalShape::StartInnerPunctBetweenCapitals,
            when: capital::start_inner_between,
        }],
    },
    Rule {
        when: capital::at_sentence_start,
        emit: &[Emit {
            shape: CapitalShape::StartInnerPunctBeforeCapital,
            when: always,
        }],
    },
    Rule {
        when: capital::at_sentence_start,
        emit: &[Emit { shape: CapitalShape::StartInnerPunct, when: always }],
    },
    Rule {
        when: capital::at_sentence_start,
        emit: &[Emit { shape: CapitalShape::StartCapitalRun, when: always }],
    },
    Rule {
        when: capital::acronym_run,
        emit: &[Emit { shape: CapitalShape::AcronymRun, when: always }],
    },
    Rule {
        when: capital::acronym_before_acronym,
        emit: &[Emit { shape: CapitalShape::AcronymBeforeAcronym, when: always }],
    },
    Rule {
        when: capital::acronym,
        emit: &[Emit { shape: CapitalShape::Acronym, when: always }],
    },
];

const CAPITAL_MARKS: &[Rule<CapitalShape>] = &[
    Rule {
        when: capital::has_capital,
        emit: &[Emit { shape: CapitalShape::HasCapital, when: always }],
    },
    Rule {
        when: capital::camel_case,
        emit: &[Emit { shape: CapitalShape::CamelCase, when: always }],
    },
];

pub static CAPITALIZATION: RuleTable<CapitalShape> = RuleTable {
    precondition: always,
    stages: &[
        Stage::FirstOf(CAPITAL_CATEGORIES),
        Stage::Each(CAPITAL_MARKS),
    ],
};

static CARDINAL_MODEL2: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9\-,.:]*[0-9]+[0-9\-,.:]*$").expect("valid cardinal regex")
});
static CARDINAL_MODEL1: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9\-,.:]*[\]\[0-9]+[0-9\-,.:]*$").expect("valid cardinal regex")
});
static BRACKETED_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9\-.]+LRB[0-9\-.]+RRB[0-9\-.]+$").expect("valid bracket regex")
});
static PLURAL_ACRONYM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]*[A-Z\-0-9.,]+s$").expect("valid plural regex"));
static UPPER_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z\-0-9.,]+$").expect("valid upper-shape regex"));
static NOUN_SHAPES_MODEL2: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"[a-z][A-Z]").expect("valid noun regex"),
        Regex::new(r"^[A-Za-z]-[A-Za-z0-9.,\-]+$").expect("valid noun regex"),
    ]
});
static NOUN_SHAPES_MODEL1: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"[a-z\-][A-Z]").expect("valid noun regex"),
        Regex::new(r"^[A-Za-z]-[a-z]+$").expect("valid noun regex"),
        Regex::new(r"^[a-z\-]+[0-9]+$").expect("valid noun regex"),
    ]
});
static NUMBER_HYPHEN_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9\-.,]+-[a-zA-Z]+$").expect("valid regex"));
static WORD_HYPHEN_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]?[a-z]+-[0-9\-.,]+$").expect("valid regex"));

const LONG_WORD: usize = 13;
const ADJECTIVE_SUFFIXES: &[&str] = &[
    "tant",
    "cal",
    "ic",
    "ive",
    "nal",
    "-dependent",
    "-sensitive",
    "-specific",
    "tly",
];
const HYPHEN_ADJECTIVE_TAILS: &[&str] = &["ing", "ed", "ic", "age", "like", "ive", "ven"];
const FOREIGN_MODEL2: &[&str] = &["Treponema", "pallidum", "Borrelia", "burgdorferi", "vitro", "vivo"];
const FOREIGN_MODEL1: &[&str] = &[
    "Treponema",
    "cerevisiae",
    "pallidum",
    "Borrelia",
    "burgdorferi",
    "vitro",
    "vivo",
    "i.e.",
    "e.g.",
];

mod morph {
    use super::*;

    fn is_long(o: &Observation<'_>) -> bool {
        o.word.chars().count() >= LONG_WORD
    }

    pub fn long(o: &Observation<'_>) -> bool {
        is_long(o)
    }

    pub fn long_gerund(o: &Observation<'_>) -> bool {
        is_long(o) && o.word.ends_with("ing")
    }

    pub fn long_past(o: &Observation<'_>) -> bool {
        is_long(o) && o.word.ends_with("ed")
    }

    pub fn long_adverb(o: &Observation<'_>) -> bool {
        is_long(o) && ["ally", "ely", "tly"].iter().any(|s| o.word.ends_with(s))
    }

    pub fn long_adjective(o: &Observation<'_>) -> bool {
        is_long(o) && ADJECTIVE_SUFFIXES.iter().any(|s| o.word.ends_with(s))
    }

    pub fn ends_s(o: &Observation<'_>) -> bool {
        o.word.ends_with('s')
    }

    fn roman_or_bracketed(word: &str) -> bool {
        matches!(word, "II" | "III" | "IV") || BRACKETED_NUMBER.is_match(word)
    }

    pub fn cardinal_model2(o: &Observation<'_>) -> bool {
        CARDINAL_MODEL2.is_match(o.word) || roman_or_bracketed(o.word)
    }

    pub fn cardinal_model1(o: &Observation<'_>) -> bool {
        CARDINAL_MODEL1.is_match(o.word) || roman_or_bracketed(o.word)
    }

    pub fn hyphen_adjective(o: &Observation<'_>) -> bool {
        let w = o.word;
        if w.contains('-') {
            let first = w.split('-').next().unwrap_or_default();
            let last = w.rsplit('-').next().unwrap_or_default();
            if HYPHEN_ADJECTIVE_TAILS.iter().any(|s| last.ends_with(s))
                || first.starts_with("pre")
                || first.starts_with("anti")
                || first.ends_with("er")
            {
                return true;
            }
        }
        w.ends_with("kDa") || matches!(w, "CR" | "CS")
    }

    pub fn plural_acronym(o: &Observation<'_>) -> bool {
        PLURAL_ACRONYM.is_match(o.word) || o.word == "GCS"
    }

    fn upper_shape(word: &str) -> bool {
        UPPER_SHAPE.is_match(word) && !matches!(word, "I" | "A" | "," | "." | ":")
    }

    fn noun_suffix(word: &str) -> bool {
        word.ends_with("coid") || word.ends_with("ness")
    }

    pub fn noun_shape_model2(o: &Observation<'_>) -> bool {
        upper_shape(o.word)
            || NOUN_SHAPES_MODEL2.iter().any(|re| re.is_match(o.word))
            || noun_suffix(o.word)
    }

    pub fn noun_shape_model1(o: &Observation<'_>) -> bool {
        upper_shape(o.word)
            || NOUN_SHAPES_MODEL1.iter().any(|re| re.is_match(o.word))
            || noun_suffix(o.word)
    }

    pub fn number_hyphen_word(o: &Observation<'_>) -> bool {
        NUMBER_HYPHEN_WORD.is_match(o.word)
    }

    pub fn word_hyphen_number(o: &Observation<'_>) -> bool {
        WORD_HYPHEN_NUMBER.is_match(o.word)
    }

    pub fn trailing_period(o: &Observation<'_>) -> bool {
        o.word.ends_with('.') && o.word != "."
    }

    pub fn foreign_model2(o: &Observation<'_>) -> bool {
        FOREIGN_MODEL2.contains(&o.word)
    }

    pub fn foreign_model1(o: &Observation<'_>) -> bool {
        FOREIGN_MODEL1.contains(&o.word)
    }

    pub fn in_vitro(o: &Observation<'_>) -> bool {
        matches!(o.word, "in" | "In") && matches!(o.next_word, "vitro" | "vivo")
    }

    pub fn list_marker(o: &Observation<'_>) -> bool {
        matches!(o.word, "i" | "ii" | "iii" | "iv")
    }
}

const LONG_WORD_RULES: &[Rule<MorphShape>] = &[
    Rule {
        when: morph::long_gerund,
        emit: &[Emit { shape: MorphShape::LongGerund, when: always }],
    },
    Rule {
        when: morph::long_past,
        emit: &[Emit { shape: MorphShape::LongPast, when: always }],
    },
    Rule {
        when: morph::long_adverb,
        emit: &[Emit { shape: MorphShape::LongAdverb, when: always }],
    },
    Rule {
        when: morph::long_adjective,
        emit: &[Emit { shape: MorphShape::LongAdjective, when: always }],
    },
    Rule {
        when: morph::long,
        emit: &[
            Emit { shape: MorphShape::LongPlural, when: morph::ends_s },
            Emit { shape: MorphShape::Long, when: always },
        ],
    },
];

const SHAPE_RULES_MODEL2: &[Rule<MorphShape>] = &[
    Rule {
        when: morph::cardinal_model2,
        emit: &[Emit { shape: MorphShape::Cardinal, when: always }],
    },
    Rule {
        when: morph::hyphen_adjective,
        emit: &[Emit { shape: MorphShape::HyphenAdjective, when: always }],
    },
    Rule {
        when: always,
        emit: &[
            Emit { shape: MorphShape::PluralAcronym, when: morph::plural_acronym },
            Emit { shape: MorphShape::NounShape, when: morph::noun_shape_model2 },
            Emit { shape: MorphShape::NumberHyphenWord, when: morph::number_hyphen_word },
            Emit { shape: MorphShape::WordHyphenNumber, when: morph::word_hyphen_number },
            Emit { shape: MorphShape::TrailingPeriod, when: morph::trailing_period },
            Emit { shape: MorphShape::Foreign, when: morph::foreign_model2 },
            Emit { shape: MorphShape::Foreign, when: morph::in_vitro },
            Emit { shape: MorphShape::ListMarker, when: morph::list_marker },
        ],
    },
];

pub static MORPHOLOGY_MODEL2: RuleTable<MorphShape> = RuleTable {
    precondition: always,
    stages: &[
        Stage::FirstOf(LONG_WORD_RULES),
        Stage::FirstOf(SHAPE_RULES_MODEL2),
    ],
};

const SHAPE_RULES_MODEL1: &[Rule<MorphShape>] = &[
    Rule {
        when: morph::cardinal_model1,
        emit: &[Emit { shape: MorphShape::Cardinal, when: always }],
    },
    Rule {
        when: morph::hyphen_adjective,
        emit: &[Emit { shape: MorphShape::HyphenAdjective, when: always }],
    },
    Rule {
        when: always,
        emit: &[
            Emit { shape: MorphShape::PluralAcronym, when: morph::plural_acronym },
            Emit { shape: MorphShape::NounShape, when: morph::noun_shape_model1 },
            Emit { shape: MorphShape::NumberHyphenWord, when: morph::number_hyphen_word },
            Emit { shape: MorphShape::WordHyphenNumber, when: morph::word_hyphen_number },
            Emit { shape: MorphShape::TrailingPeriod, when: morph::trailing_period },
            Emit { shape: MorphShape::Foreign, when: morph::foreign_model1 },
            Emit { shape: MorphShape::Foreign, when: morph::in_vitro },
            Emit { shape: MorphShape::ListMarker, when: morph::list_marker },
        ],
    },
];

pub static MORPHOLOGY_MODEL1: RuleTable<MorphShape> = RuleTable {
    precondition: always,
    stages: &[
        Stage::FirstOf(LONG_WORD_RULES),
        Stage::FirstOf(SHAPE_RULES_MODEL1),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes<S: Copy>(table: &RuleTable<S>, words: &[&str], k: usize) -> Vec<S> {
        let mut out = Vec::new();
        table.apply(&Observation::at(words, k), &mut out);
        out
    }

    fn numeric(word: &str) -> Vec<NumericShape> {
        shapes(&NUMERIC, &[word], 0)
    }

    #[test]
    fn test_numeric_shapes() {
        assert_eq!(numeric("dog"), vec![]);
        assert_eq!(numeric("1,234.5"), vec![NumericShape::Number]);
        assert_eq!(numeric("12\\/34"), vec![NumericShape::Number]);
        assert_eq!(numeric("IL-2"), vec![NumericShape::WordNumber]);
        assert_eq!(numeric("alpha-1"), vec![NumericShape::LowerWordNumber]);
        assert_eq!(numeric("IL-2-receptor"), vec![NumericShape::LettersNumbersLetters]);
        assert_eq!(numeric("A-1-B-2"), vec![NumericShape::LettersNumbers]);
        assert_eq!(numeric("3-fold"), vec![NumericShape::NumberWord]);
        assert_eq!(numeric("1-alpha-2"), vec![NumericShape::NumbersLetters]);
        assert_eq!(numeric("1980s"), vec![NumericShape::Year]);
        assert_eq!(numeric("'80s"), vec![NumericShape::Year]);
        assert_eq!(numeric("p53"), vec![NumericShape::Other]);
        assert_eq!(numeric("2x-b"), vec![NumericShape::OtherWordEnd]);
    }

    #[test]
    fn test_mid_decade_is_only_a_year() {
        assert_eq!(numeric("mid-1980s"), vec![NumericShape::Year]);
        assert!(!numeric("mid-1980s").contains(&NumericShape::LettersNumbersLetters));
    }

    #[test]
    fn test_capital_shapes() {
        let words = ["Mr", "J.", "Smith", "NASA", "IBM", "said", "eBay"];
        assert_eq!(
            shapes(&CAPITALIZATION, &words, 1),
            vec![CapitalShape::InnerPunctBetweenCapitals, CapitalShape::HasCapital]
        );
        assert_eq!(
            shapes(&CAPITALIZATION, &words, 3),
            vec![CapitalShape::CapitalRun, CapitalShape::HasCapital]
        );
        assert_eq!(
            shapes(&CAPITALIZATION, &words, 5),
            Vec::<CapitalShape>::new()
        );
        assert_eq!(
            shapes(&CAPITALIZATION, &words, 6),
            vec![CapitalShape::HasCapital, CapitalShape::CamelCase]
        );
    }

    #[test]
    fn test_sentence_start_blocks_acronym_rules() {
        // The sentence-start guard wins the chain even when it emits nothing.
        let words = ["NASA", "IBM"];
        assert_eq!(
            shapes(&CAPITALIZATION, &words, 0),
            vec![CapitalShape::HasCapital]
        );
        let words = ["the", "NASA", "IBM"];
        assert_eq!(
            shapes(&CAPITALIZATION, &words, 1),
            vec![CapitalShape::AcronymBeforeAcronym, CapitalShape::HasCapital]
        );
    }

    #[test]
    fn test_long_word_shapes() {
        let m = |w: &str| shapes(&MORPHOLOGY_MODEL2, &[w], 0);
        assert_eq!(m("understanding"), vec![MorphShape::LongGerund]);
        assert_eq!(m("characterized"), vec![MorphShape::LongPast]);
        assert_eq!(
            m("transcriptions"),
            vec![MorphShape::LongPlural, MorphShape::Long]
        );
        assert_eq!(m("transcription"), vec![MorphShape::Long]);
        assert_eq!(m("dog"), vec![]);
    }

    #[test]
    fn test_morphology_generations_differ() {
        let m2 = |w: &str| shapes(&MORPHOLOGY_MODEL2, &[w], 0);
        let m1 = |w: &str| shapes(&MORPHOLOGY_MODEL1, &[w], 0);
        assert_eq!(m2("1,000"), vec![MorphShape::Cardinal]);
        assert_eq!(m2("[3]"), vec![]);
        assert_eq!(m1("3]"), vec![MorphShape::Cardinal]);
        assert_eq!(m2("cerevisiae"), vec![]);
        assert_eq!(m1("cerevisiae"), vec![MorphShape::Foreign]);
        assert_eq!(m2("well-known"), vec![]);
        assert_eq!(m1("ab-cd7"), vec![MorphShape::NounShape]);
        assert_eq!(m2("ab-cd7"), vec![]);
    }

    #[test]
    fn test_morphology_independent_rules() {
        let m = |w: &str| shapes(&MORPHOLOGY_MODEL2, &[w], 0);
        assert_eq!(m("pre-war"), vec![MorphShape::HyphenAdjective]);
        assert_eq!(m("DNAs"), vec![MorphShape::PluralAcronym]);
        assert_eq!(m("DNA"), vec![MorphShape::NounShape]);
        assert_eq!(m("I"), vec![]);
        assert_eq!(m("Dr."), vec![MorphShape::TrailingPeriod]);
        assert_eq!(m("iii"), vec![MorphShape::ListMarker]);
        assert_eq!(m("vivo"), vec![MorphShape::Foreign]);
        assert_eq!(
            shapes(&MORPHOLOGY_MODEL2, &["in", "vitro"], 0),
            vec![MorphShape::Foreign]
        );
    }

    #[test]
    fn test_case_variants() {
        assert_eq!(CaseVariant::Title.apply("tHE"), "The");
        assert_eq!(CaseVariant::Lower.apply("ThE"), "the");
        assert_eq!(CaseVariant::Upper.apply("the"), "THE");
        assert_eq!(CaseVariant::Title.apply(""), "");
    }

    #[test]
    fn test_case_fallback_order() {
        assert_eq!(CaseFallback::default(), CaseFallback::Full);
        assert_eq!(
            CaseFallback::Full.variants(),
            &[CaseVariant::Lower, CaseVariant::Upper, CaseVariant::Title]
        );
        assert_eq!(CaseFallback::TitleOnly.variants(), &[CaseVariant::Title]);
        let parsed: CaseFallback = serde_json::from_str("\"title_only\"").unwrap();
        assert_eq!(parsed, CaseFallback::TitleOnly);
    }
}
