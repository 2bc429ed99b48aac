use std::fs;
use std::io::Write;
use std::path::Path;

use bstr::ByteSlice;

use crate::error::{Error, Result};

/// Separator between a word and its tag inside a token.
pub const TAG_SEPARATOR: char = '_';

/// A tokenized sentence with one tag per word.
///
/// Sentences read from an unlabeled file carry empty tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Words in order
    pub words: Vec<String>,
    /// Tags in order, parallel to `words`
    pub tags: Vec<String>,
}

impl Sentence {
    /// Create a tagged sentence
    pub fn new<W, T>(words: &[W], tags: &[T]) -> Result<Self>
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
        Ok(Self {
            words: words.iter().map(|w| w.as_ref().to_string()).collect(),
            tags: tags.iter().map(|t| t.as_ref().to_string()).collect(),
        })
    }

    /// Parse one `word_tag word_tag ...` line.
    ///
    /// `line` is the 1-based line number used in error messages.
    pub fn parse_tagged(text: &str, line: usize) -> Result<Self> {
        let mut words = Vec::new();
        let mut tags = Vec::new();
        for token in text.split(' ') {
            let mut parts = token.split(TAG_SEPARATOR);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(word), Some(tag), None) if !word.is_empty() && !tag.is_empty() => {
                    words.push(word.to_string());
                    tags.push(tag.to_string());
                }
                _ => {
                    return Err(Error::MalformedToken {
                        line,
                        token: token.to_string(),
                    })
                }
            }
        }
        Ok(Self { words, tags })
    }

    /// Parse one line to be tagged. Tokens may be plain words or `word_tag`
    /// pairs whose tag is ignored.
    pub fn parse_untagged(text: &str, line: usize) -> Result<Self> {
        let mut words = Vec::new();
        for token in text.split(' ') {
            let word = token.split(TAG_SEPARATOR).next().unwrap_or_default();
            if word.is_empty() {
                return Err(Error::MalformedToken {
                    line,
                    token: token.to_string(),
                });
            }
            words.push(word.to_string());
        }
        let tags = vec![String::new(); words.len()];
        Ok(Self { words, tags })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Render the words with the given tags as a `word_tag` line (no newline)
    pub fn to_line_with<T: AsRef<str>>(&self, tags: &[T]) -> String {
        let mut line = String::new();
        for (i, (word, tag)) in self.words.iter().zip(tags).enumerate() {
            if i > 0 {
                line.push(' ');
            }
            line.push_str(word);
            line.push(TAG_SEPARATOR);
            line.push_str(tag.as_ref());
        }
        line
    }

    /// Render the sentence with its own tags
    pub fn to_line(&self) -> String {
        self.to_line_with(&self.tags)
    }
}

/// An ordered collection of sentences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    sentences: Vec<Sentence>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a labeled corpus, one sentence per line.
    pub fn parse_tagged(data: &[u8]) -> Result<Self> {
        Self::parse_with(data, Sentence::parse_tagged)
    }

    /// Parse a corpus to be tagged, one sentence per line.
    pub fn parse_untagged(data: &[u8]) -> Result<Self> {
        Self::parse_with(data, Sentence::parse_untagged)
    }

    /// Read a labeled corpus from disk
    pub fn read_tagged<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        let corpus = Self::parse_tagged(&data)?;
        log::info!(
            "read {} sentences ({} tokens) from {}",
            corpus.len(),
            corpus.num_tokens(),
            path.as_ref().display()
        );
        Ok(corpus)
    }

    /// Read a corpus to be tagged from disk
    pub fn read_untagged<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        Self::parse_untagged(&data)
    }

    fn parse_with<F>(data: &[u8], parse: F) -> Result<Self>
    where
        F: Fn(&str, usize) -> Result<Sentence>,
    {
        let mut sentences = Vec::new();
        for (i, raw) in data.lines().enumerate() {
            let line = i + 1;
            let text = raw.to_str().map_err(|_| Error::InvalidUtf8 { line })?;
            if text.is_empty() {
                log::warn!("line {}: skipping blank line", line);
                continue;
            }
            sentences.push(parse(text, line)?);
        }
        Ok(Self { sentences })
    }

    pub fn push(&mut self, sentence: Sentence) {
        self.sentences.push(sentence);
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sentence> {
        self.sentences.iter()
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn num_tokens(&self) -> usize {
        self.sentences.iter().map(Sentence::len).sum()
    }

    /// Write every sentence as a `word_tag` line
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for sentence in &self.sentences {
            writeln!(writer, "{}", sentence.to_line())?;
        }
        Ok(())
    }
}

impl FromIterator<Sentence> for Corpus {
    fn from_iter<I: IntoIterator<Item = Sentence>>(iter: I) -> Self {
        Self {
            sentences: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Sentence;
    type IntoIter = std::slice::Iter<'a, Sentence>;

    fn into_iter(self) -> Self::IntoIter {
        self.sentences.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_line() {
        let s = Sentence::parse_tagged("The_DT dog_NN barked_VBD ._.", 1).unwrap();
        assert_eq!(s.words, vec!["The", "dog", "barked", "."]);
        assert_eq!(s.tags, vec!["DT", "NN", "VBD", "."]);
        assert_eq!(s.to_line(), "The_DT dog_NN barked_VBD ._.");
    }

    #[test]
    fn test_malformed_tokens_are_fatal() {
        for bad in ["The_DT dog", "a_b_c", "The_DT  dog_NN", "_NN", "dog_"] {
            let err = Sentence::parse_tagged(bad, 3).unwrap_err();
            assert!(
                matches!(err, Error::MalformedToken { line: 3, .. }),
                "{bad:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_corpus_trailing_newline_and_crlf() {
        let corpus = Corpus::parse_tagged(b"A_DT b_NN\r\nC_DT d_NN\n").unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.num_tokens(), 4);
        assert_eq!(corpus.sentences()[1].words, vec!["C", "d"]);
    }

    #[test]
    fn test_corpus_reports_line_of_error() {
        let err = Corpus::parse_tagged(b"A_DT\nB_NN C\n").unwrap_err();
        assert!(matches!(err, Error::MalformedToken { line: 2, .. }));
    }

    #[test]
    fn test_untagged_accepts_words_and_pairs() {
        let corpus = Corpus::parse_untagged(b"The dog_XX barked .\n").unwrap();
        let s = &corpus.sentences()[0];
        assert_eq!(s.words, vec!["The", "dog", "barked", "."]);
        assert_eq!(s.to_line_with(&["DT", "NN", "VBD", "."]), "The_DT dog_NN barked_VBD ._.");
    }

    #[test]
    fn test_sentence_new_checks_lengths() {
        assert!(matches!(
            Sentence::new(&["a", "b"], &["X"]),
            Err(Error::LengthMismatch { words: 2, tags: 1 })
        ));
        let empty: [&str; 0] = [];
        assert!(matches!(
            Sentence::new(&empty, &empty),
            Err(Error::EmptySentence)
        ));
    }
}
