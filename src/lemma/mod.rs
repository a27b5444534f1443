//! Text to lemma conversion
//!
//! Normalizes free text to the configured alphabet, splits it into tokens and
//! runs each token through a [`MorphAnalyzer`], dropping function words.

use crate::config::{Alphabet, LemmaConfig};
use crate::error::Result;
use crate::morph::{DictionaryMorphology, MorphAnalyzer};
use std::collections::HashMap;
use std::sync::Arc;

/// Tokenizer plus morphology
#[derive(Clone)]
pub struct Lemmatizer {
    morph: Arc<dyn MorphAnalyzer>,
    alphabet: Alphabet,
    min_word_chars: usize,
}

impl Lemmatizer {
    pub fn new(morph: Arc<dyn MorphAnalyzer>, alphabet: Alphabet, min_word_chars: usize) -> Self {
        Self {
            morph,
            alphabet,
            min_word_chars,
        }
    }

    /// Build from configuration, loading the extra dictionary if one is set
    pub fn from_config(config: &LemmaConfig) -> Result<Self> {
        let morph = match &config.dictionary {
            Some(path) => DictionaryMorphology::with_dictionary(path)?,
            None => DictionaryMorphology::builtin(),
        };
        Ok(Self::new(
            Arc::new(morph),
            config.alphabet,
            config.min_word_chars,
        ))
    }

    /// Strip everything outside the alphabet and whitespace, collapse
    /// whitespace runs to one space and trim.
    pub fn normalize(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pending_space = false;
        for c in text.chars() {
            if c.is_whitespace() {
                pending_space = true;
            } else if in_alphabet(self.alphabet, c) {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
        out
    }

    /// Base forms in input order, function words removed, duplicates kept
    pub fn base_forms(&self, text: &str) -> Vec<String> {
        self.normalize(text)
            .split(' ')
            .filter(|token| token.chars().count() >= self.min_word_chars)
            .filter_map(|token| self.morph.analyze(token))
            .filter(|analysis| !analysis.tag.is_function_word())
            .map(|analysis| analysis.base_form)
            .collect()
    }

    /// Occurrence count per base form
    pub fn frequency_map(&self, text: &str) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for form in self.base_forms(text) {
            *counts.entry(form).or_insert(0) += 1;
        }
        counts
    }

    /// Words the morphology could not reduce, most frequent first
    pub fn difficult_words(&self) -> Vec<(String, u64)> {
        self.morph.difficult_words()
    }

    pub fn clear_difficult(&self) {
        self.morph.clear_difficult();
    }
}

fn in_alphabet(alphabet: Alphabet, c: char) -> bool {
    let cyrillic = matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё');
    let latin = c.is_ascii_alphabetic();
    match alphabet {
        Alphabet::Cyrillic => cyrillic,
        Alphabet::Latin => latin,
        Alphabet::Mixed => cyrillic || latin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lemmatizer(alphabet: Alphabet) -> Lemmatizer {
        Lemmatizer::new(Arc::new(DictionaryMorphology::builtin()), alphabet, 3)
    }

    #[test]
    fn test_normalize_strips_and_collapses() {
        let l = lemmatizer(Alphabet::Cyrillic);
        assert_eq!(
            l.normalize("  Привет,   мир! 123 hello\n\tкот-коты "),
            "Привет мир коткоты"
        );
    }

    #[test]
    fn test_normalize_mixed_keeps_latin() {
        let l = lemmatizer(Alphabet::Mixed);
        assert_eq!(l.normalize("Test: тест, 42!"), "Test тест");
    }

    #[test]
    fn test_base_forms_filters_short_and_function_words() {
        let l = lemmatizer(Alphabet::Mixed);
        let forms = l.base_forms("Коты и собаки бегают для леса, а кот бегает");
        assert_eq!(
            forms,
            vec!["кот", "собака", "бегать", "лес", "кот", "бегать"]
        );
    }

    #[test]
    fn test_frequency_map_counts_occurrences() {
        let l = lemmatizer(Alphabet::Mixed);
        let map = l.frequency_map("test tests testing and the cat");
        assert_eq!(map.get("test"), Some(&3));
        assert_eq!(map.get("cat"), Some(&1));
        assert!(!map.contains_key("and"));
        assert!(!map.contains_key("the"));
    }

    #[test]
    fn test_inflections_outside_dictionary_collapse() {
        let l = lemmatizer(Alphabet::Mixed);
        let map = l.frequency_map("Кошки и кошка читают книги, книга");
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("читать"), Some(&1));
        assert!(map.values().filter(|&&n| n == 2).count() == 2);
        assert!(l.difficult_words().is_empty());
    }

    #[test]
    fn test_empty_text() {
        let l = lemmatizer(Alphabet::Mixed);
        assert!(l.base_forms("  ,,, 12 ").is_empty());
        assert!(l.frequency_map("").is_empty());
    }
}
