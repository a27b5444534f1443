//! Morphology analysis
//!
//! Maps a single word to its base form and part of speech. The dictionary
//! covers function words and irregular forms. Words it does not know are
//! reduced by a Snowball stemmer (Russian for Cyrillic, English for Latin)
//! and tagged [`PartOfSpeech::Unknown`]. Only words neither source can handle,
//! such as mixed-script tokens, are counted as "difficult".

mod dictionary;

use crate::error::{Error, Result};
use dashmap::DashMap;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Distinct difficult words remembered before new ones are dropped
pub const MAX_DIFFICULT_WORDS: usize = 10_000;

/// Part-of-speech tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Participle,
    Gerund,
    Adverb,
    Pronoun,
    Numeral,
    Preposition,
    Conjunction,
    Particle,
    Interjection,
    Unknown,
}

impl PartOfSpeech {
    /// Function words carry no searchable meaning and are never indexed
    pub fn is_function_word(self) -> bool {
        matches!(
            self,
            PartOfSpeech::Preposition
                | PartOfSpeech::Conjunction
                | PartOfSpeech::Particle
                | PartOfSpeech::Interjection
        )
    }
}

impl std::fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            PartOfSpeech::Noun => "NOUN",
            PartOfSpeech::Verb => "VERB",
            PartOfSpeech::Adjective => "ADJ",
            PartOfSpeech::Participle => "PARTICIPLE",
            PartOfSpeech::Gerund => "GERUND",
            PartOfSpeech::Adverb => "ADV",
            PartOfSpeech::Pronoun => "PRON",
            PartOfSpeech::Numeral => "NUM",
            PartOfSpeech::Preposition => "PREP",
            PartOfSpeech::Conjunction => "CONJ",
            PartOfSpeech::Particle => "PART",
            PartOfSpeech::Interjection => "INTJ",
            PartOfSpeech::Unknown => "UNKNOWN",
        };
        write!(f, "{}", tag)
    }
}

impl FromStr for PartOfSpeech {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "noun" => Ok(PartOfSpeech::Noun),
            "verb" => Ok(PartOfSpeech::Verb),
            "adj" | "adjective" => Ok(PartOfSpeech::Adjective),
            "participle" => Ok(PartOfSpeech::Participle),
            "gerund" => Ok(PartOfSpeech::Gerund),
            "adv" | "adverb" => Ok(PartOfSpeech::Adverb),
            "pron" | "pronoun" => Ok(PartOfSpeech::Pronoun),
            "num" | "numeral" => Ok(PartOfSpeech::Numeral),
            "prep" | "preposition" => Ok(PartOfSpeech::Preposition),
            "conj" | "conjunction" => Ok(PartOfSpeech::Conjunction),
            "part" | "particle" => Ok(PartOfSpeech::Particle),
            "intj" | "interjection" => Ok(PartOfSpeech::Interjection),
            "unknown" => Ok(PartOfSpeech::Unknown),
            _ => Err(Error::Parse(format!("Unknown part of speech: {}", s))),
        }
    }
}

/// Result of analyzing one word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub base_form: String,
    pub tag: PartOfSpeech,
}

/// Word-level morphology
pub trait MorphAnalyzer: Send + Sync {
    /// Base form and tag for `word`, or `None` for empty input
    fn analyze(&self, word: &str) -> Option<Analysis>;

    /// Words the analyzer could not reduce, most frequent first
    fn difficult_words(&self) -> Vec<(String, u64)> {
        Vec::new()
    }

    /// Forget collected difficult words
    fn clear_difficult(&self) {}
}

/// Entry in a user-supplied dictionary file
#[derive(Debug, Clone, Deserialize)]
struct DictionaryEntry {
    base: String,
    tag: String,
}

#[derive(Debug, Deserialize)]
struct DictionaryFile {
    #[serde(default)]
    words: HashMap<String, DictionaryEntry>,
}

/// Dictionary-backed analyzer with a stemming fallback
pub struct DictionaryMorphology {
    entries: HashMap<String, Analysis>,
    russian: Stemmer,
    english: Stemmer,
    difficult: DashMap<String, u64>,
}

impl DictionaryMorphology {
    /// Analyzer preloaded with the built-in word lists
    pub fn builtin() -> Self {
        let mut morph = Self {
            entries: HashMap::new(),
            russian: Stemmer::create(Algorithm::Russian),
            english: Stemmer::create(Algorithm::English),
            difficult: DashMap::new(),
        };
        for (word, tag) in dictionary::FUNCTION_WORDS {
            morph.insert(word, word, *tag);
        }
        for (word, base, tag) in dictionary::WORD_FORMS {
            morph.insert(word, base, *tag);
        }
        morph
    }

    /// Built-in lists extended with a TOML dictionary:
    ///
    /// ```toml
    /// [words]
    /// "коты" = { base = "кот", tag = "noun" }
    /// ```
    pub fn with_dictionary(path: &Path) -> Result<Self> {
        let mut morph = Self::builtin();
        let content = std::fs::read_to_string(path)?;
        let file: DictionaryFile = toml::from_str(&content)?;
        let count = file.words.len();
        for (word, entry) in file.words {
            let tag: PartOfSpeech = entry.tag.parse()?;
            morph.insert(&word, &entry.base, tag);
        }
        info!("Loaded {} dictionary entries from {:?}", count, path);
        Ok(morph)
    }

    /// Add or replace a word form
    pub fn insert(&mut self, word: &str, base: &str, tag: PartOfSpeech) {
        self.entries.insert(
            word.to_lowercase(),
            Analysis {
                base_form: base.to_lowercase(),
                tag,
            },
        );
    }

    /// Stem of a single-script word, `None` when no stemmer applies
    fn stem(&self, word: &str) -> Option<String> {
        let stemmer = match Script::of(word)? {
            Script::Cyrillic => &self.russian,
            Script::Latin => &self.english,
        };
        let stem = stemmer.stem(word);
        if stem.is_empty() {
            None
        } else {
            Some(stem.into_owned())
        }
    }

    fn record_difficult(&self, word: &str) {
        if let Some(mut count) = self.difficult.get_mut(word) {
            *count += 1;
            return;
        }
        if self.difficult.len() >= MAX_DIFFICULT_WORDS {
            debug!("Difficult word list full, dropping {}", word);
            return;
        }
        *self.difficult.entry(word.to_string()).or_insert(0) += 1;
    }
}

impl MorphAnalyzer for DictionaryMorphology {
    fn analyze(&self, word: &str) -> Option<Analysis> {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return None;
        }

        if let Some(found) = self.entries.get(&word) {
            return Some(found.clone());
        }

        if let Some(stem) = self.stem(&word) {
            return Some(Analysis {
                base_form: stem,
                tag: PartOfSpeech::Unknown,
            });
        }

        debug!("Unrecognized word: {}", word);
        self.record_difficult(&word);
        Some(Analysis {
            base_form: word,
            tag: PartOfSpeech::Unknown,
        })
    }

    fn difficult_words(&self) -> Vec<(String, u64)> {
        let mut words: Vec<(String, u64)> = self
            .difficult
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words
    }

    fn clear_difficult(&self) {
        self.difficult.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Cyrillic,
    Latin,
}

impl Script {
    /// Script shared by every character of `word`
    fn of(word: &str) -> Option<Self> {
        if word.chars().all(|c| matches!(c, 'а'..='я' | 'ё')) {
            Some(Script::Cyrillic)
        } else if word.chars().all(|c| c.is_ascii_lowercase()) {
            Some(Script::Latin)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_known_forms_map_to_base() {
        let morph = DictionaryMorphology::builtin();
        let a = morph.analyze("Коты").unwrap();
        assert_eq!(a.base_form, "кот");
        assert_eq!(a.tag, PartOfSpeech::Noun);

        let a = morph.analyze("бегает").unwrap();
        assert_eq!(a.base_form, "бегать");
        assert_eq!(a.tag, PartOfSpeech::Verb);
    }

    #[test]
    fn test_function_words_are_tagged() {
        let morph = DictionaryMorphology::builtin();
        for word in ["для", "или", "даже", "ого", "and", "with"] {
            let a = morph.analyze(word).unwrap();
            assert!(a.tag.is_function_word(), "{} should be a function word", word);
        }
        assert!(!PartOfSpeech::Unknown.is_function_word());
    }

    #[test]
    fn test_unknown_forms_share_a_stem() {
        let morph = DictionaryMorphology::builtin();
        let base = |w: &str| morph.analyze(w).unwrap().base_form;

        assert_eq!(base("кошки"), base("кошка"));
        assert_eq!(base("книги"), base("книга"));
        assert_ne!(base("кошка"), base("книга"));
        assert_eq!(base("Walking"), base("walked"));
        assert_eq!(morph.analyze("кошки").unwrap().tag, PartOfSpeech::Unknown);
        assert!(morph.difficult_words().is_empty());
    }

    #[test]
    fn test_mixed_script_is_difficult() {
        let morph = DictionaryMorphology::builtin();
        let a = morph.analyze("Catкот").unwrap();
        assert_eq!(a.base_form, "catкот");
        assert_eq!(a.tag, PartOfSpeech::Unknown);
        morph.analyze("catкот");
        morph.analyze("dogпёс");

        let words = morph.difficult_words();
        assert_eq!(words[0], ("catкот".to_string(), 2));
        assert_eq!(words[1], ("dogпёс".to_string(), 1));

        morph.clear_difficult();
        assert!(morph.difficult_words().is_empty());
    }

    #[test]
    fn test_difficult_words_are_bounded() {
        let morph = DictionaryMorphology::builtin();
        for i in 0..MAX_DIFFICULT_WORDS + 5 {
            morph.record_difficult(&format!("w{}", i));
        }
        morph.record_difficult("w0");

        let words = morph.difficult_words();
        assert_eq!(words.len(), MAX_DIFFICULT_WORDS);
        assert_eq!(words[0], ("w0".to_string(), 2));
    }

    #[test]
    fn test_empty_input() {
        let morph = DictionaryMorphology::builtin();
        assert!(morph.analyze("   ").is_none());
    }

    #[test]
    fn test_dictionary_file_extends_builtin() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[words]\n\"мыши\" = {{ base = \"мышь\", tag = \"noun\" }}"
        )
        .unwrap();

        let morph = DictionaryMorphology::with_dictionary(file.path()).unwrap();
        assert_eq!(morph.analyze("мыши").unwrap().base_form, "мышь");
        assert_eq!(morph.analyze("коты").unwrap().base_form, "кот");
    }

    #[test]
    fn test_tag_round_trip() {
        assert_eq!("conj".parse::<PartOfSpeech>().unwrap(), PartOfSpeech::Conjunction);
        assert!("bogus".parse::<PartOfSpeech>().is_err());
        assert_eq!(PartOfSpeech::Noun.to_string(), "NOUN");
    }
}
