//! Per-page lemma weighting
//!
//! Title and body are lemmatized independently, scaled by their field
//! weights and merged into one lemma -> weight map per page.

use super::parse_html;
use crate::lemma::Lemmatizer;
use crate::store::Field;
use std::collections::HashMap;

/// Region weights applied to lemma counts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldWeights {
    pub title: f64,
    pub body: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            title: 1.0,
            body: 0.8,
        }
    }
}

impl FieldWeights {
    /// Pick weights from field rows by selector; missing selectors keep defaults
    pub fn from_fields(fields: &[Field]) -> Self {
        let mut weights = Self::default();
        for field in fields {
            match field.selector.as_str() {
                "title" => weights.title = field.weight,
                "body" => weights.body = field.weight,
                _ => {}
            }
        }
        weights
    }
}

/// Weighted lemma maps for the two regions of a page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionWeights {
    pub title: HashMap<String, f64>,
    pub body: HashMap<String, f64>,
}

/// Turns HTML into per-page lemma weights
#[derive(Clone)]
pub struct ContentProcessor {
    lemmatizer: Lemmatizer,
    weights: FieldWeights,
}

impl ContentProcessor {
    pub fn new(lemmatizer: Lemmatizer, weights: FieldWeights) -> Self {
        Self {
            lemmatizer,
            weights,
        }
    }

    pub fn lemmatizer(&self) -> &Lemmatizer {
        &self.lemmatizer
    }

    /// Lemmatize title and body separately and apply the field weights
    pub fn process(&self, html: &str) -> RegionWeights {
        let page = parse_html(html, None);
        let title = page.title.unwrap_or_default();

        RegionWeights {
            title: self.weigh(&title, self.weights.title),
            body: self.weigh(&page.body_text, self.weights.body),
        }
    }

    /// Combined lemma -> weight map for one page
    pub fn page_weights(&self, html: &str) -> HashMap<String, f64> {
        let regions = self.process(html);
        combine(regions.title, regions.body)
    }

    fn weigh(&self, text: &str, weight: f64) -> HashMap<String, f64> {
        self.lemmatizer
            .frequency_map(text)
            .into_iter()
            .map(|(lemma, count)| (lemma, count as f64 * weight))
            .collect()
    }
}

/// Sum weights for shared keys; keys present in one map pass through
pub fn combine(title: HashMap<String, f64>, body: HashMap<String, f64>) -> HashMap<String, f64> {
    let mut merged = body;
    for (lemma, weight) in title {
        *merged.entry(lemma).or_insert(0.0) += weight;
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Alphabet;
    use crate::morph::DictionaryMorphology;
    use std::sync::Arc;

    fn processor() -> ContentProcessor {
        let lemmatizer = Lemmatizer::new(
            Arc::new(DictionaryMorphology::builtin()),
            Alphabet::Mixed,
            3,
        );
        ContentProcessor::new(lemmatizer, FieldWeights::default())
    }

    #[test]
    fn test_process_applies_body_discount() {
        let html = "<html><head><title>Коты</title></head><body>кот кот собака</body></html>";
        let regions = processor().process(html);

        assert_eq!(regions.title.get("кот"), Some(&1.0));
        let body_cat = regions.body.get("кот").copied().unwrap();
        assert!((body_cat - 1.6).abs() < 1e-9);
        let body_dog = regions.body.get("собака").copied().unwrap();
        assert!((body_dog - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_combine_sums_overlap() {
        let title = HashMap::from([("a".to_string(), 1.0), ("b".to_string(), 2.0)]);
        let body = HashMap::from([("b".to_string(), 0.8), ("c".to_string(), 1.6)]);
        let merged = combine(title, body);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged["a"], 1.0);
        assert!((merged["b"] - 2.8).abs() < 1e-9);
        assert_eq!(merged["c"], 1.6);
    }

    #[test]
    fn test_page_weights_without_title() {
        let weights = processor().page_weights("<body>test test</body>");
        assert!((weights["test"] - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_field_weights_from_rows() {
        let fields = vec![
            Field::new("title", "title", 2.0),
            Field::new("body", "body", 0.5),
        ];
        let w = FieldWeights::from_fields(&fields);
        assert_eq!(w, FieldWeights { title: 2.0, body: 0.5 });
    }
}
