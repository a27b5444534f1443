//! Built-in word lists

use super::PartOfSpeech::{self, *};

/// Function words excluded from indexing. Only tokens that survive the
/// length filter matter, so two-letter words are omitted.
pub(super) const FUNCTION_WORDS: &[(&str, PartOfSpeech)] = &[
    // Russian prepositions
    ("для", Preposition),
    ("без", Preposition),
    ("под", Preposition),
    ("над", Preposition),
    ("при", Preposition),
    ("про", Preposition),
    ("через", Preposition),
    ("между", Preposition),
    ("перед", Preposition),
    ("около", Preposition),
    ("после", Preposition),
    ("среди", Preposition),
    ("вокруг", Preposition),
    ("изза", Preposition),
    ("кроме", Preposition),
    ("вместо", Preposition),
    // Russian conjunctions
    ("что", Conjunction),
    ("чтобы", Conjunction),
    ("или", Conjunction),
    ("либо", Conjunction),
    ("если", Conjunction),
    ("когда", Conjunction),
    ("хотя", Conjunction),
    ("потому", Conjunction),
    ("поэтому", Conjunction),
    ("также", Conjunction),
    ("тоже", Conjunction),
    ("зато", Conjunction),
    ("однако", Conjunction),
    // Russian particles
    ("даже", Particle),
    ("лишь", Particle),
    ("только", Particle),
    ("вот", Particle),
    ("вон", Particle),
    ("ведь", Particle),
    ("уже", Particle),
    ("еще", Particle),
    ("ещё", Particle),
    ("разве", Particle),
    ("неужели", Particle),
    ("пусть", Particle),
    // Russian interjections
    ("ого", Interjection),
    ("увы", Interjection),
    ("ура", Interjection),
    ("ахах", Interjection),
    // English articles and prepositions
    ("the", Particle),
    ("for", Preposition),
    ("with", Preposition),
    ("from", Preposition),
    ("into", Preposition),
    ("onto", Preposition),
    ("about", Preposition),
    ("over", Preposition),
    ("under", Preposition),
    ("between", Preposition),
    ("through", Preposition),
    ("without", Preposition),
    ("within", Preposition),
    ("after", Preposition),
    ("before", Preposition),
    // English conjunctions
    ("and", Conjunction),
    ("but", Conjunction),
    ("nor", Conjunction),
    ("yet", Conjunction),
    ("because", Conjunction),
    ("although", Conjunction),
    ("while", Conjunction),
    ("unless", Conjunction),
    ("whether", Conjunction),
    ("that", Conjunction),
    // English particles and interjections
    ("not", Particle),
    ("just", Particle),
    ("only", Particle),
    ("wow", Interjection),
    ("oops", Interjection),
    ("hey", Interjection),
    ("alas", Interjection),
];

/// Inflected forms mapped to their base form
pub(super) const WORD_FORMS: &[(&str, &str, PartOfSpeech)] = &[
    // Proper nouns kept as-is
    ("москва", "москва", Noun),
    ("москвы", "москва", Noun),
    ("москве", "москва", Noun),
    ("санктпетербург", "санктпетербург", Noun),
    ("петербург", "петербург", Noun),
    // Russian nouns
    ("кот", "кот", Noun),
    ("коты", "кот", Noun),
    ("кота", "кот", Noun),
    ("котов", "кот", Noun),
    ("коту", "кот", Noun),
    ("котом", "кот", Noun),
    ("собака", "собака", Noun),
    ("собаки", "собака", Noun),
    ("собаку", "собака", Noun),
    ("собак", "собака", Noun),
    ("лес", "лес", Noun),
    ("леса", "лес", Noun),
    ("лесу", "лес", Noun),
    ("лесом", "лес", Noun),
    ("сайт", "сайт", Noun),
    ("сайта", "сайт", Noun),
    ("сайты", "сайт", Noun),
    ("сайтов", "сайт", Noun),
    ("страница", "страница", Noun),
    ("страницы", "страница", Noun),
    ("страницу", "страница", Noun),
    ("страниц", "страница", Noun),
    ("поиск", "поиск", Noun),
    ("поиска", "поиск", Noun),
    ("поиску", "поиск", Noun),
    ("город", "город", Noun),
    ("города", "город", Noun),
    ("городов", "город", Noun),
    // Russian verbs
    ("бегает", "бегать", Verb),
    ("бегать", "бегать", Verb),
    ("бегают", "бегать", Verb),
    ("бегал", "бегать", Verb),
    ("искать", "искать", Verb),
    ("ищет", "искать", Verb),
    ("ищут", "искать", Verb),
    ("читать", "читать", Verb),
    ("читает", "читать", Verb),
    ("читают", "читать", Verb),
    // Russian adjectives and participles
    ("большой", "большой", Adjective),
    ("большая", "большой", Adjective),
    ("большие", "большой", Adjective),
    ("большого", "большой", Adjective),
    ("новый", "новый", Adjective),
    ("новая", "новый", Adjective),
    ("новые", "новый", Adjective),
    ("бегущий", "бегать", Participle),
    ("читающий", "читать", Participle),
    ("бегая", "бегать", Gerund),
    ("читая", "читать", Gerund),
    // English
    ("tests", "test", Noun),
    ("testing", "test", Verb),
    ("tested", "test", Verb),
    ("cats", "cat", Noun),
    ("dogs", "dog", Noun),
    ("pages", "page", Noun),
    ("sites", "site", Noun),
    ("searches", "search", Noun),
    ("searching", "search", Verb),
    ("searched", "search", Verb),
    ("runs", "run", Verb),
    ("running", "run", Verb),
    ("ran", "run", Verb),
];
