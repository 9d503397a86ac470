//! Language stemmers and the multi-language stemmer used when a song's language is unknown.
//!
//! Every stemmer answers the same question: which stems does this token reduce to? A single
//! language yields at most one stem. [`MultiStemmer`] asks every configured language and keeps
//! each distinct answer, so a Finnish plural and a Swedish definite form both land on stems a
//! query in either language can reach.

use std::fmt;
use std::str::FromStr;

use rust_stemmers::Algorithm;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Snowball languages supported by the registry, identified by ISO 639-1 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "da")]
    Danish,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fi")]
    Finnish,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "it")]
    Italian,
    #[serde(rename = "nl")]
    Dutch,
    #[serde(rename = "no")]
    Norwegian,
    #[serde(rename = "pt")]
    Portuguese,
    #[serde(rename = "ru")]
    Russian,
    #[serde(rename = "sv")]
    Swedish,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::Danish,
        Language::German,
        Language::English,
        Language::Spanish,
        Language::Finnish,
        Language::French,
        Language::Italian,
        Language::Dutch,
        Language::Norwegian,
        Language::Portuguese,
        Language::Russian,
        Language::Swedish,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::Danish => "da",
            Language::German => "de",
            Language::English => "en",
            Language::Spanish => "es",
            Language::Finnish => "fi",
            Language::French => "fr",
            Language::Italian => "it",
            Language::Dutch => "nl",
            Language::Norwegian => "no",
            Language::Portuguese => "pt",
            Language::Russian => "ru",
            Language::Swedish => "sv",
        }
    }

    fn algorithm(self) -> Algorithm {
        match self {
            Language::Danish => Algorithm::Danish,
            Language::German => Algorithm::German,
            Language::English => Algorithm::English,
            Language::Spanish => Algorithm::Spanish,
            Language::Finnish => Algorithm::Finnish,
            Language::French => Algorithm::French,
            Language::Italian => Algorithm::Italian,
            Language::Dutch => Algorithm::Dutch,
            Language::Norwegian => Algorithm::Norwegian,
            Language::Portuguese => Algorithm::Portuguese,
            Language::Russian => Algorithm::Russian,
            Language::Swedish => Algorithm::Swedish,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .iter()
            .copied()
            .find(|lang| lang.code() == code || format!("{lang:?}").eq_ignore_ascii_case(&code))
            .ok_or_else(|| IndexError::InvalidConfig(format!("unknown language `{s}`")))
    }
}

/// Reduce a token to the set of stems it should be indexed (or queried) under.
///
/// Implementations return a sorted list without duplicates; an empty token has no stems.
pub trait TokenStemmer {
    fn stem(&self, token: &str) -> Vec<String>;
}

/// Snowball stemmer for one language.
pub struct LanguageStemmer {
    language: Language,
    inner: rust_stemmers::Stemmer,
}

impl LanguageStemmer {
    pub fn new(language: Language) -> Self {
        Self { language, inner: rust_stemmers::Stemmer::create(language.algorithm()) }
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

impl fmt::Debug for LanguageStemmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageStemmer").field("language", &self.language).finish()
    }
}

impl TokenStemmer for LanguageStemmer {
    fn stem(&self, token: &str) -> Vec<String> {
        if token.is_empty() {
            return Vec::new();
        }
        let stem = self.inner.stem(token);
        if stem.is_empty() {
            // Snowball can strip a short word down to nothing; the surface form is the better key.
            vec![token.to_string()]
        } else {
            vec![stem.into_owned()]
        }
    }
}

/// Union of the stems produced by each of its language stemmers.
#[derive(Debug)]
pub struct MultiStemmer {
    stemmers: Vec<LanguageStemmer>,
}

impl MultiStemmer {
    pub fn new(languages: &[Language]) -> Self {
        let mut languages = languages.to_vec();
        languages.sort();
        languages.dedup();
        Self { stemmers: languages.into_iter().map(LanguageStemmer::new).collect() }
    }

    pub fn languages(&self) -> Vec<Language> {
        self.stemmers.iter().map(LanguageStemmer::language).collect()
    }
}

impl TokenStemmer for MultiStemmer {
    fn stem(&self, token: &str) -> Vec<String> {
        let mut stems: Vec<String> = self.stemmers.iter().flat_map(|s| s.stem(token)).collect();
        stems.sort();
        stems.dedup();
        stems
    }
}

/// The stemmer an analyzer runs: one language, or all configured languages at once.
#[derive(Debug)]
pub enum Stemmer {
    Single(LanguageStemmer),
    Multi(MultiStemmer),
}

impl Stemmer {
    /// One language gets a plain stemmer, several get a [`MultiStemmer`].
    pub fn for_languages(languages: &[Language]) -> crate::Result<Self> {
        match languages {
            [] => Err(IndexError::InvalidConfig("at least one language is required".into())),
            [one] => Ok(Stemmer::Single(LanguageStemmer::new(*one))),
            many => Ok(Stemmer::Multi(MultiStemmer::new(many))),
        }
    }

    pub fn languages(&self) -> Vec<Language> {
        match self {
            Stemmer::Single(s) => vec![s.language()],
            Stemmer::Multi(m) => m.languages(),
        }
    }
}

impl TokenStemmer for Stemmer {
    fn stem(&self, token: &str) -> Vec<String> {
        match self {
            Stemmer::Single(s) => s.stem(token),
            Stemmer::Multi(m) => m.stem(token),
        }
    }
}
