use std::collections::HashSet;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::stemmer::{Language, Stemmer, TokenStemmer};
use crate::tokenizer::tokenize;

lazy_static! {
    static ref ENGLISH_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could","did","do","does","doing","down","during",
            "each","few","for","from","further","had","has","have","having","he","her","here","hers",
            "herself","him","himself","his","how","i","if","in","into","is","it","its","itself",
            "me","more","most","my","myself","no","nor","not","of","off","on","once","only","or",
            "other","ought","our","ours","ourselves","out","over","own","same","she","should","so",
            "some","such","than","that","the","their","theirs","them","themselves","then","there",
            "these","they","this","those","through","to","too","under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","with",
            "would","you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
    static ref FINNISH_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "ja","ei","en","et","hän","he","jo","joka","jos","kanssa","kuin","kun","me","mikä",
            "minä","mitä","mutta","ne","niin","nyt","ole","olen","oli","olla","on","ovat","se","sen",
            "sinä","siis","tai","te","tämä","tuo","vaan","vai","vain","mä","sä","myös","jotka",
        ];
        words.iter().copied().collect()
    };
    static ref SWEDISH_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "och","att","det","som","en","ett","är","av","för","med","till","den","har","de","inte",
            "om","på","i","jag","du","han","hon","vi","ni","men","så","var","vid","från","ska",
            "kan","när","nu","eller","där","mig","dig","sig","hade","mot","utan",
        ];
        words.iter().copied().collect()
    };
}

fn stop_words_for(language: Language) -> Option<&'static HashSet<&'static str>> {
    match language {
        Language::English => Some(&ENGLISH_STOPWORDS),
        Language::Finnish => Some(&FINNISH_STOPWORDS),
        Language::Swedish => Some(&SWEDISH_STOPWORDS),
        _ => None,
    }
}

/// Text-analysis settings fixed at build time and stored alongside the index,
/// so queries are analyzed exactly like the documents were.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    pub languages: Vec<Language>,
    #[serde(default)]
    pub stop_words: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self { languages: vec![Language::English, Language::Finnish, Language::Swedish], stop_words: false }
    }
}

/// A token that survived analysis, with every stem it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedToken {
    pub position: usize,
    pub stems: Vec<String>,
}

/// Tokenizer, optional stop-word filter and stemmer, run as one pipeline.
#[derive(Debug)]
pub struct Analyzer {
    stemmer: Stemmer,
    stop_words: Vec<&'static HashSet<&'static str>>,
}

impl Analyzer {
    pub fn new(settings: &AnalysisSettings) -> crate::Result<Self> {
        let stemmer = Stemmer::for_languages(&settings.languages)?;
        let stop_words = if settings.stop_words {
            stemmer.languages().into_iter().filter_map(stop_words_for).collect()
        } else {
            Vec::new()
        };
        Ok(Self { stemmer, stop_words })
    }

    pub fn stemmer(&self) -> &Stemmer {
        &self.stemmer
    }

    fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.iter().any(|set| set.contains(token))
    }

    /// Analyze `text` lazily. Positions are token ordinals before stop-word removal.
    pub fn analyze<'a>(&'a self, text: &'a str) -> impl Iterator<Item = AnalyzedToken> + 'a {
        tokenize(text).filter_map(move |token| {
            if self.is_stop_word(&token.text) {
                return None;
            }
            let stems = self.stemmer.stem(&token.text);
            if stems.is_empty() {
                return None;
            }
            Some(AnalyzedToken { position: token.position, stems })
        })
    }

    /// Distinct stems of a whole text, sorted. Used for query terms.
    pub fn stems(&self, text: &str) -> Vec<String> {
        let mut stems: Vec<String> = self.analyze(text).flat_map(|t| t.stems).collect();
        stems.sort();
        stems.dedup();
        stems
    }
}
