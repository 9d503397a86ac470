use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analyzer::AnalysisSettings;
use crate::error::{IndexError, Result};
use crate::schema::{FieldDescriptor, Schema};
use crate::stemmer::Language;

/// Inverse document frequency weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdfVariant {
    /// `ln(N / (1 + df))`. Zero or negative once a stem is in half the corpus.
    Standard,
    /// `ln(1 + N / (1 + df))`, always positive.
    #[default]
    Smoothed,
}

impl IdfVariant {
    pub fn idf(self, corpus_size: u32, document_frequency: u32) -> f32 {
        let ratio = corpus_size as f32 / (1.0 + document_frequency as f32);
        match self {
            IdfVariant::Standard => ratio.ln(),
            IdfVariant::Smoothed => (1.0 + ratio).ln(),
        }
    }
}

impl FromStr for IdfVariant {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(IdfVariant::Standard),
            "smoothed" => Ok(IdfVariant::Smoothed),
            other => Err(IndexError::InvalidConfig(format!("unknown idf variant `{other}`"))),
        }
    }
}

/// Build-time configuration. Constructed once and passed by reference to the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Languages whose stemmers run on every token.
    pub languages: Vec<Language>,
    /// Indexed fields in order, with their boosts.
    pub fields: Vec<FieldDescriptor>,
    pub stop_words: bool,
    pub idf: IdfVariant,
    /// Worker threads for the build; `None` uses rayon's default, `Some(1)` builds inline.
    pub threads: Option<usize>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let analysis = AnalysisSettings::default();
        Self {
            languages: analysis.languages,
            fields: Schema::default().fields().to_vec(),
            stop_words: analysis.stop_words,
            idf: IdfVariant::default(),
            threads: None,
        }
    }
}

impl IndexConfig {
    /// Read a JSON config file; absent keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let config: IndexConfig = serde_json::from_reader(reader).map_err(|e| {
            IndexError::InvalidConfig(format!("{}: {e}", path.as_ref().display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            return Err(IndexError::InvalidConfig("at least one language is required".into()));
        }
        if self.threads == Some(0) {
            return Err(IndexError::InvalidConfig("threads must be at least 1".into()));
        }
        self.schema().map(|_| ())
    }

    pub fn schema(&self) -> Result<Schema> {
        Schema::new(self.fields.clone())
    }

    pub fn analysis(&self) -> AnalysisSettings {
        AnalysisSettings { languages: self.languages.clone(), stop_words: self.stop_words }
    }
}
