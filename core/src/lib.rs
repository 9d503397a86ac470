//! Multilingual full-text index for song collections.
//!
//! Songs are analyzed with a shared pipeline (tokenize, optional stop words,
//! stem with every configured language), accumulated into an inverted index
//! with per-field statistics, and written as a single versioned artifact that
//! [`search::QueryEngine`] can rank against.

pub mod analyzer;
pub mod builder;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod persist;
pub mod schema;
pub mod search;
pub mod stemmer;
pub mod tokenizer;

pub use builder::IndexBuilder;
pub use config::{IdfVariant, IndexConfig};
pub use document::Document;
pub use error::{IndexError, Result};
pub use index::{DocId, DocumentStats, FieldId, IndexMeta, IndexSnapshot, InvertedIndex, Posting};
pub use schema::{FieldDescriptor, Schema};
pub use search::{IndexRead, QueryEngine, SearchHit};
pub use stemmer::{Language, Stemmer};
