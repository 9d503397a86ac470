use std::collections::HashSet;

use rayon::prelude::*;

use crate::analyzer::Analyzer;
use crate::config::IndexConfig;
use crate::document::Document;
use crate::error::{IndexError, Result};
use crate::index::{DocId, DocumentStats, FieldId, IndexMeta, IndexSnapshot, InvertedIndex};
use crate::persist::FORMAT_VERSION;
use crate::schema::Schema;

// Chunks per worker; keeps workers busy when song lengths vary a lot.
const CHUNKS_PER_THREAD: usize = 4;

/// Postings and statistics for a contiguous run of documents.
#[derive(Default)]
struct Partial {
    index: InvertedIndex,
    stats: DocumentStats,
}

impl Partial {
    fn merge(mut self, other: Partial) -> Partial {
        self.index.merge(other.index);
        self.stats.merge(other.stats);
        self
    }
}

/// Turns a document collection into an [`IndexSnapshot`].
pub struct IndexBuilder<'a> {
    config: &'a IndexConfig,
    schema: Schema,
    analyzer: Analyzer,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(config: &'a IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, schema: config.schema()?, analyzer: Analyzer::new(&config.analysis())? })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Index every document. Fails without producing anything if two documents share an id.
    pub fn build(&self, documents: &[Document]) -> Result<IndexSnapshot> {
        check_documents(documents, &self.schema)?;
        if documents.len() > DocId::MAX as usize {
            return Err(IndexError::InputParse(format!("too many documents: {}", documents.len())));
        }

        let partial = match self.config.threads {
            Some(1) => self.index_chunk(0, documents),
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| IndexError::InvalidConfig(e.to_string()))?;
                pool.install(|| self.index_parallel(documents, n))
            }
            None => self.index_parallel(documents, rayon::current_num_threads()),
        };
        let Partial { mut index, stats } = partial;
        index.normalize();

        let meta = IndexMeta {
            version: FORMAT_VERSION,
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
            num_docs: documents.len() as u32,
            num_terms: index.num_terms() as u32,
        };
        tracing::info!(num_docs = meta.num_docs, num_terms = meta.num_terms, "index build complete");

        Ok(IndexSnapshot {
            meta,
            schema: self.schema.clone(),
            analysis: self.config.analysis(),
            idf: self.config.idf,
            refs: documents.iter().map(|d| d.id.clone()).collect(),
            index,
            stats,
        })
    }

    fn index_parallel(&self, documents: &[Document], threads: usize) -> Partial {
        let chunk_size = documents.len().div_ceil(threads.max(1) * CHUNKS_PER_THREAD).max(1);
        documents
            .par_chunks(chunk_size)
            .enumerate()
            .map(|(i, chunk)| {
                tracing::debug!(chunk = i, docs = chunk.len(), "indexing chunk");
                self.index_chunk(i * chunk_size, chunk)
            })
            .reduce(Partial::default, Partial::merge)
    }

    fn index_chunk(&self, first_doc: usize, documents: &[Document]) -> Partial {
        let mut partial = Partial::default();
        for (offset, doc) in documents.iter().enumerate() {
            let doc_id = (first_doc + offset) as DocId;
            let lengths = self.index_document(&mut partial.index, doc_id, doc);
            partial.stats.insert(doc_id, lengths);
        }
        partial
    }

    /// Record postings for each field of `doc`; returns the per-field token counts.
    fn index_document(&self, index: &mut InvertedIndex, doc_id: DocId, doc: &Document) -> Vec<u32> {
        let mut lengths = Vec::with_capacity(self.schema.len());
        for (field_id, field) in self.schema.iter() {
            let text = doc.field(&field.name).unwrap_or_else(|| {
                tracing::debug!(doc = %doc.id, field = %field.name, "missing field indexed as empty");
                ""
            });
            lengths.push(self.index_field(index, doc_id, field_id, text));
        }
        lengths
    }

    fn index_field(&self, index: &mut InvertedIndex, doc_id: DocId, field: FieldId, text: &str) -> u32 {
        let mut count = 0;
        for token in self.analyzer.analyze(text) {
            count += 1;
            for stem in token.stems {
                index.record(stem, doc_id, field, token.position as u32);
            }
        }
        count
    }
}

/// Unique ids, and every indexed field holds text (or nothing).
fn check_documents(documents: &[Document], schema: &Schema) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(documents.len());
    for doc in documents {
        if !seen.insert(doc.id.as_str()) {
            return Err(IndexError::DuplicateDocumentId { id: doc.id.clone() });
        }
        if let Some(field) = schema.fields().iter().find(|f| doc.non_text.contains(&f.name)) {
            return Err(IndexError::InputParse(format!("document `{}`: field `{}` must be text", doc.id, field.name)));
        }
    }
    Ok(())
}
