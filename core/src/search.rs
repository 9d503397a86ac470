//! Ranked retrieval over a loaded index.
//!
//! A document's score is the sum, over the distinct query stems it matches and the fields
//! they match in, of `term_frequency × field_boost × idf(stem)`. Ties go to the lower
//! [`DocId`], i.e. the earlier input record.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::analyzer::Analyzer;
use crate::config::IdfVariant;
use crate::error::Result;
use crate::index::{DocId, FieldId, IndexSnapshot, Posting};

/// What a query engine needs from an index.
pub trait IndexRead {
    fn lookup_stem(&self, stem: &str) -> &[Posting];
    fn document_frequency(&self, stem: &str) -> u32;
    fn field_length(&self, doc_id: DocId, field: FieldId) -> u32;
    fn corpus_size(&self) -> u32;
    fn field_boost(&self, field: FieldId) -> f32;
    fn doc_ref(&self, doc_id: DocId) -> Option<&str>;
}

impl IndexRead for IndexSnapshot {
    fn lookup_stem(&self, stem: &str) -> &[Posting] {
        self.index.postings(stem)
    }

    fn document_frequency(&self, stem: &str) -> u32 {
        self.index.document_frequency(stem)
    }

    fn field_length(&self, doc_id: DocId, field: FieldId) -> u32 {
        self.stats.field_length(doc_id, field)
    }

    fn corpus_size(&self) -> u32 {
        IndexSnapshot::corpus_size(self)
    }

    fn field_boost(&self, field: FieldId) -> f32 {
        self.schema.field(field).map(|f| f.boost).unwrap_or(0.0)
    }

    fn doc_ref(&self, doc_id: DocId) -> Option<&str> {
        self.refs.get(doc_id as usize).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    #[serde(rename = "ref")]
    pub doc_ref: String,
    pub score: f32,
}

/// Scores queries against any [`IndexRead`], analyzing them like the indexed documents.
pub struct QueryEngine<'a, R: IndexRead> {
    reader: &'a R,
    analyzer: Analyzer,
    idf: IdfVariant,
}

impl<'a> QueryEngine<'a, IndexSnapshot> {
    /// Engine over a snapshot, using the analysis settings and IDF it was built with.
    pub fn for_snapshot(snapshot: &'a IndexSnapshot) -> Result<Self> {
        Ok(Self::new(snapshot, Analyzer::new(&snapshot.analysis)?, snapshot.idf))
    }
}

impl<'a, R: IndexRead> QueryEngine<'a, R> {
    pub fn new(reader: &'a R, analyzer: Analyzer, idf: IdfVariant) -> Self {
        Self { reader, analyzer, idf }
    }

    /// Every document matching at least one query stem, best first. `limit` of `None`
    /// returns all of them.
    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<SearchHit> {
        let n = self.reader.corpus_size();
        let mut scores: HashMap<DocId, f32> = HashMap::new();
        for stem in self.analyzer.stems(query) {
            let postings = self.reader.lookup_stem(&stem);
            if postings.is_empty() {
                continue;
            }
            let idf = self.idf.idf(n, self.reader.document_frequency(&stem));
            for p in postings {
                let contrib = p.term_frequency as f32 * self.reader.field_boost(p.field) * idf;
                *scores.entry(p.doc_id).or_insert(0.0) += contrib;
            }
        }

        let mut scored: Vec<(DocId, f32)> = scores.into_iter().collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .filter_map(|(doc_id, score)| {
                let doc_ref = self.reader.doc_ref(doc_id)?.to_string();
                Some(SearchHit { doc_id, doc_ref, score })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::document::Document;
    use crate::IndexBuilder;

    fn build(config: &IndexConfig, docs: &[Document]) -> IndexSnapshot {
        IndexBuilder::new(config).unwrap().build(docs).unwrap()
    }

    fn song(id: &str, name: &str, lyrics: &str) -> Document {
        Document::new(id).with_field("name", name).with_field("lyrics", lyrics)
    }

    #[test]
    fn score_follows_tf_boost_idf() {
        let config = IndexConfig::default();
        let snapshot = build(
            &config,
            &[song("a", "moon", "sun sun"), song("b", "moon", "rain"), song("c", "moon", "snow")],
        );
        let engine = QueryEngine::for_snapshot(&snapshot).unwrap();
        let hits = engine.search("sun", None);
        assert_eq!(hits.len(), 1);
        let expected = 2.0 * 1.0 * IdfVariant::Smoothed.idf(3, 1);
        assert!((hits[0].score - expected).abs() < 1e-6);
    }

    #[test]
    fn ties_break_by_doc_id() {
        let config = IndexConfig::default();
        let snapshot = build(&config, &[song("z", "", "sun"), song("y", "", "sun"), song("x", "", "sun")]);
        let engine = QueryEngine::for_snapshot(&snapshot).unwrap();
        let refs: Vec<String> = engine.search("sun", None).into_iter().map(|h| h.doc_ref).collect();
        assert_eq!(refs, vec!["z", "y", "x"]);
    }

    #[test]
    fn standard_idf_still_returns_matches() {
        let config = IndexConfig { idf: IdfVariant::Standard, ..IndexConfig::default() };
        let snapshot = build(&config, &[song("0", "Kesä", "aurinko paistaa"), song("1", "Summer", "sun shines")]);
        let engine = QueryEngine::for_snapshot(&snapshot).unwrap();
        let hits = engine.search("aurinko", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_ref, "0");
        assert_eq!(hits[0].score, 0.0);
    }

    #[test]
    fn limit_and_unknown_terms() {
        let config = IndexConfig::default();
        let snapshot = build(&config, &[song("0", "a", "sun"), song("1", "b", "sun")]);
        let engine = QueryEngine::for_snapshot(&snapshot).unwrap();
        assert_eq!(engine.search("sun", Some(1)).len(), 1);
        assert!(engine.search("zyzzyva", None).is_empty());
        assert!(engine.search("", None).is_empty());
        assert!(engine.search("?!", None).is_empty());
    }
}
