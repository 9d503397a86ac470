use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::analyzer::AnalysisSettings;
use crate::config::IdfVariant;
use crate::schema::Schema;

/// Dense ordinal of a document in input order.
pub type DocId = u32;
/// Position of a field in the [`Schema`].
pub type FieldId = u16;

/// Occurrences of one stem in one field of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub field: FieldId,
    pub term_frequency: u32,
    /// Token ordinals within the field, ascending.
    pub positions: Vec<u32>,
}

impl Posting {
    fn key(&self) -> (DocId, FieldId) {
        (self.doc_id, self.field)
    }
}

/// Stem → postings sorted by `(doc_id, field)`, one posting per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    terms: BTreeMap<String, Vec<Posting>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `stem` at `position` in `(doc_id, field)`.
    ///
    /// Occurrences are cheapest to record grouped by document and field, which is how
    /// the builder feeds them; out-of-order input is fixed up by [`InvertedIndex::normalize`].
    pub fn record(&mut self, stem: String, doc_id: DocId, field: FieldId, position: u32) {
        let list = self.terms.entry(stem).or_default();
        match list.last_mut() {
            Some(last) if last.doc_id == doc_id && last.field == field => {
                last.term_frequency += 1;
                last.positions.push(position);
            }
            _ => list.push(Posting { doc_id, field, term_frequency: 1, positions: vec![position] }),
        }
    }

    /// Fold another partial index into this one. Merging is commutative and associative
    /// once both sides are normalized.
    pub fn merge(&mut self, other: InvertedIndex) {
        for (stem, postings) in other.terms {
            match self.terms.entry(stem) {
                Entry::Vacant(slot) => {
                    slot.insert(postings);
                }
                Entry::Occupied(mut slot) => slot.get_mut().extend(postings),
            }
        }
        self.normalize();
    }

    /// Sort every postings list by `(doc_id, field)` and coalesce duplicate keys.
    pub fn normalize(&mut self) {
        for postings in self.terms.values_mut() {
            normalize_postings(postings);
        }
    }

    pub fn postings(&self, stem: &str) -> &[Posting] {
        self.terms.get(stem).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct documents with at least one posting for `stem`.
    pub fn document_frequency(&self, stem: &str) -> u32 {
        let postings = self.postings(stem);
        let mut count = 0;
        let mut prev: Option<DocId> = None;
        for p in postings {
            if prev != Some(p.doc_id) {
                count += 1;
                prev = Some(p.doc_id);
            }
        }
        count
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Posting])> {
        self.terms.iter().map(|(stem, postings)| (stem.as_str(), postings.as_slice()))
    }
}

fn normalize_postings(postings: &mut Vec<Posting>) {
    if postings.windows(2).all(|w| w[0].key() < w[1].key()) {
        return;
    }
    postings.sort_by_key(Posting::key);
    let mut merged: Vec<Posting> = Vec::with_capacity(postings.len());
    for p in postings.drain(..) {
        match merged.last_mut() {
            Some(last) if last.key() == p.key() => {
                last.term_frequency += p.term_frequency;
                last.positions.extend(p.positions);
                last.positions.sort_unstable();
            }
            _ => merged.push(p),
        }
    }
    *postings = merged;
}

/// Token count of every `(document, field)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    field_lengths: BTreeMap<DocId, Vec<u32>>,
}

impl DocumentStats {
    /// Store the per-field token counts of a document. Each document is inserted once.
    pub fn insert(&mut self, doc_id: DocId, lengths: Vec<u32>) {
        self.field_lengths.insert(doc_id, lengths);
    }

    pub fn merge(&mut self, other: DocumentStats) {
        self.field_lengths.extend(other.field_lengths);
    }

    pub fn field_length(&self, doc_id: DocId, field: FieldId) -> u32 {
        self.field_lengths
            .get(&doc_id)
            .and_then(|lengths| lengths.get(field as usize))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.field_lengths.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &[u32])> {
        self.field_lengths.iter().map(|(doc_id, lengths)| (*doc_id, lengths.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.field_lengths.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub created_at: String,
    pub num_docs: u32,
    pub num_terms: u32,
}

/// A complete, immutable index: everything a query engine needs, nothing more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub meta: IndexMeta,
    pub schema: Schema,
    pub analysis: AnalysisSettings,
    pub idf: IdfVariant,
    /// External reference of each document, indexed by [`DocId`].
    pub refs: Vec<String>,
    pub index: InvertedIndex,
    pub stats: DocumentStats,
}

impl IndexSnapshot {
    pub fn corpus_size(&self) -> u32 {
        self.refs.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(docs: &[(DocId, FieldId, &[&str])]) -> InvertedIndex {
        let mut idx = InvertedIndex::new();
        for (doc, field, words) in docs {
            for (pos, w) in words.iter().enumerate() {
                idx.record(w.to_string(), *doc, *field, pos as u32);
            }
        }
        idx
    }

    #[test]
    fn record_accumulates_frequency_and_positions() {
        let idx = sample(&[(0, 1, &["sun", "sun", "moon", "sun"])]);
        let postings = idx.postings("sun");
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].term_frequency, 3);
        assert_eq!(postings[0].positions, vec![0, 1, 3]);
    }

    #[test]
    fn document_frequency_counts_documents_not_fields() {
        let idx = sample(&[(0, 0, &["sun"]), (0, 1, &["sun"]), (2, 1, &["sun"])]);
        assert_eq!(idx.postings("sun").len(), 3);
        assert_eq!(idx.document_frequency("sun"), 2);
        assert_eq!(idx.document_frequency("rain"), 0);
    }

    #[test]
    fn merge_is_order_independent() {
        let a = sample(&[(0, 0, &["kesä", "sun"])]);
        let b = sample(&[(1, 1, &["sun", "sun"])]);
        let c = sample(&[(2, 0, &["kesä"])]);

        let mut left = a.clone();
        left.merge(b.clone());
        left.merge(c.clone());

        let mut right = c;
        right.merge(a);
        right.merge(b);

        assert_eq!(left, right);
        assert_eq!(left.postings("sun").iter().map(|p| p.doc_id).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn merge_coalesces_split_postings() {
        let mut a = InvertedIndex::new();
        a.record("sun".into(), 0, 1, 4);
        let mut b = InvertedIndex::new();
        b.record("sun".into(), 0, 1, 2);
        a.merge(b);
        let postings = a.postings("sun");
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].term_frequency, 2);
        assert_eq!(postings[0].positions, vec![2, 4]);
    }

    #[test]
    fn missing_stats_read_as_zero() {
        let mut stats = DocumentStats::default();
        stats.insert(3, vec![1, 5]);
        assert_eq!(stats.field_length(3, 1), 5);
        assert_eq!(stats.field_length(3, 2), 0);
        assert_eq!(stats.field_length(4, 0), 0);
    }
}
