//! Encoding of an [`IndexSnapshot`] into one self-describing artifact, and its atomic
//! placement on disk.
//!
//! Binary layout: `[magic "SNDX"][u32 LE format version][bincode payload]`.
//! JSON layout: `{"format": "songdex", "version": <u32>, "index": {...}}`, meant for
//! JavaScript-side consumers. [`decode`] recognizes both and refuses any version it was
//! not built for.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::{IndexError, Result};
use crate::index::IndexSnapshot;

pub const FORMAT_VERSION: u32 = 1;
const MAGIC: &[u8; 4] = b"SNDX";
const HEADER_LEN: usize = 8;
const JSON_FORMAT_NAME: &str = "songdex";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Binary,
    Json,
}

impl Format {
    /// `.json` paths get JSON, everything else the binary layout.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Binary,
        }
    }
}

impl FromStr for Format {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" | "bin" => Ok(Format::Binary),
            "json" => Ok(Format::Json),
            other => Err(IndexError::InvalidConfig(format!("unknown index format `{other}`"))),
        }
    }
}

#[derive(Serialize)]
struct JsonEnvelopeRef<'a> {
    format: &'a str,
    version: u32,
    index: &'a IndexSnapshot,
}


pub fn encode(snapshot: &IndexSnapshot, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Binary => {
            let payload = bincode::serialize(snapshot).map_err(IndexError::corrupt)?;
            let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
            out.extend_from_slice(MAGIC);
            out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
            out.extend_from_slice(&payload);
            Ok(out)
        }
        Format::Json => {
            let envelope = JsonEnvelopeRef { format: JSON_FORMAT_NAME, version: FORMAT_VERSION, index: snapshot };
            serde_json::to_vec(&envelope).map_err(IndexError::corrupt)
        }
    }
}

pub fn decode(bytes: &[u8]) -> Result<IndexSnapshot> {
    let snapshot = if bytes.starts_with(MAGIC) {
        decode_binary(bytes)?
    } else if bytes.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{') {
        decode_json(bytes)?
    } else {
        return Err(IndexError::CorruptIndex("not a songdex index".into()));
    };
    validate(&snapshot)?;
    Ok(snapshot)
}

fn decode_binary(bytes: &[u8]) -> Result<IndexSnapshot> {
    if bytes.len() < HEADER_LEN {
        return Err(IndexError::CorruptIndex("truncated header".into()));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    check_version(version)?;
    bincode::deserialize(&bytes[HEADER_LEN..]).map_err(IndexError::corrupt)
}

fn decode_json(bytes: &[u8]) -> Result<IndexSnapshot> {
    let mut envelope: Value = serde_json::from_slice(bytes).map_err(IndexError::corrupt)?;
    let version = envelope
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| IndexError::CorruptIndex("missing format version".into()))?;
    check_version(u32::try_from(version).unwrap_or(u32::MAX))?;
    let index = envelope
        .get_mut("index")
        .map(Value::take)
        .ok_or_else(|| IndexError::CorruptIndex("missing index payload".into()))?;
    serde_json::from_value(index).map_err(IndexError::corrupt)
}

fn check_version(found: u32) -> Result<()> {
    if found != FORMAT_VERSION {
        return Err(IndexError::UnsupportedVersion { found, supported: FORMAT_VERSION });
    }
    Ok(())
}

/// Reject payloads that decode but reference documents or fields that do not exist, or whose
/// postings are not sorted and unique by `(doc_id, field)`. Document frequency is derived
/// from that order, so it is checked rather than trusted.
fn validate(snapshot: &IndexSnapshot) -> Result<()> {
    snapshot.schema.validate().map_err(IndexError::corrupt)?;
    let num_docs = snapshot.refs.len();
    let num_fields = snapshot.schema.len();
    if snapshot.meta.version != FORMAT_VERSION || snapshot.meta.num_docs as usize != num_docs {
        return Err(IndexError::CorruptIndex("meta does not match payload".into()));
    }
    if snapshot.stats.len() != num_docs {
        return Err(IndexError::CorruptIndex("document statistics do not cover every document".into()));
    }
    for (doc_id, lengths) in snapshot.stats.iter() {
        if doc_id as usize >= num_docs || lengths.len() != num_fields {
            return Err(IndexError::CorruptIndex(format!(
                "statistics for doc {doc_id} have {} field lengths, expected {num_fields}",
                lengths.len()
            )));
        }
    }
    for (stem, postings) in snapshot.index.iter() {
        if let Some(p) = postings.iter().find(|p| p.doc_id as usize >= num_docs || p.field as usize >= num_fields) {
            return Err(IndexError::CorruptIndex(format!(
                "posting for `{stem}` references doc {} field {}",
                p.doc_id, p.field
            )));
        }
        if postings.windows(2).any(|w| (w[0].doc_id, w[0].field) >= (w[1].doc_id, w[1].field)) {
            return Err(IndexError::CorruptIndex(format!("postings for `{stem}` are out of order")));
        }
        if postings.iter().any(|p| p.term_frequency == 0 || p.positions.len() != p.term_frequency as usize) {
            return Err(IndexError::CorruptIndex(format!("postings for `{stem}` have bad term frequencies")));
        }
    }
    Ok(())
}

/// Write the snapshot to `path` through a uniquely named sibling temp file and a rename, so
/// `path` either keeps its previous content or holds the complete new index. The temp file
/// is removed on any failure.
pub fn save_index(path: &Path, snapshot: &IndexSnapshot, format: Format) -> Result<()> {
    let bytes = encode(snapshot, format)?;
    let write_err = |source: io::Error| IndexError::OutputWrite { path: path.to_path_buf(), source };

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(write_err)?;
            parent
        }
        None => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(&bytes).and_then(|_| tmp.as_file().sync_all()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), ?format, "index written");
    Ok(())
}

pub fn load_index(path: &Path) -> Result<IndexSnapshot> {
    let bytes = fs::read(path)?;
    let snapshot = decode(&bytes)?;
    tracing::info!(
        path = %path.display(),
        num_docs = snapshot.meta.num_docs,
        num_terms = snapshot.meta.num_terms,
        "index loaded"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::document::Document;
    use crate::IndexBuilder;

    fn snapshot() -> IndexSnapshot {
        let config = IndexConfig::default();
        let docs = vec![
            Document::new("0").with_field("name", "Kesä").with_field("lyrics", "aurinko paistaa"),
            Document::new("1").with_field("name", "Summer").with_field("lyrics", "sun shines"),
        ];
        IndexBuilder::new(&config).unwrap().build(&docs).unwrap()
    }

    #[test]
    fn binary_header_carries_version() {
        let bytes = encode(&snapshot(), Format::Binary).unwrap();
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), FORMAT_VERSION);
    }

    #[test]
    fn future_binary_version_is_unsupported() {
        let mut bytes = encode(&snapshot(), Format::Binary).unwrap();
        bytes[4..8].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(IndexError::UnsupportedVersion { found, supported: FORMAT_VERSION }) if found == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn future_json_version_is_unsupported() {
        let bytes = encode(&snapshot(), Format::Json).unwrap();
        let mut json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        json["version"] = serde_json::json!(99);
        let bytes = serde_json::to_vec(&json).unwrap();
        assert!(matches!(decode(&bytes), Err(IndexError::UnsupportedVersion { found: 99, .. })));
    }

    #[test]
    fn garbage_is_corrupt() {
        assert!(matches!(decode(b""), Err(IndexError::CorruptIndex(_))));
        assert!(matches!(decode(b"SNDX"), Err(IndexError::CorruptIndex(_))));
        let mut bytes = encode(&snapshot(), Format::Binary).unwrap();
        bytes.truncate(bytes.len() / 2);
        assert!(matches!(decode(&bytes), Err(IndexError::CorruptIndex(_))));
    }

    #[test]
    fn dangling_postings_are_corrupt() {
        let mut snap = snapshot();
        snap.refs.pop();
        snap.meta.num_docs -= 1;
        let bytes = encode(&snap, Format::Binary).unwrap();
        assert!(matches!(decode(&bytes), Err(IndexError::CorruptIndex(_))));
    }

    fn json_with_sun_postings(edit: impl FnOnce(&mut Vec<Value>)) -> Vec<u8> {
        let config = IndexConfig::default();
        let docs = vec![
            Document::new("a").with_field("name", "sun").with_field("lyrics", "sun"),
            Document::new("b").with_field("lyrics", "sun"),
        ];
        let snap = IndexBuilder::new(&config).unwrap().build(&docs).unwrap();
        assert_eq!(snap.index.document_frequency("sun"), 2);
        let mut json: Value = serde_json::from_slice(&encode(&snap, Format::Json).unwrap()).unwrap();
        let postings = json["index"]["index"]["terms"]["sun"].as_array_mut().unwrap();
        assert_eq!(postings.len(), 3);
        edit(postings);
        serde_json::to_vec(&json).unwrap()
    }

    #[test]
    fn reordered_postings_are_corrupt() {
        let bytes = json_with_sun_postings(|postings| postings.swap(1, 2));
        assert!(matches!(decode(&bytes), Err(IndexError::CorruptIndex(msg)) if msg.contains("out of order")));
    }

    #[test]
    fn duplicated_postings_are_corrupt() {
        let bytes = json_with_sun_postings(|postings| {
            let first = postings[0].clone();
            postings.insert(1, first);
        });
        assert!(matches!(decode(&bytes), Err(IndexError::CorruptIndex(_))));
    }

    #[test]
    fn short_field_lengths_are_corrupt() {
        let bytes = encode(&snapshot(), Format::Json).unwrap();
        let mut json: Value = serde_json::from_slice(&bytes).unwrap();
        json["index"]["stats"]["field_lengths"]["1"].as_array_mut().unwrap().pop();
        let bytes = serde_json::to_vec(&json).unwrap();
        assert!(matches!(decode(&bytes), Err(IndexError::CorruptIndex(msg)) if msg.contains("field lengths")));
    }

    #[test]
    fn untouched_json_keeps_document_frequency() {
        let bytes = json_with_sun_postings(|_| {});
        assert_eq!(decode(&bytes).unwrap().index.document_frequency("sun"), 2);
    }

    #[test]
    fn json_without_version_is_corrupt() {
        assert!(matches!(decode(br#"{"index": {}}"#), Err(IndexError::CorruptIndex(_))));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("out/index.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("out/index.bin")), Format::Binary);
        assert_eq!(Format::from_path(Path::new("index")), Format::Binary);
    }
}
