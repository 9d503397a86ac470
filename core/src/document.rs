use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, Read};

use serde_json::{Map, Value};

use crate::error::{IndexError, Result};

/// A song (or any record) to index: an external reference plus raw field texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub fields: BTreeMap<String, String>,
    /// Members that held arrays or objects. Harmless unless the schema indexes one of them.
    pub non_text: BTreeSet<String>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), fields: BTreeMap::new(), non_text: BTreeSet::new() }
    }

    pub fn with_field(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.insert(name.into(), text.into());
        self
    }

    /// Text of a field, or `None` when the record did not carry it.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Build a document from one decoded JSON record.
    ///
    /// The reference is the record's `id`, else its `index`, else `position`. Every other
    /// scalar member becomes a field; `null` members are treated as absent, and arrays or
    /// objects are only remembered by name in [`Document::non_text`].
    pub fn from_record(record: Map<String, Value>, position: usize) -> Result<Self> {
        let id = match record.get("id").or_else(|| record.get("index")) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(IndexError::InputParse(format!(
                    "record {position}: document id must be a string or integer, got {other}"
                )))
            }
            None => position.to_string(),
        };

        let mut fields = BTreeMap::new();
        let mut non_text = BTreeSet::new();
        for (key, value) in record {
            if key == "id" || key == "index" {
                continue;
            }
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    non_text.insert(key);
                    continue;
                }
            };
            fields.insert(key, text);
        }
        Ok(Self { id, fields, non_text })
    }
}

/// Decode a JSON array of records (or a single record object).
pub fn parse_json<R: Read>(reader: R) -> Result<Vec<Document>> {
    let json: Value = serde_json::from_reader(reader).map_err(IndexError::input_parse)?;
    match json {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(pos, item)| Document::from_record(expect_object(item, pos)?, pos))
            .collect(),
        Value::Object(record) => Ok(vec![Document::from_record(record, 0)?]),
        other => Err(IndexError::InputParse(format!("expected an array of records, got {other}"))),
    }
}

/// Decode JSON Lines, one record per non-blank line.
pub fn parse_jsonl<R: BufRead>(reader: R) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let pos = docs.len();
        let value: Value = serde_json::from_str(&line)
            .map_err(|e| IndexError::InputParse(format!("record {pos}: {e}")))?;
        docs.push(Document::from_record(expect_object(value, pos)?, pos)?);
    }
    Ok(docs)
}

fn expect_object(value: Value, position: usize) -> Result<Map<String, Value>> {
    match value {
        Value::Object(record) => Ok(record),
        other => Err(IndexError::InputParse(format!("record {position}: expected an object, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_is_the_default_ref() {
        let docs = parse_json(r#"[{"name":"Kesä","lyrics":"aurinko paistaa"},{"name":"Summer"}]"#.as_bytes())
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "0");
        assert_eq!(docs[1].id, "1");
        assert_eq!(docs[0].field("lyrics"), Some("aurinko paistaa"));
        assert_eq!(docs[1].field("lyrics"), None);
    }

    #[test]
    fn explicit_id_wins_over_index_and_position() {
        let docs = parse_json(
            r#"[{"id":"kesa","index":7,"name":"Kesä"},{"index":7,"name":"x"},{"id":42,"name":"y"}]"#.as_bytes(),
        )
        .unwrap();
        assert_eq!(docs[0].id, "kesa");
        assert_eq!(docs[1].id, "7");
        assert_eq!(docs[2].id, "42");
        assert!(!docs[0].fields.contains_key("index"));
    }

    #[test]
    fn null_fields_are_absent() {
        let docs = parse_json(r#"[{"name":"a","melody":null,"lyrics":"b"}]"#.as_bytes()).unwrap();
        assert_eq!(docs[0].field("melody"), None);
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        assert!(matches!(parse_json("[{".as_bytes()), Err(IndexError::InputParse(_))));
        assert!(matches!(parse_json("[1, 2]".as_bytes()), Err(IndexError::InputParse(_))));
        assert!(matches!(parse_json(r#"[{"id":true}]"#.as_bytes()), Err(IndexError::InputParse(_))));
    }

    #[test]
    fn nested_members_are_set_aside() {
        let docs =
            parse_json(r#"[{"name":"Kesä","lyrics":"aurinko","tags":["x"],"meta":{"page":3}}]"#.as_bytes()).unwrap();
        assert_eq!(docs[0].field("name"), Some("Kesä"));
        assert_eq!(docs[0].field("tags"), None);
        assert_eq!(docs[0].non_text.iter().map(String::as_str).collect::<Vec<_>>(), vec!["meta", "tags"]);
    }

    #[test]
    fn reads_json_lines() {
        let input = "{\"name\":\"a\"}\n\n{\"name\":\"b\"}\n";
        let docs = parse_jsonl(input.as_bytes()).unwrap();
        assert_eq!(docs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["0", "1"]);
        assert!(parse_jsonl("{\"name\":\"a\"}\nnot json\n".as_bytes()).is_err());
    }
}
