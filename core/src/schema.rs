use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::index::FieldId;

/// A named document field and the weight its matches carry when scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub boost: f32,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, boost: f32) -> Self {
        Self { name: name.into(), boost }
    }
}

/// Parses `name=boost` or a bare `name` (boost 1).
impl FromStr for FieldDescriptor {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, boost) = match s.split_once('=') {
            Some((name, boost)) => {
                let boost: f32 = boost
                    .trim()
                    .parse()
                    .map_err(|_| IndexError::InvalidConfig(format!("invalid boost in `{s}`")))?;
                (name.trim(), boost)
            }
            None => (s.trim(), 1.0),
        };
        Ok(FieldDescriptor::new(name, boost))
    }
}

/// Ordered field descriptors. A field's position is its [`FieldId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Default for Schema {
    fn default() -> Self {
        Self { fields: vec![FieldDescriptor::new("name", 10.0), FieldDescriptor::new("lyrics", 1.0)] }
    }
}

impl Schema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self> {
        let schema = Self { fields };
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(IndexError::InvalidConfig("schema has no fields".into()));
        }
        if self.fields.len() > FieldId::MAX as usize {
            return Err(IndexError::InvalidConfig("too many fields".into()));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(IndexError::InvalidConfig("field name is empty".into()));
            }
            if !(field.boost.is_finite() && field.boost > 0.0) {
                return Err(IndexError::InvalidConfig(format!(
                    "boost for field `{}` must be positive, got {}",
                    field.name, field.boost
                )));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(IndexError::InvalidConfig(format!("field `{}` declared twice", field.name)));
            }
        }
        Ok(())
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.fields.iter().position(|f| f.name == name).map(|i| i as FieldId)
    }

    pub fn field(&self, id: FieldId) -> Option<&FieldDescriptor> {
        self.fields.get(id as usize)
    }

    /// Iterate `(FieldId, descriptor)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &FieldDescriptor)> {
        self.fields.iter().enumerate().map(|(i, f)| (i as FieldId, f))
    }
}
