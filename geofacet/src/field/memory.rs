//! In-memory column store, used by the CLI fixtures and by tests.

use super::{DocId, FieldDataReader, NumericFieldData};
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// All values of one numeric field in one segment, indexed by doc id.
#[derive(Debug, Clone, Default)]
pub struct MemoryColumn {
    values: Vec<Vec<f64>>,
    multi_valued: bool,
}

impl MemoryColumn {
    pub fn from_values(values: Vec<Vec<f64>>) -> Self {
        let multi_valued = values.iter().any(|v| v.len() > 1);
        Self {
            values,
            multi_valued,
        }
    }

    fn push(&mut self, doc: DocId, value: f64) {
        let doc = doc as usize;
        if self.values.len() <= doc {
            self.values.resize_with(doc + 1, Vec::new);
        }
        self.values[doc].push(value);
        if self.values[doc].len() > 1 {
            self.multi_valued = true;
        }
    }
}

struct MemoryFieldData(Arc<MemoryColumn>);

impl NumericFieldData for MemoryFieldData {
    fn has_value(&self, doc: DocId) -> bool {
        self.0
            .values
            .get(doc as usize)
            .map_or(false, |v| !v.is_empty())
    }

    fn is_multi_valued(&self) -> bool {
        self.0.multi_valued
    }

    fn value(&self, doc: DocId) -> f64 {
        self.0
            .values
            .get(doc as usize)
            .and_then(|v| v.first().copied())
            .unwrap_or(0.0)
    }

    fn values(&self, doc: DocId, out: &mut Vec<f64>) {
        out.clear();
        if let Some(v) = self.0.values.get(doc as usize) {
            out.extend_from_slice(v);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySegment {
    max_doc: DocId,
    columns: HashMap<String, Arc<MemoryColumn>>,
}

impl MemorySegment {
    pub fn new(max_doc: DocId) -> Self {
        Self {
            max_doc,
            columns: HashMap::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, column: MemoryColumn) -> Self {
        self.max_doc = self.max_doc.max(column.values.len() as DocId);
        self.columns.insert(name.into(), Arc::new(column));
        self
    }

    /// Build a segment from JSON documents; doc ids follow slice order.
    ///
    /// A field value may be a number, an array of numbers, a `{"lat", "lon"}`
    /// object (stored as `field.lat` / `field.lon`) or an array of such objects.
    /// `null` means no value.
    pub fn from_json_docs(docs: &[Map<String, Value>]) -> Result<Self> {
        let mut columns: HashMap<String, MemoryColumn> = HashMap::new();

        for (doc, fields) in docs.iter().enumerate() {
            let doc = doc as DocId;
            for (name, value) in fields {
                add_json_value(&mut columns, name, doc, value)?;
            }
        }

        Ok(Self {
            max_doc: docs.len() as DocId,
            columns: columns
                .into_iter()
                .map(|(name, column)| (name, Arc::new(column)))
                .collect(),
        })
    }
}

fn add_json_value(
    columns: &mut HashMap<String, MemoryColumn>,
    name: &str,
    doc: DocId,
    value: &Value,
) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Number(n) => {
            let v = n
                .as_f64()
                .ok_or_else(|| Error::InvalidRequest(format!("field {} is not an f64", name)))?;
            columns.entry(name.to_string()).or_default().push(doc, v);
            Ok(())
        }
        Value::Object(obj) => match (obj.get("lat"), obj.get("lon")) {
            (Some(lat), Some(lon)) => {
                add_json_value(columns, &format!("{}.lat", name), doc, lat)?;
                add_json_value(columns, &format!("{}.lon", name), doc, lon)
            }
            _ => Err(Error::InvalidRequest(format!(
                "object value for field {} must have lat and lon",
                name
            ))),
        },
        Value::Array(items) => {
            for item in items {
                if item.is_array() {
                    return Err(Error::InvalidRequest(format!(
                        "nested arrays are not supported for field {}",
                        name
                    )));
                }
                add_json_value(columns, name, doc, item)?;
            }
            Ok(())
        }
        other => Err(Error::InvalidRequest(format!(
            "field {} has non-numeric value {}",
            name, other
        ))),
    }
}

impl FieldDataReader for MemorySegment {
    fn numeric_field(&self, name: &str) -> Result<Option<Box<dyn NumericFieldData>>> {
        Ok(self
            .columns
            .get(name)
            .map(|column| Box::new(MemoryFieldData(Arc::clone(column))) as Box<dyn NumericFieldData>))
    }

    fn max_doc(&self) -> DocId {
        self.max_doc
    }
}

/// A shard: segments in scan order.
#[derive(Debug, Clone, Default)]
pub struct MemoryShard {
    pub segments: Vec<MemorySegment>,
}

/// JSON documents of one segment: `{"docs": [{...}, ...]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentDocs {
    pub docs: Vec<Map<String, Value>>,
}

/// JSON form of one shard: `{"segments": [...]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShardDocs {
    pub segments: Vec<SegmentDocs>,
}

/// A set of JSON shards: `{"shards": [...]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShardSet {
    pub shards: Vec<ShardDocs>,
}

impl MemoryShard {
    pub fn new(segments: Vec<MemorySegment>) -> Self {
        Self { segments }
    }

    pub fn from_docs(shard: &ShardDocs) -> Result<Self> {
        let segments = shard
            .segments
            .iter()
            .map(|segment| MemorySegment::from_json_docs(&segment.docs))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { segments })
    }

    /// `{"segments": [{"docs": [ {...}, ... ]}, ...]}`
    pub fn from_json(value: &Value) -> Result<Self> {
        Self::from_docs(&ShardDocs::deserialize(value)?)
    }
}

impl ShardSet {
    pub fn into_shards(self) -> Result<Vec<MemoryShard>> {
        self.shards.iter().map(MemoryShard::from_docs).collect()
    }
}
