use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One distance band `[from, to)` with its running aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeEntry {
    #[serde(with = "lower_bound")]
    pub from: f64,
    #[serde(with = "upper_bound")]
    pub to: f64,
    pub count: u64,
    #[serde(with = "float_total")]
    pub total: f64,
}

impl RangeEntry {
    pub fn new(from: f64, to: f64) -> Self {
        Self {
            from,
            to,
            count: 0,
            total: 0.0,
        }
    }

    #[inline]
    pub fn contains(&self, distance: f64) -> bool {
        distance >= self.from && distance < self.to
    }

    /// `total / count`, 0.0 for an empty bucket.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    fn same_bounds(&self, other: &RangeEntry) -> bool {
        self.from.to_bits() == other.from.to_bits() && self.to.to_bits() == other.to.to_bits()
    }
}

/// The facet's aggregation state: entries in configuration order.
///
/// The table never grows or shrinks after construction. Entries may overlap;
/// a sample updates every entry it falls into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeBucketTable {
    entries: Box<[RangeEntry]>,
}

impl RangeBucketTable {
    /// Zeroed table for the given `(from, to)` bounds.
    pub fn new(bounds: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            entries: bounds
                .into_iter()
                .map(|(from, to)| RangeEntry::new(from, to))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[RangeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn record_sample(&mut self, distance: f64, weight: f64) {
        for entry in self.entries.iter_mut() {
            if entry.contains(distance) {
                entry.count += 1;
                entry.total += weight;
            }
        }
    }

    /// Same length and bitwise-identical bounds, entry by entry.
    pub fn same_shape(&self, other: &RangeBucketTable) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|(a, b)| a.same_bounds(b))
    }

    /// Add `other`'s counts and totals into `self`, index by index.
    pub fn merge_from(&mut self, other: &RangeBucketTable) -> Result<()> {
        if self.entries.len() != other.entries.len() {
            return Err(Error::ShapeMismatch(format!(
                "cannot merge a table of {} entries into one of {}",
                other.entries.len(),
                self.entries.len()
            )));
        }
        if let Some(i) = self
            .entries
            .iter()
            .zip(other.entries.iter())
            .position(|(a, b)| !a.same_bounds(b))
        {
            return Err(Error::ShapeMismatch(format!(
                "entry {} bounds differ: [{}, {}) vs [{}, {})",
                i, self.entries[i].from, self.entries[i].to, other.entries[i].from, other.entries[i].to
            )));
        }
        for (acc, entry) in self.entries.iter_mut().zip(other.entries.iter()) {
            acc.count += entry.count;
            acc.total += entry.total;
        }
        Ok(())
    }
}

/// Sum shard tables of one facet into a single table.
pub fn merge_tables<I>(tables: I) -> Result<RangeBucketTable>
where
    I: IntoIterator<Item = RangeBucketTable>,
{
    let mut tables = tables.into_iter();
    let mut merged = tables
        .next()
        .ok_or_else(|| Error::ShapeMismatch("no shard results to merge".to_string()))?;
    for table in tables {
        merged.merge_from(&table)?;
    }
    Ok(merged)
}

/// `from`: `-inf` travels as `null`.
mod lower_bound {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if *value == f64::NEG_INFINITY {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}

/// `to`: `+inf` travels as `null`.
mod upper_bound {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if *value == f64::INFINITY {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// Totals can overflow to `inf` (or be `NaN`); those travel as strings
/// since JSON has no number for them.
pub(crate) mod float_total {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_str(&value.to_string())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(s) => match s.parse::<f64>() {
                Ok(n) if !n.is_finite() => Ok(n),
                _ => Err(D::Error::custom(format!("invalid total {:?}", s))),
            },
        }
    }
}
