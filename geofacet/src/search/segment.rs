use crate::error::Result;
use crate::field::{DocId, FieldDataReader, NumericFieldData};
use tantivy::columnar::{Cardinality, Column};
use tantivy::SegmentReader;

/// An `f64` fast field column of one tantivy segment.
pub struct ColumnFieldData {
    column: Column<f64>,
}

impl ColumnFieldData {
    pub fn new(column: Column<f64>) -> Self {
        Self { column }
    }
}

impl NumericFieldData for ColumnFieldData {
    fn has_value(&self, doc: DocId) -> bool {
        self.column.first(doc).is_some()
    }

    fn is_multi_valued(&self) -> bool {
        self.column.get_cardinality() == Cardinality::Multivalued
    }

    fn value(&self, doc: DocId) -> f64 {
        self.column.first(doc).unwrap_or(0.0)
    }

    fn values(&self, doc: DocId, out: &mut Vec<f64>) {
        out.clear();
        out.extend(self.column.values_for_doc(doc));
    }
}

impl FieldDataReader for SegmentReader {
    fn numeric_field(&self, name: &str) -> Result<Option<Box<dyn NumericFieldData>>> {
        let column = self.fast_fields().column_opt::<f64>(name)?;
        Ok(column.map(|c| Box::new(ColumnFieldData::new(c)) as Box<dyn NumericFieldData>))
    }

    fn max_doc(&self) -> DocId {
        SegmentReader::max_doc(self)
    }
}
