//! Per-document weights added to bucket totals.

use crate::error::{Error, Result};
use crate::field::{DocId, NumericFieldData, SegmentContext};
use crate::script::{CompiledScript, ScriptParams, SegmentScript};
use std::sync::Arc;

/// How a facet derives each document's weight, resolved once per request.
#[derive(Clone)]
pub enum ValueSpec {
    /// Every document weighs 1.0.
    Constant,
    /// Sum of the document's values in a numeric field.
    Field(String),
    Script {
        script: Arc<dyn CompiledScript>,
        params: Arc<ScriptParams>,
    },
}

impl ValueSpec {
    pub fn source(&self) -> ValueSource {
        match self {
            ValueSpec::Constant => ValueSource::Constant,
            ValueSpec::Field(name) => ValueSource::Field {
                name: name.clone(),
                column: None,
                buf: Vec::new(),
            },
            ValueSpec::Script { script, params } => ValueSource::Script {
                script: Arc::clone(script),
                params: Arc::clone(params),
                bound: None,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ValueSpec::Constant => "constant",
            ValueSpec::Field(_) => "field",
            ValueSpec::Script { .. } => "script",
        }
    }
}

impl std::fmt::Debug for ValueSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSpec::Constant => f.write_str("Constant"),
            ValueSpec::Field(name) => f.debug_tuple("Field").field(name).finish(),
            ValueSpec::Script { params, .. } => {
                f.debug_struct("Script").field("params", params).finish()
            }
        }
    }
}

/// A weight source owned by one collector; non-constant variants hold a
/// per-segment binding that is rebuilt on every segment change.
pub enum ValueSource {
    Constant,
    Field {
        name: String,
        column: Option<Box<dyn NumericFieldData>>,
        buf: Vec<f64>,
    },
    Script {
        script: Arc<dyn CompiledScript>,
        params: Arc<ScriptParams>,
        bound: Option<Box<dyn SegmentScript>>,
    },
}

impl ValueSource {
    pub fn bind_segment(&mut self, segment: &SegmentContext<'_>) -> Result<()> {
        match self {
            ValueSource::Constant => {}
            ValueSource::Field { name, column, .. } => {
                *column = segment.reader.numeric_field(name)?;
            }
            ValueSource::Script { script, bound, .. } => {
                *bound = Some(script.bind(segment)?);
            }
        }
        Ok(())
    }

    pub fn evaluate(&mut self, doc: DocId) -> Result<f64> {
        match self {
            ValueSource::Constant => Ok(1.0),
            ValueSource::Field { column, buf, .. } => {
                let weight = match column.as_deref() {
                    Some(column) if column.has_value(doc) => {
                        if column.is_multi_valued() {
                            column.values(doc, buf);
                            buf.iter().sum::<f64>()
                        } else {
                            column.value(doc)
                        }
                    }
                    _ => 0.0,
                };
                if weight.is_finite() {
                    Ok(weight)
                } else {
                    Err(Error::NonNumericWeight {
                        doc,
                        value: weight.to_string(),
                    })
                }
            }
            ValueSource::Script { params, bound, .. } => {
                let bound = bound.as_ref().ok_or_else(|| {
                    Error::InvalidState("script evaluated before segment binding".to_string())
                })?;
                let value = bound.execute(doc, params)?;
                match value.as_f64() {
                    Some(weight) if weight.is_finite() => Ok(weight),
                    _ => Err(Error::NonNumericWeight {
                        doc,
                        value: value.to_string(),
                    }),
                }
            }
        }
    }

    /// Release per-segment bindings.
    pub fn unbind(&mut self) {
        match self {
            ValueSource::Constant => {}
            ValueSource::Field { column, .. } => *column = None,
            ValueSource::Script { bound, .. } => *bound = None,
        }
    }
}
