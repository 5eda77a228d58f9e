//! Scripting capability used by scripted value sources.
//!
//! A script is compiled once per request, bound once per segment and then
//! executed once per collected document with the request's parameters.

mod expression;

pub use expression::ExpressionEngine;

use crate::error::{Error, Result};
use crate::field::{DocId, SegmentContext};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Language used when a request names none.
pub const DEFAULT_LANG: &str = "expression";

/// Request-scoped script parameters, passed unchanged to every execution.
pub type ScriptParams = HashMap<String, Value>;

pub trait ScriptEngine: Send + Sync {
    fn lang(&self) -> &str;

    fn compile(&self, source: &str) -> Result<Arc<dyn CompiledScript>>;
}

pub trait CompiledScript: Send + Sync {
    /// Resolve whatever the script reads from `segment`.
    fn bind(&self, segment: &SegmentContext<'_>) -> Result<Box<dyn SegmentScript>>;
}

/// A script bound to one segment.
pub trait SegmentScript: Send {
    fn execute(&self, doc: DocId, params: &ScriptParams) -> Result<Value>;
}

/// Script engines by language id.
#[derive(Clone)]
pub struct ScriptRegistry {
    engines: HashMap<String, Arc<dyn ScriptEngine>>,
}

impl ScriptRegistry {
    /// A registry without any engine.
    pub fn empty() -> Self {
        Self {
            engines: HashMap::new(),
        }
    }

    pub fn register(&mut self, engine: Arc<dyn ScriptEngine>) {
        self.engines.insert(engine.lang().to_string(), engine);
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.engines.keys().map(String::as_str).collect();
        langs.sort_unstable();
        langs
    }

    pub fn compile(&self, lang: &str, source: &str) -> Result<Arc<dyn CompiledScript>> {
        let engine = self
            .engines
            .get(lang)
            .ok_or_else(|| Error::Script(format!("no script engine for lang '{}'", lang)))?;
        engine.compile(source)
    }
}

impl Default for ScriptRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ExpressionEngine));
        registry
    }
}

impl std::fmt::Debug for ScriptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_expression() {
        let registry = ScriptRegistry::default();
        assert_eq!(registry.languages(), vec!["expression"]);
        assert!(registry.compile("expression", "1 + 1").is_ok());
    }

    #[test]
    fn test_unknown_lang() {
        let registry = ScriptRegistry::default();
        let err = registry.compile("painless", "doc.x").err().unwrap();
        assert!(matches!(err, Error::Script(_)));
    }
}
