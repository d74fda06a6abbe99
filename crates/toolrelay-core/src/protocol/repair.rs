//! Argument repair ladder
//!
//! Models often emit almost-JSON arguments. The ladder tries an ordered list
//! of strategies and returns the first value one of them produces.

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Field targeted when a tool declares no usable parameter
pub const FALLBACK_FIELD: &str = "query";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepairError {
    #[error("could not decode arguments (tried {})", attempts.join(", "))]
    Exhausted { attempts: Vec<&'static str> },
}

pub type RepairResult<T> = Result<T, RepairError>;

/// One rung of the ladder
pub trait RepairStrategy: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Try to turn `raw` into a JSON value
    fn attempt(&self, raw: &str, expected_field: &str) -> Option<Value>;
}

/// Plain `serde_json` decode
#[derive(Debug, Default)]
pub struct StrictJson;

impl RepairStrategy for StrictJson {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn attempt(&self, raw: &str, _expected_field: &str) -> Option<Value> {
        serde_json::from_str(raw).ok()
    }
}

/// Drop everything after the last `}` and decode again
#[derive(Debug, Default)]
pub struct TruncateAtLastBrace;

impl RepairStrategy for TruncateAtLastBrace {
    fn name(&self) -> &'static str {
        "truncate"
    }

    fn attempt(&self, raw: &str, _expected_field: &str) -> Option<Value> {
        let end = raw.rfind('}')?;
        serde_json::from_str(&raw[..=end]).ok()
    }
}

/// Pull a single `"field": "value"` pair out of the text
#[derive(Debug, Default)]
pub struct ExtractExpectedField;

impl RepairStrategy for ExtractExpectedField {
    fn name(&self) -> &'static str {
        "extract-field"
    }

    fn attempt(&self, raw: &str, expected_field: &str) -> Option<Value> {
        let pattern = format!(r#""{}"\s*:\s*"([^"]*)""#, regex::escape(expected_field));
        let re = Regex::new(&pattern).ok()?;
        let value = re.captures(raw)?.get(1)?.as_str();

        let mut object = Map::new();
        object.insert(expected_field.to_string(), Value::String(value.to_string()));
        Some(Value::Object(object))
    }
}

/// A decoded value and the rung that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired {
    pub value: Value,
    pub strategy: &'static str,
}

/// Ordered list of repair strategies
pub struct RepairLadder {
    rungs: Vec<Box<dyn RepairStrategy>>,
}

impl Default for RepairLadder {
    fn default() -> Self {
        Self::standard()
    }
}

impl RepairLadder {
    /// Strict decode, then truncation, then field extraction
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(StrictJson),
            Box::new(TruncateAtLastBrace),
            Box::new(ExtractExpectedField),
        ])
    }

    pub fn new(rungs: Vec<Box<dyn RepairStrategy>>) -> Self {
        Self { rungs }
    }

    /// Decode `raw`, climbing the ladder until a rung succeeds
    ///
    /// Blank input decodes to an empty object.
    pub fn repair(&self, raw: &str, expected_field: &str) -> RepairResult<Repaired> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Repaired {
                value: Value::Object(Map::new()),
                strategy: "empty",
            });
        }

        for rung in &self.rungs {
            if let Some(value) = rung.attempt(raw, expected_field) {
                return Ok(Repaired {
                    value,
                    strategy: rung.name(),
                });
            }
        }

        Err(RepairError::Exhausted {
            attempts: self.rungs.iter().map(|r| r.name()).collect(),
        })
    }
}
