//! Typed view of a timings report document

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReportError;

/// Top-level member holding the analyzable part of the document
const MASTER_KEY: &str = "timingsMaster";

/// The `timingsMaster` section of a report.
///
/// Maps keep document order so repeated analysis of one body is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(deserialize_with = "lenient_string")]
    pub version: String,

    pub system: SystemInfo,

    /// Loaded plugins keyed by name
    pub plugins: IndexMap<String, Value>,

    /// Configuration namespaces present on the server
    pub config: IndexMap<String, Value>,

    pub idmap: IdMap,
}

/// Host and JVM description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Hardware threads available to the JVM
    #[serde(deserialize_with = "lenient_int")]
    pub cpu: i64,

    /// Cost of one timings measurement, higher means a slower host
    #[serde(deserialize_with = "lenient_int")]
    pub timingcost: i64,

    #[serde(deserialize_with = "lenient_string")]
    pub jvmversion: String,

    /// JVM command-line flags, space separated
    #[serde(deserialize_with = "lenient_string")]
    pub flags: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdMap {
    #[serde(rename = "handlerMap")]
    pub handler_map: IndexMap<String, Handler>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handler {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
}

/// Decode a report body.
///
/// Returns `Ok(None)` for a valid JSON object without a `timingsMaster`
/// member; such a report has nothing to analyze.
pub fn parse_report(body: &str) -> Result<Option<Report>, ReportError> {
    let document: Value = serde_json::from_str(body)?;
    let Value::Object(mut root) = document else {
        return Err(ReportError::NotAnObject);
    };

    match root.remove(MASTER_KEY) {
        Some(master) => Ok(Some(serde_json::from_value(master)?)),
        None => Ok(None),
    }
}

/// Integers may arrive as floats (truncated) or numeric strings
fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| de::Error::custom(format!("{n} is not an integer"))),
        Value::String(s) => s.parse::<i64>().map_err(de::Error::custom),
        other => Err(de::Error::custom(format!("expected a number, found {other}"))),
    }
}

/// Scalars of any kind are accepted as text
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!("expected a string, found {other}"))),
    }
}
