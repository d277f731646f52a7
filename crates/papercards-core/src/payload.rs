//! Summary payloads and the sanitizer that guards the structured column.
//!
//! Summarizers produce a [`PayloadValue`], which can carry values a JSON
//! column cannot hold verbatim: timestamps, calendar dates and non-finite
//! floats. A flashcard only ever stores a [`SanitizedPayload`], and the only
//! ways to obtain one are [`sanitize`] and decoding an already stored column.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Map keys owned by the flashcard record itself; never duplicated into the
/// payload.
pub const RESERVED_KEYS: &[&str] = &["generated_at", "expires_at"];

// ─── PayloadValue ────────────────────────────────────────────────────────────

/// A nested, loosely-typed value as produced by a summarizer.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
  Null,
  Bool(bool),
  /// An exact JSON number.
  Number(Number),
  /// A raw float; may be NaN or infinite.
  Float(f64),
  String(String),
  Timestamp(DateTime<Utc>),
  Date(NaiveDate),
  List(Vec<PayloadValue>),
  Map(BTreeMap<String, PayloadValue>),
}

impl PayloadValue {
  /// An empty map, the usual starting point for building a payload.
  pub fn map() -> Self { Self::Map(BTreeMap::new()) }

  /// Insert `key` into a map payload; a no-op on any other variant.
  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Self>) {
    if let Self::Map(entries) = self {
      entries.insert(key.into(), value.into());
    }
  }

  pub fn get(&self, key: &str) -> Option<&Self> {
    match self {
      Self::Map(entries) => entries.get(key),
      _ => None,
    }
  }

  /// `true` if a timestamp or date appears anywhere in the value.
  pub fn contains_temporal(&self) -> bool {
    match self {
      Self::Timestamp(_) | Self::Date(_) => true,
      Self::List(items) => items.iter().any(Self::contains_temporal),
      Self::Map(entries) => entries.values().any(Self::contains_temporal),
      _ => false,
    }
  }
}

impl From<Value> for PayloadValue {
  fn from(value: Value) -> Self {
    match value {
      Value::Null => Self::Null,
      Value::Bool(b) => Self::Bool(b),
      Value::Number(n) => Self::Number(n),
      Value::String(s) => Self::String(s),
      Value::Array(items) => {
        Self::List(items.into_iter().map(Self::from).collect())
      }
      Value::Object(entries) => Self::Map(
        entries.into_iter().map(|(k, v)| (k, Self::from(v))).collect(),
      ),
    }
  }
}

impl From<&str> for PayloadValue {
  fn from(s: &str) -> Self { Self::String(s.to_owned()) }
}

impl From<String> for PayloadValue {
  fn from(s: String) -> Self { Self::String(s) }
}

impl From<bool> for PayloadValue {
  fn from(b: bool) -> Self { Self::Bool(b) }
}

impl From<i64> for PayloadValue {
  fn from(n: i64) -> Self { Self::Number(n.into()) }
}

impl From<f64> for PayloadValue {
  fn from(f: f64) -> Self { Self::Float(f) }
}

impl From<DateTime<Utc>> for PayloadValue {
  fn from(dt: DateTime<Utc>) -> Self { Self::Timestamp(dt) }
}

impl From<NaiveDate> for PayloadValue {
  fn from(d: NaiveDate) -> Self { Self::Date(d) }
}

impl<T: Into<PayloadValue>> From<Option<T>> for PayloadValue {
  fn from(opt: Option<T>) -> Self { opt.map_or(Self::Null, Into::into) }
}

// ─── SanitizedPayload ────────────────────────────────────────────────────────

/// A payload guaranteed to be plain JSON with no temporal values and no
/// reserved keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SanitizedPayload(Value);

impl SanitizedPayload {
  /// Rebuild a payload from a stored JSON column. The value is passed through
  /// the sanitizer again, so the invariant holds whatever the column held.
  pub fn from_stored(value: Value) -> Self { sanitize(PayloadValue::from(value)) }

  pub fn as_json(&self) -> &Value { &self.0 }

  pub fn into_json(self) -> Value { self.0 }

  /// Look up a top-level string field.
  pub fn get_str(&self, key: &str) -> Option<&str> {
    self.0.get(key).and_then(Value::as_str)
  }
}

impl Default for SanitizedPayload {
  fn default() -> Self { Self(Value::Object(Map::new())) }
}

impl<'de> Deserialize<'de> for SanitizedPayload {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    Value::deserialize(deserializer).map(Self::from_stored)
  }
}

/// Normalize `value` into something the structured column can hold as-is.
///
/// At every depth: timestamps become RFC 3339 strings, dates become
/// `YYYY-MM-DD`, non-finite floats become `null`, and [`RESERVED_KEYS`] are
/// removed from maps.
pub fn sanitize(value: PayloadValue) -> SanitizedPayload {
  SanitizedPayload(to_json(value))
}

fn to_json(value: PayloadValue) -> Value {
  match value {
    PayloadValue::Null => Value::Null,
    PayloadValue::Bool(b) => Value::Bool(b),
    PayloadValue::Number(n) => Value::Number(n),
    PayloadValue::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
    PayloadValue::String(s) => Value::String(s),
    PayloadValue::Timestamp(dt) => {
      Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
    PayloadValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
    PayloadValue::List(items) => {
      Value::Array(items.into_iter().map(to_json).collect())
    }
    PayloadValue::Map(entries) => Value::Object(
      entries
        .into_iter()
        .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k, to_json(v)))
        .collect(),
    ),
  }
}
