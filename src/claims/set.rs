//! Claim maps with non-panicking, shape-checked accessors.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::error::TokenValidationError;

/// A dynamically-typed claim value: string, number, boolean, list, object or null.
pub type ClaimValue = Value;

/// Claims from a single source (ID token, access token or userinfo response).
///
/// Lookups never fail. A claim that is missing, `null` or of the wrong
/// shape is reported as absent so callers can fall through to the next source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    /// Create an empty claim set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the base64url payload segment of a compact JWT.
    pub fn from_jwt_segment(segment: &str) -> Result<Self, TokenValidationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(segment.trim_end_matches('='))
            .map_err(|e| TokenValidationError::Malformed(format!("invalid base64: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| TokenValidationError::Malformed(format!("invalid claims JSON: {e}")))
    }

    /// Insert a claim, returning the set for chaining.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Raw lookup. `null` values count as absent.
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// String-valued claim.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Integer claim (NumericDate values such as `iat` or `auth_time`).
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
    }

    /// Array claim whose elements are all strings.
    ///
    /// An array holding anything other than strings is absent.
    pub fn string_array(&self, name: &str) -> Option<BTreeSet<String>> {
        let Value::Array(values) = self.get(name)? else {
            return None;
        };
        values
            .iter()
            .map(|v| v.as_str().map(String::from))
            .collect()
    }

    /// List claim with every element rendered as a string.
    pub fn stringified_list(&self, name: &str) -> Option<BTreeSet<String>> {
        let Value::Array(values) = self.get(name)? else {
            return None;
        };
        Some(values.iter().map(stringify).collect())
    }

    /// Array claim keeping only its string elements.
    pub fn string_elements(&self, name: &str) -> Option<BTreeSet<String>> {
        let Value::Array(values) = self.get(name)? else {
            return None;
        };
        Some(
            values
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
        )
    }

    /// Audience claim, which may be a single string or an array of strings.
    pub fn audience(&self) -> BTreeSet<String> {
        match self.get("aud") {
            Some(Value::String(s)) => BTreeSet::from([s.clone()]),
            Some(Value::Array(_)) => self.string_elements("aud").unwrap_or_default(),
            _ => BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClaimValue)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for ClaimSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
