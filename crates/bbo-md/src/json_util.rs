//! JSON field helpers for feed parsers.
//!
//! Exchanges encode numbers either as JSON strings (`"30000.5"`) or as native
//! numbers (`30000.5`); both are accepted.

use bbo_core::error::DecodeError;

/// Parse a JSON value (string or number) as `f64`.
#[inline]
pub fn parse_str_f64(v: Option<&serde_json::Value>) -> Option<f64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        fast_float2::parse(s).ok()
    } else {
        v.as_f64()
    }
}

/// Parse a JSON value (string or number) as `i64`.
#[inline]
pub fn parse_str_i64(v: Option<&serde_json::Value>) -> Option<i64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        s.parse().ok()
    } else {
        v.as_i64()
    }
}

/// Required numeric field: missing and non-numeric values are distinct errors.
pub fn require_f64(v: &serde_json::Value, key: &'static str) -> Result<f64, DecodeError> {
    let field = v.get(key).ok_or(DecodeError::MissingField(key))?;
    parse_str_f64(Some(field)).ok_or_else(|| DecodeError::NotNumeric { field: key, value: field.to_string() })
}
