//! Validation of vehicle-list response bodies.
//!
//! A body is accepted only if it is JSON (not an HTML error page) and carries
//! a `response` array. The primary request additionally requires a `meta`
//! field.

use serde_json::Value;

use crate::error::FetchError;

/// How strictly the envelope of a response is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// `meta` and `response` are both required.
    Strict,
    /// Only `response` is required.
    Relaxed,
}

/// Heuristic for bodies that are markup rather than JSON: after trimming
/// leading whitespace the text starts with `<`.
pub fn looks_like_markup(body: &str) -> bool {
    body.trim_start().starts_with('<')
}

/// Returns `true` for values a loosely typed provider treats as "set":
/// anything except `null`, `false`, `0`, NaN and the empty string.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Decodes a response body into its list of raw vehicle records.
///
/// # Errors
///
/// [`FetchError::Markup`] for markup bodies, [`FetchError::Parse`] for
/// invalid JSON and [`FetchError::Shape`] when the envelope does not match.
pub fn parse_vehicle_list(body: &str, envelope: Envelope) -> Result<Vec<Value>, FetchError> {
    if looks_like_markup(body) {
        return Err(FetchError::Markup);
    }

    let mut data: Value = serde_json::from_str(body)?;

    if envelope == Envelope::Strict && !data.get("meta").is_some_and(is_truthy) {
        return Err(FetchError::Shape("missing meta"));
    }

    match data.get_mut("response").map(Value::take) {
        Some(Value::Array(vehicles)) => Ok(vehicles),
        Some(_) => Err(FetchError::Shape("response is not an array")),
        None => Err(FetchError::Shape("missing response")),
    }
}
