//! Mapping of provider vehicle records onto [`BusLocation`].
//!
//! | Provider key | Field              | When absent                          |
//! |--------------|--------------------|--------------------------------------|
//! | `vId`        | `id`               | `meridian-` + random alphanumerics   |
//! | `la` / `lo`  | `latitude` / `longitude` | `0`                            |
//! | `h`          | `heading`          | `0`                                  |
//! | `hN`         | `heading_name`     | `"Unknown"`                          |
//! | `s`          | `speed`            | `0`                                  |
//! | `mLn`        | `route_name`       | the live route's name                |
//! | `mSn`        | `route_short_name` | the live route's short name          |
//! | `mD`         | `next_stop`        | nearest stop to the position         |
//! | `uT`         | `timestamp`        | now                                  |
//!
//! "Absent" follows [`is_truthy`]: `0`, `""`, `false` and `null` all count as
//! missing.

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;
use serde_json::Value;
use tracing::debug;

use crate::model::{BusLocation, BusRoute};
use crate::parser::is_truthy;

const ID_PREFIX: &str = "meridian-";
const ID_SUFFIX_LEN: usize = 7;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub const UNKNOWN_HEADING: &str = "Unknown";

/// Builds a [`BusLocation`] from one raw provider record.
///
/// `route` is the live route: it supplies the route identity defaults and the
/// stops used to derive `next_stop`.
pub fn normalize_vehicle<R: Rng>(item: &Value, route: &BusRoute, rng: &mut R) -> BusLocation {
    let field = |key: &str| item.get(key).filter(|v| is_truthy(v));

    let latitude = field("la").and_then(as_number).unwrap_or(0.0);
    let longitude = field("lo").and_then(as_number).unwrap_or(0.0);

    BusLocation {
        id: field("vId")
            .and_then(as_text)
            .unwrap_or_else(|| synthesize_id(rng)),
        latitude,
        longitude,
        heading: field("h").and_then(as_number).unwrap_or(0.0),
        heading_name: field("hN")
            .and_then(as_text)
            .unwrap_or_else(|| UNKNOWN_HEADING.to_string()),
        speed: field("s").and_then(as_number).unwrap_or(0.0),
        route_id: route.id,
        route_name: field("mLn")
            .and_then(as_text)
            .unwrap_or_else(|| route.name.clone()),
        route_short_name: field("mSn")
            .and_then(as_text)
            .unwrap_or_else(|| route.short_name.clone()),
        next_stop: field("mD")
            .and_then(as_text)
            .unwrap_or_else(|| route.nearest_stop(latitude, longitude).to_string()),
        timestamp: field("uT")
            .and_then(as_epoch_millis)
            .unwrap_or_else(|| Utc::now().timestamp_millis()),
        raw_data: Some(item.clone()),
    }
}

/// Normalizes every record of a vehicle list, keeping order.
pub fn normalize_vehicles<R: Rng>(items: &[Value], route: &BusRoute, rng: &mut R) -> Vec<BusLocation> {
    items
        .iter()
        .map(|item| normalize_vehicle(item, route, rng))
        .collect()
}

fn synthesize_id<R: Rng>(rng: &mut R) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())]))
        .collect();
    format!("{ID_PREFIX}{suffix}")
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|f| f.is_finite())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads an update time given as epoch milliseconds, an RFC 3339 string or a
/// `YYYY-MM-DD HH:MM:SS` string taken as UTC.
fn as_epoch_millis(value: &Value) -> Option<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    DateTime::parse_from_rfc3339(s)
                        .ok()
                        .map(|dt| dt.timestamp_millis())
                })
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|dt| dt.and_utc().timestamp_millis())
                })
        }
        _ => None,
    };

    if parsed.is_none() {
        debug!(value = %value, "Unparseable update time, using now");
    }
    parsed
}
