//! Fixed GraphQL scalars for protobuf well-known types.
//!
//! `Empty`, `Timestamp`, `Duration`, `bytes` and `JSON` are registered with
//! every [`TypeRegistry`](crate::TypeRegistry). Generated resolvers call the
//! parse/serialize helpers in this module; a failed conversion surfaces to
//! the GraphQL caller as a field error.

use std::collections::HashMap;

use async_graphql::dynamic::Scalar;
use async_graphql::Value;
use base64::Engine;
use chrono::SecondsFormat;
use prost_reflect::ReflectMessage;

use crate::error::EdgeError;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// The `Empty` scalar. Parses and serializes to `null`.
pub fn scalar_empty() -> Scalar {
    Scalar::new("Empty").description("Empty accepts only `null` value")
}

/// The `Timestamp` scalar: an ISO-8601 string with millisecond precision.
pub fn scalar_timestamp() -> Scalar {
    Scalar::new("Timestamp")
}

/// The `Duration` scalar: a textual duration such as `1h2m3.5s`.
pub fn scalar_duration() -> Scalar {
    Scalar::new("Duration").description("Duration represent time duration")
}

/// The `bytes` scalar: standard base64 on the wire, `Vec<u8>` in the program.
pub fn scalar_bytes() -> Scalar {
    Scalar::new("bytes")
}

/// The `JSON` scalar: an opaque key/value map used for protobuf map fields.
pub fn scalar_json() -> Scalar {
    Scalar::new("JSON")
}

/// Serialize a protobuf timestamp to its ISO-8601 textual form.
pub fn serialize_timestamp(ts: &prost_types::Timestamp) -> Result<String, EdgeError> {
    if !(0..1_000_000_000).contains(&ts.nanos) {
        return Err(EdgeError::InvalidScalar(format!(
            "timestamp nanos out of range: {}",
            ts.nanos
        )));
    }
    let dt = chrono::DateTime::from_timestamp(ts.seconds, ts.nanos as u32).ok_or_else(|| {
        EdgeError::InvalidScalar(format!("timestamp out of range: {}s", ts.seconds))
    })?;
    Ok(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Parse an ISO-8601 string into a protobuf timestamp.
pub fn parse_timestamp(literal: &str) -> Result<prost_types::Timestamp, EdgeError> {
    let dt = chrono::DateTime::parse_from_rfc3339(literal)
        .map_err(|e| EdgeError::InvalidScalar(format!("invalid timestamp {literal:?}: {e}")))?;
    Ok(prost_types::Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    })
}

/// Serialize a protobuf duration to its textual form (`1h2m3.5s`, `1.5ms`, ...).
pub fn serialize_duration(d: &prost_types::Duration) -> Result<String, EdgeError> {
    if d.seconds != 0 && d.nanos != 0 && (d.seconds < 0) != (d.nanos < 0) {
        return Err(EdgeError::InvalidScalar(format!(
            "duration sign mismatch: {}s {}ns",
            d.seconds, d.nanos
        )));
    }
    Ok(format_nanos(d.seconds as i128 * NANOS_PER_SEC + d.nanos as i128))
}

/// Parse a textual duration into a protobuf duration.
///
/// Accepts a sequence of decimal numbers with unit suffixes `ns`, `us`, `ms`,
/// `s`, `m`, `h`, with an optional leading sign.
pub fn parse_duration(literal: &str) -> Result<prost_types::Duration, EdgeError> {
    let bad = || EdgeError::InvalidScalar(format!("invalid duration {literal:?}"));
    let mut rest = literal;
    let mut neg = false;
    if let Some(r) = rest.strip_prefix('-') {
        neg = true;
        rest = r;
    } else if let Some(r) = rest.strip_prefix('+') {
        rest = r;
    }
    if rest == "0" {
        return Ok(prost_types::Duration::default());
    }
    if rest.is_empty() {
        return Err(bad());
    }
    let mut total: i128 = 0;
    while !rest.is_empty() {
        let int_len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let whole: u128 = if int_len > 0 {
            rest[..int_len].parse().map_err(|_| bad())?
        } else {
            0
        };
        rest = &rest[int_len..];
        let mut frac_digits = "";
        if let Some(r) = rest.strip_prefix('.') {
            let frac_len = r.find(|c: char| !c.is_ascii_digit()).unwrap_or(r.len());
            frac_digits = &r[..frac_len];
            rest = &r[frac_len..];
            if int_len == 0 && frac_digits.is_empty() {
                return Err(bad());
            }
        } else if int_len == 0 {
            return Err(bad());
        }
        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit: i128 = match &rest[..unit_len] {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3600 * NANOS_PER_SEC,
            _ => return Err(bad()),
        };
        rest = &rest[unit_len..];
        total += whole as i128 * unit;
        let mut scale = unit;
        for digit in frac_digits.bytes() {
            scale /= 10;
            total += (digit - b'0') as i128 * scale;
        }
    }
    if neg {
        total = -total;
    }
    Ok(prost_types::Duration {
        seconds: (total / NANOS_PER_SEC) as i64,
        nanos: (total % NANOS_PER_SEC) as i32,
    })
}

fn format_nanos(total: i128) -> String {
    if total == 0 {
        return "0s".to_string();
    }
    let mut out = String::new();
    if total < 0 {
        out.push('-');
    }
    let n = total.unsigned_abs();
    if n < 1_000 {
        out.push_str(&n.to_string());
        out.push_str("ns");
    } else if n < 1_000_000 {
        push_frac(&mut out, n, 1_000);
        out.push_str("us");
    } else if n < NANOS_PER_SEC as u128 {
        push_frac(&mut out, n, 1_000_000);
        out.push_str("ms");
    } else {
        let secs = n / NANOS_PER_SEC as u128;
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if hours > 0 {
            out.push_str(&hours.to_string());
            out.push('h');
        }
        if hours > 0 || mins > 0 {
            out.push_str(&mins.to_string());
            out.push('m');
        }
        push_frac(
            &mut out,
            (secs % 60) * NANOS_PER_SEC as u128 + n % NANOS_PER_SEC as u128,
            NANOS_PER_SEC as u128,
        );
        out.push('s');
    }
    out
}

// Prints value/scale with trailing fraction zeros trimmed, e.g. 1500/1000 -> "1.5".
fn push_frac(out: &mut String, value: u128, scale: u128) {
    out.push_str(&(value / scale).to_string());
    let frac = value % scale;
    if frac == 0 {
        return;
    }
    let mut digits = String::new();
    let mut rem = frac;
    let mut s = scale / 10;
    while s > 0 {
        digits.push(char::from(b'0' + (rem / s) as u8));
        rem %= s;
        s /= 10;
    }
    while digits.ends_with('0') {
        digits.pop();
    }
    out.push('.');
    out.push_str(&digits);
}

/// Encode bytes for the `bytes` scalar (standard base64 alphabet).
pub fn encode_bytes(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode a `bytes` scalar literal.
pub fn decode_bytes(literal: &str) -> Result<Vec<u8>, EdgeError> {
    base64::engine::general_purpose::STANDARD
        .decode(literal)
        .map_err(|e| EdgeError::InvalidScalar(format!("invalid base64 {literal:?}: {e}")))
}

/// Convert a protobuf map with scalar values into a `JSON` scalar value.
pub fn scalar_map<K, V>(map: &HashMap<K, V>) -> Result<Value, EdgeError>
where
    K: ToString,
    V: serde::Serialize,
{
    let mut object = serde_json::Map::with_capacity(map.len());
    for (key, value) in map {
        let json = serde_json::to_value(value)
            .map_err(|e| EdgeError::InvalidScalar(format!("map value: {e}")))?;
        object.insert(key.to_string(), json);
    }
    Value::from_json(serde_json::Value::Object(object))
        .map_err(|e| EdgeError::InvalidScalar(format!("map value: {e}")))
}

/// Convert a protobuf map with message values into a `JSON` scalar value.
///
/// Values are rendered in protobuf JSON form via their reflection descriptor.
pub fn message_map<K, V>(map: &HashMap<K, V>) -> Result<Value, EdgeError>
where
    K: ToString,
    V: ReflectMessage,
{
    let mut object = serde_json::Map::with_capacity(map.len());
    for (key, value) in map {
        let json = serde_json::to_value(value.transcode_to_dynamic())
            .map_err(|e| EdgeError::InvalidScalar(format!("map value: {e}")))?;
        object.insert(key.to_string(), json);
    }
    Value::from_json(serde_json::Value::Object(object))
        .map_err(|e| EdgeError::InvalidScalar(format!("map value: {e}")))
}
