//! GraphQL input to protobuf request decoding.
//!
//! Generated operation resolvers serialize the `input` argument to JSON and
//! deserialize it into a new request message. The JSON shape produced by the
//! GraphQL input objects differs from protobuf JSON in two places: wrapper
//! inputs carry an explicit `{value: ...}` object, and Duration literals use
//! the textual scalar form. [`normalize_input`] bridges both before the
//! protobuf JSON deserializer runs.

use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MessageDescriptor, ReflectMessage};
use serde_json::Value as JsonValue;

use crate::error::EdgeError;
use crate::scalars::parse_duration;

const WRAPPER_TYPES: &[&str] = &[
    "google.protobuf.BoolValue",
    "google.protobuf.StringValue",
    "google.protobuf.BytesValue",
    "google.protobuf.Int32Value",
    "google.protobuf.UInt32Value",
    "google.protobuf.Int64Value",
    "google.protobuf.UInt64Value",
    "google.protobuf.FloatValue",
    "google.protobuf.DoubleValue",
];

/// Decode a GraphQL `input` argument into a protobuf request message.
pub fn decode_request<T>(input: JsonValue) -> Result<T, EdgeError>
where
    T: ReflectMessage + Default,
{
    let descriptor = T::default().descriptor();
    let message_name = descriptor.full_name().to_string();
    let normalized = normalize_input(&descriptor, input);
    let dynamic = DynamicMessage::deserialize(descriptor, normalized).map_err(|e| {
        tracing::debug!(error = %e, message = %message_name, "request decode failed");
        EdgeError::InvalidRequest(e.to_string())
    })?;
    dynamic
        .transcode_to()
        .map_err(|e| EdgeError::InvalidRequest(e.to_string()))
}

/// Rewrite a GraphQL input value into protobuf JSON form.
pub fn normalize_input(descriptor: &MessageDescriptor, value: JsonValue) -> JsonValue {
    let JsonValue::Object(object) = value else {
        return value;
    };
    let mut out = serde_json::Map::with_capacity(object.len());
    for (key, field_value) in object {
        let field = descriptor
            .get_field_by_json_name(&key)
            .or_else(|| descriptor.get_field_by_name(&key));
        let field_value = match field {
            Some(field) => normalize_field(&field, field_value),
            None => field_value,
        };
        out.insert(key, field_value);
    }
    JsonValue::Object(out)
}

fn normalize_field(field: &FieldDescriptor, value: JsonValue) -> JsonValue {
    if field.is_map() {
        let Kind::Message(entry) = field.kind() else {
            return value;
        };
        let value_field = entry.map_entry_value_field();
        if let JsonValue::Object(entries) = value {
            return JsonValue::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, normalize_singular(&value_field, v)))
                    .collect(),
            );
        }
        return value;
    }
    if field.is_list() {
        if let JsonValue::Array(items) = value {
            return JsonValue::Array(
                items
                    .into_iter()
                    .map(|item| normalize_singular(field, item))
                    .collect(),
            );
        }
        return value;
    }
    normalize_singular(field, value)
}

fn normalize_singular(field: &FieldDescriptor, value: JsonValue) -> JsonValue {
    let Kind::Message(inner) = field.kind() else {
        return value;
    };
    match inner.full_name() {
        name if WRAPPER_TYPES.contains(&name) => unwrap_wrapper(value),
        "google.protobuf.Duration" => canonicalize_duration(value),
        _ => normalize_input(&inner, value),
    }
}

// `{value: x}` -> `x`; bare values pass through untouched.
fn unwrap_wrapper(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(mut object) if object.len() == 1 && object.contains_key("value") => {
            object.remove("value").unwrap_or(JsonValue::Null)
        }
        other => other,
    }
}

// Textual duration -> protobuf JSON seconds form (`"1h2m3.5s"` -> `"3723.5s"`).
fn canonicalize_duration(value: JsonValue) -> JsonValue {
    let JsonValue::String(literal) = value else {
        return value;
    };
    match parse_duration(&literal) {
        Ok(duration) => {
            let total = duration.seconds as i128 * 1_000_000_000 + duration.nanos as i128;
            let sign = if total < 0 { "-" } else { "" };
            let abs = total.unsigned_abs();
            let secs = abs / 1_000_000_000;
            let nanos = abs % 1_000_000_000;
            if nanos == 0 {
                JsonValue::String(format!("{sign}{secs}s"))
            } else {
                let mut frac = format!("{nanos:09}");
                while frac.ends_with('0') {
                    frac.pop();
                }
                JsonValue::String(format!("{sign}{secs}.{frac}s"))
            }
        }
        Err(_) => JsonValue::String(literal),
    }
}
