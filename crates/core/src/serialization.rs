//! URL-safe token codec for JSON values.
//!
//! Query parameters like `filters` and `groups` carry whole JSON structures.
//! They travel as base64-encoded JSON using the URL-safe alphabet without
//! padding, so the resulting token needs no escaping beyond what the HTTP
//! layer already applies to query strings.
//!
//! [`encode_fields`] / [`decode_fields`] additionally handle flat maps whose
//! values mix scalars and composites: composite values (and strings that
//! would collide with the marker) are replaced by `--<token>`, and the `--`
//! prefix is what marks a value as encoded on the way back.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as Base64, Engine as _};
use serde_json::{Map, Value};

/// Prefix marking a map value as a base64-encoded JSON token.
pub const ENCODED_MARKER: &str = "--";

/// Failures while decoding a token back into a JSON value.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The token is not valid URL-safe base64.
    #[error("Invalid base64 token: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes are not a valid JSON document.
    #[error("Decoded token is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a JSON value into a URL-safe token.
pub fn encode(value: &Value) -> String {
    // Serialization of an in-memory Value cannot fail.
    let json = serde_json::to_string(value).unwrap_or_default();
    Base64.encode(json.as_bytes())
}

/// Decode a token produced by [`encode`] back into a JSON value.
pub fn decode(token: &str) -> Result<Value, DecodeError> {
    let bytes = Base64.decode(token.as_bytes())?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Encode the composite values of a flat map.
///
/// Objects and arrays are replaced by a marker-prefixed token. Strings that
/// happen to start with the marker are encoded as well, so that the marker
/// stays an unambiguous signal for [`decode_fields`]. Other scalars pass
/// through unchanged.
pub fn encode_fields(obj: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(obj.len());
    for (key, value) in obj {
        let encoded = match value {
            Value::Object(_) | Value::Array(_) => {
                Value::String(format!("{ENCODED_MARKER}{}", encode(value)))
            }
            Value::String(s) if s.starts_with(ENCODED_MARKER) => {
                Value::String(format!("{ENCODED_MARKER}{}", encode(value)))
            }
            other => other.clone(),
        };
        out.insert(key.clone(), encoded);
    }
    out
}

/// Inverse of [`encode_fields`]: marker-prefixed strings are decoded, all
/// other values pass through unchanged.
pub fn decode_fields(obj: &Map<String, Value>) -> Result<Map<String, Value>, DecodeError> {
    let mut out = Map::with_capacity(obj.len());
    for (key, value) in obj {
        let decoded = match value {
            Value::String(s) if s.starts_with(ENCODED_MARKER) => {
                decode(&s[ENCODED_MARKER.len()..])?
            }
            other => other.clone(),
        };
        out.insert(key.clone(), decoded);
    }
    Ok(out)
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roundtrip(value: Value) {
        let token = encode(&value);
        assert_eq!(decode(&token).unwrap(), value);
    }

    // -- encode / decode --

    #[test]
    fn roundtrips_scalars() {
        roundtrip(json!(null));
        roundtrip(json!(true));
        roundtrip(json!(false));
        roundtrip(json!(0));
        roundtrip(json!(-17));
        roundtrip(json!(3.25));
        roundtrip(json!(""));
        roundtrip(json!("platform"));
    }

    #[test]
    fn roundtrips_unicode_strings() {
        roundtrip(json!("Žurnál ∑ 数据"));
    }

    #[test]
    fn roundtrips_nested_structures() {
        roundtrip(json!({
            "report_type": [5, 7],
            "date": {"start": "2021-01", "end": "2021-12"},
            "nested": [{"a": [1, 2, {"b": null}]}],
        }));
    }

    #[test]
    fn token_is_url_safe() {
        // A payload that produces '+' and '/' under the standard alphabet.
        let token = encode(&json!({"k": "???>>>~~~\u{00ff}\u{00fe}"}));
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(matches!(decode("%%%"), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn decode_rejects_non_json_payload() {
        let token = Base64.encode(b"not json at all");
        assert!(matches!(decode(&token), Err(DecodeError::Json(_))));
    }

    // -- encode_fields / decode_fields --

    #[test]
    fn fields_scalars_pass_through() {
        let obj = json!({"page": 1, "zero_rows": true, "name": "report"});
        let encoded = encode_fields(obj.as_object().unwrap());
        assert_eq!(Value::Object(encoded), obj);
    }

    #[test]
    fn fields_composites_are_marked() {
        let obj = json!({"filters": {"platform": [1, 2]}});
        let encoded = encode_fields(obj.as_object().unwrap());
        let token = encoded["filters"].as_str().unwrap();
        assert!(token.starts_with(ENCODED_MARKER));
        assert_eq!(
            decode(&token[ENCODED_MARKER.len()..]).unwrap(),
            json!({"platform": [1, 2]})
        );
    }

    #[test]
    fn fields_marker_colliding_string_is_escaped() {
        let obj = json!({"note": "--looks like a token"});
        let encoded = encode_fields(obj.as_object().unwrap());
        // The raw value was replaced, not passed through.
        assert_ne!(encoded["note"], obj["note"]);
        let decoded = decode_fields(&encoded).unwrap();
        assert_eq!(Value::Object(decoded), obj);
    }

    #[test]
    fn fields_roundtrip_mixed_object() {
        let obj = json!({
            "scalar": 42,
            "text": "plain",
            "escaped": "--prefixed",
            "list": [1, "two", null],
            "map": {"inner": {"deep": true}},
        });
        let map = obj.as_object().unwrap();
        let decoded = decode_fields(&encode_fields(map)).unwrap();
        assert_eq!(Value::Object(decoded), obj);
    }

    #[test]
    fn decode_fields_passes_unmarked_values_through() {
        let obj = json!({"plain": "text", "n": 7});
        let decoded = decode_fields(obj.as_object().unwrap()).unwrap();
        assert_eq!(Value::Object(decoded), obj);
    }
}
