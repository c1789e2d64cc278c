//! Plain JSON form, following `JSON.stringify` semantics.
//!
//! - `undefined` properties are omitted, `undefined` array items become `null`
//! - non-finite numbers become `null`
//! - dates become ISO strings, invalid dates `null`
//! - big integers become decimal strings
//! - regular expressions, maps and sets become `{}`

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use super::{MAX_SAFE, Value};
use crate::utils::date::DateTimeUtc;

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Undefined | Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => serialize_number(*n, serializer),
            Self::BigInt(digits) => serializer.serialize_str(digits),
            Self::String(s) => serializer.serialize_str(s),
            Self::Date(ms) => match DateTimeUtc::from_millis(*ms) {
                Some(dt) => serializer.serialize_str(&dt.to_iso_string()),
                None => serializer.serialize_unit(),
            },
            Self::RegExp { .. } | Self::Map(_) | Self::Set(_) => {
                serializer.serialize_map(Some(0))?.end()
            }
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(entries) => {
                let mut map = serializer.serialize_map(None)?;
                for (key, value) in entries.iter().filter(|(_, v)| !v.is_undefined()) {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn serialize_number<S: Serializer>(n: f64, serializer: S) -> Result<S::Ok, S::Error> {
    if !n.is_finite() {
        serializer.serialize_unit()
    } else if n.fract() == 0.0 && n.abs() <= MAX_SAFE as f64 {
        // `-0` stringifies as `0`
        serializer.serialize_i64(n as i64)
    } else {
        serializer.serialize_f64(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(v: &Value) -> String {
        serde_json::to_string(v).unwrap()
    }

    #[test]
    fn test_plain_object() {
        let v = Value::object([("title", Value::from("X"))]);
        assert_eq!(json(&v), r#"{"title":"X"}"#);
    }

    #[test]
    fn test_undefined_rules() {
        let v = Value::object([
            ("a", Value::Undefined),
            ("b", Value::Array(vec![Value::Undefined, Value::Number(1.0)])),
        ]);
        assert_eq!(json(&v), r#"{"b":[null,1]}"#);
    }

    #[test]
    fn test_special_numbers() {
        let v = Value::Array(vec![
            Value::Number(f64::NAN),
            Value::Number(f64::INFINITY),
            Value::Number(-0.0),
            Value::Number(2.5),
        ]);
        assert_eq!(json(&v), "[null,null,0,2.5]");
    }

    #[test]
    fn test_rich_types() {
        let v = Value::Array(vec![
            Value::Date(0.0),
            Value::Date(f64::NAN),
            Value::BigInt("123".into()),
            Value::Set(vec![Value::Null]),
            Value::RegExp {
                source: "a+".into(),
                flags: "g".into(),
            },
        ]);
        assert_eq!(
            json(&v),
            r#"["1970-01-01T00:00:00.000Z",null,"123",{},{}]"#
        );
    }
}
