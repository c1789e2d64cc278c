//! Lossless JSON form exchanged with the module host.
//!
//! Values JSON cannot express are wrapped in objects carrying a `$kiln` tag:
//!
//! ```text
//! undefined        {"$kiln":"undefined"}
//! NaN, -0, ±Inf    {"$kiln":"number","v":"NaN"}
//! 10n              {"$kiln":"bigint","v":"10"}
//! new Date(0)      {"$kiln":"date","v":0}
//! /a/g             {"$kiln":"regexp","source":"a","flags":"g"}
//! new Map([[k,v]]) {"$kiln":"map","v":[[k,v]]}
//! new Set([x])     {"$kiln":"set","v":[x]}
//! {"$kiln":1}      {"$kiln":"object","v":{"$kiln":1}}
//! ```

use serde_json::{Map, Number, Value as Json, json};
use thiserror::Error;

use super::{MAX_SAFE, Value};

const TAG: &str = "$kiln";

/// Malformed tagged payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tagged payload: {0}")]
pub struct TaggedError(String);

/// Encode a value for the module host.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn to_tagged(value: &Value) -> Json {
    match value {
        Value::Undefined => json!({ TAG: "undefined" }),
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => {
            if n.is_nan() || n.is_infinite() || (*n == 0.0 && n.is_sign_negative()) {
                json!({ TAG: "number", "v": super::format_number(*n) })
            } else if n.fract() == 0.0 && n.abs() <= MAX_SAFE as f64 {
                Json::from(*n as i64)
            } else {
                Number::from_f64(*n).map_or(Json::Null, Json::Number)
            }
        }
        Value::BigInt(digits) => json!({ TAG: "bigint", "v": digits }),
        Value::String(s) => Json::String(s.clone()),
        Value::Date(ms) => {
            let v = Number::from_f64(*ms).map_or(Json::Null, Json::Number);
            json!({ TAG: "date", "v": v })
        }
        Value::RegExp { source, flags } => {
            json!({ TAG: "regexp", "source": source, "flags": flags })
        }
        Value::Array(items) => Json::Array(items.iter().map(to_tagged).collect()),
        Value::Object(entries) => {
            let map: Map<String, Json> = entries
                .iter()
                .map(|(k, v)| (k.clone(), to_tagged(v)))
                .collect();
            if map.contains_key(TAG) {
                json!({ TAG: "object", "v": map })
            } else {
                Json::Object(map)
            }
        }
        Value::Map(entries) => {
            let pairs: Vec<Json> = entries
                .iter()
                .map(|(k, v)| Json::Array(vec![to_tagged(k), to_tagged(v)]))
                .collect();
            json!({ TAG: "map", "v": pairs })
        }
        Value::Set(items) => {
            let items: Vec<Json> = items.iter().map(to_tagged).collect();
            json!({ TAG: "set", "v": items })
        }
    }
}

/// Decode a value produced by the module host.
pub fn from_tagged(json: Json) -> Result<Value, TaggedError> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(b)),
        Json::Number(n) => Ok(Value::Number(n.as_f64().unwrap_or(f64::NAN))),
        Json::String(s) => Ok(Value::String(s)),
        Json::Array(items) => items
            .into_iter()
            .map(from_tagged)
            .collect::<Result<_, _>>()
            .map(Value::Array),
        Json::Object(mut map) => match map.remove(TAG) {
            None => decode_object(map),
            Some(Json::String(tag)) => decode_tagged(&tag, map),
            Some(other) => Err(TaggedError(format!("tag must be a string, got {other}"))),
        },
    }
}

fn decode_object(map: Map<String, Json>) -> Result<Value, TaggedError> {
    map.into_iter()
        .map(|(k, v)| from_tagged(v).map(|v| (k, v)))
        .collect::<Result<_, _>>()
        .map(Value::Object)
}

fn decode_tagged(tag: &str, mut map: Map<String, Json>) -> Result<Value, TaggedError> {
    let mut take = |key: &str| {
        map.remove(key)
            .ok_or_else(|| TaggedError(format!("`{tag}` is missing `{key}`")))
    };

    match tag {
        "undefined" => Ok(Value::Undefined),
        "number" => match take("v")?.as_str() {
            Some("NaN") => Ok(Value::Number(f64::NAN)),
            Some("Infinity") => Ok(Value::Number(f64::INFINITY)),
            Some("-Infinity") => Ok(Value::Number(f64::NEG_INFINITY)),
            Some("-0") => Ok(Value::Number(-0.0)),
            other => Err(TaggedError(format!("unknown number {other:?}"))),
        },
        "bigint" => match take("v")? {
            Json::String(digits) => Ok(Value::BigInt(digits)),
            other => Err(TaggedError(format!("bigint must be a string, got {other}"))),
        },
        "date" => match take("v")? {
            Json::Null => Ok(Value::Date(f64::NAN)),
            Json::Number(n) => Ok(Value::Date(n.as_f64().unwrap_or(f64::NAN))),
            other => Err(TaggedError(format!("date must be a number, got {other}"))),
        },
        "regexp" => {
            let source = take("source")?;
            let flags = take("flags")?;
            match (source, flags) {
                (Json::String(source), Json::String(flags)) => Ok(Value::RegExp { source, flags }),
                _ => Err(TaggedError("regexp source and flags must be strings".into())),
            }
        }
        "map" => {
            let Json::Array(pairs) = take("v")? else {
                return Err(TaggedError("map entries must be an array".into()));
            };
            pairs
                .into_iter()
                .map(|pair| match pair {
                    Json::Array(kv) if kv.len() == 2 => {
                        let mut kv = kv.into_iter();
                        let k = from_tagged(kv.next().unwrap_or(Json::Null))?;
                        let v = from_tagged(kv.next().unwrap_or(Json::Null))?;
                        Ok((k, v))
                    }
                    _ => Err(TaggedError("map entry must be a [key, value] pair".into())),
                })
                .collect::<Result<_, _>>()
                .map(Value::Map)
        }
        "set" => match take("v")? {
            Json::Array(items) => items
                .into_iter()
                .map(from_tagged)
                .collect::<Result<_, _>>()
                .map(Value::Set),
            _ => Err(TaggedError("set items must be an array".into())),
        },
        "object" => match take("v")? {
            Json::Object(inner) => decode_object(inner),
            _ => Err(TaggedError("escaped object must be an object".into())),
        },
        other => Err(TaggedError(format!("unknown tag `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_passes_through() {
        let v = from_tagged(json!({"title": "X", "tags": ["a"]})).unwrap();
        assert_eq!(
            v,
            Value::object([
                ("title", Value::from("X")),
                ("tags", Value::Array(vec![Value::from("a")])),
            ])
        );
    }

    #[test]
    fn test_decode_tags() {
        let v = from_tagged(json!([
            {"$kiln": "undefined"},
            {"$kiln": "bigint", "v": "900719925474099312"},
            {"$kiln": "date", "v": 86400000},
            {"$kiln": "map", "v": [["a", 1]]},
            {"$kiln": "set", "v": [{"$kiln": "number", "v": "-Infinity"}]},
        ]))
        .unwrap();
        assert_eq!(
            v,
            Value::Array(vec![
                Value::Undefined,
                Value::BigInt("900719925474099312".into()),
                Value::Date(86_400_000.0),
                Value::Map(vec![(Value::from("a"), Value::Number(1.0))]),
                Value::Set(vec![Value::Number(f64::NEG_INFINITY)]),
            ])
        );
    }

    #[test]
    fn test_user_tag_key_escaped() {
        let original = Value::object([("$kiln", Value::from("mine"))]);
        let encoded = to_tagged(&original);
        assert_eq!(encoded, json!({"$kiln": "object", "v": {"$kiln": "mine"}}));
        assert_eq!(from_tagged(encoded).unwrap(), original);
    }

    #[test]
    fn test_nan_survives() {
        let encoded = to_tagged(&Value::Number(f64::NAN));
        match from_tagged(encoded).unwrap() {
            Value::Number(n) => assert!(n.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_errors() {
        assert!(from_tagged(json!({"$kiln": "nope"})).is_err());
        assert!(from_tagged(json!({"$kiln": "map", "v": [[1]]})).is_err());
        assert!(from_tagged(json!({"$kiln": 3})).is_err());
    }
}
