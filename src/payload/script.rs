//! JS literal form for the document's state script.
//!
//! The output is an expression that evaluates to an equal value in the
//! browser and is safe to place inside `<script>`: `<`, `>`, `/`, U+2028
//! and U+2029 are escaped in every string.

use super::{Value, format_number};

/// Serialize a value as a JS expression.
pub fn to_js_literal(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Undefined => out.push_str("undefined"),
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(out, *n),
        Value::BigInt(digits) => write_bigint(out, digits),
        Value::String(s) => write_string(out, s),
        Value::Date(ms) => {
            out.push_str("new Date(");
            write_number(out, *ms);
            out.push(')');
        }
        Value::RegExp { source, flags } => {
            out.push_str("new RegExp(");
            write_string(out, source);
            out.push(',');
            write_string(out, flags);
            out.push(')');
        }
        Value::Array(items) => {
            out.push('[');
            write_list(out, items);
            out.push(']');
        }
        Value::Object(entries) => {
            out.push('{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // A literal `__proto__` key would set the prototype instead
                if key == "__proto__" {
                    out.push('[');
                    write_string(out, key);
                    out.push(']');
                } else {
                    write_string(out, key);
                }
                out.push(':');
                write_value(out, value);
            }
            out.push('}');
        }
        Value::Map(entries) => {
            out.push_str("new Map([");
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('[');
                write_value(out, key);
                out.push(',');
                write_value(out, value);
                out.push(']');
            }
            out.push_str("])");
        }
        Value::Set(items) => {
            out.push_str("new Set([");
            write_list(out, items);
            out.push_str("])");
        }
    }
}

fn write_list(out: &mut String, items: &[Value]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_value(out, item);
    }
}

fn write_number(out: &mut String, n: f64) {
    let text = format_number(n);
    // Parenthesize negatives so `-0` and `-1` survive any surrounding operator
    if text.starts_with('-') {
        out.push('(');
        out.push_str(&text);
        out.push(')');
    } else {
        out.push_str(&text);
    }
}

fn write_bigint(out: &mut String, digits: &str) {
    let unsigned = digits.strip_prefix('-').unwrap_or(digits);
    if !unsigned.is_empty() && unsigned.bytes().all(|b| b.is_ascii_digit()) {
        out.push_str(digits);
        out.push('n');
    } else {
        out.push_str("BigInt(");
        write_string(out, digits);
        out.push(')');
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '/' => out.push_str("\\u002F"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives() {
        assert_eq!(to_js_literal(&Value::Undefined), "undefined");
        assert_eq!(to_js_literal(&Value::Number(f64::NAN)), "NaN");
        assert_eq!(to_js_literal(&Value::Number(-0.0)), "(-0)");
        assert_eq!(to_js_literal(&Value::Number(3.0)), "3");
        assert_eq!(to_js_literal(&Value::BigInt("-12".into())), "-12n");
    }

    #[test]
    fn test_script_breakout_escaped() {
        let v = Value::from("</script><script>alert(1)</script>\u{2028}");
        let lit = to_js_literal(&v);
        assert!(!lit.contains('<'));
        assert!(!lit.contains('>'));
        assert!(!lit.contains("</"));
        assert!(!lit.contains('\u{2028}'));
        assert!(lit.contains("\\u003C\\u002Fscript\\u003E"));
    }

    #[test]
    fn test_rich_values() {
        let v = Value::object([
            ("at", Value::Date(0.0)),
            ("re", Value::RegExp { source: "a/b".into(), flags: "gi".into() }),
            ("m", Value::Map(vec![(Value::from("k"), Value::Set(vec![Value::Number(1.0)]))])),
        ]);
        assert_eq!(
            to_js_literal(&v),
            r#"{"at":new Date(0),"re":new RegExp("a\u002Fb","gi"),"m":new Map([["k",new Set([1])]])}"#
        );
    }

    #[test]
    fn test_proto_key() {
        let v = Value::object([("__proto__", Value::Null)]);
        assert_eq!(to_js_literal(&v), r#"{["__proto__"]:null}"#);
    }

    #[test]
    fn test_control_chars() {
        assert_eq!(to_js_literal(&Value::from("a\u{1}b\n")), r#""a\u0001b\n""#);
    }
}
