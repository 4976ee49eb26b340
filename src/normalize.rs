// Body normalization for response comparison
// Canonicalizes JSON bodies (sorted keys, compact form) and collapses
// whitespace in text/HTML bodies so incidental formatting never counts
// as a difference.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Number, Value};

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
    static ref INTER_TAG_SPACE: Regex = Regex::new(r">\s+<").unwrap();
}

/// Normalize a raw response body into its canonical comparable form.
///
/// Absent and empty bodies both normalize to the empty string. Bodies
/// that parse as JSON are re-serialized with every object's keys sorted;
/// anything else is treated as text.
pub fn normalize(body: Option<&str>) -> String {
    let body = match body {
        Some(b) if !b.is_empty() => b,
        _ => return String::new(),
    };

    match serde_json::from_str::<Value>(body) {
        Ok(json) => canonical_json(&json),
        Err(_) => normalize_text(body),
    }
}

/// Compact serialization of a JSON value with recursively sorted keys
pub fn canonical_json(value: &Value) -> String {
    sort_keys(value).to_string()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(obj) => {
            let mut entries: Vec<(&String, &Value)> = obj.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), sort_keys(v));
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        Value::Number(n) => Value::Number(integral_number(n)),
        other => other.clone(),
    }
}

/// `1.0` and `1` are the same number; write integral floats as integers
fn integral_number(n: &Number) -> Number {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_EXACT => Number::from(f as i64),
        _ => n.clone(),
    }
}

/// Collapse whitespace runs, drop whitespace between tags, then trim
pub fn normalize_text(body: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(body, " ");
    let tight = INTER_TAG_SPACE.replace_all(&collapsed, "><");
    tight.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_and_empty_bodies_are_empty() {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some("")), "");
    }

    #[test]
    fn whitespace_only_body_is_empty() {
        assert_eq!(normalize(Some("  \n\t ")), "");
    }

    #[test]
    fn json_keys_are_sorted_recursively() {
        let body = r#"{"b": 1, "a": {"z": true, "y": [ {"d": 1, "c": 2} ]}}"#;
        assert_eq!(
            normalize(Some(body)),
            r#"{"a":{"y":[{"c":2,"d":1}],"z":true},"b":1}"#
        );
    }

    #[test]
    fn json_arrays_keep_element_order() {
        assert_eq!(normalize(Some("[3, 1, 2]")), "[3,1,2]");
    }

    #[test]
    fn json_primitives_pass_through() {
        assert_eq!(normalize(Some("42")), "42");
        assert_eq!(normalize(Some("\"hello  world\"")), "\"hello  world\"");
        assert_eq!(normalize(Some("null")), "null");
    }

    #[test]
    fn integral_floats_match_integers() {
        assert_eq!(normalize(Some(r#"{"a":1.0,"b":[2.00,-0.0]}"#)), r#"{"a":1,"b":[2,0]}"#);
        assert_eq!(normalize(Some(r#"{"a":1.0}"#)), normalize(Some(r#"{"a":1}"#)));
        assert_eq!(normalize(Some(r#"{"a":1.5}"#)), r#"{"a":1.5}"#);
    }

    #[test]
    fn text_whitespace_is_collapsed() {
        assert_eq!(normalize(Some("  hello \n\n  world\t")), "hello world");
    }

    #[test]
    fn whitespace_between_tags_is_removed() {
        let html = "<html>\n  <body>\n    <p>Hi  there</p>\n  </body>\n</html>\n";
        assert_eq!(normalize(Some(html)), "<html><body><p>Hi there</p></body></html>");
    }

    #[test]
    fn malformed_json_falls_back_to_text() {
        assert_eq!(normalize(Some("{\"a\": 1,   ")), "{\"a\": 1,");
    }

    #[test]
    fn canonical_json_is_stable_under_renormalization() {
        let v = json!({"name": "x", "id": 1, "tags": ["b", "a"], "nested": {"k": null}});
        let once = normalize(Some(&v.to_string()));
        let twice = normalize(Some(&once));
        assert_eq!(once, twice);
    }
}
