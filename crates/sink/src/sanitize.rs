//! Document cleanup before indexing.
//!
//! The store mishandles `null` values and literal tabs inside rule-language
//! text, so every document goes through [`sanitize`] on its way out.
//! The function is pure and total: it never fails and never touches its input.

use serde_json::{Map, Value};

/// Fields that may hold embedded rule-language text (Sigma, YARA, Nuclei).
pub const RULE_TEXT_FIELDS: [&str; 3] = ["sigma_rules", "yara_rules", "nuclei_rules"];

/// Tabs in rule text are replaced by this many spaces.
const TAB_REPLACEMENT: &str = "    ";

/// Returns a cleaned copy of `document`.
///
/// Per key/value pair, recursively:
/// - `null` becomes `""`
/// - objects are sanitized recursively
/// - arrays: object elements are sanitized, other elements are kept as-is
/// - strings under a [`RULE_TEXT_FIELDS`] key get tabs replaced by four spaces
/// - everything else is kept as-is
pub fn sanitize(document: &Map<String, Value>) -> Map<String, Value> {
    document
        .iter()
        .map(|(key, value)| (key.clone(), sanitize_field(key, value)))
        .collect()
}

/// Sanitizes an arbitrary JSON value: objects go through [`sanitize`],
/// anything else is returned unchanged.
pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize(map)),
        other => other.clone(),
    }
}

fn sanitize_field(key: &str, value: &Value) -> Value {
    match value {
        Value::Null => Value::String(String::new()),
        Value::Object(map) => Value::Object(sanitize(map)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => Value::Object(sanitize(map)),
                    other => other.clone(),
                })
                .collect(),
        ),
        Value::String(text) if RULE_TEXT_FIELDS.contains(&key) => {
            Value::String(text.replace('\t', TAB_REPLACEMENT))
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn null_becomes_empty_string() {
        let cleaned = sanitize(&object(json!({"host": null, "port": 443})));
        assert_eq!(cleaned["host"], "");
        assert_eq!(cleaned["port"], 443);
    }

    #[test]
    fn nested_objects_are_cleaned() {
        let cleaned = sanitize(&object(json!({
            "info": {"name": "x", "reference": null, "meta": {"cvss": null}}
        })));
        assert_eq!(cleaned["info"]["reference"], "");
        assert_eq!(cleaned["info"]["meta"]["cvss"], "");
        assert_eq!(cleaned["info"]["name"], "x");
    }

    #[test]
    fn array_objects_cleaned_other_elements_kept() {
        let cleaned = sanitize(&object(json!({
            "items": [{"a": null}, null, 3, "t\tt", [null]]
        })));
        assert_eq!(cleaned["items"], json!([{"a": ""}, null, 3, "t\tt", [null]]));
    }

    #[test]
    fn rule_text_tabs_replaced() {
        let cleaned = sanitize(&object(json!({
            "nuclei_rules": "id: x\n\tinfo:\n\t\tname: y",
            "yara_rules": "rule a {\tcondition: true }",
            "description": "keep\ttabs"
        })));
        assert_eq!(cleaned["nuclei_rules"], "id: x\n    info:\n        name: y");
        assert_eq!(cleaned["yara_rules"], "rule a {    condition: true }");
        assert_eq!(cleaned["description"], "keep\ttabs");
    }

    #[test]
    fn rule_text_field_with_non_string_is_kept() {
        let cleaned = sanitize(&object(json!({"sigma_rules": ["a\tb"]})));
        assert_eq!(cleaned["sigma_rules"], json!(["a\tb"]));
    }

    #[test]
    fn input_is_not_modified() {
        let original = object(json!({"a": null}));
        let _ = sanitize(&original);
        assert!(original["a"].is_null());
    }

    #[test]
    fn sanitize_value_passes_scalars_through() {
        assert_eq!(sanitize_value(&json!(null)), json!(null));
        assert_eq!(sanitize_value(&json!("x")), json!("x"));
        assert_eq!(sanitize_value(&json!({"x": null})), json!({"x": ""}));
    }

    #[test]
    fn key_order_is_preserved() {
        let cleaned = sanitize(&object(json!({"z": 1, "a": null, "m": 2})));
        let keys: Vec<&str> = cleaned.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }
}
