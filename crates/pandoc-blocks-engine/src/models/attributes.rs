use serde::{Deserialize, Deserializer, Serialize, Serializer, ser::SerializeMap};
use serde_json::Value;

use crate::ast::Attr;

/// Attribute set carried by heading and semantic blocks
///
/// Mirrors Pandoc's `{#id .class key="value"}` syntax. Keyvals keep their
/// insertion order so reconstruction emits them as they were written.
///
/// Deserialization is forgiving: keyvals may arrive as a JSON object or a
/// list of `[key, value]` pairs, and non-string values are coerced to text
/// rather than rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::id"
    )]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::classes")]
    pub classes: Vec<String>,
    #[serde(
        default,
        serialize_with = "keyvals_as_map",
        deserialize_with = "lenient::keyvals"
    )]
    pub keyvals: Vec<(String, String)>,
}

impl Attributes {
    /// Build from a Pandoc attribute triple; an empty id becomes `None`
    pub fn from_ast(attr: &Attr) -> Self {
        Self {
            id: (!attr.id.is_empty()).then(|| attr.id.clone()),
            classes: attr.classes.clone(),
            keyvals: attr.keyvals.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.as_deref().is_none_or(str::is_empty)
            && self.classes.is_empty()
            && self.keyvals.is_empty()
    }

    pub fn keyval(&self, key: &str) -> Option<&str> {
        self.keyvals
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a keyval, replacing an existing entry in place
    pub fn set_keyval(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.keyvals.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.keyvals.push((key, value)),
        }
    }
}

fn keyvals_as_map<S: Serializer>(keyvals: &[(String, String)], s: S) -> Result<S::Ok, S::Error> {
    let mut map = s.serialize_map(Some(keyvals.len()))?;
    for (key, value) in keyvals {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

mod lenient {
    use super::*;

    /// Best-effort string rendering of an arbitrary JSON value
    pub(super) fn coerce(value: Value) -> String {
        match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub(super) fn id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => None,
            other => Some(coerce(other)).filter(|s| !s.is_empty()),
        })
    }

    pub(super) fn classes<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .map(coerce)
                .filter(|c| !c.is_empty())
                .collect(),
            Value::String(s) => s.split_whitespace().map(str::to_string).collect(),
            _ => Vec::new(),
        })
    }

    pub(super) fn keyvals<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Vec<(String, String)>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Object(map) => map.into_iter().map(|(k, v)| (k, coerce(v))).collect(),
            Value::Array(items) => items.into_iter().filter_map(pair).collect(),
            _ => Vec::new(),
        })
    }

    fn pair(item: Value) -> Option<(String, String)> {
        let Value::Array(mut parts) = item else {
            return None;
        };
        if parts.len() != 2 {
            return None;
        }
        let value = parts.pop().map(coerce)?;
        match parts.pop()? {
            Value::String(key) => Some((key, value)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_ast_empty_id_is_none() {
        let attr = Attr {
            id: String::new(),
            classes: vec!["theorem".to_string()],
            keyvals: vec![("title".to_string(), "Main".to_string())],
        };
        let attributes = Attributes::from_ast(&attr);

        assert_eq!(attributes.id, None);
        assert_eq!(attributes.classes, vec!["theorem"]);
        assert_eq!(attributes.keyval("title"), Some("Main"));
    }

    #[test]
    fn test_set_keyval_replaces_in_place() {
        let mut attributes = Attributes::default();
        attributes.set_keyval("a", "1");
        attributes.set_keyval("b", "2");
        attributes.set_keyval("a", "3");

        assert_eq!(
            attributes.keyvals,
            vec![
                ("a".to_string(), "3".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_is_empty_ignores_empty_id() {
        let attributes = Attributes {
            id: Some(String::new()),
            ..Attributes::default()
        };
        assert!(attributes.is_empty());
    }

    #[test]
    fn test_serializes_keyvals_as_ordered_map() {
        let mut attributes = Attributes {
            id: Some("box".to_string()),
            classes: vec!["theorem".to_string()],
            keyvals: vec![],
        };
        attributes.set_keyval("zeta", "1");
        attributes.set_keyval("alpha", "2");

        let json = serde_json::to_string(&attributes).unwrap();
        assert_eq!(
            json,
            r#"{"id":"box","classes":["theorem"],"keyvals":{"zeta":"1","alpha":"2"}}"#
        );
    }

    #[test]
    fn test_deserialize_coerces_non_string_values() {
        let value = json!({
            "id": 42,
            "classes": ["a", 7, null],
            "keyvals": {"count": 3, "flag": true, "none": null, "nested": {"x": 1}}
        });
        let attributes: Attributes = serde_json::from_value(value).unwrap();

        assert_eq!(attributes.id.as_deref(), Some("42"));
        assert_eq!(attributes.classes, vec!["a", "7"]);
        assert_eq!(attributes.keyval("count"), Some("3"));
        assert_eq!(attributes.keyval("flag"), Some("true"));
        assert_eq!(attributes.keyval("none"), Some(""));
        assert_eq!(attributes.keyval("nested"), Some(r#"{"x":1}"#));
    }

    #[test]
    fn test_deserialize_accepts_pair_list_and_skips_malformed() {
        let value = json!({
            "keyvals": [["k", "v"], ["n", 1], "junk", [1, "x"], ["only-key"]]
        });
        let attributes: Attributes = serde_json::from_value(value).unwrap();

        assert_eq!(
            attributes.keyvals,
            vec![
                ("k".to_string(), "v".to_string()),
                ("n".to_string(), "1".to_string())
            ]
        );
    }

    #[test]
    fn test_deserialize_missing_fields_defaults() {
        let attributes: Attributes = serde_json::from_value(json!({})).unwrap();
        assert!(attributes.is_empty());
    }

    #[test]
    fn test_deserialize_class_string_splits_on_whitespace() {
        let attributes: Attributes =
            serde_json::from_value(json!({"classes": "theorem  note"})).unwrap();
        assert_eq!(attributes.classes, vec!["theorem", "note"]);
    }
}
