//! Row values as column-name → value maps.
//!
//! The upsert generator and the call builder read rows through [`RowFields`]. Implement it with
//! `#[derive(RowFields)]`, use a map directly, or project any serde type with
//! [`fields_from_serialize`].

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::value::Value;

/// Column name → value, ordered by name.
pub type FieldMap = BTreeMap<String, Value>;

/// Field access for row-like values.
pub trait RowFields {
    fn field_map(&self) -> FieldMap;
}

impl RowFields for FieldMap {
    fn field_map(&self) -> FieldMap {
        self.clone()
    }
}

impl RowFields for HashMap<String, Value> {
    fn field_map(&self) -> FieldMap {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl RowFields for HashMap<&str, Value> {
    fn field_map(&self) -> FieldMap {
        self.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }
}

impl RowFields for serde_json::Map<String, serde_json::Value> {
    fn field_map(&self) -> FieldMap {
        self.iter()
            .map(|(k, v)| (k.clone(), json_to_value(v.clone())))
            .collect()
    }
}

impl<T: RowFields + ?Sized> RowFields for &T {
    fn field_map(&self) -> FieldMap {
        (**self).field_map()
    }
}

/// Project a serializable struct into a [`FieldMap`] through its serde representation.
///
/// Field names follow serde (`#[serde(rename = "...")]` applies). The value must serialize to a
/// JSON object.
pub fn fields_from_serialize<T: Serialize + ?Sized>(row: &T) -> Result<FieldMap> {
    match serde_json::to_value(row)? {
        serde_json::Value::Object(map) => Ok(map.field_map()),
        other => Err(Error::validation(format!(
            "row must serialize to an object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Map a JSON value onto the closest [`Value`] kind.
///
/// Arrays of only strings or only integers become native arrays; other arrays and objects stay
/// JSON.
pub(crate) fn json_to_value(v: serde_json::Value) -> Value {
    use serde_json::Value as J;
    match v {
        J::Null => Value::Null,
        J::Bool(b) => Value::Bool(b),
        J::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or(Value::Json(J::Number(n)), Value::Float),
        },
        J::String(s) => Value::Text(s),
        J::Array(items) => {
            if items.iter().all(J::is_string) {
                Value::TextArray(
                    items
                        .into_iter()
                        .filter_map(|i| match i {
                            J::String(s) => Some(s),
                            _ => None,
                        })
                        .collect(),
                )
            } else if items.iter().all(J::is_i64) {
                Value::IntArray(items.iter().filter_map(J::as_i64).collect())
            } else {
                Value::Json(J::Array(items))
            }
        }
        obj @ J::Object(_) => Value::Json(obj),
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Ad {
        id: i64,
        #[serde(rename = "pdf_url")]
        pdf: String,
        tags: Vec<String>,
        owner: Option<i32>,
    }

    #[test]
    fn test_serialize_projection_honors_renames() {
        let ad = Ad {
            id: 4,
            pdf: "a.pdf".into(),
            tags: vec!["x".into()],
            owner: None,
        };
        let map = fields_from_serialize(&ad).unwrap();

        assert_eq!(map.get("id"), Some(&Value::Int(4)));
        assert_eq!(map.get("pdf_url"), Some(&Value::from("a.pdf")));
        assert_eq!(map.get("tags"), Some(&Value::TextArray(vec!["x".into()])));
        assert_eq!(map.get("owner"), Some(&Value::Null));
        assert!(!map.contains_key("pdf"));
    }

    #[test]
    fn test_non_object_rows_are_rejected() {
        let err = fields_from_serialize(&vec![1, 2]).unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_json_arrays_map_to_native_arrays_when_uniform() {
        assert_eq!(
            json_to_value(json!([1, 2])),
            Value::IntArray(vec![1, 2])
        );
        assert_eq!(
            json_to_value(json!(["a"])),
            Value::TextArray(vec!["a".into()])
        );
        assert_eq!(
            json_to_value(json!([1, "a"])),
            Value::Json(json!([1, "a"]))
        );
        assert_eq!(json_to_value(json!(1.5)), Value::Float(1.5));
    }

    #[test]
    fn test_maps_implement_row_fields() {
        let mut by_str: HashMap<&str, Value> = HashMap::new();
        by_str.insert("b", Value::from(2));
        by_str.insert("a", Value::from(1));

        let keys: Vec<String> = by_str.field_map().into_keys().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        let obj = json!({"n": 1});
        let map = obj.as_object().unwrap().field_map();
        assert_eq!(map.get("n"), Some(&Value::Int(1)));
    }
}
