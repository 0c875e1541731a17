// Lenient field parsers for form-driven clients: ids may arrive as numbers
// or strings, and an unselected dropdown arrives as "".
use serde::{de::Error as _, Deserialize, Deserializer};

use crate::models::product::ProductSize;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

fn parse_id<E: serde::de::Error>(raw: RawId) -> Result<Option<i64>, E> {
    match raw {
        RawId::Int(id) => Ok(Some(id)),
        RawId::Text(s) if s.trim().is_empty() => Ok(None),
        RawId::Text(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| E::custom(format!("invalid id '{s}'"))),
    }
}

/// `null`, absent and `""` all mean "no reference".
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawId>::deserialize(deserializer)? {
        Some(raw) => parse_id(raw),
        None => Ok(None),
    }
}

pub fn id_list<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<RawId>::deserialize(deserializer)?
        .into_iter()
        .map(|raw| parse_id(raw)?.ok_or_else(|| D::Error::custom("empty id in list")))
        .collect()
}

pub fn optional_size<'de, D>(deserializer: D) -> Result<Option<ProductSize>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse().map(Some).map_err(D::Error::custom),
        None => Ok(None),
    }
}

/// Query-string values: an empty parameter is the same as a missing one.
pub fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "optional_id")]
        id: Option<i64>,
        #[serde(default, deserialize_with = "optional_size")]
        size: Option<ProductSize>,
    }

    #[derive(Debug, Deserialize)]
    struct ListProbe {
        #[serde(deserialize_with = "id_list")]
        ids: Vec<i64>,
    }

    fn probe(value: serde_json::Value) -> Result<Probe, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn ids_accept_numbers_and_numeric_strings() {
        assert_eq!(probe(json!({ "id": 4 })).unwrap().id, Some(4));
        assert_eq!(probe(json!({ "id": " 12 " })).unwrap().id, Some(12));
    }

    #[test]
    fn empty_and_null_ids_are_absent() {
        assert_eq!(probe(json!({ "id": "" })).unwrap().id, None);
        assert_eq!(probe(json!({ "id": null })).unwrap().id, None);
        assert_eq!(probe(json!({})).unwrap().id, None);
    }

    #[test]
    fn garbage_ids_are_rejected() {
        assert!(probe(json!({ "id": "abc" })).is_err());
    }

    #[test]
    fn sizes_parse_from_uppercase_names() {
        assert_eq!(probe(json!({ "size": "MEDIUM" })).unwrap().size, Some(ProductSize::Medium));
        assert_eq!(probe(json!({ "size": "" })).unwrap().size, None);
        assert!(probe(json!({ "size": "HUGE" })).is_err());
    }

    #[test]
    fn id_lists_reject_blank_entries() {
        let list: ListProbe = serde_json::from_value(json!({ "ids": [1, "2"] })).unwrap();
        assert_eq!(list.ids, vec![1, 2]);
        assert!(serde_json::from_value::<ListProbe>(json!({ "ids": [1, ""] })).is_err());
    }

    #[test]
    fn blank_query_values_are_dropped() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" pen ".into())), Some("pen".into()));
    }
}
