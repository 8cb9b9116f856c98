// src/models/session.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub const GENERAL_SCOPE: &str = "general";
pub const LOT_SCOPE_PREFIX: &str = "lot_";

/// Highest array slot (and lot number) a key may address.
pub const MAX_ARRAY_INDEX: usize = 999;

/// Namespace a lot-scoped section lives in.
///
/// Sections that are not lot-scoped always use `Global` (bare keys).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormScope {
    Global,
    General,
    Lot(usize),
}

impl FormScope {
    pub fn from_segment(segment: &str) -> Option<Self> {
        if segment == GENERAL_SCOPE {
            return Some(FormScope::General);
        }
        let index = segment.strip_prefix(LOT_SCOPE_PREFIX)?;
        // "lot_01" would alias "lot_1"
        if index.len() > 1 && index.starts_with('0') {
            return None;
        }
        index
            .parse()
            .ok()
            .filter(|i| *i <= MAX_ARRAY_INDEX)
            .map(FormScope::Lot)
    }

    pub fn prefix(&self) -> Option<String> {
        match self {
            FormScope::Global => None,
            FormScope::General => Some(GENERAL_SCOPE.to_string()),
            FormScope::Lot(index) => Some(format!("{}{}", LOT_SCOPE_PREFIX, index)),
        }
    }

    /// Prefixes `path` with this scope.
    pub fn key(&self, path: &str) -> String {
        match self.prefix() {
            Some(prefix) => join_key(&prefix, path),
            None => path.to_string(),
        }
    }

    pub fn lot_index(&self) -> Option<usize> {
        match self {
            FormScope::Lot(index) => Some(*index),
            _ => None,
        }
    }
}

impl fmt::Display for FormScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix() {
            Some(prefix) => f.write_str(&prefix),
            None => f.write_str("global"),
        }
    }
}

pub fn join_key(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

/// Flat working copy of the form: dotted keys to widget values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct SessionFieldMap(BTreeMap<String, Value>);

impl SessionFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        self.0.retain(|k, v| keep(k, v));
    }

    /// Keys equal to `prefix` or below it (`prefix.*`).
    pub fn keys_under(&self, prefix: &str) -> Vec<String> {
        let nested = format!("{}.", prefix);
        self.0
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(k, _)| k.as_str() == prefix || k.starts_with(&nested))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Removes `prefix` and everything below it; returns how many keys went.
    pub fn remove_under(&mut self, prefix: &str) -> usize {
        let keys = self.keys_under(prefix);
        for key in &keys {
            self.0.remove(key);
        }
        keys.len()
    }

    /// Number of array slots stored below `prefix` (highest index + 1).
    /// Slots above `MAX_ARRAY_INDEX` are not counted.
    pub fn array_len(&self, prefix: &str) -> usize {
        let nested = format!("{}.", prefix);
        self.0
            .range(nested.clone()..)
            .take_while(|(k, _)| k.starts_with(&nested))
            .filter_map(|(k, _)| {
                k[nested.len()..]
                    .split('.')
                    .next()
                    .and_then(|segment| segment.parse::<usize>().ok())
            })
            .filter(|index| *index <= MAX_ARRAY_INDEX)
            .map(|index| index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Moves every key below `from` to the same relative key below `to`.
    pub fn rename_prefix(&mut self, from: &str, to: &str) {
        for key in self.keys_under(from) {
            if let Some(value) = self.0.remove(&key) {
                let new_key = format!("{}{}", to, &key[from.len()..]);
                self.0.insert(new_key, value);
            }
        }
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl From<BTreeMap<String, Value>> for SessionFieldMap {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for SessionFieldMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Reads a value that may be stored as a number or a numeric string.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

/// Empty values count as "not filled in".
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(entries: &[(&str, Value)]) -> SessionFieldMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn scope_segments() {
        assert_eq!(FormScope::from_segment("general"), Some(FormScope::General));
        assert_eq!(FormScope::from_segment("lot_12"), Some(FormScope::Lot(12)));
        assert_eq!(FormScope::from_segment("lot_01"), None);
        assert_eq!(FormScope::from_segment("lot_"), None);
        assert_eq!(FormScope::from_segment("clientInfo"), None);
        assert_eq!(FormScope::Lot(3).key("orderType.type"), "lot_3.orderType.type");
        assert_eq!(FormScope::Global.key("clientInfo"), "clientInfo");
    }

    #[test]
    fn keys_under_does_not_match_sibling_prefixes() {
        let fields = map(&[
            ("lot_1.orderType.type", json!("blago")),
            ("lot_10.orderType.type", json!("gradnje")),
            ("lot_1", json!(null)),
        ]);
        assert_eq!(
            fields.keys_under("lot_1"),
            vec!["lot_1".to_string(), "lot_1.orderType.type".to_string()]
        );
    }

    #[test]
    fn array_len_counts_highest_index() {
        let fields = map(&[
            ("general.orderType.cofinancers.0.programName", json!("A")),
            ("general.orderType.cofinancers.2.programName", json!("C")),
            ("general.orderType.cofinancersNote", json!("x")),
        ]);
        assert_eq!(fields.array_len("general.orderType.cofinancers"), 3);
        assert_eq!(fields.array_len("general.orderType.criteria"), 0);
    }

    #[test]
    fn slots_past_the_cap_are_not_counted() {
        let fields = map(&[
            ("general.orderType.cofinancers.1.programName", json!("B")),
            ("general.orderType.cofinancers.200000.programName", json!("X")),
            ("lotConfiguration.lots.999.name", json!("Zadnji")),
        ]);
        assert_eq!(fields.array_len("general.orderType.cofinancers"), 2);
        assert_eq!(fields.array_len("lotConfiguration.lots"), MAX_ARRAY_INDEX + 1);
        assert_eq!(FormScope::from_segment("lot_999"), Some(FormScope::Lot(999)));
        assert_eq!(FormScope::from_segment("lot_1000"), None);
    }

    #[test]
    fn rename_prefix_moves_whole_subtree() {
        let mut fields = map(&[
            ("lot_2.orderType.type", json!("blago")),
            ("lot_2.priceInfo.priceClause", json!("drugo")),
            ("lot_20.orderType.type", json!("storitve")),
        ]);
        fields.rename_prefix("lot_2", "lot_1");
        assert_eq!(fields.get("lot_1.orderType.type"), Some(&json!("blago")));
        assert_eq!(fields.get("lot_1.priceInfo.priceClause"), Some(&json!("drugo")));
        assert_eq!(fields.get("lot_20.orderType.type"), Some(&json!("storitve")));
        assert!(fields.get("lot_2.orderType.type").is_none());
    }

    #[test]
    fn numeric_strings_are_read_as_numbers() {
        assert_eq!(value_as_f64(&json!("1250,50")), Some(1250.5));
        assert_eq!(value_as_f64(&json!(42)), Some(42.0));
        assert_eq!(value_as_f64(&json!(true)), None);
    }
}
