// src/services/reconcile.rs
//
// Flat session keys <-> nested form document.
//
// `lot_0.orderType.cofinancers.1.programName = "X"` becomes
// `{"lot_0": {"orderType": {"cofinancers": [null, {"programName": "X"}]}}}`.
// Numeric segments are array slots wherever they occur in the key.

use serde_json::{Map, Value};

use crate::{
    common::error::AppError,
    models::session::{join_key, SessionFieldMap, LOT_SCOPE_PREFIX},
};

/// Array slots above this index are rejected instead of padding huge arrays with nulls.
pub use crate::models::session::MAX_ARRAY_INDEX;

enum Segment<'a> {
    Field(&'a str),
    Index(usize),
}

fn parse_segment<'a>(segment: &'a str, key: &str) -> Result<Segment<'a>, AppError> {
    if segment.is_empty() {
        return Err(AppError::InvalidFieldKey(key.to_string()));
    }
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        let index: usize = segment
            .parse()
            .map_err(|_| AppError::InvalidFieldKey(key.to_string()))?;
        if index > MAX_ARRAY_INDEX {
            return Err(AppError::InvalidFieldKey(key.to_string()));
        }
        return Ok(Segment::Index(index));
    }
    Ok(Segment::Field(segment))
}

/// Rejects keys addressing an array slot or lot above `MAX_ARRAY_INDEX`
/// before any render or prune pass sizes its loops from them.
pub fn check_keys(fields: &SessionFieldMap) -> Result<(), AppError> {
    for key in fields.keys() {
        for segment in key.split('.') {
            let index = segment.strip_prefix(LOT_SCOPE_PREFIX).unwrap_or(segment);
            if !index.is_empty()
                && index.bytes().all(|b| b.is_ascii_digit())
                && !index.parse::<usize>().is_ok_and(|i| i <= MAX_ARRAY_INDEX)
            {
                return Err(AppError::InvalidFieldKey(key.clone()));
            }
        }
    }
    Ok(())
}

/// Rebuilds the nested document from the flat session map.
pub fn flatten_to_nested(fields: &SessionFieldMap) -> Result<Value, AppError> {
    let mut root = Value::Object(Map::new());

    for (key, value) in fields.iter() {
        let segments = key
            .split('.')
            .map(|s| parse_segment(s, key))
            .collect::<Result<Vec<_>, _>>()?;

        if matches!(segments.first(), Some(Segment::Index(_))) {
            // The document root is always an object
            return Err(AppError::InvalidFieldKey(key.clone()));
        }

        insert_at(&mut root, &segments, value.clone(), key)?;
    }

    Ok(root)
}

fn insert_at(slot: &mut Value, segments: &[Segment<'_>], value: Value, key: &str) -> Result<(), AppError> {
    let Some((head, rest)) = segments.split_first() else {
        return store_leaf(slot, value, key);
    };

    match head {
        Segment::Field(name) => {
            if slot.is_null() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(object) = slot else {
                return Err(AppError::PathConflict(key.to_string()));
            };
            let child = object.entry(name.to_string()).or_insert(Value::Null);
            insert_at(child, rest, value, key)
        }
        Segment::Index(index) => {
            if slot.is_null() {
                *slot = Value::Array(Vec::new());
            }
            let Value::Array(array) = slot else {
                return Err(AppError::PathConflict(key.to_string()));
            };
            if array.len() <= *index {
                array.resize(index + 1, Value::Null);
            }
            insert_at(&mut array[*index], rest, value, key)
        }
    }
}

fn store_leaf(slot: &mut Value, value: Value, key: &str) -> Result<(), AppError> {
    match (&*slot, &value) {
        (Value::Null, _) => {
            *slot = value;
            Ok(())
        }
        // An empty container leaf is compatible with children stored below it
        (Value::Object(_), Value::Object(o)) if o.is_empty() => Ok(()),
        (Value::Array(_), Value::Array(a)) if a.is_empty() => Ok(()),
        (_, Value::Null) => Ok(()),
        _ => Err(AppError::PathConflict(key.to_string())),
    }
}

/// Flattens a nested document back into session keys.
///
/// Objects and arrays holding containers are descended into; arrays of
/// scalars (multiselect values), empty arrays and empty objects stay leaves.
pub fn populate_from_nested(document: &Value) -> Result<SessionFieldMap, AppError> {
    let Value::Object(root) = document else {
        return Err(AppError::InvalidDocument(
            "the form document must be a JSON object".to_string(),
        ));
    };

    let mut fields = SessionFieldMap::new();
    for (name, value) in root {
        populate(name.clone(), value, &mut fields);
    }
    Ok(fields)
}

fn populate(prefix: String, value: &Value, fields: &mut SessionFieldMap) {
    match value {
        Value::Object(object) if !object.is_empty() => {
            for (name, child) in object {
                populate(join_key(&prefix, name), child, fields);
            }
        }
        Value::Array(items) if items.iter().any(|v| v.is_object() || v.is_array()) => {
            for (index, child) in items.iter().enumerate() {
                populate(join_key(&prefix, &index.to_string()), child, fields);
            }
        }
        _ => {
            fields.insert(prefix, value.clone());
        }
    }
}
