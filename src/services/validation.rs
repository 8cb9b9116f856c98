// src/services/validation.rs

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{
    schema::{FieldFormat, FieldKind, FieldNode, FormSchema},
    session::{is_blank, join_key, FormScope, SessionFieldMap},
};
use crate::services::visibility::{active_scopes, is_required, is_visible, EvalContext};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Checks every visible field; returns field key -> error code.
pub fn validate_session(schema: &FormSchema, session: &SessionFieldMap) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();
    let scopes = active_scopes(session);

    for section in &schema.sections {
        let section_scopes: &[FormScope] = if section.lot_scoped {
            &scopes
        } else {
            &[FormScope::Global]
        };
        for scope in section_scopes {
            let prefix = section.key_prefix(*scope);
            validate_object(schema, &section.node, &prefix, *scope, session, &mut errors);
        }
    }

    if !errors.is_empty() {
        tracing::debug!("Form validation found {} problem(s)", errors.len());
    }
    errors
}

fn validate_object(
    schema: &FormSchema,
    object: &FieldNode,
    object_key: &str,
    scope: FormScope,
    session: &SessionFieldMap,
    errors: &mut BTreeMap<String, String>,
) {
    let ctx = EvalContext {
        scope,
        parent_key: object_key,
    };

    for child in &object.properties {
        let key = join_key(object_key, &child.name);
        if !is_visible(schema, child, ctx, session) {
            continue;
        }
        let required = is_required(schema, child, ctx, session);

        match child.kind {
            FieldKind::Object => validate_object(schema, child, &key, scope, session, errors),
            FieldKind::Array if child.is_object_array() => {
                let count = session.array_len(&key);
                if required && count == 0 {
                    errors.insert(key.clone(), "required".to_string());
                }
                if let Some(items) = child.items.as_deref() {
                    for index in 0..count {
                        let item_key = join_key(&key, &index.to_string());
                        validate_object(schema, items, &item_key, scope, session, errors);
                    }
                }
            }
            _ => {
                let value = session.get(&key);
                if is_blank(value) {
                    if required {
                        errors.insert(key, "required".to_string());
                    }
                } else if let Some(code) = value.and_then(|v| type_error(child, v)) {
                    errors.insert(key, code.to_string());
                }
            }
        }
    }
}

fn type_error(node: &FieldNode, value: &Value) -> Option<&'static str> {
    let valid = match node.kind {
        FieldKind::Number => value.is_number(),
        FieldKind::Integer => {
            value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Array => value.is_array(),
        FieldKind::String => value.is_string(),
        FieldKind::Object => value.is_object(),
    };
    if !valid {
        return Some(match node.kind {
            FieldKind::Number => "invalid_number",
            FieldKind::Integer => "invalid_integer",
            FieldKind::Boolean => "invalid_boolean",
            FieldKind::Array => "invalid_list",
            _ => "invalid_text",
        });
    }

    if node.format == Some(FieldFormat::Date) {
        let parsed = value
            .as_str()
            .is_some_and(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok());
        if !parsed {
            return Some("invalid_date_format");
        }
    }

    let allowed = |v: &Value, options_node: &FieldNode| {
        options_node.options.is_empty() || options_node.options.iter().any(|o| &o.value == v)
    };
    match (node.kind, node.items.as_deref()) {
        (FieldKind::Array, Some(items)) => {
            let items_ok = value
                .as_array()
                .is_some_and(|values| values.iter().all(|v| allowed(v, items)));
            (!items_ok).then_some("invalid_option")
        }
        _ => (!allowed(value, node)).then_some("invalid_option"),
    }
}
