// src/services/visibility.rs

use serde_json::Value;

use crate::models::{
    schema::{Condition, FieldKind, FieldNode, FormSchema},
    session::{join_key, FormScope, SessionFieldMap},
};

/// Where a field is being evaluated: its scope and the key of the object holding it.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub scope: FormScope,
    pub parent_key: &'a str,
}

impl EvalContext<'_> {
    /// Session key a condition reads from.
    pub fn resolve(&self, schema: &FormSchema, condition: &Condition) -> String {
        if let Some(relative) = condition.field.strip_prefix('.') {
            return join_key(self.parent_key, relative);
        }
        let section_name = condition.field.split('.').next().unwrap_or_default();
        match schema.section(section_name) {
            Some(section) if section.lot_scoped => self.scope.key(&condition.field),
            _ => condition.field.clone(),
        }
    }
}

/// Compares the stored value against the expected one.
///
/// Arrays match when they contain the expected value; numbers compare
/// numerically; a missing value counts as `false`/`null`.
pub fn value_matches(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None | Some(Value::Null) => matches!(expected, Value::Null | Value::Bool(false)),
        Some(Value::Array(items)) => match expected {
            Value::Array(_) => actual == Some(expected),
            _ => items.iter().any(|item| scalar_eq(item, expected)),
        },
        Some(value) => scalar_eq(value, expected),
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

pub fn condition_holds(
    schema: &FormSchema,
    condition: &Condition,
    ctx: EvalContext<'_>,
    session: &SessionFieldMap,
) -> bool {
    let key = ctx.resolve(schema, condition);
    value_matches(session.get(&key), &condition.value)
}

/// `render_if` must hold and, when declared, at least one `render_if_any` entry.
pub fn is_visible(
    schema: &FormSchema,
    node: &FieldNode,
    ctx: EvalContext<'_>,
    session: &SessionFieldMap,
) -> bool {
    let render_if = node
        .render_if
        .as_ref()
        .is_none_or(|c| condition_holds(schema, c, ctx, session));
    let render_if_any = node.render_if_any.is_empty()
        || node
            .render_if_any
            .iter()
            .any(|c| condition_holds(schema, c, ctx, session));
    render_if && render_if_any
}

/// Required either statically or through a satisfied `required_if`.
pub fn is_required(
    schema: &FormSchema,
    node: &FieldNode,
    ctx: EvalContext<'_>,
    session: &SessionFieldMap,
) -> bool {
    node.required
        || node
            .required_if
            .as_ref()
            .is_some_and(|c| condition_holds(schema, c, ctx, session))
}

/// Scopes whose lot-scoped sections are in use.
pub fn active_scopes(session: &SessionFieldMap) -> Vec<FormScope> {
    if session.get(HAS_LOTS_KEY) == Some(&Value::Bool(true)) {
        (0..session.array_len(LOTS_KEY)).map(FormScope::Lot).collect()
    } else {
        vec![FormScope::General]
    }
}

pub const HAS_LOTS_KEY: &str = "lotsInfo.hasLots";
pub const LOTS_KEY: &str = "lotConfiguration.lots";

/// Drops everything that must not reach the saved document: keys unknown to
/// the schema, keys of inactive scopes and values of hidden fields.
///
/// Hiding one field can hide others that depend on it, so passes repeat
/// until nothing changes.
pub fn prune_hidden(schema: &FormSchema, session: &SessionFieldMap) -> SessionFieldMap {
    let mut pruned = session.clone();
    let scopes = active_scopes(session);

    pruned.retain(|key, _| {
        let Some((scope, section, _)) = schema.split_key(key) else {
            tracing::debug!("Dropping key outside the schema: {}", key);
            return false;
        };
        let in_scope = if section.lot_scoped {
            scopes.contains(&scope)
        } else {
            scope == FormScope::Global
        };
        if !in_scope {
            tracing::debug!("Dropping key of inactive scope {}: {}", scope, key);
            return false;
        }
        if schema.node_for_key(key).is_none() {
            tracing::debug!("Dropping key outside the schema: {}", key);
            return false;
        }
        true
    });

    loop {
        let mut hidden = Vec::new();
        for section in &schema.sections {
            let section_scopes: &[FormScope] = if section.lot_scoped {
                &scopes
            } else {
                &[FormScope::Global]
            };
            for scope in section_scopes {
                let prefix = section.key_prefix(*scope);
                collect_hidden(schema, &section.node, &prefix, *scope, &pruned, &mut hidden);
            }
        }

        let removed: usize = hidden.iter().map(|prefix| pruned.remove_under(prefix)).sum();
        if removed == 0 {
            break;
        }
        tracing::debug!("Pruned {} hidden value(s)", removed);
    }

    pruned
}

fn collect_hidden(
    schema: &FormSchema,
    object: &FieldNode,
    object_key: &str,
    scope: FormScope,
    session: &SessionFieldMap,
    hidden: &mut Vec<String>,
) {
    let ctx = EvalContext {
        scope,
        parent_key: object_key,
    };
    for child in &object.properties {
        let child_key = join_key(object_key, &child.name);
        if child.is_conditional() && !is_visible(schema, child, ctx, session) {
            hidden.push(child_key);
            continue;
        }
        match child.kind {
            FieldKind::Object => collect_hidden(schema, child, &child_key, scope, session, hidden),
            FieldKind::Array if child.is_object_array() => {
                if let Some(items) = child.items.as_deref() {
                    for index in 0..session.array_len(&child_key) {
                        let item_key = join_key(&child_key, &index.to_string());
                        collect_hidden(schema, items, &item_key, scope, session, hidden);
                    }
                }
            }
            _ => {}
        }
    }
}
