// src/services/renderer.rs
//
// Walks the schema for one wizard step and drives a UI toolkit through the
// `WidgetRenderer` seam. Every widget reads its current value from the
// session map and whatever the toolkit hands back is written to the same key.

use serde_json::{json, Value};

use crate::{
    common::error::AppError,
    models::{
        schema::{FieldKind, FieldNode, FormSchema},
        session::{join_key, value_as_f64, FormScope, SessionFieldMap},
        widget::{Widget, WidgetKind},
    },
    services::{
        lots,
        reconcile::MAX_ARRAY_INDEX,
        visibility::{active_scopes, is_required, is_visible, EvalContext},
    },
};

/// The page-rendering toolkit.
pub trait WidgetRenderer {
    /// Shows `widget` and returns the value the user left in it.
    /// `None` keeps the stored value, `Some(Value::Null)` clears it.
    fn render(&mut self, widget: &Widget, current: Option<&Value>) -> Option<Value>;
}

/// Only describes the widgets; never changes a value.
#[derive(Debug, Default)]
pub struct WidgetCollector;

impl WidgetRenderer for WidgetCollector {
    fn render(&mut self, _widget: &Widget, _current: Option<&Value>) -> Option<Value> {
        None
    }
}

/// Replays values a client submitted for a step, keyed by widget key.
#[derive(Debug, Default)]
pub struct ReplayRenderer {
    changes: SessionFieldMap,
}

impl ReplayRenderer {
    pub fn new(changes: SessionFieldMap) -> Self {
        Self { changes }
    }

    /// Changes whose widget was not on the page (hidden or unknown).
    pub fn unapplied(&self) -> impl Iterator<Item = &String> {
        self.changes.keys()
    }
}

impl WidgetRenderer for ReplayRenderer {
    fn render(&mut self, widget: &Widget, _current: Option<&Value>) -> Option<Value> {
        self.changes.remove(&widget.key)
    }
}

pub struct FormRenderer<'a> {
    schema: &'a FormSchema,
}

impl<'a> FormRenderer<'a> {
    pub fn new(schema: &'a FormSchema) -> Self {
        Self { schema }
    }

    /// One full pass over a step, the way the page function runs after every interaction.
    pub fn render_step(
        &self,
        step: usize,
        session: &mut SessionFieldMap,
        ui: &mut dyn WidgetRenderer,
    ) -> Result<Vec<Widget>, AppError> {
        let sections = self.schema.step_sections(step)?;
        let mut widgets = Vec::new();

        for section in sections {
            // hasLots may flip while rendering the lots step, so scopes are read per section
            let scopes = if section.lot_scoped {
                active_scopes(session)
            } else {
                vec![FormScope::Global]
            };
            for scope in scopes {
                let prefix = section.key_prefix(scope);
                self.render_object(&section.node, &prefix, scope, session, ui, &mut widgets);
            }
        }

        tracing::debug!("Step {} rendered with {} widget(s)", step, widgets.len());
        Ok(widgets)
    }

    fn render_object(
        &self,
        object: &FieldNode,
        object_key: &str,
        scope: FormScope,
        session: &mut SessionFieldMap,
        ui: &mut dyn WidgetRenderer,
        widgets: &mut Vec<Widget>,
    ) {
        for child in &object.properties {
            let key = join_key(object_key, &child.name);
            let ctx = EvalContext {
                scope,
                parent_key: object_key,
            };
            if !is_visible(self.schema, child, ctx, session) {
                continue;
            }

            match child.kind {
                FieldKind::Object => {
                    self.render_object(child, &key, scope, session, ui, widgets);
                }
                FieldKind::Array if child.is_object_array() => {
                    self.render_object_array(child, key, ctx, session, ui, widgets);
                }
                _ => {
                    let mut widget = self.describe(child, key, ctx, session);
                    let current = session.get(&widget.key).cloned();
                    if let Some(new_value) = ui.render(&widget, current.as_ref()) {
                        write_value(session, &widget.key, new_value);
                    }
                    widget.value = session.get(&widget.key).cloned();
                    widgets.push(widget);
                }
            }
        }
    }

    fn render_object_array(
        &self,
        node: &FieldNode,
        key: String,
        ctx: EvalContext<'_>,
        session: &mut SessionFieldMap,
        ui: &mut dyn WidgetRenderer,
        widgets: &mut Vec<Widget>,
    ) {
        let Some(items) = node.items.as_deref() else {
            return;
        };

        let mut control = self.describe(node, key.clone(), ctx, session);
        let count = session.array_len(&key);
        let new_count = ui
            .render(&control, Some(&json!(count)))
            .as_ref()
            .and_then(value_as_f64)
            .map(|n| (n.max(0.0) as usize).min(MAX_ARRAY_INDEX + 1))
            .unwrap_or(count);

        for index in new_count..count {
            session.remove_under(&join_key(&key, &index.to_string()));
        }
        // New slots hold an empty object so the item count survives until fields are filled
        for index in count..new_count {
            session.insert(join_key(&key, &index.to_string()), json!({}));
        }

        control.value = Some(json!(new_count));
        widgets.push(control);

        for index in 0..new_count {
            let item_key = join_key(&key, &index.to_string());
            self.render_object(items, &item_key, ctx.scope, session, ui, widgets);
        }
    }

    fn describe(
        &self,
        node: &FieldNode,
        key: String,
        ctx: EvalContext<'_>,
        session: &SessionFieldMap,
    ) -> Widget {
        let mut widget = Widget::from_node(node, key);
        widget.required = is_required(self.schema, node, ctx, session);
        widget.scope = ctx.scope.to_string();
        widget.lot_name = ctx.scope.lot_index().and_then(|i| lots::lot_name(session, i));
        widget
    }
}

fn write_value(session: &mut SessionFieldMap, key: &str, value: Value) {
    if value.is_null() {
        session.remove(key);
    } else {
        session.insert(key, value);
    }
}
