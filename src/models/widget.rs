// src/models/widget.rs

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::models::schema::{FieldFormat, FieldKind, FieldNode, FieldOption};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    TextInput,
    TextArea,
    NumberInput,
    IntegerInput,
    Checkbox,
    DateInput,
    FileUpload,
    Radio,
    SelectBox,
    MultiSelect,
    TextList,
    // Item count of an array of sub-forms
    ArrayControl,
}

impl WidgetKind {
    pub fn for_node(node: &FieldNode) -> Self {
        if node.is_object_array() {
            return WidgetKind::ArrayControl;
        }
        if node.kind == FieldKind::Array {
            let has_options = node.items.as_ref().is_some_and(|i| !i.options.is_empty());
            return if has_options {
                WidgetKind::MultiSelect
            } else {
                WidgetKind::TextList
            };
        }
        if !node.options.is_empty() {
            return if node.format == Some(FieldFormat::Radio) {
                WidgetKind::Radio
            } else {
                WidgetKind::SelectBox
            };
        }
        match (node.kind, node.format) {
            (FieldKind::Boolean, _) => WidgetKind::Checkbox,
            (FieldKind::Number, _) => WidgetKind::NumberInput,
            (FieldKind::Integer, _) => WidgetKind::IntegerInput,
            (_, Some(FieldFormat::Textarea)) => WidgetKind::TextArea,
            (_, Some(FieldFormat::Date)) => WidgetKind::DateInput,
            (_, Some(FieldFormat::File)) => WidgetKind::FileUpload,
            _ => WidgetKind::TextInput,
        }
    }
}

/// Descriptor handed to the UI toolkit for one input.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    #[schema(example = "lot_0.orderType.estimatedValue")]
    pub key: String,
    pub kind: WidgetKind,
    #[schema(example = "Ocenjena vrednost (EUR brez DDV)")]
    pub label: String,
    pub help: Option<String>,
    pub options: Vec<FieldOption>,
    pub required: bool,
    #[schema(example = "lot_0")]
    pub scope: String,
    #[schema(example = "Prenosniki")]
    pub lot_name: Option<String>,
    // Value after the render pass
    #[schema(value_type = Option<Object>)]
    pub value: Option<Value>,
}

impl Widget {
    pub fn from_node(node: &FieldNode, key: String) -> Self {
        let options = match node.items.as_deref() {
            Some(items) if node.kind == FieldKind::Array => items.options.clone(),
            _ => node.options.clone(),
        };
        Widget {
            key,
            kind: WidgetKind::for_node(node),
            label: node.title.clone(),
            help: node.description.clone(),
            options,
            required: node.required,
            scope: String::new(),
            lot_name: None,
            value: None,
        }
    }
}
