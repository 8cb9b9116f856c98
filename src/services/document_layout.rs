// src/services/document_layout.rs
//
// Turns a nested form document into an ordered list of printable blocks.
// Both exporters (Word, PDF) consume the same layout.

use chrono::NaiveDate;
use serde_json::Value;

use crate::{
    models::{
        document::{Block, DocumentLayout},
        schema::{display_value, FieldFormat, FieldKind, FieldNode, FormSchema, Section},
        session::{is_blank, FormScope, GENERAL_SCOPE},
    },
    services::validation::DATE_FORMAT,
};

const YES: &str = "Da";
const NO: &str = "Ne";
const PRINT_DATE_FORMAT: &str = "%d.%m.%Y";
const MAX_HEADING_LEVEL: u8 = 6;

pub fn build_layout(schema: &FormSchema, document: &Value) -> DocumentLayout {
    let mut blocks = vec![Block::Title(schema.title.clone())];
    let lots = lot_names(document);

    for step in &schema.steps {
        let mut step_blocks = Vec::new();
        for section in step.sections.iter().filter_map(|name| schema.section(name)) {
            step_blocks.extend(section_blocks(section, document, lots.as_deref()));
        }
        if !step_blocks.is_empty() {
            blocks.push(Block::Heading {
                level: 1,
                text: step.title.clone(),
            });
            blocks.extend(step_blocks);
        }
    }

    DocumentLayout {
        title: schema.title.clone(),
        blocks,
    }
}

// `None` when the procurement is not divided into lots.
fn lot_names(document: &Value) -> Option<Vec<String>> {
    if document.pointer("/lotsInfo/hasLots") != Some(&Value::Bool(true)) {
        return None;
    }
    let lots = document
        .pointer("/lotConfiguration/lots")
        .and_then(Value::as_array)?;
    Some(
        lots.iter()
            .enumerate()
            .map(|(i, lot)| {
                lot.get("name")
                    .and_then(Value::as_str)
                    .filter(|name| !name.trim().is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Sklop {}", i + 1))
            })
            .collect(),
    )
}

fn section_blocks(section: &Section, document: &Value, lots: Option<&[String]>) -> Vec<Block> {
    let mut blocks = Vec::new();

    if !section.lot_scoped {
        object_blocks(&section.node, document.get(&section.name), 3, &mut blocks);
    } else if let Some(lots) = lots {
        for (index, name) in lots.iter().enumerate() {
            let scope = FormScope::Lot(index).to_string();
            let mut lot_blocks = Vec::new();
            let value = document.get(&scope).and_then(|s| s.get(&section.name));
            object_blocks(&section.node, value, 4, &mut lot_blocks);
            if !lot_blocks.is_empty() {
                blocks.push(Block::LotHeading(format!("Sklop {}: {}", index + 1, name)));
                blocks.extend(lot_blocks);
            }
        }
    } else {
        let value = document.get(GENERAL_SCOPE).and_then(|s| s.get(&section.name));
        object_blocks(&section.node, value, 3, &mut blocks);
    }

    if blocks.is_empty() {
        return blocks;
    }
    let mut with_heading = vec![Block::Heading {
        level: 2,
        text: section.title().to_string(),
    }];
    with_heading.extend(blocks);
    with_heading
}

fn object_blocks(node: &FieldNode, value: Option<&Value>, level: u8, blocks: &mut Vec<Block>) {
    let Some(object) = value.and_then(Value::as_object) else {
        return;
    };
    let level = level.min(MAX_HEADING_LEVEL);

    for child in &node.properties {
        let child_value = object.get(&child.name);
        if is_blank(child_value) {
            continue;
        }
        match child.kind {
            FieldKind::Object => {
                let mut nested = Vec::new();
                object_blocks(child, child_value, level + 1, &mut nested);
                if !nested.is_empty() {
                    blocks.push(Block::Heading {
                        level,
                        text: child.title.clone(),
                    });
                    blocks.extend(nested);
                }
            }
            FieldKind::Array if child.is_object_array() => {
                let (Some(items), Some(values)) =
                    (child.items.as_deref(), child_value.and_then(Value::as_array))
                else {
                    continue;
                };
                for (i, item) in values.iter().enumerate() {
                    blocks.push(Block::Heading {
                        level,
                        text: format!("{} {}", item_title(child, items), i + 1),
                    });
                    object_blocks(items, Some(item), level + 1, blocks);
                }
            }
            _ => {
                if let Some(text) = child_value.map(|v| format_value(child, v)) {
                    blocks.push(Block::Field {
                        label: child.title.clone(),
                        value: text,
                    });
                }
            }
        }
    }
}

fn item_title<'a>(array: &'a FieldNode, items: &'a FieldNode) -> &'a str {
    if items.title.is_empty() {
        &array.title
    } else {
        &items.title
    }
}

/// Printable text of a leaf value.
pub fn format_value(node: &FieldNode, value: &Value) -> String {
    match value {
        Value::Bool(true) => YES.to_string(),
        Value::Bool(false) => NO.to_string(),
        Value::Array(values) => values
            .iter()
            .map(|v| format_scalar(node, v))
            .collect::<Vec<_>>()
            .join(", "),
        other => format_scalar(node, other),
    }
}

fn format_scalar(node: &FieldNode, value: &Value) -> String {
    if let Some(label) = node.label_for(value) {
        return label.to_string();
    }
    if node.format == Some(FieldFormat::Date) {
        if let Some(date) = value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
        {
            return date.format(PRINT_DATE_FORMAT).to_string();
        }
    }
    match value {
        Value::Bool(true) => YES.to_string(),
        Value::Bool(false) => NO.to_string(),
        other => display_value(other),
    }
}
