// src/models/schema.rs

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    models::session::{FormScope, MAX_ARRAY_INDEX},
};

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    Textarea,
    Date,
    File,
    Radio,
    // Formats the wizard has no dedicated widget for
    #[serde(other)]
    Other,
}

/// Visibility/requirement predicate: `field` must hold `value`.
///
/// `field` is a schema path (`orderType.type`) resolved in the scope of the
/// field being evaluated. A leading `.` makes it relative to the enclosing
/// object, which is how array items refer to their siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Condition {
    pub field: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub value: Value,
}

impl Condition {
    pub fn is_relative(&self) -> bool {
        self.field.starts_with('.')
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FieldOption {
    #[schema(value_type = Object)]
    pub value: Value,
    pub label: String,
}

// --- TREE ---

#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: FieldKind,
    pub format: Option<FieldFormat>,
    pub options: Vec<FieldOption>,
    pub render_if: Option<Condition>,
    pub render_if_any: Vec<Condition>,
    pub required_if: Option<Condition>,
    // Listed in the parent object's `required`
    pub required: bool,
    pub properties: Vec<FieldNode>,
    pub items: Option<Box<FieldNode>>,
}

impl FieldNode {
    pub fn property(&self, name: &str) -> Option<&FieldNode> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn is_conditional(&self) -> bool {
        self.render_if.is_some() || !self.render_if_any.is_empty()
    }

    /// Arrays whose items are objects are rendered as repeated sub-forms.
    pub fn is_object_array(&self) -> bool {
        self.kind == FieldKind::Array
            && self.items.as_ref().is_some_and(|i| i.kind == FieldKind::Object)
    }

    /// Label shown for a stored value (enum label when one is declared).
    pub fn label_for(&self, value: &Value) -> Option<&str> {
        let options = match (&self.items, self.options.is_empty()) {
            (Some(items), true) => &items.options,
            _ => &self.options,
        };
        options
            .iter()
            .find(|o| &o.value == value)
            .map(|o| o.label.as_str())
    }

    fn from_json(name: &str, raw: &Value, required: bool) -> Result<Self, AppError> {
        let raw_node: RawNode = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::InvalidSchema(format!("field '{}': {}", name, e)))?;

        if !raw_node.enum_labels.is_empty() && raw_node.enum_labels.len() != raw_node.enum_values.len() {
            return Err(AppError::InvalidSchema(format!(
                "field '{}': enumLabels has {} entries but enum has {}",
                name,
                raw_node.enum_labels.len(),
                raw_node.enum_values.len()
            )));
        }

        let options = raw_node
            .enum_values
            .iter()
            .enumerate()
            .map(|(i, value)| FieldOption {
                value: value.clone(),
                label: raw_node
                    .enum_labels
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| display_value(value)),
            })
            .collect();

        let mut properties = Vec::with_capacity(raw_node.properties.len());
        for (child_name, child_raw) in &raw_node.properties {
            if child_name.is_empty() || child_name.contains('.') || child_name.parse::<usize>().is_ok() {
                return Err(AppError::InvalidSchema(format!(
                    "property name '{}' under '{}' cannot be used as a key segment",
                    child_name, name
                )));
            }
            let child_required = raw_node.required.iter().any(|r| r == child_name);
            properties.push(FieldNode::from_json(child_name, child_raw, child_required)?);
        }

        let items = match (&raw_node.items, raw_node.kind) {
            (Some(items_raw), _) => Some(Box::new(FieldNode::from_json(name, items_raw, false)?)),
            (None, FieldKind::Array) => {
                return Err(AppError::InvalidSchema(format!(
                    "array field '{}' has no items",
                    name
                )))
            }
            (None, _) => None,
        };

        Ok(FieldNode {
            name: name.to_string(),
            title: raw_node.title.unwrap_or_else(|| name.to_string()),
            description: raw_node.description,
            kind: raw_node.kind,
            format: raw_node.format,
            options,
            render_if: raw_node.render_if,
            render_if_any: raw_node.render_if_any,
            required_if: raw_node.required_if,
            required,
            properties,
            items,
        })
    }
}

// Shape of a node as written in the JSON schema file.
#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    kind: FieldKind,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "enum", default)]
    enum_values: Vec<Value>,
    #[serde(rename = "enumLabels", default)]
    enum_labels: Vec<String>,
    #[serde(default)]
    format: Option<FieldFormat>,
    #[serde(default)]
    render_if: Option<Condition>,
    #[serde(default)]
    render_if_any: Vec<Condition>,
    #[serde(default)]
    required_if: Option<Condition>,
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    items: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    #[serde(default)]
    title: Option<String>,
    steps: Vec<WizardStep>,
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(default)]
    lot_scoped: bool,
}

// --- SECTIONS & STEPS ---

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub lot_scoped: bool,
    pub node: FieldNode,
}

impl Section {
    pub fn title(&self) -> &str {
        &self.node.title
    }

    /// Key prefix of this section inside `scope` (`lot_1.orderType`, `clientInfo`).
    pub fn key_prefix(&self, scope: FormScope) -> String {
        if self.lot_scoped {
            scope.key(&self.name)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WizardStep {
    #[schema(example = "Vrsta naročila")]
    pub title: String,
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepSummary {
    pub index: usize,
    pub title: String,
    pub sections: Vec<String>,
    // Repeated once per lot when lots are enabled
    pub lot_scoped: bool,
}

// --- SCHEMA ---

#[derive(Debug, Clone)]
pub struct FormSchema {
    pub title: String,
    pub steps: Vec<WizardStep>,
    pub sections: Vec<Section>,
    raw: Value,
}

impl FormSchema {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::InvalidSchema(format!("cannot read '{}': {}", path.display(), e))
        })?;
        let raw: Value = serde_json::from_str(&content).map_err(|e| {
            AppError::InvalidSchema(format!("'{}' is not valid JSON: {}", path.display(), e))
        })?;
        let schema = Self::from_value(raw)?;
        tracing::info!(
            "Form schema '{}' loaded: {} steps, {} sections",
            schema.title,
            schema.steps.len(),
            schema.sections.len()
        );
        Ok(schema)
    }

    pub fn from_value(raw: Value) -> Result<Self, AppError> {
        let raw_schema: RawSchema = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::InvalidSchema(e.to_string()))?;

        let mut sections = Vec::with_capacity(raw_schema.properties.len());
        for (name, section_raw) in &raw_schema.properties {
            if FormScope::from_segment(name).is_some() {
                return Err(AppError::InvalidSchema(format!(
                    "section name '{}' collides with a scope prefix",
                    name
                )));
            }
            let node = FieldNode::from_json(name, section_raw, false)?;
            if node.kind != FieldKind::Object {
                return Err(AppError::InvalidSchema(format!(
                    "section '{}' must be an object",
                    name
                )));
            }
            let RawSection { lot_scoped } = serde_json::from_value(section_raw.clone())
                .map_err(|e| AppError::InvalidSchema(format!("section '{}': {}", name, e)))?;
            sections.push(Section {
                name: name.clone(),
                lot_scoped,
                node,
            });
        }

        let schema = FormSchema {
            title: raw_schema.title.unwrap_or_default(),
            steps: raw_schema.steps,
            sections,
            raw,
        };
        schema.check_references()?;
        Ok(schema)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn step(&self, index: usize) -> Result<&WizardStep, AppError> {
        self.steps.get(index).ok_or(AppError::UnknownStep(index))
    }

    pub fn step_sections(&self, index: usize) -> Result<Vec<&Section>, AppError> {
        let step = self.step(index)?;
        Ok(step
            .sections
            .iter()
            .filter_map(|name| self.section(name))
            .collect())
    }

    pub fn step_summaries(&self) -> Vec<StepSummary> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| StepSummary {
                index,
                title: step.title.clone(),
                sections: step.sections.clone(),
                lot_scoped: step
                    .sections
                    .iter()
                    .filter_map(|name| self.section(name))
                    .any(|s| s.lot_scoped),
            })
            .collect()
    }

    /// Resolves a scope-free schema path (`orderType.cofinancers.programName`).
    /// Array levels may be skipped or addressed with an index.
    pub fn node_for_path(&self, path: &str) -> Option<&FieldNode> {
        let mut segments = path.split('.');
        let section = self.section(segments.next()?)?;
        walk(&section.node, segments)
    }

    /// Resolves a session key (`lot_0.orderType.cofinancers.1.programName`).
    /// `None` means the key has no place in the schema.
    pub fn node_for_key(&self, key: &str) -> Option<&FieldNode> {
        let (scope, section, rest) = self.split_key(key)?;
        if section.lot_scoped == (scope == FormScope::Global) {
            return None;
        }
        walk_strict(&section.node, rest)
    }

    /// Splits a session key into its scope, section and remaining segments.
    pub fn split_key<'k>(&self, key: &'k str) -> Option<(FormScope, &Section, Vec<&'k str>)> {
        let mut segments: Vec<&str> = key.split('.').collect();
        let scope = match FormScope::from_segment(segments[0]) {
            Some(scope) => {
                segments.remove(0);
                scope
            }
            None => FormScope::Global,
        };
        if segments.is_empty() {
            return None;
        }
        let section = self.section(segments.remove(0))?;
        Some((scope, section, segments))
    }

    // Every step names real sections and every absolute condition points at a real field.
    fn check_references(&self) -> Result<(), AppError> {
        for step in &self.steps {
            for name in &step.sections {
                if self.section(name).is_none() {
                    return Err(AppError::InvalidSchema(format!(
                        "step '{}' references unknown section '{}'",
                        step.title, name
                    )));
                }
            }
        }

        for section in &self.sections {
            self.check_node_conditions(&section.node, section)?;
        }
        Ok(())
    }

    fn check_node_conditions(&self, node: &FieldNode, owner: &Section) -> Result<(), AppError> {
        let conditions = node
            .render_if
            .iter()
            .chain(node.render_if_any.iter())
            .chain(node.required_if.iter());

        for condition in conditions {
            if condition.is_relative() {
                continue;
            }
            let target = condition.field.split('.').next().and_then(|s| self.section(s));
            let resolves = self.node_for_path(&condition.field).is_some();
            // A global field may not depend on a lot-scoped one: there is no scope to read it from.
            let scope_ok = target.is_some_and(|t| owner.lot_scoped || !t.lot_scoped);
            if !resolves || !scope_ok {
                return Err(AppError::InvalidSchema(format!(
                    "condition on '{}' references '{}' which cannot be resolved",
                    node.name, condition.field
                )));
            }
        }

        for child in &node.properties {
            self.check_node_conditions(child, owner)?;
        }
        if let Some(items) = &node.items {
            self.check_node_conditions(items, owner)?;
        }
        Ok(())
    }
}

fn walk<'a, 'k>(mut node: &'a FieldNode, segments: impl Iterator<Item = &'k str>) -> Option<&'a FieldNode> {
    for segment in segments {
        if node.kind == FieldKind::Array {
            let items = node.items.as_deref()?;
            if segment.parse::<usize>().is_ok() {
                node = items;
                continue;
            }
            node = items.property(segment)?;
        } else {
            node = node.property(segment)?;
        }
    }
    Some(node)
}

// Session keys must address every array level with an index.
fn walk_strict<'a>(mut node: &'a FieldNode, segments: Vec<&str>) -> Option<&'a FieldNode> {
    for segment in segments {
        node = match node.kind {
            FieldKind::Array => {
                segment.parse::<usize>().ok().filter(|i| *i <= MAX_ARRAY_INDEX)?;
                node.items.as_deref()?
            }
            FieldKind::Object => node.property(segment)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Plain-text rendering of a scalar used for labels.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
