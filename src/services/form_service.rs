// src/services/form_service.rs

use std::{collections::BTreeMap, sync::Arc};

use serde_json::Value;

use crate::{
    common::error::AppError,
    models::{
        schema::FormSchema,
        session::SessionFieldMap,
        widget::Widget,
    },
    services::{
        lots,
        reconcile::{check_keys, flatten_to_nested, populate_from_nested},
        renderer::{FormRenderer, ReplayRenderer, WidgetCollector},
        validation::validate_session,
        visibility::prune_hidden,
    },
};

/// Outcome of one render pass over a wizard step.
#[derive(Debug)]
pub struct StepOutcome {
    pub fields: SessionFieldMap,
    pub widgets: Vec<Widget>,
    // Submitted keys with no widget on the rendered page
    pub unapplied: Vec<String>,
}

#[derive(Clone)]
pub struct FormService {
    schema: Arc<FormSchema>,
}

impl FormService {
    pub fn new(schema: Arc<FormSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    /// Replays `changes` through the renderer for `step`. A change can reveal
    /// further fields (a radio choice showing its detail input), so the page is
    /// rendered again until nothing more applies.
    pub fn apply_step(
        &self,
        step: usize,
        fields: SessionFieldMap,
        changes: SessionFieldMap,
    ) -> Result<StepOutcome, AppError> {
        check_keys(&fields)?;
        check_keys(&changes)?;
        let renderer = FormRenderer::new(&self.schema);
        let mut session = fields;

        if changes.is_empty() {
            let widgets = renderer.render_step(step, &mut session, &mut WidgetCollector)?;
            return Ok(StepOutcome {
                fields: session,
                widgets,
                unapplied: Vec::new(),
            });
        }

        let mut ui = ReplayRenderer::new(changes);

        let mut widgets = renderer.render_step(step, &mut session, &mut ui)?;
        let mut pending = ui.unapplied().count();
        while pending > 0 {
            widgets = renderer.render_step(step, &mut session, &mut ui)?;
            let left = ui.unapplied().count();
            if left == pending {
                break;
            }
            pending = left;
        }

        let unapplied: Vec<String> = ui.unapplied().cloned().collect();
        if !unapplied.is_empty() {
            tracing::debug!("Step {}: {} change(s) had no visible widget", step, unapplied.len());
        }
        Ok(StepOutcome {
            fields: session,
            widgets,
            unapplied,
        })
    }

    /// Hidden and out-of-scope values never reach the document.
    pub fn build_document(&self, fields: &SessionFieldMap) -> Result<Value, AppError> {
        check_keys(fields)?;
        let visible = prune_hidden(&self.schema, fields);
        flatten_to_nested(&visible)
    }

    /// Drafts keep everything the user typed, hidden answers included, so a
    /// resumed draft looks exactly like it was left.
    pub fn draft_document(&self, fields: &SessionFieldMap) -> Result<Value, AppError> {
        flatten_to_nested(fields)
    }

    pub fn load_fields(&self, document: &Value) -> Result<SessionFieldMap, AppError> {
        populate_from_nested(document)
    }

    pub fn validate(&self, fields: &SessionFieldMap) -> Result<BTreeMap<String, String>, AppError> {
        check_keys(fields)?;
        let visible = prune_hidden(&self.schema, fields);
        Ok(validate_session(&self.schema, &visible))
    }

    pub fn ensure_valid(&self, fields: &SessionFieldMap) -> Result<(), AppError> {
        let errors = self.validate(fields)?;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::FormValidationError(errors))
        }
    }

    // --- LOTS ---

    pub fn add_lot(&self, mut fields: SessionFieldMap, name: &str) -> (SessionFieldMap, usize) {
        let index = lots::add_lot(&mut fields, name);
        (fields, index)
    }

    pub fn rename_lot(
        &self,
        mut fields: SessionFieldMap,
        index: usize,
        name: &str,
    ) -> Result<SessionFieldMap, AppError> {
        lots::rename_lot(&mut fields, index, name)?;
        Ok(fields)
    }

    pub fn remove_lot(&self, mut fields: SessionFieldMap, index: usize) -> Result<SessionFieldMap, AppError> {
        lots::remove_lot(&mut fields, index)?;
        Ok(fields)
    }

    pub fn copy_general_to_lot(
        &self,
        mut fields: SessionFieldMap,
        index: usize,
    ) -> Result<(SessionFieldMap, usize), AppError> {
        let copied = lots::copy_general_to_lot(&self.schema, &mut fields, index)?;
        Ok((fields, copied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::tests::bundled_schema;
    use serde_json::json;

    const CLIENT_STEP: usize = 0;
    const ORDER_TYPE_STEP: usize = 5;

    fn service() -> FormService {
        FormService::new(Arc::new(bundled_schema()))
    }

    fn fields(entries: &[(&str, Value)]) -> SessionFieldMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn apply_step_reveals_and_fills_dependent_fields() {
        let service = service();
        // singleClientName only appears once isSingleClient is true
        let changes = fields(&[
            ("clientInfo.isSingleClient", json!(true)),
            ("clientInfo.singleClientName", json!("Občina Koper")),
        ]);

        let outcome = service
            .apply_step(CLIENT_STEP, SessionFieldMap::new(), changes)
            .unwrap();

        assert_eq!(outcome.fields.get("clientInfo.singleClientName"), Some(&json!("Občina Koper")));
        assert!(outcome.unapplied.is_empty());
        assert!(outcome.widgets.iter().any(|w| w.key == "clientInfo.singleClientName"));
    }

    #[test]
    fn apply_step_reports_changes_without_widgets() {
        let service = service();
        let changes = fields(&[("general.orderType.nonexistent", json!(1))]);

        let outcome = service
            .apply_step(ORDER_TYPE_STEP, SessionFieldMap::new(), changes)
            .unwrap();

        assert_eq!(outcome.unapplied, vec!["general.orderType.nonexistent".to_string()]);
        assert!(!outcome.fields.contains_key("general.orderType.nonexistent"));
    }

    #[test]
    fn unknown_step_is_an_error() {
        let result = service().apply_step(42, SessionFieldMap::new(), SessionFieldMap::new());
        assert!(matches!(result, Err(AppError::UnknownStep(42))));
    }

    #[test]
    fn apply_step_rejects_array_slots_past_the_cap() {
        let service = service();
        let session = fields(&[
            ("general.orderType.isCofinanced", json!(true)),
            ("general.orderType.cofinancers.200000.cofinancerName", json!("X")),
        ]);

        let result = service.apply_step(ORDER_TYPE_STEP, session, SessionFieldMap::new());
        assert!(matches!(result, Err(AppError::InvalidFieldKey(_))));

        let changes = fields(&[("general.orderType.cofinancers.1000.cofinancerName", json!("X"))]);
        let result = service.apply_step(ORDER_TYPE_STEP, SessionFieldMap::new(), changes);
        assert!(matches!(result, Err(AppError::InvalidFieldKey(_))));
    }

    #[test]
    fn validate_and_build_reject_lots_past_the_cap() {
        let service = service();
        let session = fields(&[
            ("lotsInfo.hasLots", json!(true)),
            ("lotConfiguration.lots.100000.name", json!("X")),
        ]);

        assert!(matches!(service.validate(&session), Err(AppError::InvalidFieldKey(_))));
        assert!(matches!(service.build_document(&session), Err(AppError::InvalidFieldKey(_))));
        assert!(matches!(service.ensure_valid(&session), Err(AppError::InvalidFieldKey(_))));
    }

    #[test]
    fn hidden_fields_never_reach_the_document() {
        let service = service();
        let session = fields(&[
            ("clientInfo.isSingleClient", json!(false)),
            ("clientInfo.singleClientName", json!("Skrito")),
            ("projectInfo.projectName", json!("Vidno")),
        ]);

        let document = service.build_document(&session).unwrap();

        assert_eq!(document["projectInfo"]["projectName"], json!("Vidno"));
        assert!(document["clientInfo"].get("singleClientName").is_none());
    }

    #[test]
    fn document_round_trips_through_fields() {
        let service = service();
        let session = fields(&[
            ("projectInfo.projectName", json!("Obnova")),
            ("lotsInfo.hasLots", json!(true)),
            ("lotConfiguration.lots.0.name", json!("Sklop A")),
            ("lot_0.orderType.isCofinanced", json!(true)),
            ("lot_0.orderType.cofinancers.0.cofinancerName", json!("EU")),
        ]);

        let document = service.build_document(&session).unwrap();
        let restored = service.load_fields(&document).unwrap();

        assert_eq!(restored, session);
    }

    #[test]
    fn ensure_valid_reports_every_problem() {
        let result = service().ensure_valid(&SessionFieldMap::new());
        match result {
            Err(AppError::FormValidationError(errors)) => {
                assert!(errors.contains_key("projectInfo.projectName"));
                assert!(errors.contains_key("general.orderType.estimatedValue"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }
}
