// src/handlers/form.rs
//
// Stateless form operations: the client keeps the field map and sends it
// with every call.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{procurement::FieldsPayload, session::SessionFieldMap, widget::Widget},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyStepPayload {
    #[serde(default)]
    pub fields: SessionFieldMap,
    // Widget key -> new value; null clears the field
    #[serde(default)]
    pub changes: SessionFieldMap,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StepResponse {
    pub fields: SessionFieldMap,
    pub widgets: Vec<Widget>,
    pub unapplied: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LotPayload {
    #[serde(default)]
    pub fields: SessionFieldMap,

    #[validate(length(min = 1, max = 200, message = "Ime sklopa mora imeti od 1 do 200 znakov"))]
    #[schema(example = "Prenosni računalniki")]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LotResponse {
    pub fields: SessionFieldMap,
    pub index: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FieldsResponse {
    pub fields: SessionFieldMap,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CopyGeneralResponse {
    pub fields: SessionFieldMap,
    pub copied: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationReport {
    pub valid: bool,
    // Field key -> error code
    pub errors: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentPayload {
    #[schema(value_type = Object)]
    pub document: Value,
}

// POST /api/form/steps/{step}
#[utoipa::path(
    post,
    path = "/api/form/steps/{step}",
    tag = "Form",
    request_body = ApplyStepPayload,
    params(("step" = usize, Path, description = "Step index, 0-based")),
    responses(
        (status = 200, description = "Updated fields and the widgets of the step", body = StepResponse),
        (status = 404, description = "Unknown step")
    )
)]
pub async fn apply_step(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(step): Path<usize>,
    Json(payload): Json<ApplyStepPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = app_state
        .form_service
        .apply_step(step, payload.fields, payload.changes)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(StepResponse {
        fields: outcome.fields,
        widgets: outcome.widgets,
        unapplied: outcome.unapplied,
    }))
}

// POST /api/form/lots
#[utoipa::path(
    post,
    path = "/api/form/lots",
    tag = "Form",
    request_body = LotPayload,
    responses(
        (status = 200, description = "Lot added", body = LotResponse),
        (status = 400, description = "Invalid lot name")
    )
)]
pub async fn add_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<LotPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let (fields, index) = app_state.form_service.add_lot(payload.fields, &payload.name);
    Ok(Json(LotResponse { fields, index }))
}

// PUT /api/form/lots/{index}
#[utoipa::path(
    put,
    path = "/api/form/lots/{index}",
    tag = "Form",
    request_body = LotPayload,
    params(("index" = usize, Path, description = "Lot index, 0-based")),
    responses(
        (status = 200, description = "Lot renamed", body = FieldsResponse),
        (status = 404, description = "Unknown lot")
    )
)]
pub async fn rename_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(index): Path<usize>,
    Json(payload): Json<LotPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let fields = app_state
        .form_service
        .rename_lot(payload.fields, index, &payload.name)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(FieldsResponse { fields }))
}

// POST /api/form/lots/{index}/remove
#[utoipa::path(
    post,
    path = "/api/form/lots/{index}/remove",
    tag = "Form",
    request_body = FieldsPayload,
    params(("index" = usize, Path, description = "Lot index, 0-based")),
    responses(
        (status = 200, description = "Lot removed, later lots renumbered", body = FieldsResponse),
        (status = 404, description = "Unknown lot")
    )
)]
pub async fn remove_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(index): Path<usize>,
    Json(payload): Json<FieldsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = app_state
        .form_service
        .remove_lot(payload.fields, index)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(FieldsResponse { fields }))
}

// POST /api/form/lots/{index}/copy-general
#[utoipa::path(
    post,
    path = "/api/form/lots/{index}/copy-general",
    tag = "Form",
    request_body = FieldsPayload,
    params(("index" = usize, Path, description = "Lot index, 0-based")),
    responses(
        (status = 200, description = "General values copied into the lot", body = CopyGeneralResponse),
        (status = 404, description = "Unknown lot")
    )
)]
pub async fn copy_general_to_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(index): Path<usize>,
    Json(payload): Json<FieldsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let (fields, copied) = app_state
        .form_service
        .copy_general_to_lot(payload.fields, index)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(CopyGeneralResponse { fields, copied }))
}

// POST /api/form/validate
#[utoipa::path(
    post,
    path = "/api/form/validate",
    tag = "Form",
    request_body = FieldsPayload,
    responses(
        (status = 200, description = "Validation report", body = ValidationReport),
        (status = 400, description = "Malformed field keys")
    )
)]
pub async fn validate_form(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<FieldsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let errors = app_state
        .form_service
        .validate(&payload.fields)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(ValidationReport {
        valid: errors.is_empty(),
        errors,
    }))
}

// POST /api/form/document
#[utoipa::path(
    post,
    path = "/api/form/document",
    tag = "Form",
    request_body = FieldsPayload,
    responses(
        (status = 200, description = "Nested document without hidden fields", body = DocumentPayload),
        (status = 400, description = "Malformed or conflicting keys")
    )
)]
pub async fn build_document(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<FieldsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let document = app_state
        .form_service
        .build_document(&payload.fields)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(DocumentPayload { document }))
}

// POST /api/form/fields
#[utoipa::path(
    post,
    path = "/api/form/fields",
    tag = "Form",
    request_body = DocumentPayload,
    responses(
        (status = 200, description = "Flat field map", body = FieldsResponse),
        (status = 400, description = "Document root is not an object")
    )
)]
pub async fn load_fields(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<DocumentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = app_state
        .form_service
        .load_fields(&payload.document)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(FieldsResponse { fields }))
}
