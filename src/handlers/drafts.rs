// src/handlers/drafts.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::procurement::{DraftMetadata, DraftWithFields, FieldsPayload, OperationResult},
};

// GET /api/drafts
#[utoipa::path(
    get,
    path = "/api/drafts",
    tag = "Drafts",
    responses(
        (status = 200, description = "Saved drafts, newest first", body = Vec<DraftMetadata>)
    )
)]
pub async fn list_drafts(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let drafts = app_state
        .draft_service
        .list_metadata(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(drafts))
}

// POST /api/drafts
#[utoipa::path(
    post,
    path = "/api/drafts",
    tag = "Drafts",
    request_body = FieldsPayload,
    responses(
        (status = 201, description = "Draft saved", body = OperationResult),
        (status = 400, description = "Malformed field keys")
    )
)]
pub async fn save_draft(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<FieldsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let document = app_state
        .form_service
        .draft_document(&payload.fields)
        .map_err(to_api)?;
    let id = app_state
        .draft_service
        .save(&app_state.db_pool, &document)
        .await
        .map_err(to_api)?;

    let message = app_state.i18n_store.translate(&locale.0, "draft_saved");
    Ok((StatusCode::CREATED, Json(OperationResult::ok(message, Some(id)))))
}

// GET /api/drafts/{id}
#[utoipa::path(
    get,
    path = "/api/drafts/{id}",
    tag = "Drafts",
    params(("id" = i64, Path, description = "Draft id")),
    responses(
        (status = 200, description = "Draft with its field map", body = DraftWithFields),
        (status = 404, description = "Draft not found")
    )
)]
pub async fn get_draft(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let draft = app_state
        .draft_service
        .load(&app_state.db_pool, id)
        .await
        .map_err(to_api)?;
    let fields = app_state
        .form_service
        .load_fields(&draft.document)
        .map_err(to_api)?;

    Ok(Json(DraftWithFields { draft, fields }))
}

// PUT /api/drafts/{id}
#[utoipa::path(
    put,
    path = "/api/drafts/{id}",
    tag = "Drafts",
    request_body = FieldsPayload,
    params(("id" = i64, Path, description = "Draft id")),
    responses(
        (status = 200, description = "Draft updated", body = OperationResult),
        (status = 404, description = "Draft not found")
    )
)]
pub async fn update_draft(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
    Json(payload): Json<FieldsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let document = app_state
        .form_service
        .draft_document(&payload.fields)
        .map_err(to_api)?;
    app_state
        .draft_service
        .update(&app_state.db_pool, id, &document)
        .await
        .map_err(to_api)?;

    let message = app_state.i18n_store.translate(&locale.0, "draft_saved");
    Ok(Json(OperationResult::ok(message, Some(id))))
}

// DELETE /api/drafts/{id}
#[utoipa::path(
    delete,
    path = "/api/drafts/{id}",
    tag = "Drafts",
    params(("id" = i64, Path, description = "Draft id")),
    responses(
        (status = 200, description = "Draft deleted", body = OperationResult),
        (status = 404, description = "Draft not found")
    )
)]
pub async fn delete_draft(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .draft_service
        .delete(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let message = app_state.i18n_store.translate(&locale.0, "draft_deleted");
    Ok(Json(OperationResult::ok(message, Some(id))))
}
