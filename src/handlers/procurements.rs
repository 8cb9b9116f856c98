// src/handlers/procurements.rs

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
    models::procurement::{
        OperationResult, ProcurementWithFields, ProcurementSummary, SaveProcurementPayload,
    },
};

// GET /api/procurements
#[utoipa::path(
    get,
    path = "/api/procurements",
    tag = "Procurements",
    responses(
        (status = 200, description = "Summaries of saved procurement records", body = Vec<ProcurementSummary>)
    )
)]
pub async fn list_procurements(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let records = app_state
        .procurement_service
        .list(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(records))
}

// POST /api/procurements
#[utoipa::path(
    post,
    path = "/api/procurements",
    tag = "Procurements",
    request_body = SaveProcurementPayload,
    responses(
        (status = 201, description = "Record created", body = OperationResult),
        (status = 422, description = "Submitted form is not valid")
    )
)]
pub async fn create_procurement(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<SaveProcurementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let record = app_state
        .procurement_service
        .save(&app_state.db_pool, None, &payload.fields, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let message = app_state.i18n_store.translate(&locale.0, "procurement_saved");
    Ok((StatusCode::CREATED, Json(OperationResult::ok(message, Some(record.id)))))
}

// GET /api/procurements/{id}
#[utoipa::path(
    get,
    path = "/api/procurements/{id}",
    tag = "Procurements",
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 200, description = "Record with its field map", body = ProcurementWithFields),
        (status = 404, description = "Record not found")
    )
)]
pub async fn get_procurement(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let record = app_state
        .procurement_service
        .load(&app_state.db_pool, id)
        .await
        .map_err(to_api)?;
    let fields = app_state
        .form_service
        .load_fields(&record.document)
        .map_err(to_api)?;

    Ok(Json(ProcurementWithFields { record, fields }))
}

// PUT /api/procurements/{id}
#[utoipa::path(
    put,
    path = "/api/procurements/{id}",
    tag = "Procurements",
    request_body = SaveProcurementPayload,
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 200, description = "Record overwritten", body = OperationResult),
        (status = 404, description = "Record not found"),
        (status = 422, description = "Submitted form is not valid")
    )
)]
pub async fn update_procurement(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
    Json(payload): Json<SaveProcurementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .procurement_service
        .save(&app_state.db_pool, Some(id), &payload.fields, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let message = app_state.i18n_store.translate(&locale.0, "procurement_saved");
    Ok(Json(OperationResult::ok(message, Some(id))))
}

// DELETE /api/procurements/{id}
#[utoipa::path(
    delete,
    path = "/api/procurements/{id}",
    tag = "Procurements",
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 200, description = "Record deleted", body = OperationResult),
        (status = 404, description = "Record not found")
    )
)]
pub async fn delete_procurement(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .procurement_service
        .delete(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let message = app_state.i18n_store.translate(&locale.0, "procurement_deleted");
    Ok(Json(OperationResult::ok(message, Some(id))))
}
