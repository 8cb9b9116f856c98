// src/handlers/documents.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{
        document::{ExportFormat, ExportOptions, ExportedFile},
        session::SessionFieldMap,
    },
};

// Where the server kept its copy of the file
static EXPORT_PATH_HEADER: HeaderName = HeaderName::from_static("x-export-path");

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
    pub prefix: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExportPayload {
    #[serde(default)]
    pub fields: SessionFieldMap,
    #[serde(default)]
    pub format: ExportFormat,
    #[schema(example = "javno_narocilo")]
    pub prefix: Option<String>,
}

// GET /api/procurements/{id}/export
#[utoipa::path(
    get,
    path = "/api/procurements/{id}/export",
    tag = "Export",
    params(
        ("id" = i64, Path, description = "Record id"),
        ExportQuery
    ),
    responses(
        (status = 200, description = "Exported document", content_type = "application/octet-stream"),
        (status = 404, description = "Record not found"),
        (status = 500, description = "Fonts missing or rendering failed")
    )
)]
pub async fn export_procurement(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let record = app_state
        .procurement_service
        .load(&app_state.db_pool, id)
        .await
        .map_err(to_api)?;

    let options = ExportOptions {
        format: query.format,
        record_id: Some(id),
        prefix: query.prefix,
    };
    let exported = app_state
        .document_service
        .generate(&record.document, &options)
        .await
        .map_err(to_api)?;

    Ok(file_response(exported))
}

// POST /api/export
#[utoipa::path(
    post,
    path = "/api/export",
    tag = "Export",
    request_body = ExportPayload,
    responses(
        (status = 200, description = "Exported document of an unsaved form", content_type = "application/octet-stream"),
        (status = 400, description = "Malformed field keys"),
        (status = 500, description = "Fonts missing or rendering failed")
    )
)]
pub async fn export_fields(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<ExportPayload>,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let document = app_state
        .form_service
        .build_document(&payload.fields)
        .map_err(to_api)?;

    let options = ExportOptions {
        format: payload.format,
        record_id: None,
        prefix: payload.prefix,
    };
    let exported = app_state
        .document_service
        .generate(&document, &options)
        .await
        .map_err(to_api)?;

    Ok(file_response(exported))
}

fn file_response(exported: ExportedFile) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", exported.file_name);
    let path = exported.path.display().to_string();
    let headers = [
        (header::CONTENT_TYPE, exported.format.content_type().to_string()),
        (header::CONTENT_DISPOSITION, disposition),
        (EXPORT_PATH_HEADER.clone(), path),
    ];

    (headers, exported.bytes).into_response()
}
