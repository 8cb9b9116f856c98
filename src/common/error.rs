// src/common/error.rs

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Payload validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    // Field key -> error code ("required", "invalid_date_format", ...)
    #[error("Form validation failed on {} field(s)", .0.len())]
    FormValidationError(BTreeMap<String, String>),

    #[error("Draft {0} not found")]
    DraftNotFound(i64),

    #[error("Procurement record {0} not found")]
    ProcurementNotFound(i64),

    #[error("Invalid field key: '{0}'")]
    InvalidFieldKey(String),

    #[error("Key '{0}' clashes with a value already stored on the same path")]
    PathConflict(String),

    #[error("Invalid form document: {0}")]
    InvalidDocument(String),

    #[error("Stored form document is not valid JSON: {0}")]
    CorruptDocument(String),

    #[error("Unknown wizard step {0}")]
    UnknownStep(usize),

    #[error("Lot {0} does not exist")]
    LotNotFound(usize),

    #[error("Invalid form schema: {0}")]
    InvalidSchema(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Status code and message key in the locale catalogues.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::FormValidationError(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "form_validation_failed")
            }
            AppError::DraftNotFound(_) => (StatusCode::NOT_FOUND, "draft_not_found"),
            AppError::ProcurementNotFound(_) => (StatusCode::NOT_FOUND, "procurement_not_found"),
            AppError::InvalidFieldKey(_) => (StatusCode::BAD_REQUEST, "invalid_field_key"),
            AppError::PathConflict(_) => (StatusCode::BAD_REQUEST, "path_conflict"),
            AppError::InvalidDocument(_) => (StatusCode::BAD_REQUEST, "invalid_document"),
            AppError::UnknownStep(_) => (StatusCode::NOT_FOUND, "unknown_step"),
            AppError::LotNotFound(_) => (StatusCode::NOT_FOUND, "lot_not_found"),
            AppError::CorruptDocument(_) => (StatusCode::INTERNAL_SERVER_ERROR, "corrupt_document"),
            AppError::InvalidSchema(_) => (StatusCode::INTERNAL_SERVER_ERROR, "invalid_schema"),
            AppError::FontNotFound(_) => (StatusCode::INTERNAL_SERVER_ERROR, "font_not_found"),
            AppError::ExportFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "export_failed"),
            AppError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::IoError(_) | AppError::InternalServerError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }

    /// Translates the error into the user's language.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!("Internal server error: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", code, self);
        }

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = BTreeMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::FormValidationError(errors) => Some(json!(errors)),
            _ => None,
        };

        ApiError {
            status,
            message: store.translate(&locale.0, code),
            details,
        }
    }
}

// Error already resolved to the response the client sees.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({
                "success": false,
                "message": self.message,
                "details": details,
            }),
            None => json!({
                "success": false,
                "message": self.message,
            }),
        };
        (self.status, Json(body)).into_response()
    }
}
