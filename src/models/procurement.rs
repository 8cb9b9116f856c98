// src/models/procurement.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::session::SessionFieldMap;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProcurementStatus {
    #[default]
    Osnutek,
    Oddano,
}

// --- ROWS ---

#[derive(Debug, Clone, FromRow)]
pub struct DraftRow {
    pub id: i64,
    pub form_data_json: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftMetadata {
    #[schema(example = 3)]
    pub id: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProcurementRow {
    pub id: i64,
    pub naziv: Option<String>,
    pub vrednost: f64,
    pub status: ProcurementStatus,
    pub form_data_json: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing entry: summary columns only.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcurementSummary {
    #[schema(example = 12)]
    pub id: i64,
    #[schema(example = "Nakup računalniške opreme")]
    pub naziv: Option<String>,
    #[schema(example = 125000.0)]
    pub vrednost: f64,
    pub status: ProcurementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- DOMAIN ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: i64,
    #[schema(value_type = Object)]
    pub document: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcurementRecord {
    pub id: i64,
    pub naziv: Option<String>,
    pub vrednost: f64,
    pub status: ProcurementStatus,
    #[schema(value_type = Object)]
    pub document: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Summary columns derived from a form document.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSummary {
    pub naziv: Option<String>,
    pub vrednost: f64,
}

// --- PAYLOADS & RESPONSES ---

#[derive(Debug, Deserialize, ToSchema)]
pub struct FieldsPayload {
    #[serde(default)]
    pub fields: SessionFieldMap,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveProcurementPayload {
    #[serde(default)]
    pub fields: SessionFieldMap,
    #[serde(default)]
    pub status: ProcurementStatus,
}

/// Success/failure flag with a human-readable message.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OperationResult {
    pub success: bool,
    #[schema(example = "Osnutek je shranjen.")]
    pub message: String,
    pub id: Option<i64>,
}

impl OperationResult {
    pub fn ok(message: String, id: Option<i64>) -> Self {
        Self {
            success: true,
            message,
            id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DraftWithFields {
    #[serde(flatten)]
    pub draft: Draft,
    pub fields: SessionFieldMap,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcurementWithFields {
    #[serde(flatten)]
    pub record: ProcurementRecord,
    pub fields: SessionFieldMap,
}
