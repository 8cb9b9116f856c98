// src/handlers/schema.rs

use axum::{extract::State, response::IntoResponse, Json};

use crate::{config::AppState, models::schema::StepSummary};

// GET /api/schema
#[utoipa::path(
    get,
    path = "/api/schema",
    tag = "Schema",
    responses(
        (status = 200, description = "Form schema as loaded at startup", content_type = "application/json")
    )
)]
pub async fn get_schema(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.form_service.schema().raw().clone())
}

// GET /api/schema/steps
#[utoipa::path(
    get,
    path = "/api/schema/steps",
    tag = "Schema",
    responses(
        (status = 200, description = "Wizard steps in order", body = Vec<StepSummary>)
    )
)]
pub async fn list_steps(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.form_service.schema().step_summaries())
}
