//src/main.rs

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Without a schema or a database there is nothing to serve
    let app_state = AppState::new().await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("Database migrations applied");

    let addr = app_state.bind_addr.clone();
    let app = create_router(app_state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(app_state: AppState) -> Router {
    let schema_routes = Router::new()
        .route("/", get(handlers::schema::get_schema))
        .route("/steps", get(handlers::schema::list_steps));

    let form_routes = Router::new()
        .route("/steps/{step}", post(handlers::form::apply_step))
        .route("/lots", post(handlers::form::add_lot))
        .route("/lots/{index}", put(handlers::form::rename_lot))
        .route("/lots/{index}/remove", post(handlers::form::remove_lot))
        .route("/lots/{index}/copy-general", post(handlers::form::copy_general_to_lot))
        .route("/validate", post(handlers::form::validate_form))
        .route("/document", post(handlers::form::build_document))
        .route("/fields", post(handlers::form::load_fields));

    let draft_routes = Router::new()
        .route(
            "/",
            post(handlers::drafts::save_draft).get(handlers::drafts::list_drafts),
        )
        .route(
            "/{id}",
            get(handlers::drafts::get_draft)
                .put(handlers::drafts::update_draft)
                .delete(handlers::drafts::delete_draft),
        );

    let procurement_routes = Router::new()
        .route(
            "/",
            post(handlers::procurements::create_procurement)
                .get(handlers::procurements::list_procurements),
        )
        .route(
            "/{id}",
            get(handlers::procurements::get_procurement)
                .put(handlers::procurements::update_procurement)
                .delete(handlers::procurements::delete_procurement),
        )
        .route("/{id}/export", get(handlers::documents::export_procurement));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/schema", schema_routes)
        .nest("/api/form", form_routes)
        .nest("/api/drafts", draft_routes)
        .nest("/api/procurements", procurement_routes)
        .route("/api/export", post(handlers::documents::export_fields))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::i18n::I18nStore,
        db::tests::memory_pool,
        models::schema::tests::bundled_schema,
        services::document_service::ExportSettings,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_app() -> (Router, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::build(
            memory_pool().await,
            Arc::new(bundled_schema()),
            I18nStore::load().unwrap(),
            ExportSettings {
                export_dir: dir.path().join("exports"),
                fonts_dir: dir.path().join("fonts"),
                font_family: "LiberationSans".to_string(),
            },
        );
        (create_router(state), dir)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, _, bytes) = send_raw(app, method, uri, body, None).await;
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn send_raw(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
        language: Option<&str>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(language) = language {
            request = request.header(header::ACCEPT_LANGUAGE, language);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, bytes.to_vec())
    }

    fn valid_fields() -> Value {
        json!({
            "clientInfo.isSingleClient": true,
            "clientInfo.singleClientName": "Občina Piran",
            "projectInfo.projectName": "Obnova vrtca",
            "projectInfo.projectSubject": "Energetska sanacija",
            "submissionProcedure.procedure": "odprti postopek",
            "general.orderType.type": "gradnje",
            "general.orderType.estimatedValue": 480000,
            "general.executionDeadline.type": "meseci",
            "general.executionDeadline.months": 8,
            "contractInfo.type": "pogodba"
        })
    }

    #[tokio::test]
    async fn health_and_steps() {
        let (app, _dir) = test_app().await;

        let (status, _, body) = send_raw(&app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");

        let (status, steps) = send(&app, "GET", "/api/schema/steps", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(steps.as_array().map(Vec::len), Some(13));
        assert_eq!(steps[5]["lotScoped"], json!(true));
    }

    #[tokio::test]
    async fn errors_are_localised() {
        let (app, _dir) = test_app().await;

        let (status, body) = send(&app, "POST", "/api/form/steps/99", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Korak obrazca ne obstaja."));

        let (status, _, bytes) = send_raw(&app, "GET", "/api/drafts/7", None, Some("en-GB,en;q=0.9")).await;
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], json!("Draft not found."));
    }

    #[tokio::test]
    async fn step_changes_are_applied() {
        let (app, _dir) = test_app().await;
        let payload = json!({
            "fields": {},
            "changes": { "general.orderType.type": "blago", "general.orderType.deliveryType": "enkratna dobava" }
        });

        let (status, body) = send(&app, "POST", "/api/form/steps/5", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fields"]["general.orderType.deliveryType"], json!("enkratna dobava"));
        assert_eq!(body["unapplied"], json!([]));
        assert_eq!(body["widgets"][0]["kind"], json!("radio"));
    }

    #[tokio::test]
    async fn keys_past_the_array_cap_are_rejected() {
        let (app, _dir) = test_app().await;
        let fields = json!({
            "lotsInfo.hasLots": true,
            "lotConfiguration.lots.100000.name": "X"
        });

        for uri in ["/api/form/steps/5", "/api/form/validate", "/api/form/document", "/api/export"] {
            let (status, body) = send(&app, "POST", uri, Some(json!({ "fields": fields }))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["success"], json!(false));
        }
    }

    #[tokio::test]
    async fn lot_operations() {
        let (app, _dir) = test_app().await;

        let (status, body) = send(&app, "POST", "/api/form/lots", Some(json!({ "name": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["name"].is_array());

        let (status, body) = send(
            &app,
            "POST",
            "/api/form/lots",
            Some(json!({ "fields": { "general.priceInfo.priceClause": "fiksne cene" }, "name": "Sklop A" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["index"], json!(0));

        let (status, body) = send(
            &app,
            "POST",
            "/api/form/lots/0/copy-general",
            Some(json!({ "fields": body["fields"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["copied"], json!(1));
        assert_eq!(body["fields"]["lot_0.priceInfo.priceClause"], json!("fiksne cene"));

        let (status, _) = send(&app, "POST", "/api/form/lots/4/remove", Some(json!({ "fields": body["fields"] }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn draft_lifecycle() {
        let (app, _dir) = test_app().await;
        let fields = json!({
            "projectInfo.projectName": "Nakup vozil",
            "lot_0.orderType.cofinancers.1.cofinancerName": "EU"
        });

        let (status, saved) = send(&app, "POST", "/api/drafts", Some(json!({ "fields": fields }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(saved["success"], json!(true));
        let id = saved["id"].as_i64().unwrap();

        let (status, draft) = send(&app, "GET", &format!("/api/drafts/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(draft["fields"]["lot_0.orderType.cofinancers.1.cofinancerName"], json!("EU"));
        assert_eq!(draft["document"]["lot_0"]["orderType"]["cofinancers"][0], Value::Null);

        let (_, list) = send(&app, "GET", "/api/drafts", None).await;
        assert_eq!(list.as_array().map(Vec::len), Some(1));

        let (status, _) = send(&app, "DELETE", &format!("/api/drafts/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "GET", &format!("/api/drafts/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn submitting_an_incomplete_form_is_rejected() {
        let (app, _dir) = test_app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/procurements",
            Some(json!({ "fields": {}, "status": "oddano" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["details"]["projectInfo.projectName"], json!("required"));
    }

    #[tokio::test]
    async fn procurement_save_and_export() {
        let (app, dir) = test_app().await;

        let (status, saved) = send(
            &app,
            "POST",
            "/api/procurements",
            Some(json!({ "fields": valid_fields(), "status": "oddano" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = saved["id"].as_i64().unwrap();

        let (_, list) = send(&app, "GET", "/api/procurements", None).await;
        assert_eq!(list[0]["naziv"], json!("Obnova vrtca"));
        assert_eq!(list[0]["vrednost"], json!(480000.0));
        assert_eq!(list[0]["status"], json!("oddano"));

        let (status, headers, bytes) = send_raw(
            &app,
            "GET",
            &format!("/api/procurements/{}/export?format=word", id),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers[header::CONTENT_TYPE],
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.contains(&format!("javno_narocilo_{}_", id)));
        assert!(crate::services::word_export::tests::document_xml_of(&bytes).contains("Obnova vrtca"));
        assert_eq!(std::fs::read_dir(dir.path().join("exports")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn unsaved_form_exports_as_novo() {
        let (app, _dir) = test_app().await;

        let (status, headers, _) = send_raw(
            &app,
            "POST",
            "/api/export",
            Some(json!({ "fields": valid_fields(), "format": "word" })),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.contains("javno_narocilo_novo_"));
        assert!(disposition.contains(".docx"));
    }
}
