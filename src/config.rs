// src/config.rs

use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    common::i18n::I18nStore,
    db::{DraftRepository, ProcurementRepository},
    models::schema::FormSchema,
    services::{
        document_service::{DocumentService, ExportSettings},
        draft_service::DraftService,
        form_service::FormService,
        procurement_service::ProcurementService,
    },
};

const DEFAULT_DATABASE_URL: &str = "sqlite://javna_narocila.db";
const DEFAULT_SCHEMA_PATH: &str = "schema/form_schema.json";
const DEFAULT_EXPORT_DIR: &str = "exports";
const DEFAULT_FONTS_DIR: &str = "./fonts";
const DEFAULT_FONT_FAMILY: &str = "LiberationSans";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub bind_addr: String,
    pub i18n_store: Arc<I18nStore>,
    pub form_service: FormService,
    pub draft_service: DraftService,
    pub procurement_service: ProcurementService,
    pub document_service: DocumentService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env_or("DATABASE_URL", DEFAULT_DATABASE_URL);
        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        // The database file is created on first start
        let connect_options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
        let db_pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(connect_options)
            .await?;

        tracing::info!("Database connection established: {}", database_url);

        let schema_path = PathBuf::from(env_or("FORM_SCHEMA_PATH", DEFAULT_SCHEMA_PATH));
        let schema = FormSchema::load(&schema_path)
            .map_err(|e| anyhow::anyhow!("cannot load form schema: {}", e))?;

        let export_settings = ExportSettings {
            export_dir: PathBuf::from(env_or("EXPORT_DIR", DEFAULT_EXPORT_DIR)),
            fonts_dir: PathBuf::from(env_or("FONTS_DIR", DEFAULT_FONTS_DIR)),
            font_family: env_or("FONT_FAMILY", DEFAULT_FONT_FAMILY),
        };

        let mut state = Self::build(db_pool, Arc::new(schema), I18nStore::load()?, export_settings);
        state.bind_addr = env_or("BIND_ADDR", DEFAULT_BIND_ADDR);
        Ok(state)
    }

    /// Wires repositories and services around an open pool.
    pub fn build(
        db_pool: SqlitePool,
        schema: Arc<FormSchema>,
        i18n_store: I18nStore,
        export_settings: ExportSettings,
    ) -> Self {
        let form_service = FormService::new(schema.clone());
        let draft_service = DraftService::new(DraftRepository::new(db_pool.clone()));
        let procurement_service =
            ProcurementService::new(ProcurementRepository::new(db_pool.clone()), form_service.clone());
        let document_service = DocumentService::new(schema, export_settings);

        Self {
            db_pool,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            i18n_store: Arc::new(i18n_store),
            form_service,
            draft_service,
            procurement_service,
            document_service,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
