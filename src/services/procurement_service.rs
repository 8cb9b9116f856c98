// src/services/procurement_service.rs

use sqlx::{Acquire, Executor, Sqlite};

use crate::{
    common::error::AppError,
    db::ProcurementRepository,
    models::{
        procurement::{
            ProcurementRecord, ProcurementRow, ProcurementStatus, ProcurementSummary, RecordSummary,
        },
        schema::FormSchema,
        session::{value_as_f64, SessionFieldMap},
    },
    services::{
        draft_service::{parse_document, serialize_document},
        form_service::FormService,
        visibility::{active_scopes, prune_hidden},
    },
};

const PROJECT_NAME_KEY: &str = "projectInfo.projectName";
const ESTIMATED_VALUE_PATH: &str = "orderType.estimatedValue";

#[derive(Clone)]
pub struct ProcurementService {
    repo: ProcurementRepository,
    form: FormService,
}

impl ProcurementService {
    pub fn new(repo: ProcurementRepository, form: FormService) -> Self {
        Self { repo, form }
    }

    /// Inserts a new record (`id == None`) or overwrites an existing one.
    /// Concurrent saves of the same record: the last one wins.
    pub async fn save<'e, E>(
        &self,
        executor: E,
        id: Option<i64>,
        fields: &SessionFieldMap,
        status: ProcurementStatus,
    ) -> Result<ProcurementRecord, AppError>
    where
        E: Executor<'e, Database = Sqlite> + Acquire<'e, Database = Sqlite>,
    {
        if status == ProcurementStatus::Oddano {
            self.form.ensure_valid(fields)?;
        }

        let summary = extract_summary(self.form.schema(), fields);
        let document = self.form.build_document(fields)?;
        let json = serialize_document(&document)?;

        let mut tx = executor.begin().await?;
        let id = match id {
            Some(id) => {
                if !self.repo.update(&mut *tx, id, &summary, status, &json).await? {
                    return Err(AppError::ProcurementNotFound(id));
                }
                id
            }
            None => self.repo.insert(&mut *tx, &summary, status, &json).await?,
        };
        let row = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::ProcurementNotFound(id))?;
        tx.commit().await?;

        tracing::info!("Procurement record {} saved ({:?})", id, status);
        record_from_row(row)
    }

    pub async fn load<'e, E>(&self, executor: E, id: i64) -> Result<ProcurementRecord, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = self
            .repo
            .find_by_id(executor, id)
            .await?
            .ok_or(AppError::ProcurementNotFound(id))?;
        record_from_row(row)
    }

    pub async fn list<'e, E>(&self, executor: E) -> Result<Vec<ProcurementSummary>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        self.repo.list(executor).await
    }

    pub async fn delete<'e, E>(&self, executor: E, id: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if !self.repo.delete(executor, id).await? {
            return Err(AppError::ProcurementNotFound(id));
        }
        tracing::info!("Procurement record {} deleted", id);
        Ok(())
    }
}

/// Listing columns: project name and the estimated value, summed over lots.
pub fn extract_summary(schema: &FormSchema, fields: &SessionFieldMap) -> RecordSummary {
    let visible = prune_hidden(schema, fields);

    let naziv = visible
        .get(PROJECT_NAME_KEY)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let vrednost = active_scopes(&visible)
        .iter()
        .filter_map(|scope| visible.get(&scope.key(ESTIMATED_VALUE_PATH)))
        .filter_map(value_as_f64)
        .sum();

    RecordSummary { naziv, vrednost }
}

fn record_from_row(row: ProcurementRow) -> Result<ProcurementRecord, AppError> {
    Ok(ProcurementRecord {
        id: row.id,
        naziv: row.naziv,
        vrednost: row.vrednost,
        status: row.status,
        document: parse_document(&row.form_data_json)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
