// src/db/procurement_repo.rs

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::procurement::{ProcurementRow, ProcurementStatus, ProcurementSummary, RecordSummary},
};

#[derive(Clone)]
pub struct ProcurementRepository {
    pool: SqlitePool,
}

impl ProcurementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        summary: &RecordSummary,
        status: ProcurementStatus,
        form_data_json: &str,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO javna_narocila (naziv, vrednost, status, form_data_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(summary.naziv.as_deref())
        .bind(summary.vrednost)
        .bind(status)
        .bind(form_data_json)
        .bind(now)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Overwrites the whole record. Returns `false` when the id is unknown.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: i64,
        summary: &RecordSummary,
        status: ProcurementStatus,
        form_data_json: &str,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE javna_narocila
            SET naziv = ?, vrednost = ?, status = ?, form_data_json = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(summary.naziv.as_deref())
        .bind(summary.vrednost)
        .bind(status)
        .bind(form_data_json)
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: i64,
    ) -> Result<Option<ProcurementRow>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, ProcurementRow>(
            r#"
            SELECT id, naziv, vrednost, status, form_data_json, created_at, updated_at
            FROM javna_narocila
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(row)
    }

    pub async fn list<'e, E>(&self, executor: E) -> Result<Vec<ProcurementSummary>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let records = sqlx::query_as::<_, ProcurementSummary>(
            r#"
            SELECT id, naziv, vrednost, status, created_at, updated_at
            FROM javna_narocila
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM javna_narocila WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
