// src/db/draft_repo.rs

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::procurement::{DraftMetadata, DraftRow},
};

#[derive(Clone)]
pub struct DraftRepository {
    pool: SqlitePool,
}

impl DraftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, form_data_json: &str) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO drafts (form_data_json, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(form_data_json)
        .bind(now)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Returns `false` when no draft has this id.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: i64,
        form_data_json: &str,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE drafts SET form_data_json = ?, updated_at = ? WHERE id = ?")
            .bind(form_data_json)
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<DraftRow>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, DraftRow>(
            "SELECT id, form_data_json, created_at, updated_at FROM drafts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(row)
    }

    /// Newest first.
    pub async fn list_metadata<'e, E>(&self, executor: E) -> Result<Vec<DraftMetadata>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let drafts = sqlx::query_as::<_, DraftMetadata>(
            "SELECT id, updated_at FROM drafts ORDER BY updated_at DESC, id DESC",
        )
        .fetch_all(executor)
        .await?;

        Ok(drafts)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM drafts WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
