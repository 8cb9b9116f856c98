// src/services/draft_service.rs

use serde_json::Value;
use sqlx::{Executor, Sqlite};

use crate::{
    common::error::AppError,
    db::DraftRepository,
    models::procurement::{Draft, DraftMetadata, DraftRow},
};

#[derive(Clone)]
pub struct DraftService {
    repo: DraftRepository,
}

impl DraftService {
    pub fn new(repo: DraftRepository) -> Self {
        Self { repo }
    }

    pub async fn save<'e, E>(&self, executor: E, document: &Value) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let json = serialize_document(document)?;
        let id = self.repo.insert(executor, &json).await?;
        tracing::info!("Draft {} saved", id);
        Ok(id)
    }

    pub async fn update<'e, E>(&self, executor: E, id: i64, document: &Value) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let json = serialize_document(document)?;
        if !self.repo.update(executor, id, &json).await? {
            return Err(AppError::DraftNotFound(id));
        }
        tracing::info!("Draft {} updated", id);
        Ok(())
    }

    pub async fn load<'e, E>(&self, executor: E, id: i64) -> Result<Draft, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = self
            .repo
            .find_by_id(executor, id)
            .await?
            .ok_or(AppError::DraftNotFound(id))?;
        draft_from_row(row)
    }

    pub async fn list_metadata<'e, E>(&self, executor: E) -> Result<Vec<DraftMetadata>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        self.repo.list_metadata(executor).await
    }

    pub async fn delete<'e, E>(&self, executor: E, id: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if !self.repo.delete(executor, id).await? {
            return Err(AppError::DraftNotFound(id));
        }
        tracing::info!("Draft {} deleted", id);
        Ok(())
    }
}

pub(crate) fn serialize_document(document: &Value) -> Result<String, AppError> {
    if !document.is_object() {
        return Err(AppError::InvalidDocument("document root must be an object".to_string()));
    }
    serde_json::to_string(document).map_err(|e| AppError::InvalidDocument(e.to_string()))
}

pub(crate) fn parse_document(json: &str) -> Result<Value, AppError> {
    serde_json::from_str(json).map_err(|e| AppError::CorruptDocument(e.to_string()))
}

fn draft_from_row(row: DraftRow) -> Result<Draft, AppError> {
    Ok(Draft {
        id: row.id,
        document: parse_document(&row.form_data_json)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::memory_pool;
    use serde_json::json;

    fn service(pool: &sqlx::SqlitePool) -> DraftService {
        DraftService::new(DraftRepository::new(pool.clone()))
    }

    #[tokio::test]
    async fn saved_draft_loads_back_unchanged() {
        let pool = memory_pool().await;
        let service = service(&pool);
        let document = json!({
            "projectInfo": { "projectName": "Nakup vozil" },
            "lot_0": { "orderType": { "cofinancers": [{ "cofinancerName": "EU" }] } }
        });

        let id = service.save(&pool, &document).await.unwrap();
        let draft = service.load(&pool, id).await.unwrap();

        assert_eq!(draft.id, id);
        assert_eq!(draft.document, document);
    }

    #[tokio::test]
    async fn update_replaces_the_document() {
        let pool = memory_pool().await;
        let service = service(&pool);
        let id = service.save(&pool, &json!({ "a": 1 })).await.unwrap();

        service.update(&pool, id, &json!({ "b": 2 })).await.unwrap();

        assert_eq!(service.load(&pool, id).await.unwrap().document, json!({ "b": 2 }));
    }

    #[tokio::test]
    async fn metadata_lists_every_draft() {
        let pool = memory_pool().await;
        let service = service(&pool);
        let first = service.save(&pool, &json!({})).await.unwrap();
        let second = service.save(&pool, &json!({})).await.unwrap();

        let ids: Vec<i64> = service
            .list_metadata(&pool)
            .await
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();

        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first) && ids.contains(&second));
    }

    #[tokio::test]
    async fn missing_draft_is_not_found() {
        let pool = memory_pool().await;
        let service = service(&pool);

        assert!(matches!(service.load(&pool, 99).await, Err(AppError::DraftNotFound(99))));
        assert!(matches!(
            service.update(&pool, 99, &json!({})).await,
            Err(AppError::DraftNotFound(99))
        ));
        assert!(matches!(service.delete(&pool, 99).await, Err(AppError::DraftNotFound(99))));
    }

    #[tokio::test]
    async fn deleted_draft_is_gone() {
        let pool = memory_pool().await;
        let service = service(&pool);
        let id = service.save(&pool, &json!({})).await.unwrap();

        service.delete(&pool, id).await.unwrap();

        assert!(matches!(service.load(&pool, id).await, Err(AppError::DraftNotFound(_))));
    }

    #[tokio::test]
    async fn non_object_document_is_rejected() {
        let pool = memory_pool().await;
        let result = service(&pool).save(&pool, &json!([1, 2])).await;
        assert!(matches!(result, Err(AppError::InvalidDocument(_))));
    }
}
