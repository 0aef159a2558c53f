// src/db/search_repo.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::common::recent_searches::RecentSearchStore;

// Implementação Postgres da porta de buscas recentes: a lista inteira
// vive numa linha JSONB por usuário (é pequena e sempre lida/gravada junta).
#[derive(Clone)]
pub struct PgRecentSearchStore {
    pool: PgPool,
}

impl PgRecentSearchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecentSearchStore for PgRecentSearchStore {
    async fn load(&self, user_id: Uuid) -> Result<Vec<String>, AppError> {
        let terms: Option<Value> =
            sqlx::query_scalar("SELECT terms FROM recent_searches WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        match terms {
            Some(value) => {
                let list: Vec<String> = serde_json::from_value(value)
                    .map_err(|e| anyhow::anyhow!("recent_searches corrompido: {}", e))?;
                Ok(list)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, user_id: Uuid, terms: &[String]) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO recent_searches (user_id, terms) \
             VALUES ($1, $2) \
             ON CONFLICT (user_id) \
             DO UPDATE SET terms = EXCLUDED.terms, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(serde_json::json!(terms))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
