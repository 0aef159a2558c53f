// src/db/notification_repo.rs

use serde_json::Value;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::notification::Notification};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind, title, message, payload, is_read, read_at, created_at";

#[derive(Clone, Default)]
pub struct NotificationRepository;

impl NotificationRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        kind: &str,
        title: &str,
        message: &str,
        payload: &Value,
    ) -> Result<Notification, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO notifications (user_id, kind, title, message, payload) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        let notification = sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(kind)
            .bind(title)
            .bind(message)
            .bind(payload)
            .fetch_one(executor)
            .await?;

        Ok(notification)
    }

    /// Notificações do usuário, mais recentes primeiro.
    /// unread_only filtra por read_at IS NULL.
    pub async fn list<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        unread_only: bool,
        kind: Option<&str>,
    ) -> Result<Vec<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = $1 \
               AND (NOT $2 OR read_at IS NULL) \
               AND ($3::text IS NULL OR kind = $3) \
             ORDER BY created_at DESC \
             LIMIT 100"
        );
        let notifications = sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(unread_only)
            .bind(kind)
            .fetch_all(executor)
            .await?;

        Ok(notifications)
    }

    pub async fn unread_count<'e, E>(&self, executor: E, user_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    /// Idempotente: marcar de novo não muda read_at nem dá erro.
    /// O filtro por user_id garante que ninguém marca linha dos outros.
    pub async fn mark_read<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE notifications \
             SET is_read = TRUE, read_at = COALESCE(read_at, NOW()) \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        let notification = sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(executor)
            .await?;

        Ok(notification)
    }

    pub async fn mark_all_read<'e, E>(&self, executor: E, user_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = TRUE, read_at = NOW() \
             WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
