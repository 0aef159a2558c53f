// src/services/notification_service.rs

use serde_json::{Value, json};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::NotificationRepository,
    models::notification::Notification,
    realtime::{RealtimeEvent, RealtimeHub},
};

#[derive(Clone)]
pub struct NotificationService {
    repo: NotificationRepository,
    hub: RealtimeHub,
}

impl NotificationService {
    pub fn new(repo: NotificationRepository, hub: RealtimeHub) -> Self {
        Self { repo, hub }
    }

    /// Insere a notificação e empurra o INSERT para as conexões realtime
    /// do usuário. Quem não está conectado vê na próxima consulta (o cache
    /// consultável é a fonte de verdade, o push é aceleração).
    pub async fn fanout<'e, E>(
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
        let notification = self
            .repo
            .insert(executor, user_id, kind, title, message, payload)
            .await?;

        let listeners = self.hub.publish(
            user_id,
            RealtimeEvent::insert("notifications", json!(notification)),
        );
        tracing::debug!(
            "🔔 Notificação {} criada para {} ({} conexão(ões) notificada(s))",
            notification.id,
            user_id,
            listeners
        );

        Ok(notification)
    }

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
        self.repo.list(executor, user_id, unread_only, kind).await
    }

    pub async fn unread_count<'e, E>(&self, executor: E, user_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.unread_count(executor, user_id).await
    }

    /// Idempotente: marcar o que já está lido devolve a linha sem erro.
    pub async fn mark_read<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Notification, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let notification = self
            .repo
            .mark_read(executor, id, user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        self.hub.publish(
            user_id,
            RealtimeEvent::update("notifications", json!(notification)),
        );

        Ok(notification)
    }

    pub async fn mark_all_read<'e, E>(&self, executor: E, user_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = self.repo.mark_all_read(executor, user_id).await?;
        if updated > 0 {
            self.hub.publish(
                user_id,
                RealtimeEvent::update("notifications", json!({ "markedRead": updated })),
            );
        }
        Ok(updated)
    }
}
