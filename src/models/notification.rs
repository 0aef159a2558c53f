// src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Notificação in-app. Criada direto pelo fanout (não passa pelo pipeline
// de jobs). O cliente só mexe em is_read/read_at, nunca apaga.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,

    #[schema(example = "lead_new")]
    pub kind: String,
    #[schema(example = "Novo lead recebido")]
    pub title: String,
    pub message: String,
    pub payload: Value,

    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    #[schema(example = 3)]
    pub count: i64,
}
