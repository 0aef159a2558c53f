// src/models/constraint.rs

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::automation::{Channel, TriggerEvent};

// --- JANELA DE SILÊNCIO ---

// Janela por fornecedor durante a qual nenhuma entrega deve disparar.
// Pode cruzar a meia-noite (ex: 22:00 -> 08:00).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuietHoursConfig {
    pub id: Uuid,
    #[schema(ignore)]
    pub supplier_id: Option<Uuid>,

    #[schema(value_type = String, example = "22:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "08:00:00")]
    pub end_time: NaiveTime,

    // Nome IANA (ex: "America/Sao_Paulo")
    #[schema(example = "America/Sao_Paulo")]
    pub timezone: String,

    // Dias ISO (1 = segunda ... 7 = domingo). Vazio = todos os dias.
    #[schema(example = json!([1, 2, 3, 4, 5]))]
    pub days_of_week: Vec<i16>,

    pub updated_at: DateTime<Utc>,
}

// --- RATE LIMIT ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    pub id: Uuid,
    #[schema(ignore)]
    pub supplier_id: Option<Uuid>,

    pub channel: Channel,

    #[schema(example = 20)]
    pub max_per_hour: i32,
    #[schema(example = 100)]
    pub max_per_day: i32,

    pub updated_at: DateTime<Utc>,
}

// --- OPT-OUT ---

// Retirada de consentimento. automation_type NULL = todos os tipos do canal.
// Registro histórico imutável: só insere, nunca edita.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationOptOut {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(ignore)]
    pub supplier_id: Option<Uuid>,

    pub channel: Channel,
    pub automation_type: Option<TriggerEvent>,

    pub created_at: DateTime<Utc>,
}
