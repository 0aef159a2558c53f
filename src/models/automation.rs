// src/models/automation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- ENUMS ---

// Mapeia o CREATE TYPE trigger_event do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "trigger_event", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    LeadNew,
    QuoteSentNoOpen,
    QuoteViewedNoAccept,
    PaymentDue,
    OrderCompletedReview,
}

// Mapeia o CREATE TYPE comm_channel do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "comm_channel", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    Notification,
    Whatsapp,
}

// --- REGRA (A Definição) ---

// "Quando o evento X acontecer, depois de D horas, envia pelo canal C."
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationAutomation {
    pub id: Uuid,

    // NULL = template global (sem dono)
    #[schema(ignore)]
    pub supplier_id: Option<Uuid>,

    #[schema(example = "Lembrete de orçamento não aberto")]
    pub name: String,
    pub description: Option<String>,

    pub trigger_event: TriggerEvent,

    // Predicado opaco: objeto JSON de igualdades chave/valor
    // avaliado contra o contexto do evento. NULL = sempre casa.
    #[schema(example = json!({"category": "eletricista"}))]
    pub trigger_conditions: Option<Value>,

    #[schema(example = 24)]
    pub delay_hours: i32,

    pub channel: Channel,

    // Ou um template gerenciado, ou um corpo inline.
    pub template_id: Option<Uuid>,
    pub message_template: Option<String>,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
