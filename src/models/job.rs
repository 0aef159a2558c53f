// src/models/job.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::automation::{Channel, TriggerEvent};

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "entity_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Lead,
    Quote,
    Order,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Sent,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// `sent`, `failed` e `cancelled` são finais: nenhum job sai delas.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Sent | JobStatus::Failed | JobStatus::Cancelled)
    }

    /// Arestas permitidas da máquina de estados do job.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Pending => matches!(
                next,
                JobStatus::Processing | JobStatus::Sent | JobStatus::Failed | JobStatus::Cancelled
            ),
            // `processing` é transitório: segurado durante a tentativa de entrega.
            // A volta para `pending` é o adiamento por rate limit / quiet hours.
            JobStatus::Processing => matches!(
                next,
                JobStatus::Sent | JobStatus::Failed | JobStatus::Cancelled | JobStatus::Pending
            ),
            JobStatus::Sent | JobStatus::Failed | JobStatus::Cancelled => false,
        }
    }
}

// --- REFERÊNCIA POLIMÓRFICA ---

// A entidade que disparou o job (lead, orçamento ou pedido),
// como união etiquetada em vez de um par string+id solto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

// --- JOB (Uma instância concreta da regra) ---

// Carrega um snapshot dos campos relevantes da regra no momento da criação:
// apagar ou desativar a regra depois não afeta o job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutomationJob {
    pub id: Uuid,
    pub automation_id: Option<Uuid>,
    #[schema(ignore)]
    pub supplier_id: Option<Uuid>,
    pub recipient_user_id: Uuid,

    pub entity_kind: EntityKind,
    pub entity_id: Uuid,

    pub trigger_event: TriggerEvent,
    pub channel: Channel,
    pub message_template: Option<String>,

    // Imutável depois de criado: trigger_time + delay_hours.
    pub scheduled_for: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub attempts: i32,

    pub status: JobStatus,
    pub delivery_log: Option<Value>,
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl AutomationJob {
    pub fn entity(&self) -> EntityRef {
        EntityRef {
            kind: self.entity_kind,
            id: self.entity_id,
        }
    }
}

// Dados para inserir um job novo (os snapshots vêm da regra).
#[derive(Debug, Clone)]
pub struct NewAutomationJob {
    pub automation_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub recipient_user_id: Uuid,
    pub entity: EntityRef,
    pub trigger_event: TriggerEvent,
    pub channel: Channel,
    pub message_template: Option<String>,
    pub scheduled_for: DateTime<Utc>,
}

// --- ESTATÍSTICAS ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub pending: i64,
    pub processing: i64,
    pub sent: i64,
    pub failed: i64,
    pub cancelled: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estados_finais_nao_transicionam() {
        for terminal in [JobStatus::Sent, JobStatus::Failed, JobStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for next in [
                JobStatus::Pending,
                JobStatus::Processing,
                JobStatus::Sent,
                JobStatus::Failed,
                JobStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn pending_segue_as_arestas_da_maquina() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Sent));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn processing_resolve_ou_volta_para_pending() {
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Sent));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Cancelled));
        // Adiamento (rate limit / quiet hours) devolve para a fila.
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Pending));
    }
}
