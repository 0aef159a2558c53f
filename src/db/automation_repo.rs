// src/db/automation_repo.rs

use serde_json::Value;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::automation::{Channel, CommunicationAutomation, TriggerEvent},
};

const AUTOMATION_COLUMNS: &str = r#"
    id, supplier_id, name, description, trigger_event, trigger_conditions,
    delay_hours, channel, template_id, message_template, is_active,
    created_at, updated_at
"#;

// Sem estado próprio: cada método recebe o executor (pool, conexão RLS
// ou transação) de quem chama.
#[derive(Clone, Default)]
pub struct AutomationRepository;

impl AutomationRepository {
    pub fn new() -> Self {
        Self
    }

    /// Regras do fornecedor, mais recentes primeiro.
    pub async fn list_by_supplier<'e, E>(
        &self,
        executor: E,
        supplier_id: Uuid,
    ) -> Result<Vec<CommunicationAutomation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {AUTOMATION_COLUMNS} FROM communication_automations \
             WHERE supplier_id = $1 ORDER BY created_at DESC"
        );
        let rules = sqlx::query_as::<_, CommunicationAutomation>(&sql)
            .bind(supplier_id)
            .fetch_all(executor)
            .await?;

        Ok(rules)
    }

    /// Templates globais (supplier_id IS NULL), usados como ponto de partida.
    pub async fn list_templates<'e, E>(
        &self,
        executor: E,
    ) -> Result<Vec<CommunicationAutomation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {AUTOMATION_COLUMNS} FROM communication_automations \
             WHERE supplier_id IS NULL ORDER BY created_at DESC"
        );
        let templates = sqlx::query_as::<_, CommunicationAutomation>(&sql)
            .fetch_all(executor)
            .await?;

        Ok(templates)
    }

    /// Regras ativas do fornecedor para um evento. É daqui que sai o fanout:
    /// cada linha retornada pode virar um job.
    pub async fn list_active_for_trigger<'e, E>(
        &self,
        executor: E,
        supplier_id: Uuid,
        trigger_event: TriggerEvent,
    ) -> Result<Vec<CommunicationAutomation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {AUTOMATION_COLUMNS} FROM communication_automations \
             WHERE supplier_id = $1 AND trigger_event = $2 AND is_active \
             ORDER BY created_at ASC"
        );
        let rules = sqlx::query_as::<_, CommunicationAutomation>(&sql)
            .bind(supplier_id)
            .bind(trigger_event)
            .fetch_all(executor)
            .await?;

        Ok(rules)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Option<CommunicationAutomation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {AUTOMATION_COLUMNS} FROM communication_automations \
             WHERE id = $1 AND supplier_id = $2"
        );
        let rule = sqlx::query_as::<_, CommunicationAutomation>(&sql)
            .bind(id)
            .bind(supplier_id)
            .fetch_optional(executor)
            .await?;

        Ok(rule)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create<'e, E>(
        &self,
        executor: E,
        supplier_id: Uuid,
        name: &str,
        description: Option<&str>,
        trigger_event: TriggerEvent,
        trigger_conditions: Option<&Value>,
        delay_hours: i32,
        channel: Channel,
        template_id: Option<Uuid>,
        message_template: Option<&str>,
    ) -> Result<CommunicationAutomation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO communication_automations \
             (supplier_id, name, description, trigger_event, trigger_conditions, \
              delay_hours, channel, template_id, message_template) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {AUTOMATION_COLUMNS}"
        );
        let rule = sqlx::query_as::<_, CommunicationAutomation>(&sql)
            .bind(supplier_id)
            .bind(name)
            .bind(description)
            .bind(trigger_event)
            .bind(trigger_conditions)
            .bind(delay_hours)
            .bind(channel)
            .bind(template_id)
            .bind(message_template)
            .fetch_one(executor)
            .await?;

        Ok(rule)
    }

    /// Atualização parcial: campos None mantêm o valor atual.
    #[allow(clippy::too_many_arguments)]
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        supplier_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        trigger_conditions: Option<&Value>,
        delay_hours: Option<i32>,
        channel: Option<Channel>,
        message_template: Option<&str>,
    ) -> Result<CommunicationAutomation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE communication_automations SET \
                name = COALESCE($3, name), \
                description = COALESCE($4, description), \
                trigger_conditions = COALESCE($5, trigger_conditions), \
                delay_hours = COALESCE($6, delay_hours), \
                channel = COALESCE($7, channel), \
                message_template = COALESCE($8, message_template), \
                updated_at = NOW() \
             WHERE id = $1 AND supplier_id = $2 \
             RETURNING {AUTOMATION_COLUMNS}"
        );
        let rule = sqlx::query_as::<_, CommunicationAutomation>(&sql)
            .bind(id)
            .bind(supplier_id)
            .bind(name)
            .bind(description)
            .bind(trigger_conditions)
            .bind(delay_hours)
            .bind(channel)
            .bind(message_template)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound)?;

        Ok(rule)
    }

    /// Liga/desliga a regra. Não toca em jobs já agendados.
    pub async fn set_active<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        supplier_id: Uuid,
        is_active: bool,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE communication_automations \
             SET is_active = $3, updated_at = NOW() \
             WHERE id = $1 AND supplier_id = $2",
        )
        .bind(id)
        .bind(supplier_id)
        .bind(is_active)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Apaga só a regra. Jobs em andamento seguem no snapshot deles.
    pub async fn delete<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        supplier_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM communication_automations WHERE id = $1 AND supplier_id = $2",
        )
        .bind(id)
        .bind(supplier_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
