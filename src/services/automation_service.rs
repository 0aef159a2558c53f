// src/services/automation_service.rs

use serde_json::Value;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{AppError, field_validation_error},
    db::AutomationRepository,
    models::automation::{Channel, CommunicationAutomation, TriggerEvent},
};

#[derive(Clone)]
pub struct AutomationService {
    repo: AutomationRepository,
}

impl AutomationService {
    pub fn new(repo: AutomationRepository) -> Self {
        Self { repo }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        supplier_id: Uuid,
    ) -> Result<Vec<CommunicationAutomation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_by_supplier(executor, supplier_id).await
    }

    pub async fn list_templates<'e, E>(
        &self,
        executor: E,
    ) -> Result<Vec<CommunicationAutomation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_templates(executor).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create<'e, E>(
        &self,
        executor: E,
        supplier_id: Uuid,
        name: &str,
        description: Option<&str>,
        trigger_event: TriggerEvent,
        trigger_conditions: Option<Value>,
        delay_hours: i32,
        channel: Channel,
        template_id: Option<Uuid>,
        message_template: Option<&str>,
    ) -> Result<CommunicationAutomation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // A regra precisa ter conteúdo: template gerenciado ou corpo inline.
        if template_id.is_none() && message_template.is_none() {
            return Err(field_validation_error("messageTemplate", "required"));
        }
        if let Some(conditions) = &trigger_conditions {
            if !conditions.is_null() && !conditions.is_object() {
                return Err(field_validation_error("triggerConditions", "invalid_object"));
            }
        }

        self.repo
            .create(
                executor,
                supplier_id,
                name,
                description,
                trigger_event,
                trigger_conditions.as_ref(),
                delay_hours,
                channel,
                template_id,
                message_template,
            )
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        supplier_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        trigger_conditions: Option<Value>,
        delay_hours: Option<i32>,
        channel: Option<Channel>,
        message_template: Option<&str>,
    ) -> Result<CommunicationAutomation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if let Some(delay) = delay_hours {
            if delay < 0 {
                return Err(field_validation_error("delayHours", "min_zero"));
            }
        }
        if let Some(conditions) = &trigger_conditions {
            if !conditions.is_null() && !conditions.is_object() {
                return Err(field_validation_error("triggerConditions", "invalid_object"));
            }
        }

        self.repo
            .update(
                executor,
                id,
                supplier_id,
                name,
                description,
                trigger_conditions.as_ref(),
                delay_hours,
                channel,
                message_template,
            )
            .await
    }

    /// Liga/desliga a regra. Desligar só barra agendamentos futuros:
    /// jobs já criados continuam o caminho deles.
    pub async fn toggle<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        supplier_id: Uuid,
        is_active: bool,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let affected = self.repo.set_active(executor, id, supplier_id, is_active).await?;
        if affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    pub async fn delete<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        supplier_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let affected = self.repo.delete(executor, id, supplier_id).await?;
        if affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
