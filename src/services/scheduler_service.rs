// src/services/scheduler_service.rs

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AutomationRepository, JobRepository},
    models::automation::{CommunicationAutomation, TriggerEvent},
    models::job::{AutomationJob, EntityRef, NewAutomationJob},
};

// =============================================================================
//  AGENDADOR: evento de negócio -> jobs pendentes (fanout)
// =============================================================================

#[derive(Clone)]
pub struct SchedulerService {
    automation_repo: AutomationRepository,
    job_repo: JobRepository,
}

/// scheduled_for = instante do gatilho + delay em horas, exato.
/// delay 0 = "elegível imediatamente", mas passa pela mesma checagem de
/// vencimento do executor como qualquer outro.
pub fn compute_scheduled_for(trigger_time: DateTime<Utc>, delay_hours: i32) -> DateTime<Utc> {
    trigger_time + Duration::hours(delay_hours as i64)
}

/// Avalia o predicado da regra contra o contexto do evento.
/// O predicado é um objeto de igualdades chave/valor: todas precisam bater.
/// NULL, ausente ou objeto vazio = sempre casa.
pub fn matches_conditions(conditions: Option<&Value>, context: &Value) -> bool {
    let Some(conditions) = conditions else {
        return true;
    };
    let Some(required) = conditions.as_object() else {
        // Predicado mal formado não derruba o fanout: trata como "sem condição".
        return conditions.is_null();
    };
    if required.is_empty() {
        return true;
    }

    let Some(ctx) = context.as_object() else {
        return false;
    };
    required.iter().all(|(key, expected)| ctx.get(key) == Some(expected))
}

/// Snapshot da regra no momento do agendamento: o job carrega os campos
/// de que precisa e segue o caminho dele mesmo se a regra mudar ou sumir.
pub fn job_from_rule(
    rule: &CommunicationAutomation,
    entity: EntityRef,
    recipient_user_id: Uuid,
    trigger_time: DateTime<Utc>,
) -> NewAutomationJob {
    NewAutomationJob {
        automation_id: Some(rule.id),
        supplier_id: rule.supplier_id,
        recipient_user_id,
        entity,
        trigger_event: rule.trigger_event,
        channel: rule.channel,
        message_template: rule.message_template.clone(),
        scheduled_for: compute_scheduled_for(trigger_time, rule.delay_hours),
    }
}

/// O plano do fanout: um job por regra ativa cujo predicado casa com o
/// contexto do evento. Regra desligada fica de fora aqui; os jobs já
/// criados por ela não são tocados.
pub fn plan_fanout(
    rules: &[CommunicationAutomation],
    context: &Value,
    entity: EntityRef,
    recipient_user_id: Uuid,
    trigger_time: DateTime<Utc>,
) -> Vec<NewAutomationJob> {
    rules
        .iter()
        .filter(|rule| rule.is_active)
        .filter(|rule| matches_conditions(rule.trigger_conditions.as_ref(), context))
        .map(|rule| job_from_rule(rule, entity, recipient_user_id, trigger_time))
        .collect()
}

impl SchedulerService {
    pub fn new(automation_repo: AutomationRepository, job_repo: JobRepository) -> Self {
        Self {
            automation_repo,
            job_repo,
        }
    }

    /// Para cada regra ativa que casa com o evento, insere um job pendente.
    /// Zero regras casando = zero jobs, sem erro.
    ///
    /// Os campos da regra são copiados para o job (snapshot): a regra pode
    /// ser alterada ou apagada depois sem afetar o que já foi agendado.
    #[allow(clippy::too_many_arguments)]
    pub async fn schedule<'e, A>(
        &self,
        acquirable: A,
        supplier_id: Uuid,
        trigger_event: TriggerEvent,
        entity: EntityRef,
        recipient_user_id: Uuid,
        context: &Value,
        trigger_time: DateTime<Utc>,
    ) -> Result<Vec<AutomationJob>, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut tx = acquirable.begin().await?;

        let rules = self
            .automation_repo
            .list_active_for_trigger(&mut *tx, supplier_id, trigger_event)
            .await?;

        let planned = plan_fanout(&rules, context, entity, recipient_user_id, trigger_time);

        let mut jobs = Vec::with_capacity(planned.len());
        for new_job in &planned {
            let job = self.job_repo.insert(&mut *tx, new_job).await?;
            jobs.push(job);
        }

        tx.commit().await?;

        if !jobs.is_empty() {
            tracing::info!(
                "📬 Evento {:?} agendou {} job(s) para a entidade {:?}",
                trigger_event,
                jobs.len(),
                entity
            );
        }

        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::automation::Channel;
    use crate::models::job::EntityKind;
    use serde_json::json;

    fn regra(
        trigger_conditions: Option<Value>,
        delay_hours: i32,
        is_active: bool,
    ) -> CommunicationAutomation {
        CommunicationAutomation {
            id: Uuid::new_v4(),
            supplier_id: Some(Uuid::new_v4()),
            name: "Lembrete".to_string(),
            description: None,
            trigger_event: TriggerEvent::QuoteSentNoOpen,
            trigger_conditions,
            delay_hours,
            channel: Channel::Email,
            template_id: None,
            message_template: Some("Seu orçamento está esperando.".to_string()),
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn entidade() -> EntityRef {
        EntityRef {
            kind: EntityKind::Quote,
            id: Uuid::new_v4(),
        }
    }

    #[test]
    fn delay_zero_agenda_no_instante_do_gatilho() {
        let t = Utc::now();
        assert_eq!(compute_scheduled_for(t, 0), t);
    }

    #[test]
    fn delay_em_horas_e_exato() {
        let t = Utc::now();
        assert_eq!(compute_scheduled_for(t, 24), t + Duration::hours(24));
        assert_eq!(compute_scheduled_for(t, 1), t + Duration::hours(1));
    }

    #[test]
    fn sem_condicoes_sempre_casa() {
        let ctx = json!({"category": "eletricista"});
        assert!(matches_conditions(None, &ctx));
        assert!(matches_conditions(Some(&Value::Null), &ctx));
        assert!(matches_conditions(Some(&json!({})), &ctx));
    }

    #[test]
    fn todas_as_igualdades_precisam_bater() {
        let conditions = json!({"category": "eletricista", "city": "SP"});
        assert!(matches_conditions(
            Some(&conditions),
            &json!({"category": "eletricista", "city": "SP", "extra": 1})
        ));
        assert!(!matches_conditions(
            Some(&conditions),
            &json!({"category": "eletricista", "city": "RJ"})
        ));
        assert!(!matches_conditions(Some(&conditions), &json!({"city": "SP"})));
    }

    #[test]
    fn contexto_nao_objeto_nao_casa_predicado_com_chaves() {
        let conditions = json!({"category": "eletricista"});
        assert!(!matches_conditions(Some(&conditions), &Value::Null));
        assert!(!matches_conditions(Some(&conditions), &json!("texto")));
    }

    #[test]
    fn uma_regra_casando_gera_um_job_duas_geram_dois() {
        let t = Utc::now();
        let casa_a = regra(None, 0, true);
        let casa_b = regra(Some(json!({"city": "SP"})), 24, true);
        let nao_casa = regra(Some(json!({"city": "RJ"})), 0, true);
        let recipient = Uuid::new_v4();
        let ctx = json!({"city": "SP"});

        let um = plan_fanout(&[casa_a.clone()], &ctx, entidade(), recipient, t);
        assert_eq!(um.len(), 1);

        let dois = plan_fanout(
            &[casa_a, casa_b, nao_casa],
            &ctx,
            entidade(),
            recipient,
            t,
        );
        assert_eq!(dois.len(), 2);
    }

    #[test]
    fn regra_desligada_nao_agenda_nada() {
        let desligada = regra(None, 0, false);
        let planned = plan_fanout(
            &[desligada],
            &json!({}),
            entidade(),
            Uuid::new_v4(),
            Utc::now(),
        );
        assert!(planned.is_empty());
    }

    #[test]
    fn job_copia_o_snapshot_da_regra() {
        let t = Utc::now();
        let rule = regra(None, 24, true);
        let entity = entidade();
        let recipient = Uuid::new_v4();

        let job = job_from_rule(&rule, entity, recipient, t);

        assert_eq!(job.automation_id, Some(rule.id));
        assert_eq!(job.supplier_id, rule.supplier_id);
        assert_eq!(job.recipient_user_id, recipient);
        assert_eq!(job.entity, entity);
        assert_eq!(job.trigger_event, rule.trigger_event);
        assert_eq!(job.channel, rule.channel);
        assert_eq!(job.message_template, rule.message_template);
        assert_eq!(job.scheduled_for, t + Duration::hours(24));
    }
}
