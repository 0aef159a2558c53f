// src/services/constraint_service.rs

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use chrono_tz::Tz;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{AppError, field_validation_error},
    db::ConstraintRepository,
    models::automation::{Channel, TriggerEvent},
    models::constraint::{CommunicationOptOut, QuietHoursConfig, RateLimitConfig},
};

// =============================================================================
//  AVALIAÇÃO PURA (o executor usa na hora de disparar)
// =============================================================================

/// O que fazer com um job vencido, na ordem de precedência:
/// opt-out cancela; rate limit adia (contando tentativa, com teto);
/// quiet hours segura sem contar tentativa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintDecision {
    Proceed,
    Cancel { reason: &'static str },
    Defer { reason: &'static str, count_attempt: bool },
}

/// Um opt-out bloqueia a entrega se o escopo dele cobre o job:
/// mesmo canal, fornecedor igual (ou opt-out global) e tipo igual
/// (ou opt-out sem tipo = todos os tipos). Casamento exato, nunca
/// "canal inteiro" quando o opt-out nomeia um tipo.
pub fn opt_out_blocks(
    opt_out: &CommunicationOptOut,
    supplier_id: Option<Uuid>,
    channel: Channel,
    trigger_event: TriggerEvent,
) -> bool {
    if opt_out.channel != channel {
        return false;
    }
    if let Some(scope_supplier) = opt_out.supplier_id {
        if Some(scope_supplier) != supplier_id {
            return false;
        }
    }
    match opt_out.automation_type {
        Some(opted_type) => opted_type == trigger_event,
        None => true,
    }
}

pub fn find_blocking_opt_out<'a>(
    opt_outs: &'a [CommunicationOptOut],
    supplier_id: Option<Uuid>,
    channel: Channel,
    trigger_event: TriggerEvent,
) -> Option<&'a CommunicationOptOut> {
    opt_outs
        .iter()
        .find(|o| opt_out_blocks(o, supplier_id, channel, trigger_event))
}

/// O instante atual (convertido para o fuso do fornecedor) cai na janela
/// de silêncio? Janelas podem cruzar a meia-noite (start > end).
pub fn in_quiet_hours(config: &QuietHoursConfig, now: DateTime<Utc>) -> Result<bool, AppError> {
    let tz: Tz = config
        .timezone
        .parse()
        .map_err(|_| AppError::InvalidTimezone(config.timezone.clone()))?;
    let local = now.with_timezone(&tz);

    // Dias ISO: 1 = segunda ... 7 = domingo. Vazio = todos os dias.
    if !config.days_of_week.is_empty() {
        let weekday = local.weekday().number_from_monday() as i16;
        if !config.days_of_week.contains(&weekday) {
            return Ok(false);
        }
    }

    let time = local.time();
    Ok(time_in_window(time, config.start_time, config.end_time))
}

fn time_in_window(time: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end {
        time >= start && time < end
    } else {
        // Janela que vira a noite: 22:00 -> 08:00
        time >= start || time < end
    }
}

pub fn rate_limit_exceeded(
    config: &RateLimitConfig,
    sent_last_hour: i64,
    sent_last_day: i64,
) -> bool {
    sent_last_hour >= config.max_per_hour as i64 || sent_last_day >= config.max_per_day as i64
}

/// Combina as três restrições na precedência do pipeline.
pub fn evaluate(
    opted_out: bool,
    rate_exceeded: bool,
    in_quiet_window: bool,
    attempts: i32,
    max_attempts: i32,
) -> ConstraintDecision {
    if opted_out {
        return ConstraintDecision::Cancel { reason: "opted_out" };
    }
    if rate_exceeded {
        // Adia e tenta no próximo ciclo, até o teto de tentativas.
        if attempts + 1 >= max_attempts {
            return ConstraintDecision::Cancel {
                reason: "rate_limit_max_attempts",
            };
        }
        return ConstraintDecision::Defer {
            reason: "rate_limited",
            count_attempt: true,
        };
    }
    if in_quiet_window {
        return ConstraintDecision::Defer {
            reason: "quiet_hours",
            count_attempt: false,
        };
    }
    ConstraintDecision::Proceed
}

// =============================================================================
//  GESTÃO (CRUD das restrições)
// =============================================================================

#[derive(Clone)]
pub struct ConstraintService {
    repo: ConstraintRepository,
}

impl ConstraintService {
    pub fn new(repo: ConstraintRepository) -> Self {
        Self { repo }
    }

    pub async fn get_quiet_hours<'e, E>(
        &self,
        executor: E,
        supplier_id: Option<Uuid>,
    ) -> Result<Vec<QuietHoursConfig>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_quiet_hours(executor, supplier_id).await
    }

    pub async fn upsert_quiet_hours<'e, E>(
        &self,
        executor: E,
        supplier_id: Uuid,
        start_time: NaiveTime,
        end_time: NaiveTime,
        timezone: &str,
        days_of_week: &[i16],
    ) -> Result<QuietHoursConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Valida antes de gravar: fuso precisa ser um nome IANA conhecido.
        if timezone.parse::<Tz>().is_err() {
            return Err(AppError::InvalidTimezone(timezone.to_string()));
        }
        if days_of_week.iter().any(|d| !(1..=7).contains(d)) {
            return Err(field_validation_error("daysOfWeek", "invalid_iso_weekday"));
        }

        self.repo
            .upsert_quiet_hours(executor, supplier_id, start_time, end_time, timezone, days_of_week)
            .await
    }

    pub async fn get_rate_limits<'e, E>(
        &self,
        executor: E,
        supplier_id: Option<Uuid>,
    ) -> Result<Vec<RateLimitConfig>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_rate_limits(executor, supplier_id).await
    }

    pub async fn upsert_rate_limit<'e, E>(
        &self,
        executor: E,
        supplier_id: Uuid,
        channel: Channel,
        max_per_hour: i32,
        max_per_day: i32,
    ) -> Result<RateLimitConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .upsert_rate_limit(executor, supplier_id, channel, max_per_hour, max_per_day)
            .await
    }

    /// Lista vazia é resposta válida (fornecedor sem opt-outs), não erro.
    pub async fn get_opt_outs<'e, E>(
        &self,
        executor: E,
        supplier_id: Option<Uuid>,
    ) -> Result<Vec<CommunicationOptOut>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_opt_outs(executor, supplier_id).await
    }

    /// Os opt-outs do próprio usuário (todos, ou só os de um fornecedor).
    pub async fn get_user_opt_outs<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        supplier_id: Option<Uuid>,
    ) -> Result<Vec<CommunicationOptOut>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .list_opt_outs_for_user(executor, user_id, supplier_id)
            .await
    }

    /// Append-only: opt-out não se edita nem se apaga.
    pub async fn create_opt_out<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        supplier_id: Option<Uuid>,
        channel: Channel,
        automation_type: Option<TriggerEvent>,
    ) -> Result<CommunicationOptOut, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .create_opt_out(executor, user_id, supplier_id, channel, automation_type)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn opt_out(
        supplier_id: Option<Uuid>,
        channel: Channel,
        automation_type: Option<TriggerEvent>,
    ) -> CommunicationOptOut {
        CommunicationOptOut {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            supplier_id,
            channel,
            automation_type,
            created_at: Utc::now(),
        }
    }

    fn quiet(start: &str, end: &str, tz: &str, days: Vec<i16>) -> QuietHoursConfig {
        QuietHoursConfig {
            id: Uuid::new_v4(),
            supplier_id: None,
            start_time: start.parse().unwrap(),
            end_time: end.parse().unwrap(),
            timezone: tz.to_string(),
            days_of_week: days,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn opt_out_com_tipo_so_bloqueia_aquele_tipo() {
        let supplier = Uuid::new_v4();
        let o = opt_out(Some(supplier), Channel::Email, Some(TriggerEvent::LeadNew));

        assert!(opt_out_blocks(&o, Some(supplier), Channel::Email, TriggerEvent::LeadNew));
        // Mesmo canal, outro tipo: não bloqueia.
        assert!(!opt_out_blocks(&o, Some(supplier), Channel::Email, TriggerEvent::PaymentDue));
    }

    #[test]
    fn opt_out_sem_tipo_bloqueia_o_canal_inteiro() {
        let o = opt_out(None, Channel::Sms, None);
        assert!(opt_out_blocks(&o, Some(Uuid::new_v4()), Channel::Sms, TriggerEvent::LeadNew));
        assert!(opt_out_blocks(&o, None, Channel::Sms, TriggerEvent::PaymentDue));
        assert!(!opt_out_blocks(&o, None, Channel::Email, TriggerEvent::LeadNew));
    }

    #[test]
    fn opt_out_de_outro_fornecedor_nao_bloqueia() {
        let o = opt_out(Some(Uuid::new_v4()), Channel::Email, None);
        assert!(!opt_out_blocks(&o, Some(Uuid::new_v4()), Channel::Email, TriggerEvent::LeadNew));
    }

    #[test]
    fn janela_simples_no_fuso_do_fornecedor() {
        // 23:00 UTC = 20:00 em São Paulo (UTC-3): fora da janela 22h-08h local.
        let cfg = quiet("22:00:00", "08:00:00", "America/Sao_Paulo", vec![]);
        let fora = Utc.with_ymd_and_hms(2025, 6, 10, 23, 0, 0).unwrap();
        assert!(!in_quiet_hours(&cfg, fora).unwrap());

        // 02:00 UTC = 23:00 em São Paulo: dentro.
        let dentro = Utc.with_ymd_and_hms(2025, 6, 11, 2, 0, 0).unwrap();
        assert!(in_quiet_hours(&cfg, dentro).unwrap());
    }

    #[test]
    fn janela_que_cruza_a_meia_noite() {
        let cfg = quiet("22:00:00", "08:00:00", "UTC", vec![]);
        let madrugada = Utc.with_ymd_and_hms(2025, 6, 10, 3, 0, 0).unwrap();
        let noite = Utc.with_ymd_and_hms(2025, 6, 10, 23, 0, 0).unwrap();
        let tarde = Utc.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap();

        assert!(in_quiet_hours(&cfg, madrugada).unwrap());
        assert!(in_quiet_hours(&cfg, noite).unwrap());
        assert!(!in_quiet_hours(&cfg, tarde).unwrap());
    }

    #[test]
    fn dias_da_semana_limitam_a_janela() {
        // 2025-06-10 é terça (dia ISO 2).
        let terca = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let so_fim_de_semana = quiet("00:00:00", "23:59:59", "UTC", vec![6, 7]);
        let todo_dia = quiet("00:00:00", "23:59:59", "UTC", vec![]);

        assert!(!in_quiet_hours(&so_fim_de_semana, terca).unwrap());
        assert!(in_quiet_hours(&todo_dia, terca).unwrap());
    }

    #[test]
    fn fuso_invalido_vira_erro() {
        let cfg = quiet("22:00:00", "08:00:00", "Marte/Cratera", vec![]);
        assert!(matches!(
            in_quiet_hours(&cfg, Utc::now()),
            Err(AppError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn rate_limit_por_hora_e_por_dia() {
        let cfg = RateLimitConfig {
            id: Uuid::new_v4(),
            supplier_id: None,
            channel: Channel::Email,
            max_per_hour: 2,
            max_per_day: 10,
            updated_at: Utc::now(),
        };
        assert!(!rate_limit_exceeded(&cfg, 1, 5));
        assert!(rate_limit_exceeded(&cfg, 2, 5));
        assert!(rate_limit_exceeded(&cfg, 0, 10));
    }

    #[test]
    fn teto_de_adiamentos_e_na_fronteira() {
        // Com teto 5: adia até attempts = 3 (vira 4), cancela quando o
        // próximo adiamento alcançaria o teto (attempts = 4).
        assert_eq!(
            evaluate(false, true, false, 3, 5),
            ConstraintDecision::Defer { reason: "rate_limited", count_attempt: true }
        );
        assert_eq!(
            evaluate(false, true, false, 4, 5),
            ConstraintDecision::Cancel { reason: "rate_limit_max_attempts" }
        );
    }

    #[test]
    fn precedencia_opt_out_rate_limit_quiet_hours() {
        // Opt-out ganha de tudo.
        assert_eq!(
            evaluate(true, true, true, 0, 5),
            ConstraintDecision::Cancel { reason: "opted_out" }
        );
        // Rate limit adia contando tentativa.
        assert_eq!(
            evaluate(false, true, false, 0, 5),
            ConstraintDecision::Defer { reason: "rate_limited", count_attempt: true }
        );
        // Rate limit no teto cancela.
        assert_eq!(
            evaluate(false, true, false, 4, 5),
            ConstraintDecision::Cancel { reason: "rate_limit_max_attempts" }
        );
        // Quiet hours segura sem contar tentativa.
        assert_eq!(
            evaluate(false, false, true, 0, 5),
            ConstraintDecision::Defer { reason: "quiet_hours", count_attempt: false }
        );
        assert_eq!(evaluate(false, false, false, 0, 5), ConstraintDecision::Proceed);
    }
}
