// src/db/constraint_repo.rs

use chrono::NaiveTime;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::automation::{Channel, TriggerEvent},
    models::constraint::{CommunicationOptOut, QuietHoursConfig, RateLimitConfig},
};

#[derive(Clone, Default)]
pub struct ConstraintRepository;

impl ConstraintRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  QUIET HOURS
    // =========================================================================

    /// Config do escopo pedido: do fornecedor, ou a global quando None.
    pub async fn list_quiet_hours<'e, E>(
        &self,
        executor: E,
        supplier_id: Option<Uuid>,
    ) -> Result<Vec<QuietHoursConfig>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let configs = sqlx::query_as::<_, QuietHoursConfig>(
            "SELECT id, supplier_id, start_time, end_time, timezone, days_of_week, updated_at \
             FROM quiet_hours_config \
             WHERE supplier_id IS NOT DISTINCT FROM $1",
        )
        .bind(supplier_id)
        .fetch_all(executor)
        .await?;

        Ok(configs)
    }

    /// A config que vale na hora de disparar: a do fornecedor se existir,
    /// senão a global.
    pub async fn find_effective_quiet_hours<'e, E>(
        &self,
        executor: E,
        supplier_id: Option<Uuid>,
    ) -> Result<Option<QuietHoursConfig>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let config = sqlx::query_as::<_, QuietHoursConfig>(
            "SELECT id, supplier_id, start_time, end_time, timezone, days_of_week, updated_at \
             FROM quiet_hours_config \
             WHERE supplier_id IS NOT DISTINCT FROM $1 OR supplier_id IS NULL \
             ORDER BY supplier_id NULLS LAST \
             LIMIT 1",
        )
        .bind(supplier_id)
        .fetch_optional(executor)
        .await?;

        Ok(config)
    }

    /// Upsert com chave em supplier_id (uma janela por fornecedor).
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
        let config = sqlx::query_as::<_, QuietHoursConfig>(
            "INSERT INTO quiet_hours_config (supplier_id, start_time, end_time, timezone, days_of_week) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (supplier_id) \
             DO UPDATE SET \
                start_time = EXCLUDED.start_time, \
                end_time = EXCLUDED.end_time, \
                timezone = EXCLUDED.timezone, \
                days_of_week = EXCLUDED.days_of_week, \
                updated_at = NOW() \
             RETURNING id, supplier_id, start_time, end_time, timezone, days_of_week, updated_at",
        )
        .bind(supplier_id)
        .bind(start_time)
        .bind(end_time)
        .bind(timezone)
        .bind(days_of_week)
        .fetch_one(executor)
        .await?;

        Ok(config)
    }

    // =========================================================================
    //  RATE LIMITS
    // =========================================================================

    pub async fn list_rate_limits<'e, E>(
        &self,
        executor: E,
        supplier_id: Option<Uuid>,
    ) -> Result<Vec<RateLimitConfig>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let configs = sqlx::query_as::<_, RateLimitConfig>(
            "SELECT id, supplier_id, channel, max_per_hour, max_per_day, updated_at \
             FROM rate_limits_config \
             WHERE supplier_id IS NOT DISTINCT FROM $1 \
             ORDER BY channel",
        )
        .bind(supplier_id)
        .fetch_all(executor)
        .await?;

        Ok(configs)
    }

    pub async fn find_effective_rate_limit<'e, E>(
        &self,
        executor: E,
        supplier_id: Option<Uuid>,
        channel: Channel,
    ) -> Result<Option<RateLimitConfig>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let config = sqlx::query_as::<_, RateLimitConfig>(
            "SELECT id, supplier_id, channel, max_per_hour, max_per_day, updated_at \
             FROM rate_limits_config \
             WHERE (supplier_id IS NOT DISTINCT FROM $1 OR supplier_id IS NULL) \
               AND channel = $2 \
             ORDER BY supplier_id NULLS LAST \
             LIMIT 1",
        )
        .bind(supplier_id)
        .bind(channel)
        .fetch_optional(executor)
        .await?;

        Ok(config)
    }

    /// Upsert com chave em (supplier_id, channel).
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
        let config = sqlx::query_as::<_, RateLimitConfig>(
            "INSERT INTO rate_limits_config (supplier_id, channel, max_per_hour, max_per_day) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (supplier_id, channel) \
             DO UPDATE SET \
                max_per_hour = EXCLUDED.max_per_hour, \
                max_per_day = EXCLUDED.max_per_day, \
                updated_at = NOW() \
             RETURNING id, supplier_id, channel, max_per_hour, max_per_day, updated_at",
        )
        .bind(supplier_id)
        .bind(channel)
        .bind(max_per_hour)
        .bind(max_per_day)
        .fetch_one(executor)
        .await?;

        Ok(config)
    }

    // =========================================================================
    //  OPT-OUTS (append-only)
    // =========================================================================

    pub async fn list_opt_outs<'e, E>(
        &self,
        executor: E,
        supplier_id: Option<Uuid>,
    ) -> Result<Vec<CommunicationOptOut>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let opt_outs = sqlx::query_as::<_, CommunicationOptOut>(
            "SELECT id, user_id, supplier_id, channel, automation_type, created_at \
             FROM communication_opt_outs \
             WHERE supplier_id IS NOT DISTINCT FROM $1 \
             ORDER BY created_at DESC",
        )
        .bind(supplier_id)
        .fetch_all(executor)
        .await?;

        Ok(opt_outs)
    }

    /// Tudo que pode bloquear uma entrega para este destinatário:
    /// opt-outs do fornecedor em questão e os globais do usuário.
    pub async fn list_opt_outs_for_user<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        supplier_id: Option<Uuid>,
    ) -> Result<Vec<CommunicationOptOut>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let opt_outs = sqlx::query_as::<_, CommunicationOptOut>(
            "SELECT id, user_id, supplier_id, channel, automation_type, created_at \
             FROM communication_opt_outs \
             WHERE user_id = $1 \
               AND (supplier_id IS NOT DISTINCT FROM $2 OR supplier_id IS NULL)",
        )
        .bind(user_id)
        .bind(supplier_id)
        .fetch_all(executor)
        .await?;

        Ok(opt_outs)
    }

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
        let opt_out = sqlx::query_as::<_, CommunicationOptOut>(
            "INSERT INTO communication_opt_outs (user_id, supplier_id, channel, automation_type) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, supplier_id, channel, automation_type, created_at",
        )
        .bind(user_id)
        .bind(supplier_id)
        .bind(channel)
        .bind(automation_type)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // Tratamento de erro de chave duplicada
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::Conflict("Opt-out já registrado para este escopo.".to_string());
                }
            }
            e.into()
        })?;

        Ok(opt_out)
    }
}
