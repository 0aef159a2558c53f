// src/db/job_repo.rs

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::automation::Channel,
    models::job::{AutomationJob, EntityRef, JobStatus, JobStats, NewAutomationJob},
};

const JOB_COLUMNS: &str = r#"
    id, automation_id, supplier_id, recipient_user_id, entity_kind, entity_id,
    trigger_event, channel, message_template, scheduled_for, executed_at,
    attempts, status, delivery_log, error_message, created_at
"#;

#[derive(Clone, Default)]
pub struct JobRepository;

impl JobRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        job: &NewAutomationJob,
    ) -> Result<AutomationJob, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO automation_jobs \
             (automation_id, supplier_id, recipient_user_id, entity_kind, entity_id, \
              trigger_event, channel, message_template, scheduled_for) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {JOB_COLUMNS}"
        );
        let created = sqlx::query_as::<_, AutomationJob>(&sql)
            .bind(job.automation_id)
            .bind(job.supplier_id)
            .bind(job.recipient_user_id)
            .bind(job.entity.kind)
            .bind(job.entity.id)
            .bind(job.trigger_event)
            .bind(job.channel)
            .bind(job.message_template.as_deref())
            .bind(job.scheduled_for)
            .fetch_one(executor)
            .await?;

        Ok(created)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Option<AutomationJob>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM automation_jobs WHERE id = $1 AND supplier_id = $2"
        );
        let job = sqlx::query_as::<_, AutomationJob>(&sql)
            .bind(id)
            .bind(supplier_id)
            .fetch_optional(executor)
            .await?;

        Ok(job)
    }

    /// Lista os jobs do fornecedor, com filtros opcionais de status e entidade.
    pub async fn list<'e, E>(
        &self,
        executor: E,
        supplier_id: Uuid,
        status: Option<JobStatus>,
        entity: Option<EntityRef>,
    ) -> Result<Vec<AutomationJob>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM automation_jobs \
             WHERE supplier_id = $1 \
               AND ($2::job_status IS NULL OR status = $2) \
               AND ($3::entity_kind IS NULL OR (entity_kind = $3 AND entity_id = $4)) \
             ORDER BY created_at DESC \
             LIMIT 200"
        );
        let jobs = sqlx::query_as::<_, AutomationJob>(&sql)
            .bind(supplier_id)
            .bind(status)
            .bind(entity.map(|e| e.kind))
            .bind(entity.map(|e| e.id))
            .fetch_all(executor)
            .await?;

        Ok(jobs)
    }

    pub async fn stats<'e, E>(
        &self,
        executor: E,
        supplier_id: Uuid,
    ) -> Result<JobStats, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stats = sqlx::query_as::<_, JobStats>(
            "SELECT \
                COUNT(*) FILTER (WHERE status = 'pending')    AS pending, \
                COUNT(*) FILTER (WHERE status = 'processing') AS processing, \
                COUNT(*) FILTER (WHERE status = 'sent')       AS sent, \
                COUNT(*) FILTER (WHERE status = 'failed')     AS failed, \
                COUNT(*) FILTER (WHERE status = 'cancelled')  AS cancelled \
             FROM automation_jobs WHERE supplier_id = $1",
        )
        .bind(supplier_id)
        .fetch_one(executor)
        .await?;

        Ok(stats)
    }

    // =========================================================================
    //  TRANSIÇÕES DE ESTADO (todas com guarda no WHERE: a linha só muda
    //  se ainda estiver no estado de origem esperado)
    // =========================================================================

    /// Reivindica os jobs vencidos: pending + scheduled_for <= now viram
    /// processing de forma atômica. SKIP LOCKED evita entrega dupla com
    /// varreduras sobrepostas.
    pub async fn claim_due<'e, E>(
        &self,
        executor: E,
        now: DateTime<Utc>,
        batch_size: i64,
    ) -> Result<Vec<AutomationJob>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE automation_jobs SET status = 'processing' \
             WHERE id IN ( \
                SELECT id FROM automation_jobs \
                WHERE status = 'pending' AND scheduled_for <= $1 \
                ORDER BY scheduled_for ASC \
                LIMIT $2 \
                FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {JOB_COLUMNS}"
        );
        let claimed = sqlx::query_as::<_, AutomationJob>(&sql)
            .bind(now)
            .bind(batch_size)
            .fetch_all(executor)
            .await?;

        Ok(claimed)
    }

    pub async fn mark_sent<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        executed_at: DateTime<Utc>,
        delivery_log: &Value,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE automation_jobs \
             SET status = 'sent', executed_at = $2, delivery_log = $3 \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(executed_at)
        .bind(delivery_log)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn mark_failed<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        executed_at: DateTime<Utc>,
        error_message: &str,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE automation_jobs \
             SET status = 'failed', executed_at = $2, error_message = $3 \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(executed_at)
        .bind(error_message)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Cancela durante o processamento (opt-out, teto de tentativas).
    pub async fn cancel_processing<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        reason: &Value,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE automation_jobs \
             SET status = 'cancelled', delivery_log = $2 \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(reason)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Adia: devolve para pending com uma tentativa a mais.
    /// O próximo ciclo de varredura reavalia as restrições.
    pub async fn defer<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE automation_jobs \
             SET status = 'pending', attempts = attempts + 1 \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Segura o job dentro da janela de silêncio: volta para pending sem
    /// contar tentativa (a janela passa sozinha, não é falha de entrega).
    pub async fn hold<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE automation_jobs \
             SET status = 'pending' \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Cancelamento manual: só sai de pending.
    pub async fn cancel_pending<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        supplier_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE automation_jobs \
             SET status = 'cancelled', \
                 delivery_log = '{\"reason\": \"manually_cancelled\"}'::jsonb \
             WHERE id = $1 AND supplier_id = $2 AND status = 'pending'",
        )
        .bind(id)
        .bind(supplier_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Quantos jobs foram enviados no canal desde `since` (janela móvel
    /// do rate limit).
    pub async fn count_sent_since<'e, E>(
        &self,
        executor: E,
        supplier_id: Option<Uuid>,
        channel: Channel,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM automation_jobs \
             WHERE supplier_id IS NOT DISTINCT FROM $1 \
               AND channel = $2 AND status = 'sent' AND executed_at >= $3",
        )
        .bind(supplier_id)
        .bind(channel)
        .bind(since)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }
}
