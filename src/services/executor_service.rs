// src/services/executor_service.rs

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::{
    common::error::AppError,
    db::{ConstraintRepository, JobRepository},
    models::automation::Channel,
    models::job::AutomationJob,
    services::constraint_service::{
        ConstraintDecision, evaluate, find_blocking_opt_out, in_quiet_hours, rate_limit_exceeded,
    },
    services::delivery::DeliveryProvider,
    services::notification_service::NotificationService,
};

// Teto de adiamentos por rate limit antes de desistir do job.
pub const MAX_DELIVERY_ATTEMPTS: i32 = 5;
const CLAIM_BATCH_SIZE: i64 = 50;

// =============================================================================
//  EXECUTOR: varre os jobs vencidos e resolve cada um
//  (pending -> processing -> sent | failed | cancelled | pending de novo)
// =============================================================================

#[derive(Clone)]
pub struct ExecutorService {
    pool: PgPool,
    job_repo: JobRepository,
    constraint_repo: ConstraintRepository,
    notification_service: NotificationService,
    delivery: Arc<dyn DeliveryProvider>,
    scan_interval: std::time::Duration,
}

impl ExecutorService {
    pub fn new(
        pool: PgPool,
        job_repo: JobRepository,
        constraint_repo: ConstraintRepository,
        notification_service: NotificationService,
        delivery: Arc<dyn DeliveryProvider>,
        scan_interval: std::time::Duration,
    ) -> Self {
        Self {
            pool,
            job_repo,
            constraint_repo,
            notification_service,
            delivery,
            scan_interval,
        }
    }

    /// Sobe o worker em background. Erros de um ciclo são logados e o
    /// próximo ciclo segue normalmente.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                "⚙️ Executor de automações ativo (varredura a cada {:?})",
                self.scan_interval
            );
            let mut interval = tokio::time::interval(self.scan_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                match self.run_once(Utc::now()).await {
                    Ok(0) => {}
                    Ok(sent) => tracing::info!("⚙️ Ciclo do executor entregou {} job(s)", sent),
                    Err(e) => tracing::error!("Ciclo do executor falhou: {:?}", e),
                }
            }
        })
    }

    /// Um ciclo de varredura. Retorna quantos jobs foram enviados.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let claimed = self
            .job_repo
            .claim_due(&self.pool, now, CLAIM_BATCH_SIZE)
            .await?;

        let mut sent = 0;
        for job in claimed {
            match self.process_job(&job, now).await {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) => {
                    // Falha inesperada (banco fora etc.): registra e marca failed
                    // para não deixar o job preso em processing.
                    tracing::error!("Erro processando job {}: {:?}", job.id, e);
                    let _ = self
                        .job_repo
                        .mark_failed(&self.pool, job.id, now, &e.to_string())
                        .await;
                }
            }
        }

        Ok(sent)
    }

    /// Reavalia as restrições no instante do disparo e resolve o job.
    /// Retorna true se a entrega aconteceu.
    async fn process_job(&self, job: &AutomationJob, now: DateTime<Utc>) -> Result<bool, AppError> {
        let decision = self.decide(job, now).await?;

        match decision {
            ConstraintDecision::Cancel { reason } => {
                tracing::info!("🚫 Job {} cancelado: {}", job.id, reason);
                self.job_repo
                    .cancel_processing(&self.pool, job.id, &json!({ "reason": reason }))
                    .await?;
                Ok(false)
            }
            ConstraintDecision::Defer { reason, count_attempt } => {
                tracing::debug!("⏸️ Job {} adiado: {}", job.id, reason);
                if count_attempt {
                    self.job_repo.defer(&self.pool, job.id).await?;
                } else {
                    self.job_repo.hold(&self.pool, job.id).await?;
                }
                Ok(false)
            }
            ConstraintDecision::Proceed => match self.delivery.deliver(job).await {
                Ok(delivery_log) => {
                    self.job_repo
                        .mark_sent(&self.pool, job.id, now, &delivery_log)
                        .await?;
                    self.fanout_in_app(job).await;
                    Ok(true)
                }
                Err(e) => {
                    // Sem retry automático: failed é terminal para o cliente.
                    tracing::warn!("Entrega do job {} falhou: {}", job.id, e);
                    self.job_repo
                        .mark_failed(&self.pool, job.id, now, &e.to_string())
                        .await?;
                    Ok(false)
                }
            },
        }
    }

    async fn decide(
        &self,
        job: &AutomationJob,
        now: DateTime<Utc>,
    ) -> Result<ConstraintDecision, AppError> {
        // 1. Opt-out do destinatário
        let opt_outs = self
            .constraint_repo
            .list_opt_outs_for_user(&self.pool, job.recipient_user_id, job.supplier_id)
            .await?;
        let opted_out =
            find_blocking_opt_out(&opt_outs, job.supplier_id, job.channel, job.trigger_event)
                .is_some();

        // 2. Rate limit do canal (janelas móveis de hora e dia)
        let rate_exceeded = match self
            .constraint_repo
            .find_effective_rate_limit(&self.pool, job.supplier_id, job.channel)
            .await?
        {
            Some(limit) => {
                let last_hour = self
                    .job_repo
                    .count_sent_since(&self.pool, job.supplier_id, job.channel, now - Duration::hours(1))
                    .await?;
                let last_day = self
                    .job_repo
                    .count_sent_since(&self.pool, job.supplier_id, job.channel, now - Duration::days(1))
                    .await?;
                rate_limit_exceeded(&limit, last_hour, last_day)
            }
            None => false,
        };

        // 3. Janela de silêncio no fuso do fornecedor
        let in_quiet_window = match self
            .constraint_repo
            .find_effective_quiet_hours(&self.pool, job.supplier_id)
            .await?
        {
            Some(config) => in_quiet_hours(&config, now)?,
            None => false,
        };

        Ok(evaluate(
            opted_out,
            rate_exceeded,
            in_quiet_window,
            job.attempts,
            MAX_DELIVERY_ATTEMPTS,
        ))
    }

    /// Entrega pelo canal `notification` também materializa a notificação
    /// in-app (com push realtime para quem estiver conectado).
    async fn fanout_in_app(&self, job: &AutomationJob) {
        if job.channel != Channel::Notification {
            return;
        }

        let message = job
            .message_template
            .clone()
            .unwrap_or_else(|| "Você tem uma nova atualização.".to_string());
        let result = self
            .notification_service
            .fanout(
                &self.pool,
                job.recipient_user_id,
                "automation",
                "Lembrete automático",
                &message,
                &json!({
                    "jobId": job.id,
                    "entity": job.entity(),
                }),
            )
            .await;

        if let Err(e) = result {
            // O job já está sent; a notificação in-app é melhor esforço.
            tracing::error!("Fanout in-app do job {} falhou: {:?}", job.id, e);
        }
    }
}
