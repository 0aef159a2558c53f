// src/services/job_service.rs

use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::JobRepository,
    models::job::{AutomationJob, EntityRef, JobStats, JobStatus},
};

// A superfície de observação dos jobs: o cliente lista, vê estatísticas
// e no máximo cancela o que ainda está pendente.
#[derive(Clone)]
pub struct JobService {
    repo: JobRepository,
}

impl JobService {
    pub fn new(repo: JobRepository) -> Self {
        Self { repo }
    }

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
        self.repo.list(executor, supplier_id, status, entity).await
    }

    pub async fn stats<'e, E>(
        &self,
        executor: E,
        supplier_id: Uuid,
    ) -> Result<JobStats, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.stats(executor, supplier_id).await
    }

    /// Cancelamento manual. Estados finais (e processing) não saem do lugar:
    /// job inexistente vira NotFound, job fora de pending vira Conflict.
    /// Recebe a conexão concreta (as duas queries precisam rodar na mesma
    /// conexão RLS, e um executor genérico não se reusa).
    pub async fn cancel(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        supplier_id: Uuid,
    ) -> Result<(), AppError> {
        let affected = self.repo.cancel_pending(&mut *conn, id, supplier_id).await?;
        if affected == 0 {
            // Distingue "não existe" de "existe mas já resolvido".
            match self.repo.find_by_id(&mut *conn, id, supplier_id).await? {
                // Processing ainda pode virar cancelled, mas só pelo executor.
                Some(job) if job.status.can_transition_to(JobStatus::Cancelled) => {
                    Err(AppError::Conflict(
                        "Job está em processamento no momento; tente novamente.".to_string(),
                    ))
                }
                Some(job) => Err(AppError::Conflict(format!(
                    "Job já está em estado {:?}.",
                    job.status
                ))),
                None => Err(AppError::NotFound),
            }
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exige_send<F: Send>(_: F) {}

    // Só precisa compilar: o future de cancel tem que ser Send para o
    // handler axum aceitá-lo, inclusive quando chamado com `&mut *conn`
    // de uma conexão da pool.
    #[allow(dead_code)]
    fn cancelamento_e_usavel_em_handler(service: &JobService, conn: &mut PgConnection) {
        exige_send(service.cancel(conn, Uuid::new_v4(), Uuid::new_v4()));
    }

    #[test]
    fn conflito_distingue_processing_de_estado_final() {
        // Processing ainda alcança cancelled (pelo executor); finais não.
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Cancelled));
        for terminal in [JobStatus::Sent, JobStatus::Failed, JobStatus::Cancelled] {
            assert!(!terminal.can_transition_to(JobStatus::Cancelled));
        }
    }
}
