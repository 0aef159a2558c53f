// src/config.rs

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use std::{env, time::Duration};

use crate::{
    common::i18n::I18nStore,
    common::recent_searches::RecentSearchStore,
    db::{
        AutomationRepository, ConstraintRepository, JobRepository, NotificationRepository,
        PgRecentSearchStore,
    },
    realtime::RealtimeHub,
    services::auth::AuthService,
    services::automation_service::AutomationService,
    services::constraint_service::ConstraintService,
    services::delivery::{DeliveryProvider, LogDeliveryProvider},
    services::executor_service::ExecutorService,
    services::job_service::JobService,
    services::notification_service::NotificationService,
    services::scheduler_service::SchedulerService,
};

const DEFAULT_EXECUTOR_SCAN_SECS: u64 = 30;

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub i18n_store: I18nStore,
    pub realtime_hub: RealtimeHub,

    pub auth_service: AuthService,
    pub automation_service: AutomationService,
    pub scheduler_service: SchedulerService,
    pub constraint_service: ConstraintService,
    pub job_service: JobService,
    pub notification_service: NotificationService,
    pub search_store: Arc<dyn RecentSearchStore>,
}

impl AppState {
    /// Carrega as configurações, conecta ao banco e monta o gráfico de
    /// dependências. Se algo falhar aqui, a aplicação não deve subir.
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let automation_repo = AutomationRepository::new();
        let job_repo = JobRepository::new();
        let constraint_repo = ConstraintRepository::new();
        let notification_repo = NotificationRepository::new();

        let realtime_hub = RealtimeHub::new();

        let auth_service = AuthService::new(jwt_secret);
        let automation_service = AutomationService::new(automation_repo.clone());
        let scheduler_service = SchedulerService::new(automation_repo, job_repo.clone());
        let constraint_service = ConstraintService::new(constraint_repo);
        let job_service = JobService::new(job_repo);
        let notification_service =
            NotificationService::new(notification_repo, realtime_hub.clone());
        let search_store: Arc<dyn RecentSearchStore> =
            Arc::new(PgRecentSearchStore::new(db_pool.clone()));

        Ok(Self {
            db_pool,
            i18n_store: I18nStore::new(),
            realtime_hub,
            auth_service,
            automation_service,
            scheduler_service,
            constraint_service,
            job_service,
            notification_service,
            search_store,
        })
    }

    /// Monta o executor de background a partir do estado já construído.
    /// O intervalo de varredura vem de EXECUTOR_SCAN_SECS (padrão: 30s).
    pub fn build_executor(&self) -> ExecutorService {
        let scan_secs = env::var("EXECUTOR_SCAN_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_EXECUTOR_SCAN_SECS);

        let delivery: Arc<dyn DeliveryProvider> = Arc::new(LogDeliveryProvider);

        ExecutorService::new(
            self.db_pool.clone(),
            JobRepository::new(),
            ConstraintRepository::new(),
            self.notification_service.clone(),
            delivery,
            Duration::from_secs(scan_secs),
        )
    }
}
