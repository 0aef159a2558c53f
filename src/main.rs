//src/main.rs

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, patch, post},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod realtime;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Sobe o executor de automações em background (varre os jobs vencidos)
    app_state.build_executor().spawn();

    // Regras de comunicação do fornecedor
    let automation_routes = Router::new()
        .route("/"
               ,post(handlers::automations::create_automation)
               .get(handlers::automations::list_automations)
        )
        .route("/templates"
               ,get(handlers::automations::list_templates)
        )
        .route("/{id}"
               ,patch(handlers::automations::update_automation)
               .delete(handlers::automations::delete_automation)
        )
        .route("/{id}/toggle"
               ,post(handlers::automations::toggle_automation)
        );

    // Eventos de negócio (fanout de jobs)
    let event_routes = Router::new()
        .route("/", post(handlers::events::publish_event));

    // Fila de entregas
    let job_routes = Router::new()
        .route("/", get(handlers::jobs::list_jobs))
        .route("/stats", get(handlers::jobs::job_stats))
        .route("/{id}/cancel", post(handlers::jobs::cancel_job));

    // Restrições de entrega
    let constraint_routes = Router::new()
        .route("/quiet-hours"
               ,get(handlers::constraints::get_quiet_hours)
               .put(handlers::constraints::put_quiet_hours)
        )
        .route("/rate-limits"
               ,get(handlers::constraints::get_rate_limits)
               .put(handlers::constraints::put_rate_limit)
        )
        .route("/opt-outs"
               ,get(handlers::constraints::get_opt_outs)
               .post(handlers::constraints::create_opt_out)
        );

    // Notificações in-app + canal realtime
    let notification_routes = Router::new()
        .route("/"
               ,get(handlers::notifications::list_notifications)
               .post(handlers::notifications::create_notification)
        )
        .route("/unread-count", get(handlers::notifications::unread_count))
        .route("/read-all", post(handlers::notifications::mark_all_read))
        .route("/{id}/read", post(handlers::notifications::mark_read))
        .route("/ws", get(handlers::notifications::notifications_ws));

    // Buscas recentes
    let search_routes = Router::new()
        .route("/recent"
               ,get(handlers::searches::list_recent_searches)
               .post(handlers::searches::push_recent_search)
        );

    // Tudo (menos /api/health e o Swagger) atrás do auth_guard
    let protected = Router::new()
        .nest("/api/automations", automation_routes)
        .nest("/api/events", event_routes)
        .nest("/api/jobs", job_routes)
        .nest("/api/constraints", constraint_routes)
        .nest("/api/notifications", notification_routes)
        .nest("/api/searches", search_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .merge(protected)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
