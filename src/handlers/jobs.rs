// src/handlers/jobs.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::db_utils::{get_rls_connection, with_timeout},
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, supplier::SupplierContext},
    models::job::{AutomationJob, EntityKind, EntityRef, JobStats, JobStatus},
};

// =============================================================================
//  FILTROS
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct JobListFilters {
    /// Filtra por estado do job.
    pub status: Option<JobStatus>,
    /// Filtra pela entidade de origem (os dois campos juntos).
    pub entity_kind: Option<EntityKind>,
    pub entity_id: Option<Uuid>,
}

impl JobListFilters {
    // Só vira filtro de entidade quando o par (kind, id) está completo.
    fn entity(&self) -> Option<EntityRef> {
        match (self.entity_kind, self.entity_id) {
            (Some(kind), Some(id)) => Some(EntityRef { kind, id }),
            _ => None,
        }
    }
}

// =============================================================================
//  HANDLERS
// =============================================================================

// GET /api/jobs
#[utoipa::path(
    get,
    path = "/api/jobs",
    tag = "Jobs",
    params(
        JobListFilters,
        ("x-supplier-id" = Uuid, Header, description = "ID do Fornecedor")
    ),
    responses(
        (status = 200, description = "Jobs do fornecedor (mais recentes primeiro)", body = Vec<AutomationJob>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_jobs(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    supplier: SupplierContext,
    Query(filters): Query<JobListFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_rls_connection(&app_state, &user, Some(&supplier))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let entity = filters.entity();
    let jobs = with_timeout(
        app_state
            .job_service
            .list(&mut *conn, supplier.0, filters.status, entity),
    )
    .await
    .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(jobs)))
}

// GET /api/jobs/stats
#[utoipa::path(
    get,
    path = "/api/jobs/stats",
    tag = "Jobs",
    params(
        ("x-supplier-id" = Uuid, Header, description = "ID do Fornecedor")
    ),
    responses(
        (status = 200, description = "Contagem de jobs por estado", body = JobStats)
    ),
    security(("api_jwt" = []))
)]
pub async fn job_stats(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    supplier: SupplierContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_rls_connection(&app_state, &user, Some(&supplier))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let stats = with_timeout(app_state.job_service.stats(&mut *conn, supplier.0))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(stats)))
}

// POST /api/jobs/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/jobs/{id}/cancel",
    tag = "Jobs",
    params(
        ("id" = Uuid, Path, description = "ID do job"),
        ("x-supplier-id" = Uuid, Header, description = "ID do Fornecedor")
    ),
    responses(
        (status = 204, description = "Job cancelado"),
        (status = 404, description = "Job não encontrado"),
        (status = 409, description = "Job fora de pending (já resolvido ou em processamento)")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_job(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    supplier: SupplierContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_rls_connection(&app_state, &user, Some(&supplier))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    with_timeout(app_state.job_service.cancel(&mut *conn, id, supplier.0))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
