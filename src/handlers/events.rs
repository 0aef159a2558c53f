// src/handlers/events.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::db_utils::{get_rls_connection, with_timeout},
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, supplier::SupplierContext},
    models::automation::TriggerEvent,
    models::job::{AutomationJob, EntityRef},
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishEventPayload {
    pub trigger_event: TriggerEvent,

    pub entity: EntityRef,

    /// Quem deve receber as comunicações geradas por este evento.
    pub recipient_user_id: Uuid,

    /// Contexto do evento, avaliado contra as trigger_conditions das regras.
    #[schema(example = json!({"category": "eletricista"}))]
    pub context: Option<Value>,

    /// Instante do gatilho. Ausente = agora (eventos reprocessados podem
    /// informar o instante original).
    pub trigger_time: Option<DateTime<Utc>>,
}

// =============================================================================
//  HANDLERS
// =============================================================================

// POST /api/events
#[utoipa::path(
    post,
    path = "/api/events",
    tag = "Events",
    request_body = PublishEventPayload,
    responses(
        (status = 200, description = "Jobs agendados pelo evento (vazio quando nenhuma regra casa)", body = Vec<AutomationJob>),
        (status = 400, description = "Dados inválidos")
    ),
    params(
        ("x-supplier-id" = Uuid, Header, description = "ID do Fornecedor")
    ),
    security(("api_jwt" = []))
)]
pub async fn publish_event(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    supplier: SupplierContext,
    Json(payload): Json<PublishEventPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_rls_connection(&app_state, &user, Some(&supplier))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let context = payload.context.unwrap_or(Value::Null);
    let trigger_time = payload.trigger_time.unwrap_or_else(Utc::now);

    let jobs = with_timeout(app_state.scheduler_service.schedule(
        &mut *conn,
        supplier.0,
        payload.trigger_event,
        payload.entity,
        payload.recipient_user_id,
        &context,
        trigger_time,
    ))
    .await
    .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(jobs)))
}
