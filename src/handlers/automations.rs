// src/handlers/automations.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
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
    models::automation::{Channel, CommunicationAutomation, TriggerEvent},
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAutomationPayload {
    #[validate(length(min = 2, message = "min_length"))]
    #[schema(example = "Lembrete de orçamento não aberto")]
    pub name: String,

    pub description: Option<String>,

    pub trigger_event: TriggerEvent,

    #[schema(example = json!({"category": "eletricista"}))]
    pub trigger_conditions: Option<Value>,

    #[validate(range(min = 0, message = "min_zero"))]
    #[serde(default)]
    #[schema(example = 24)]
    pub delay_hours: i32,

    pub channel: Channel,

    pub template_id: Option<Uuid>,
    pub message_template: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAutomationPayload {
    #[validate(length(min = 2, message = "min_length"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub trigger_conditions: Option<Value>,
    #[validate(range(min = 0, message = "min_zero"))]
    pub delay_hours: Option<i32>,
    pub channel: Option<Channel>,
    pub message_template: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleAutomationPayload {
    #[schema(example = false)]
    pub is_active: bool,
}

// =============================================================================
//  HANDLERS
// =============================================================================

// GET /api/automations
#[utoipa::path(
    get,
    path = "/api/automations",
    tag = "Automations",
    responses(
        (status = 200, description = "Regras do fornecedor", body = Vec<CommunicationAutomation>)
    ),
    params(
        ("x-supplier-id" = Uuid, Header, description = "ID do Fornecedor")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_automations(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    supplier: SupplierContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_rls_connection(&app_state, &user, Some(&supplier))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let rules = with_timeout(app_state.automation_service.list(&mut *conn, supplier.0))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(rules)))
}

// GET /api/automations/templates
#[utoipa::path(
    get,
    path = "/api/automations/templates",
    tag = "Automations",
    responses(
        (status = 200, description = "Templates globais", body = Vec<CommunicationAutomation>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_templates(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_rls_connection(&app_state, &user, None)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let templates = with_timeout(app_state.automation_service.list_templates(&mut *conn))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(templates)))
}

// POST /api/automations
#[utoipa::path(
    post,
    path = "/api/automations",
    tag = "Automations",
    request_body = CreateAutomationPayload,
    responses(
        (status = 201, description = "Regra criada", body = CommunicationAutomation),
        (status = 400, description = "Dados inválidos")
    ),
    params(
        ("x-supplier-id" = Uuid, Header, description = "ID do Fornecedor")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_automation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    supplier: SupplierContext,
    Json(payload): Json<CreateAutomationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_rls_connection(&app_state, &user, Some(&supplier))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let rule = with_timeout(app_state.automation_service.create(
        &mut *conn,
        supplier.0,
        &payload.name,
        payload.description.as_deref(),
        payload.trigger_event,
        payload.trigger_conditions,
        payload.delay_hours,
        payload.channel,
        payload.template_id,
        payload.message_template.as_deref(),
    ))
    .await
    .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(rule)))
}

// PATCH /api/automations/{id}
#[utoipa::path(
    patch,
    path = "/api/automations/{id}",
    tag = "Automations",
    request_body = UpdateAutomationPayload,
    responses(
        (status = 200, description = "Regra atualizada", body = CommunicationAutomation),
        (status = 404, description = "Regra não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da regra"),
        ("x-supplier-id" = Uuid, Header, description = "ID do Fornecedor")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_automation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    supplier: SupplierContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAutomationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_rls_connection(&app_state, &user, Some(&supplier))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let rule = with_timeout(app_state.automation_service.update(
        &mut *conn,
        id,
        supplier.0,
        payload.name.as_deref(),
        payload.description.as_deref(),
        payload.trigger_conditions,
        payload.delay_hours,
        payload.channel,
        payload.message_template.as_deref(),
    ))
    .await
    .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(rule)))
}

// POST /api/automations/{id}/toggle
#[utoipa::path(
    post,
    path = "/api/automations/{id}/toggle",
    tag = "Automations",
    request_body = ToggleAutomationPayload,
    responses(
        (status = 204, description = "Regra ligada/desligada"),
        (status = 404, description = "Regra não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da regra"),
        ("x-supplier-id" = Uuid, Header, description = "ID do Fornecedor")
    ),
    security(("api_jwt" = []))
)]
pub async fn toggle_automation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    supplier: SupplierContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ToggleAutomationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_rls_connection(&app_state, &user, Some(&supplier))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    with_timeout(app_state.automation_service.toggle(&mut *conn, id, supplier.0, payload.is_active))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// DELETE /api/automations/{id}
#[utoipa::path(
    delete,
    path = "/api/automations/{id}",
    tag = "Automations",
    responses(
        (status = 204, description = "Regra removida (jobs em andamento seguem no snapshot)"),
        (status = 404, description = "Regra não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da regra"),
        ("x-supplier-id" = Uuid, Header, description = "ID do Fornecedor")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_automation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    supplier: SupplierContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_rls_connection(&app_state, &user, Some(&supplier))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    with_timeout(app_state.automation_service.delete(&mut *conn, id, supplier.0))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
