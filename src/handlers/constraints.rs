// src/handlers/constraints.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::NaiveTime;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::db_utils::{get_rls_connection, with_timeout},
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, supplier::SupplierContext},
    models::automation::{Channel, TriggerEvent},
    models::constraint::{CommunicationOptOut, QuietHoursConfig, RateLimitConfig},
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertQuietHoursPayload {
    #[schema(value_type = String, example = "22:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "08:00:00")]
    pub end_time: NaiveTime,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "America/Sao_Paulo")]
    pub timezone: String,

    /// Dias ISO (1 = segunda ... 7 = domingo). Vazio = todos os dias.
    #[serde(default)]
    #[schema(example = json!([1, 2, 3, 4, 5]))]
    pub days_of_week: Vec<i16>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRateLimitPayload {
    pub channel: Channel,

    #[validate(range(min = 1, message = "min_one"))]
    #[schema(example = 20)]
    pub max_per_hour: i32,

    #[validate(range(min = 1, message = "min_one"))]
    #[schema(example = 100)]
    pub max_per_day: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOptOutPayload {
    /// Ausente = opt-out global (vale para qualquer fornecedor).
    pub supplier_id: Option<Uuid>,

    pub channel: Channel,

    /// Ausente = todos os tipos de comunicação do canal.
    pub automation_type: Option<TriggerEvent>,
}

// =============================================================================
//  QUIET HOURS
// =============================================================================

// GET /api/constraints/quiet-hours
#[utoipa::path(
    get,
    path = "/api/constraints/quiet-hours",
    tag = "Constraints",
    params(
        ("x-supplier-id" = Uuid, Header, description = "ID do Fornecedor")
    ),
    responses(
        (status = 200, description = "Janela de silêncio do fornecedor", body = Vec<QuietHoursConfig>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_quiet_hours(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    supplier: SupplierContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_rls_connection(&app_state, &user, Some(&supplier))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let configs = with_timeout(
        app_state
            .constraint_service
            .get_quiet_hours(&mut *conn, Some(supplier.0)),
    )
    .await
    .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(configs)))
}

// PUT /api/constraints/quiet-hours
#[utoipa::path(
    put,
    path = "/api/constraints/quiet-hours",
    tag = "Constraints",
    request_body = UpsertQuietHoursPayload,
    params(
        ("x-supplier-id" = Uuid, Header, description = "ID do Fornecedor")
    ),
    responses(
        (status = 200, description = "Janela gravada", body = QuietHoursConfig),
        (status = 400, description = "Fuso ou dias inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn put_quiet_hours(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    supplier: SupplierContext,
    Json(payload): Json<UpsertQuietHoursPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_rls_connection(&app_state, &user, Some(&supplier))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let config = with_timeout(app_state.constraint_service.upsert_quiet_hours(
        &mut *conn,
        supplier.0,
        payload.start_time,
        payload.end_time,
        &payload.timezone,
        &payload.days_of_week,
    ))
    .await
    .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(config)))
}

// =============================================================================
//  RATE LIMITS
// =============================================================================

// GET /api/constraints/rate-limits
#[utoipa::path(
    get,
    path = "/api/constraints/rate-limits",
    tag = "Constraints",
    params(
        ("x-supplier-id" = Uuid, Header, description = "ID do Fornecedor")
    ),
    responses(
        (status = 200, description = "Limites por canal do fornecedor", body = Vec<RateLimitConfig>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_rate_limits(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    supplier: SupplierContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_rls_connection(&app_state, &user, Some(&supplier))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let configs = with_timeout(
        app_state
            .constraint_service
            .get_rate_limits(&mut *conn, Some(supplier.0)),
    )
    .await
    .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(configs)))
}

// PUT /api/constraints/rate-limits
#[utoipa::path(
    put,
    path = "/api/constraints/rate-limits",
    tag = "Constraints",
    request_body = UpsertRateLimitPayload,
    params(
        ("x-supplier-id" = Uuid, Header, description = "ID do Fornecedor")
    ),
    responses(
        (status = 200, description = "Limite gravado", body = RateLimitConfig),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn put_rate_limit(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    supplier: SupplierContext,
    Json(payload): Json<UpsertRateLimitPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_rls_connection(&app_state, &user, Some(&supplier))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let config = with_timeout(app_state.constraint_service.upsert_rate_limit(
        &mut *conn,
        supplier.0,
        payload.channel,
        payload.max_per_hour,
        payload.max_per_day,
    ))
    .await
    .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(config)))
}

// =============================================================================
//  OPT-OUTS (escopo do usuário autenticado)
// =============================================================================

// GET /api/constraints/opt-outs
#[utoipa::path(
    get,
    path = "/api/constraints/opt-outs",
    tag = "Constraints",
    responses(
        (status = 200, description = "Opt-outs do usuário autenticado", body = Vec<CommunicationOptOut>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_opt_outs(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.0.id;
    let mut conn = get_rls_connection(&app_state, &user, None)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let opt_outs = with_timeout(
        app_state
            .constraint_service
            .get_user_opt_outs(&mut *conn, user_id, None),
    )
    .await
    .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(opt_outs)))
}

// POST /api/constraints/opt-outs
#[utoipa::path(
    post,
    path = "/api/constraints/opt-outs",
    tag = "Constraints",
    request_body = CreateOptOutPayload,
    responses(
        (status = 201, description = "Opt-out registrado", body = CommunicationOptOut),
        (status = 409, description = "Opt-out idêntico já registrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_opt_out(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateOptOutPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.0.id;
    let mut conn = get_rls_connection(&app_state, &user, None)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let opt_out = with_timeout(app_state.constraint_service.create_opt_out(
        &mut *conn,
        user_id,
        payload.supplier_id,
        payload.channel,
        payload.automation_type,
    ))
    .await
    .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(opt_out)))
}
