// src/handlers/notifications.rs

use axum::{
    Json,
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::db_utils::{get_rls_connection, with_timeout},
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::notification::{Notification, UnreadCount},
};

// =============================================================================
//  PAYLOADS E FILTROS
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NotificationListFilters {
    /// true = só não lidas.
    #[serde(default)]
    pub unread_only: bool,
    /// Filtra por tipo (ex: "lead_new").
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationPayload {
    /// Destinatário. Ausente = o próprio usuário autenticado.
    pub user_id: Option<Uuid>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "lead_new")]
    pub kind: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Novo lead recebido")]
    pub title: String,

    #[validate(length(min = 1, message = "required"))]
    pub message: String,

    pub payload: Option<Value>,
}

// =============================================================================
//  HANDLERS
// =============================================================================

// GET /api/notifications
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    params(NotificationListFilters),
    responses(
        (status = 200, description = "Notificações do usuário (mais recentes primeiro)", body = Vec<Notification>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(filters): Query<NotificationListFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.0.id;
    let mut conn = get_rls_connection(&app_state, &user, None)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let notifications = with_timeout(app_state.notification_service.list(
        &mut *conn,
        user_id,
        filters.unread_only,
        filters.kind.as_deref(),
    ))
    .await
    .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(notifications)))
}

// GET /api/notifications/unread-count
#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    tag = "Notifications",
    responses(
        (status = 200, description = "Quantidade de não lidas", body = UnreadCount)
    ),
    security(("api_jwt" = []))
)]
pub async fn unread_count(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.0.id;
    let mut conn = get_rls_connection(&app_state, &user, None)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let count = with_timeout(app_state.notification_service.unread_count(&mut *conn, user_id))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(UnreadCount { count })))
}

// POST /api/notifications
#[utoipa::path(
    post,
    path = "/api/notifications",
    tag = "Notifications",
    request_body = CreateNotificationPayload,
    responses(
        (status = 201, description = "Notificação criada e empurrada para as conexões realtime", body = Notification),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_notification(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateNotificationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let recipient = payload.user_id.unwrap_or(user.0.id);
    let mut conn = get_rls_connection(&app_state, &user, None)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = payload.payload.unwrap_or_else(|| Value::Object(Default::default()));
    let notification = with_timeout(app_state.notification_service.fanout(
        &mut *conn,
        recipient,
        &payload.kind,
        &payload.title,
        &payload.message,
        &body,
    ))
    .await
    .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(notification)))
}

// POST /api/notifications/{id}/read
#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    params(
        ("id" = Uuid, Path, description = "ID da notificação")
    ),
    responses(
        (status = 200, description = "Notificação marcada como lida (idempotente)", body = Notification),
        (status = 404, description = "Notificação não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_read(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.0.id;
    let mut conn = get_rls_connection(&app_state, &user, None)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let notification =
        with_timeout(app_state.notification_service.mark_read(&mut *conn, id, user_id))
            .await
            .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(notification)))
}

// POST /api/notifications/read-all
#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    responses(
        (status = 200, description = "Todas as não lidas marcadas", body = UnreadCount)
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_all_read(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.0.id;
    let mut conn = get_rls_connection(&app_state, &user, None)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let updated = with_timeout(app_state.notification_service.mark_all_read(&mut *conn, user_id))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(UnreadCount { count: updated as i64 })))
}

// =============================================================================
//  WEBSOCKET REALTIME
// =============================================================================

// GET /api/notifications/ws
//
// O upgrade acontece depois do auth_guard: a identidade vem do token,
// nunca de parâmetro da URL.
#[utoipa::path(
    get,
    path = "/api/notifications/ws",
    tag = "Notifications",
    responses(
        (status = 101, description = "Conexão WebSocket aberta; eventos INSERT/UPDATE de notificações chegam como JSON")
    ),
    security(("api_jwt" = []))
)]
pub async fn notifications_ws(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let user_id = user.0.id;
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(mut socket: WebSocket, app_state: AppState, user_id: Uuid) {
    let mut subscription = app_state.realtime_hub.subscribe(user_id);
    tracing::debug!("🔌 Conexão realtime aberta para o usuário {}", user_id);

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                let Ok(text) = serde_json::to_string(&event) else { continue };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    // Cliente só fala para fechar; qualquer outro frame é ignorado.
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                }
            }
        }
    }

    subscription.close();
    tracing::debug!("🔌 Conexão realtime encerrada para o usuário {}", user_id);
}
