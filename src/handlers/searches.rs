// src/handlers/searches.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::db_utils::with_timeout,
    common::error::{ApiError, AppError},
    common::recent_searches::push_term,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PushSearchPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "eletricista")]
    pub term: String,
}

// GET /api/searches/recent
#[utoipa::path(
    get,
    path = "/api/searches/recent",
    tag = "Searches",
    responses(
        (status = 200, description = "Buscas recentes do usuário (mais recente primeiro)", body = Vec<String>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_recent_searches(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let terms = with_timeout(app_state.search_store.load(user.0.id))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(terms)))
}

// POST /api/searches/recent
#[utoipa::path(
    post,
    path = "/api/searches/recent",
    tag = "Searches",
    request_body = PushSearchPayload,
    responses(
        (status = 200, description = "Lista atualizada", body = Vec<String>),
        (status = 400, description = "Termo vazio")
    ),
    security(("api_jwt" = []))
)]
pub async fn push_recent_search(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<PushSearchPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let user_id = user.0.id;
    let updated = with_timeout(async {
        let terms = app_state.search_store.load(user_id).await?;
        let terms = push_term(terms, &payload.term);
        app_state.search_store.save(user_id, &terms).await?;
        Ok(terms)
    })
    .await
    .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(updated)))
}
