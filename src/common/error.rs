use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// A taxonomia que os handlers e o frontend enxergam:
// validação nunca chega ao banco; permissão e conflito não são retryables;
// timeout é retryable e distinto de rejeição do servidor.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Permissão negada")]
    PermissionDenied,

    #[error("Registro não encontrado")]
    NotFound,

    #[error("Conflito: {0}")]
    Conflict(String),

    #[error("Tempo de espera esgotado")]
    Timeout,

    #[error("Token de autenticação inválido ou ausente")]
    InvalidToken,

    #[error("Fuso horário inválido: {0}")]
    InvalidTimezone(String),

    #[error("Falha na entrega: {0}")]
    DeliveryFailed(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    // Código estável usado como chave de tradução no I18nStore.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation",
            AppError::PermissionDenied => "permission_denied",
            AppError::NotFound => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Timeout => "timeout",
            AppError::InvalidToken => "invalid_token",
            AppError::InvalidTimezone(_) => "invalid_timezone",
            AppError::DeliveryFailed(_) => "delivery_failed",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidTimezone(_) => StatusCode::BAD_REQUEST,
            AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::DeliveryFailed(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Traduz o erro para a resposta HTTP no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        // Validação devolve todos os detalhes, campo a campo.
        if let AppError::ValidationError(errors) = self {
            let mut details: HashMap<String, Vec<String>> = HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .collect();
                details.insert(field.to_string(), messages);
            }
            return ApiError {
                status: StatusCode::BAD_REQUEST,
                message: store.translate(&locale.0, "validation"),
                details: Some(json!(details)),
            };
        }

        if matches!(
            self,
            AppError::DatabaseError(_) | AppError::InternalServerError(_)
        ) {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        ApiError {
            status: self.status(),
            message: store.translate(&locale.0, self.code()),
            details: None,
        }
    }
}

// Fallback sem tradução, usado pelos middlewares e pelo worker.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(
            self,
            AppError::DatabaseError(_) | AppError::InternalServerError(_)
        ) {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

// O erro já pronto para virar resposta: status + mensagem localizada.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => Json(json!({ "error": self.message, "details": details })),
            None => Json(json!({ "error": self.message })),
        };
        (self.status, body).into_response()
    }
}

/// Monta um AppError::ValidationError para checagens que o derive não cobre
/// (ex: "template_id ou message_template obrigatório").
pub fn field_validation_error(field: &str, code: &'static str) -> AppError {
    let mut errors = validator::ValidationErrors::new();
    let mut err = validator::ValidationError::new(code);
    err.message = Some(code.into());

    // Leak seguro para erro estático
    let static_field: &'static str = Box::leak(field.to_string().into_boxed_str());
    errors.add(static_field, err);

    AppError::ValidationError(errors)
}
