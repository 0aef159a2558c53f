// src/middleware/supplier.rs

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use uuid::Uuid;

use crate::common::error::ApiError; // Usamos o nosso ApiError para rejeição

// O nome do nosso cabeçalho HTTP customizado
const SUPPLIER_ID_HEADER: &str = "x-supplier-id";

// O extrator de escopo de fornecedor.
// Ele armazena o UUID do fornecedor em nome do qual o usuário opera.
#[derive(Debug, Clone)]
pub struct SupplierContext(pub Uuid);

impl<S> FromRequestParts<S> for SupplierContext
where
    S: Send + Sync,
{
    // Usamos ApiError como rejeição, pois ele já implementa IntoResponse
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        // Tenta ler o cabeçalho X-Supplier-ID
        let header_value = parts.headers.get(SUPPLIER_ID_HEADER);

        match header_value {
            Some(value) => {
                let value_str = value.to_str().map_err(|_| ApiError {
                    status: StatusCode::BAD_REQUEST,
                    message: "Cabeçalho X-Supplier-ID contém caracteres inválidos.".to_string(),
                    details: None,
                })?;

                let supplier_id = Uuid::parse_str(value_str).map_err(|_| ApiError {
                    status: StatusCode::BAD_REQUEST,
                    message: "Cabeçalho X-Supplier-ID inválido (não é um UUID).".to_string(),
                    details: None,
                })?;

                Ok(SupplierContext(supplier_id))
            }
            None => Err(ApiError {
                status: StatusCode::BAD_REQUEST,
                message: "O cabeçalho X-Supplier-ID é obrigatório.".to_string(),
                details: None,
            }),
        }
    }
}
