// src/services/auth.rs

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Claims, CurrentUser},
};

// Validação stateless: o token é emitido pelo backend principal com o mesmo
// segredo; aqui só conferimos a assinatura e extraímos a identidade.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<CurrentUser, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(CurrentUser {
            id: token_data.claims.sub,
        })
    }

    /// Emite um token para o usuário (útil em ambientes de desenvolvimento
    /// e nos testes; em produção quem emite é o backend principal).
    pub fn generate_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )
        .map_err(|e| anyhow::anyhow!("Falha ao assinar o token: {}", e))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_emitido_valida_de_volta() {
        let service = AuthService::new("segredo-de-teste".to_string());
        let user_id = Uuid::new_v4();

        let token = service.generate_token(user_id).unwrap();
        let user = service.validate_token(&token).unwrap();
        assert_eq!(user.id, user_id);
    }

    #[test]
    fn token_com_outro_segredo_e_rejeitado() {
        let emissor = AuthService::new("segredo-a".to_string());
        let validador = AuthService::new("segredo-b".to_string());

        let token = emissor.generate_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            validador.validate_token(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn lixo_nao_passa_na_validacao() {
        let service = AuthService::new("segredo".to_string());
        assert!(matches!(
            service.validate_token("nao-e-um-jwt"),
            Err(AppError::InvalidToken)
        ));
    }
}
