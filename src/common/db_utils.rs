use std::future::Future;
use std::time::Duration;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::supplier::SupplierContext;

// Toda chamada ao banco disparada por requisição passa por este teto.
// Estourou: vira AppError::Timeout (retryable), distinto de rejeição.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(12);

/// Limita a espera de uma operação de banco/serviço.
pub async fn with_timeout<T, F>(fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout),
    }
}

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---

// Valor de sessão para app.supplier_id: vazio quando a rota não é
// escopada por fornecedor, para sobrescrever o que a conexão anterior
// da pool tiver deixado.
fn supplier_setting(supplier: Option<&SupplierContext>) -> String {
    supplier.map(|s| s.0.to_string()).unwrap_or_default()
}

/// Adquire uma conexão da pool e define as variáveis de sessão que as
/// policies de row-level security do Postgres leem (dono da linha).
/// is_local = false: com true fora de transação o valor morre no próprio
/// statement do set_config. As duas chaves são sempre regravadas, então
/// nada vaza entre requisições que reusam a conexão.
pub(crate) async fn get_rls_connection(
    app_state: &AppState,
    user: &AuthenticatedUser,
    supplier: Option<&SupplierContext>,
) -> Result<sqlx::pool::PoolConnection<sqlx::Postgres>, AppError> {
    // 1. Adquire conexão
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let mut conn = app_state.db_pool.acquire().await?;

    // 2. Define User ID
    sqlx::query("SELECT set_config('app.user_id', $1, false)")
        .bind(user.0.id.to_string())
        .execute(&mut *conn)
        .await?;

    // 3. Define (ou limpa) o Supplier ID
    sqlx::query("SELECT set_config('app.supplier_id', $1, false)")
        .bind(supplier_setting(supplier))
        .execute(&mut *conn)
        .await?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn rota_escopada_grava_o_fornecedor() {
        let id = Uuid::new_v4();
        let ctx = SupplierContext(id);
        assert_eq!(supplier_setting(Some(&ctx)), id.to_string());
    }

    #[test]
    fn rota_sem_escopo_limpa_a_variavel() {
        assert_eq!(supplier_setting(None), "");
    }
}
