// src/services/delivery.rs

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

use crate::{common::error::AppError, models::job::AutomationJob};

// A fronteira com o mundo externo: SMTP, gateway de SMS, API do WhatsApp.
// O executor só conhece esta interface; o retorno vira o delivery_log do job.
#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    async fn deliver(&self, job: &AutomationJob) -> Result<Value, AppError>;
}

// Provedor padrão: registra a entrega no log estruturado.
// Os provedores reais entram aqui quando as credenciais forem provisionadas.
pub struct LogDeliveryProvider;

#[async_trait]
impl DeliveryProvider for LogDeliveryProvider {
    async fn deliver(&self, job: &AutomationJob) -> Result<Value, AppError> {
        tracing::info!(
            "📨 Entregando job {} via {:?} para o usuário {}",
            job.id,
            job.channel,
            job.recipient_user_id
        );

        Ok(json!({
            "provider": "log",
            "channel": job.channel,
            "recipient": job.recipient_user_id,
            "deliveredAt": Utc::now(),
        }))
    }
}
