// src/realtime.rs

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

// O evento empurrado para os clientes conectados: qual tabela mudou,
// que operação foi, e a linha afetada.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEvent {
    pub op: ChangeOp,
    pub table: String,
    pub row: Value,
}

impl RealtimeEvent {
    pub fn insert(table: &str, row: Value) -> Self {
        Self {
            op: ChangeOp::Insert,
            table: table.to_string(),
            row,
        }
    }

    pub fn update(table: &str, row: Value) -> Self {
        Self {
            op: ChangeOp::Update,
            table: table.to_string(),
            row,
        }
    }
}

// Hub de canais realtime: no máximo um sender por usuário; múltiplas
// conexões do mesmo usuário compartilham o mesmo canal broadcast.
#[derive(Clone, Default)]
pub struct RealtimeHub {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<RealtimeEvent>>>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abre uma assinatura para o usuário. O valor retornado É o recurso:
    /// quem o segura é dono do canal e deve chamar `close()` (ou soltar)
    /// quando a conexão terminar.
    pub fn subscribe(&self, user_id: Uuid) -> RealtimeSubscription {
        let mut channels = self.channels.write().unwrap();
        let tx = channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        RealtimeSubscription {
            user_id,
            rx: tx.subscribe(),
            hub: self.clone(),
        }
    }

    /// Publica um evento para todas as conexões do usuário.
    /// Retorna quantos receptores estavam escutando (0 = ninguém online).
    pub fn publish(&self, user_id: Uuid, event: RealtimeEvent) -> usize {
        let channels = self.channels.read().unwrap();
        match channels.get(&user_id) {
            Some(tx) => tx.send(event).unwrap_or(0),
            None => 0,
        }
    }

    pub fn connected_users(&self) -> usize {
        self.channels.read().unwrap().len()
    }

    // Remove o sender quando a última assinatura do usuário fechar.
    fn release(&self, user_id: Uuid) {
        let mut channels = self.channels.write().unwrap();
        if let Some(tx) = channels.get(&user_id) {
            // O receiver da assinatura que está fechando ainda conta aqui.
            if tx.receiver_count() <= 1 {
                channels.remove(&user_id);
            }
        }
    }
}

// Aquisição escopada com liberação garantida: o Drop devolve o canal
// ao hub mesmo se o componente dono esquecer de fechar.
pub struct RealtimeSubscription {
    user_id: Uuid,
    rx: broadcast::Receiver<RealtimeEvent>,
    hub: RealtimeHub,
}

impl RealtimeSubscription {
    /// Espera o próximo evento. `None` = canal encerrado.
    /// Se a assinatura ficar para trás (lag), pula para o mais recente:
    /// o cache consultável continua sendo a fonte de verdade.
    pub async fn recv(&mut self) -> Option<RealtimeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Assinatura realtime do usuário {} perdeu {} eventos",
                        self.user_id,
                        skipped
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Encerramento explícito (equivale a soltar o valor).
    pub fn close(self) {}
}

impl Drop for RealtimeSubscription {
    fn drop(&mut self) {
        self.hub.release(self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn publica_e_recebe_no_canal_do_usuario() {
        let hub = RealtimeHub::new();
        let user = Uuid::new_v4();

        let mut sub = hub.subscribe(user);
        let delivered = hub.publish(user, RealtimeEvent::insert("notifications", json!({"id": 1})));
        assert_eq!(delivered, 1);

        let event = sub.recv().await.expect("evento deveria chegar");
        assert_eq!(event.op, ChangeOp::Insert);
        assert_eq!(event.table, "notifications");
    }

    #[tokio::test]
    async fn usuario_sem_assinatura_nao_recebe_nada() {
        let hub = RealtimeHub::new();
        let delivered = hub.publish(Uuid::new_v4(), RealtimeEvent::insert("notifications", json!({})));
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn duas_conexoes_compartilham_o_mesmo_canal() {
        let hub = RealtimeHub::new();
        let user = Uuid::new_v4();

        let mut a = hub.subscribe(user);
        let mut b = hub.subscribe(user);
        assert_eq!(hub.connected_users(), 1);

        let delivered = hub.publish(user, RealtimeEvent::update("notifications", json!({"id": 2})));
        assert_eq!(delivered, 2);
        assert!(a.recv().await.is_some());
        assert!(b.recv().await.is_some());
    }

    #[tokio::test]
    async fn fechar_a_ultima_assinatura_libera_o_canal() {
        let hub = RealtimeHub::new();
        let user = Uuid::new_v4();

        let a = hub.subscribe(user);
        let b = hub.subscribe(user);
        a.close();
        assert_eq!(hub.connected_users(), 1);
        b.close();
        assert_eq!(hub.connected_users(), 0);

        // Publicar depois do fechamento não entrega para ninguém.
        let delivered = hub.publish(user, RealtimeEvent::insert("notifications", json!({})));
        assert_eq!(delivered, 0);
    }
}
