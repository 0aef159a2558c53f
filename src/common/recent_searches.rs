// src/common/recent_searches.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;

// Lista MRU limitada: mais recente primeiro, sem duplicatas, no máximo N.
pub const MAX_RECENT_SEARCHES: usize = 10;

// Porta de persistência: o mecanismo de storage fica atrás desta interface
// (hoje Postgres, amanhã qualquer coisa que implemente load/save).
#[async_trait]
pub trait RecentSearchStore: Send + Sync {
    async fn load(&self, user_id: Uuid) -> Result<Vec<String>, AppError>;
    async fn save(&self, user_id: Uuid, terms: &[String]) -> Result<(), AppError>;
}

/// Insere um termo no topo da lista, deduplicando (case-insensitive)
/// e cortando no limite.
pub fn push_term(mut terms: Vec<String>, term: &str) -> Vec<String> {
    let term = term.trim();
    if term.is_empty() {
        return terms;
    }

    let lowered = term.to_lowercase();
    terms.retain(|t| t.to_lowercase() != lowered);
    terms.insert(0, term.to_string());
    terms.truncate(MAX_RECENT_SEARCHES);
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lista(itens: &[&str]) -> Vec<String> {
        itens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn termo_novo_entra_no_topo() {
        let result = push_term(lista(&["b", "c"]), "a");
        assert_eq!(result, lista(&["a", "b", "c"]));
    }

    #[test]
    fn termo_repetido_sobe_sem_duplicar() {
        let result = push_term(lista(&["a", "b", "c"]), "B");
        assert_eq!(result, lista(&["B", "a", "c"]));
    }

    #[test]
    fn lista_respeita_o_limite() {
        let mut terms = Vec::new();
        for i in 0..20 {
            terms = push_term(terms, &format!("termo-{i}"));
        }
        assert_eq!(terms.len(), MAX_RECENT_SEARCHES);
        assert_eq!(terms[0], "termo-19");
    }

    #[test]
    fn termo_vazio_e_ignorado() {
        let result = push_term(lista(&["a"]), "   ");
        assert_eq!(result, lista(&["a"]));
    }
}
