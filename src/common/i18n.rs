// src/common/i18n.rs

use std::collections::HashMap;

// Catálogo de mensagens de erro em memória, indexado por idioma e código.
// O idioma vem do extrator Locale (Accept-Language).
#[derive(Clone)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

const DEFAULT_LANG: &str = "en";

impl I18nStore {
    pub fn new() -> Self {
        let mut messages = HashMap::new();

        let mut pt = HashMap::new();
        pt.insert("validation", "Um ou mais campos são inválidos.");
        pt.insert("permission_denied", "Você não tem permissão para esta operação.");
        pt.insert("not_found", "Registro não encontrado.");
        pt.insert("conflict", "O registro já existe.");
        pt.insert("timeout", "A operação demorou demais. Tente novamente.");
        pt.insert("invalid_token", "Token de autenticação inválido ou ausente.");
        pt.insert("invalid_timezone", "Fuso horário inválido.");
        pt.insert("delivery_failed", "Falha ao entregar a comunicação.");
        pt.insert("internal", "Ocorreu um erro inesperado.");
        messages.insert("pt", pt);

        let mut en = HashMap::new();
        en.insert("validation", "One or more fields are invalid.");
        en.insert("permission_denied", "You do not have permission for this operation.");
        en.insert("not_found", "Record not found.");
        en.insert("conflict", "The record already exists.");
        en.insert("timeout", "The operation took too long. Please retry.");
        en.insert("invalid_token", "Missing or invalid authentication token.");
        en.insert("invalid_timezone", "Invalid timezone.");
        en.insert("delivery_failed", "Failed to deliver the communication.");
        en.insert("internal", "An unexpected error occurred.");
        messages.insert("en", en);

        Self { messages }
    }

    /// Busca a mensagem no idioma pedido, caindo para o inglês e,
    /// em último caso, para o próprio código.
    pub fn translate(&self, lang: &str, code: &str) -> String {
        self.messages
            .get(lang)
            .and_then(|m| m.get(code))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|m| m.get(code)))
            .map(|s| s.to_string())
            .unwrap_or_else(|| code.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traduz_no_idioma_pedido() {
        let store = I18nStore::new();
        assert_eq!(store.translate("pt", "not_found"), "Registro não encontrado.");
        assert_eq!(store.translate("en", "not_found"), "Record not found.");
    }

    #[test]
    fn idioma_desconhecido_cai_para_ingles() {
        let store = I18nStore::new();
        assert_eq!(store.translate("de", "timeout"), "The operation took too long. Please retry.");
    }

    #[test]
    fn codigo_desconhecido_volta_o_proprio_codigo() {
        let store = I18nStore::new();
        assert_eq!(store.translate("pt", "xyz"), "xyz");
    }
}
