use std::collections::BTreeMap;

use thiserror::Error;

/// Field name to messages, as returned by the backend on a 400.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Failure of a backend call, classified once at the HTTP boundary.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid input: {0:?}")]
    Validation(FieldErrors),
    #[error("not authorized (HTTP {0})")]
    Auth(u16),
    #[error("resource not found")]
    NotFound,
    #[error("rate limited")]
    RateLimited,
    #[error("server error (HTTP {0})")]
    Server(u16),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
}

/// What the user was doing when a call failed; picks the wording for a 400.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Login,
    Register,
    Payment,
    PasswordReset,
    Routine,
    Profile,
    General,
}

impl ApiError {
    /// Builds the error for a non-success response.
    pub fn from_response(status: u16, body: &str) -> Self {
        match status {
            400 => ApiError::Validation(parse_field_errors(body)),
            401 | 403 => ApiError::Auth(status),
            404 => ApiError::NotFound,
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server(status),
            _ => ApiError::Status(status),
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::Validation(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn user_message(&self, action: Action) -> String {
        match self {
            ApiError::Validation(_) => match action {
                Action::Login => "Email ou senha inválidos".into(),
                Action::Register => "Erro ao cadastrar. Verifique os dados.".into(),
                Action::Payment => "Dados do cartão inválidos. Verifique as informações.".into(),
                Action::PasswordReset => "Email não encontrado ou inválido.".into(),
                Action::Routine => "Dados do treino inválidos.".into(),
                Action::Profile => "Dados do perfil inválidos.".into(),
                Action::General => "Dados inválidos.".into(),
            },
            ApiError::Auth(_) => "Erro de autenticação. Faça login novamente.".into(),
            ApiError::RateLimited => {
                "Muitas tentativas. Aguarde alguns minutos antes de tentar novamente.".into()
            }
            ApiError::Server(_) => "Erro interno do servidor. Tente novamente.".into(),
            ApiError::Network(_) => "Erro de conexão. Verifique se o servidor está rodando.".into(),
            ApiError::NotFound => "Registro não encontrado.".into(),
            ApiError::Status(_) | ApiError::Decode(_) => "Erro inesperado. Tente novamente.".into(),
        }
    }
}

/// Reads a DRF-style error body. `{"field": ["msg"]}` and `{"detail": "msg"}`
/// are both understood; anything else lands under `non_field_errors`.
fn parse_field_errors(body: &str) -> FieldErrors {
    let mut fields = FieldErrors::new();
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => {
            if !body.trim().is_empty() {
                fields.insert("non_field_errors".into(), vec![body.trim().to_string()]);
            }
            return fields;
        }
    };

    match value {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                let messages = match value {
                    serde_json::Value::Array(items) => items
                        .into_iter()
                        .map(|item| match item {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        })
                        .collect(),
                    serde_json::Value::String(s) => vec![s],
                    other => vec![other.to_string()],
                };
                fields.insert(key, messages);
            }
        }
        serde_json::Value::Array(items) => {
            let messages = items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect();
            fields.insert("non_field_errors".into(), messages);
        }
        other => {
            fields.insert("non_field_errors".into(), vec![other.to_string()]);
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_variants() {
        assert!(matches!(ApiError::from_response(400, "{}"), ApiError::Validation(_)));
        assert_eq!(ApiError::from_response(401, ""), ApiError::Auth(401));
        assert_eq!(ApiError::from_response(403, ""), ApiError::Auth(403));
        assert_eq!(ApiError::from_response(404, ""), ApiError::NotFound);
        assert_eq!(ApiError::from_response(429, ""), ApiError::RateLimited);
        assert_eq!(ApiError::from_response(502, ""), ApiError::Server(502));
        assert_eq!(ApiError::from_response(418, ""), ApiError::Status(418));
    }

    #[test]
    fn validation_body_is_parsed_per_field() {
        let err = ApiError::from_response(
            400,
            r#"{"numero_cartao": ["Número inválido."], "detail": "Falhou"}"#,
        );
        let fields = err.field_errors().unwrap();
        assert_eq!(fields["numero_cartao"], vec!["Número inválido.".to_string()]);
        assert_eq!(fields["detail"], vec!["Falhou".to_string()]);
    }

    #[test]
    fn plain_text_body_goes_to_non_field_errors() {
        let err = ApiError::from_response(400, "bad request");
        assert_eq!(err.field_errors().unwrap()["non_field_errors"], vec!["bad request".to_string()]);
    }

    #[test]
    fn messages_depend_on_status_and_action() {
        let invalid = ApiError::Validation(FieldErrors::new());
        assert_eq!(
            invalid.user_message(Action::Payment),
            "Dados do cartão inválidos. Verifique as informações."
        );
        assert_eq!(invalid.user_message(Action::PasswordReset), "Email não encontrado ou inválido.");
        assert!(ApiError::RateLimited.user_message(Action::PasswordReset).starts_with("Muitas tentativas"));
        assert!(ApiError::Network("down".into()).user_message(Action::General).starts_with("Erro de conexão"));
    }
}
