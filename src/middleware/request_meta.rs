// src/middleware/request_meta.rs

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

// Metadados da requisição para a trilha de auditoria. A extração nunca falha:
// sem cabeçalho, o campo fica vazio.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Atrás do proxy, o primeiro endereço do x-forwarded-for é o cliente
        let ip_address = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let user_agent = parts
            .headers
            .get("user-agent")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        Ok(RequestMeta { ip_address, user_agent })
    }
}
