//! Caller extraction.
//!
//! The fronting authentication layer verifies the request and forwards the
//! principal in the `x-caller-address` header. Handlers that mutate the
//! ledger take a [`Caller`]; a missing or malformed header yields `401`.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use w3chat_shared::constants::CALLER_HEADER;
use w3chat_shared::Address;

use crate::error::ServerError;

/// The authenticated principal behind a request.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Address);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or_else(|| ServerError::Unauthenticated(format!("missing {CALLER_HEADER} header")))?;

        let raw = value
            .to_str()
            .map_err(|_| ServerError::Unauthenticated(format!("unreadable {CALLER_HEADER} header")))?;

        let address = Address::from_hex(raw)
            .map_err(|e| ServerError::Unauthenticated(e.to_string()))?;

        if address.is_zero() {
            return Err(ServerError::Unauthenticated("zero address".into()));
        }

        Ok(Caller(address))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(header: Option<&str>) -> Result<Caller, ServerError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(CALLER_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_valid_header() {
        let addr = Address(rand::random());
        let caller = extract(Some(&addr.to_hex().to_uppercase().replacen("0X", "0x", 1)))
            .await
            .unwrap();
        assert_eq!(caller.0, addr);
    }

    #[tokio::test]
    async fn test_missing_or_bad_header() {
        assert!(matches!(extract(None).await, Err(ServerError::Unauthenticated(_))));
        assert!(matches!(
            extract(Some("0x1234")).await,
            Err(ServerError::Unauthenticated(_))
        ));
        assert!(matches!(
            extract(Some(&Address::ZERO.to_hex())).await,
            Err(ServerError::Unauthenticated(_))
        ));
    }
}
