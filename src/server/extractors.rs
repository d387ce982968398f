//! Custom extractors for the HTTP server.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{ACCEPT, AUTHORIZATION},
        request::Parts,
    },
};
use std::convert::Infallible;
use tracing::debug;

use crate::auth::User;
use crate::error::AppError;

use super::AppState;

/// Response encoding requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Json,
    MsgPack,
}

impl ResponseFormat {
    /// `MessagePack` when the `Accept` header names it, JSON otherwise
    pub fn from_accept(accept: Option<&str>) -> Self {
        match accept {
            Some(value) if value.contains("msgpack") => Self::MsgPack,
            _ => Self::Json,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ResponseFormat
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let accept = parts.headers.get(ACCEPT).and_then(|v| v.to_str().ok());
        Ok(Self::from_accept(accept))
    }
}

/// Caller identified by the `Authorization: Bearer <token>` header.
///
/// When authentication is disabled, a missing or rejected token yields
/// [`User::anonymous`] instead of a 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let verified = match bearer_token(parts) {
            Some(token) => state.verifier.verify(token).await,
            None => Err(crate::auth::AuthError::MissingToken),
        };

        match verified {
            Ok(user) => Ok(Self(user)),
            Err(e) if state.config.auth.required => {
                debug!(error = %e, "Rejected request");
                Err(AppError::Unauthorized("Authentication required".to_string()))
            }
            Err(_) => Ok(Self(User::anonymous())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<(&str, &str)>) -> Parts {
        let mut builder = Request::builder().uri("/predict");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_response_format_from_accept() {
        assert_eq!(ResponseFormat::from_accept(None), ResponseFormat::Json);
        assert_eq!(
            ResponseFormat::from_accept(Some("application/json")),
            ResponseFormat::Json
        );
        assert_eq!(
            ResponseFormat::from_accept(Some("application/msgpack")),
            ResponseFormat::MsgPack
        );
        assert_eq!(
            ResponseFormat::from_accept(Some("application/x-msgpack, */*")),
            ResponseFormat::MsgPack
        );
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some(("authorization", "Bearer abc")))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some(("authorization", "bearer  abc ")))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some(("authorization", "Basic abc")))), None);
        assert_eq!(bearer_token(&parts(Some(("authorization", "Bearer ")))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
