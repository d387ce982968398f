//! Bearer-token verification.
//!
//! Tokens are issued by an external identity provider. The server only needs
//! something that turns a token into a [`User`]; [`StaticTokenVerifier`]
//! serves that role for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl User {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Caller admitted while authentication is disabled
    pub fn anonymous() -> Self {
        Self::new("anonymous")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Malformed token entry: {0}")]
    MalformedEntry(String),
}

/// Verifies bearer tokens issued by the identity provider
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<User, AuthError>;
}

/// Fixed token table loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, User>,
}

impl StaticTokenVerifier {
    /// Parse entries of the form `token:uid` or `token:uid:email`.
    pub fn from_entries(entries: &[String]) -> Result<Self, AuthError> {
        let mut tokens = HashMap::with_capacity(entries.len());
        for entry in entries {
            let mut parts = entry.trim().splitn(3, ':');
            let token = parts.next().unwrap_or_default();
            let uid = parts.next().unwrap_or_default();
            if token.is_empty() || uid.is_empty() {
                return Err(AuthError::MalformedEntry(entry.clone()));
            }

            let mut user = User::new(uid);
            if let Some(email) = parts.next().filter(|e| !e.is_empty()) {
                user = user.with_email(email);
            }
            tokens.insert(token.to_string(), user);
        }
        Ok(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<User, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}
