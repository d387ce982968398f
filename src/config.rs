use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use crate::mood::EngineKind;

/// Application configuration loaded from environment variables.
///
/// All settings can be configured via environment variables with the `ARTMOOD_`
/// prefix and `__` between nested keys. For example: `ARTMOOD_SERVER__PORT=8080`,
/// `ARTMOOD_ENGINE__KIND=embedding`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Which mood engine serves predictions
    #[serde(default)]
    pub engine: EngineConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub cors: CorsConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl ServerConfig {
    /// Returns the socket address for binding the server
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub kind: EngineKind,

    /// Build the embedding engine at startup instead of on first request
    #[serde(default)]
    pub preload: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// CLIP model to use (Hugging Face model ID)
    #[serde(default = "default_model")]
    pub name: String,

    /// Enable CUDA acceleration
    #[serde(default)]
    pub enable_cuda: bool,

    /// Model cache directory; platform cache dir when unset
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            enable_cuda: false,
            cache_dir: None,
        }
    }
}

fn default_model() -> String {
    "Xenova/clip-vit-base-patch32".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Allowed browser origins
    #[serde(default = "default_origins")]
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_origins(),
        }
    }
}

fn default_origins() -> Vec<String> {
    [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:5173",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Reject `/predict` calls without a valid bearer token
    #[serde(default = "default_auth_required")]
    pub required: bool,

    /// Static tokens in `token:uid[:email]` form
    #[serde(default)]
    pub dev_tokens: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            required: default_auth_required(),
            dev_tokens: Vec::new(),
        }
    }
}

fn default_auth_required() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables should be prefixed with `ARTMOOD_` and use
    /// double underscores for nested values:
    /// - `ARTMOOD_ENGINE__KIND` -> engine.kind
    /// - `ARTMOOD_MODEL__ENABLE_CUDA` -> model.enable_cuda
    /// - `ARTMOOD_CORS__ORIGINS` -> cors.origins (comma separated)
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(environment())
    }

    fn from_environment(env: Environment) -> Result<Self, ConfigError> {
        Config::builder().add_source(env).build()?.try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("ARTMOOD")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("cors.origins")
        .with_list_parse_key("auth.dev_tokens")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_environment(environment().source(Some(map))).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.model.name, "Xenova/clip-vit-base-patch32");
        assert!(!config.model.enable_cuda);
        assert_eq!(config.engine.kind, EngineKind::Heuristic);
        assert!(!config.engine.preload);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.cors.origins.len(), 4);
        assert!(config.auth.required);
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerConfig::default();
        let addr = server.socket_addr().unwrap();
        assert_eq!(addr.port(), 8000);

        let bad = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = from_vars(&[]);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.engine.kind, EngineKind::Heuristic);
    }

    #[test]
    fn test_environment_overrides() {
        let config = from_vars(&[
            ("ARTMOOD_SERVER__PORT", "9100"),
            ("ARTMOOD_ENGINE__KIND", "embedding"),
            ("ARTMOOD_ENGINE__PRELOAD", "true"),
            ("ARTMOOD_AUTH__REQUIRED", "false"),
            ("ARTMOOD_CORS__ORIGINS", "https://a.example,https://b.example"),
            ("ARTMOOD_AUTH__DEV_TOKENS", "tok1:alice,tok2:bob:bob@example.com"),
        ]);

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.engine.kind, EngineKind::Embedding);
        assert!(config.engine.preload);
        assert!(!config.auth.required);
        assert_eq!(config.cors.origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.auth.dev_tokens.len(), 2);
    }
}
