//! Runtime configuration
//!
//! Read once at startup from `API_*` environment variables (the binary
//! loads `.env` first through `dotenvy`). Every field has a development
//! default, so a bare `cargo run` comes up against a local Postgres.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Interface the listener binds to (`API_BIND`)
    pub bind: IpAddr,
    /// Listener port (`API_PORT`)
    pub port: u16,
    /// Secret the landlord bearer tokens are signed with (`API_JWT_SECRET`)
    pub jwt_secret: String,
    /// Postgres connection string (`API_DATABASE_URL`)
    pub database_url: String,
    /// Tracing filter used when `RUST_LOG` is unset (`API_LOG_LEVEL`)
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            jwt_secret: "change-me-in-production".to_owned(),
            database_url: "postgres://localhost/rental".to_owned(),
            log_level: "info".to_owned(),
        }
    }
}

impl ApiConfig {
    /// Reads the `API_*` environment; unset variables keep their defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Where the server listens
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_listen_on_all_interfaces() {
        let config = ApiConfig::default();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
    }
}
