//! Server configuration
//!
//! Configuration is read from the environment (optionally via a `.env`
//! file loaded in `main`): database connection string, allowed client
//! origin for CORS, token-signing secret, and the listen port.

use thiserror::Error;

/// Server configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// SQLite connection string, e.g. `sqlite://ripple.db?mode=rwc`
    pub database_url: String,
    /// Origin allowed by the CORS layer, e.g. `http://localhost:5173`
    pub client_origin: String,
    /// Secret used to sign and verify bearer tokens
    pub jwt_secret: String,
    /// TCP port the server binds to
    pub port: u16,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// `DATABASE_URL` and `JWT_SECRET` are required; `CLIENT_ORIGIN`
    /// defaults to the local dev client and `SERVER_PORT` to 3000.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingValue("DATABASE_URL"))?;

        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingValue("JWT_SECRET"))?;
        if jwt_secret.is_empty() {
            return Err(ConfigError::MissingValue("JWT_SECRET"));
        }

        let client_origin = std::env::var("CLIENT_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        let port = match std::env::var("SERVER_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => 3000,
        };

        Ok(Self {
            database_url,
            client_origin,
            jwt_secret,
            port,
        })
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid port: {0}")]
    InvalidPort(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_url_is_an_error() {
        let err = ConfigError::MissingValue("DATABASE_URL");
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn invalid_port_is_reported() {
        let err = ConfigError::InvalidPort("not-a-port".to_string());
        assert!(err.to_string().contains("not-a-port"));
    }
}
