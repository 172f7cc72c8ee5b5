use std::{env, fmt::Display, str::FromStr};

use chrono::Duration;
use services::ServiceSettings;
use services::auth_service::generate_secret;
use services::leaderboard_service::MAX_LEADERBOARD_LIMIT;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Ten years; longer lifetimes overflow token expiry timestamps.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {message}")]
    Invalid {
        key: &'static str,
        value: String,
        message: String,
    },
}

/// Server settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub passing_score: u32,
    pub leaderboard_limit: u32,
}

impl ServerConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed or is
    /// out of range.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => warn!("Failed to read .env file: {e}"),
        }

        let jwt_secret = var("AWARE_JWT_SECRET").unwrap_or_else(|| {
            warn!("AWARE_JWT_SECRET not set, generating a random secret; tokens will not survive a restart");
            generate_secret()
        });

        let config = Self {
            db_url: try_load("AWARE_DB_URL", "sqlite://aware.sqlite3")?,
            host: try_load("AWARE_HOST", "0.0.0.0")?,
            port: try_load("AWARE_PORT", "8080")?,
            jwt_secret,
            token_ttl_hours: try_load("AWARE_TOKEN_TTL_HOURS", "24")?,
            passing_score: try_load("AWARE_PASSING_SCORE", "70")?,
            leaderboard_limit: try_load("AWARE_LEADERBOARD_LIMIT", "10")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.passing_score > 100 {
            return Err(invalid(
                "AWARE_PASSING_SCORE",
                self.passing_score,
                "must be between 0 and 100",
            ));
        }
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.token_ttl_hours) {
            return Err(invalid(
                "AWARE_TOKEN_TTL_HOURS",
                self.token_ttl_hours,
                format!("must be between 1 and {MAX_TOKEN_TTL_HOURS}"),
            ));
        }
        if self.leaderboard_limit == 0 || self.leaderboard_limit > MAX_LEADERBOARD_LIMIT {
            return Err(invalid(
                "AWARE_LEADERBOARD_LIMIT",
                self.leaderboard_limit,
                "must be between 1 and 100",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if the token lifetime cannot be represented.
    pub fn service_settings(&self) -> Result<ServiceSettings, ConfigError> {
        let token_ttl = Duration::try_hours(self.token_ttl_hours).ok_or_else(|| {
            invalid(
                "AWARE_TOKEN_TTL_HOURS",
                self.token_ttl_hours,
                "out of range",
            )
        })?;
        Ok(ServiceSettings {
            jwt_secret: self.jwt_secret.clone(),
            token_ttl,
            leaderboard_default: self.leaderboard_limit,
            leaderboard_max: MAX_LEADERBOARD_LIMIT,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        invalid(key, &raw, e)
    })
}

fn invalid(key: &'static str, value: impl Display, message: impl Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        message: message.to_string(),
    }
}
