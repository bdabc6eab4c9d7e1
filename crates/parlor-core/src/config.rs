//! Configuration module
//!
//! This module provides the runtime configuration for the upload service.
//! Every setting is read from the environment with a sensible default, so a
//! bare `parlor-api` invocation works out of the box.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

// Common constants
const SERVER_PORT: u16 = 9000;
const MAX_UPLOAD_KB: i64 = 10_240;
const TOKEN_TTL_SECS: u64 = 60;

/// Runtime configuration for the upload service
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    /// Root directory that stored files are confined to.
    pub upload_root: PathBuf,
    /// Upload size ceiling in kibibytes. Values below 1 disable the limit.
    pub max_upload_kb: i64,
    /// How long an issued upload token survives without a keep-alive ping.
    pub token_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .unwrap_or(SERVER_PORT),
            environment,
            upload_root: env::var("PARLOR_UPLOAD_ROOT")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            max_upload_kb: env::var("PARLOR_MAX_UPLOAD_KB")
                .unwrap_or_else(|_| MAX_UPLOAD_KB.to_string())
                .parse()
                .unwrap_or(MAX_UPLOAD_KB),
            token_ttl: Duration::from_secs(
                env::var("PARLOR_TOKEN_TTL_SECS")
                    .unwrap_or_else(|_| TOKEN_TTL_SECS.to_string())
                    .parse()
                    .unwrap_or(TOKEN_TTL_SECS),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Upload ceiling in bytes, or `None` when uploads are unlimited.
    pub fn max_upload_bytes(&self) -> Option<u64> {
        if self.max_upload_kb < 1 {
            None
        } else {
            Some(self.max_upload_kb as u64 * 1024)
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.upload_root.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("PARLOR_UPLOAD_ROOT must not be empty"));
        }

        if self.token_ttl.is_zero() {
            return Err(anyhow::anyhow!(
                "PARLOR_TOKEN_TTL_SECS must be at least 1 second"
            ));
        }

        Ok(())
    }
}
