//! Process-wide configuration, loaded once at startup into an explicit
//! `Settings` struct: no global mutable state besides configuration.
//! Reads each variable via `std::env::var` with a development-friendly
//! fallback rather than a config-file layer.

use std::env;
use std::path::PathBuf;

use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct Settings {
    pub postgres_url: String,
    pub redis_url: String,
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub cdktf_dir: PathBuf,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_name: String,
    pub cors_allowed_origins: Vec<String>,
    pub worker_concurrency: usize,
}

impl Settings {
    /// Reads every setting from the environment. Fails only on a
    /// genuinely required variable (`SECRET_KEY`) being absent — the
    /// rest fall back to development-friendly defaults.
    pub fn from_env() -> Result<Self, CoreError> {
        let postgres_url = env::var("POSTGRES_URL").unwrap_or_else(|_| {
            let user = env::var("POSTGRES_USER").unwrap_or_else(|_| "openlabs".to_string());
            let password = env::var("POSTGRES_PASSWORD").unwrap_or_else(|_| "openlabs".to_string());
            let host = env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string());
            let port = env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".to_string());
            let db = env::var("POSTGRES_DB").unwrap_or_else(|_| "openlabs".to_string());
            format!("postgres://{user}:{password}@{host}:{port}/{db}")
        });

        let redis_url = env::var("REDIS_QUEUE_URL").unwrap_or_else(|_| {
            let host = env::var("REDIS_QUEUE_HOST").unwrap_or_else(|_| "localhost".to_string());
            let port = env::var("REDIS_QUEUE_PORT").unwrap_or_else(|_| "6379".to_string());
            format!("redis://{host}:{port}")
        });

        let secret_key = env::var("SECRET_KEY")
            .map_err(|_| CoreError::Validation("SECRET_KEY must be set".to_string()))?;

        let access_token_expire_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let cdktf_dir = env::var("CDKTF_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp/openlabs-cdktf"));

        let admin_email = env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@openlabs.local".to_string());
        let admin_password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "changeme".to_string());
        let admin_name = env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string());

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        let worker_concurrency = env::var("WORKER_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4);

        Ok(Settings {
            postgres_url,
            redis_url,
            secret_key,
            access_token_expire_minutes,
            cdktf_dir,
            admin_email,
            admin_password,
            admin_name,
            cors_allowed_origins,
            worker_concurrency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases live in one test: `Settings::from_env` reads process-wide
    // env vars, so running these as separate #[test] fns risks a race
    // under cargo's default parallel test execution.
    #[test]
    fn from_env_requires_secret_key_and_fills_in_defaults() {
        unsafe {
            env::remove_var("SECRET_KEY");
        }
        assert!(matches!(
            Settings::from_env(),
            Err(CoreError::Validation(_))
        ));

        unsafe {
            env::set_var("SECRET_KEY", "test-secret");
            env::remove_var("POSTGRES_URL");
            env::remove_var("REDIS_QUEUE_URL");
        }
        let settings = Settings::from_env().unwrap();
        assert!(settings.postgres_url.starts_with("postgres://"));
        assert!(settings.redis_url.starts_with("redis://"));
        assert_eq!(settings.access_token_expire_minutes, 60);

        unsafe {
            env::remove_var("SECRET_KEY");
        }
    }
}
