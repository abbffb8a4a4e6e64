//! CLI configuration from the environment.
//!
//! ```bash
//! PROCAUTH_DATABASE_URL=sqlite:///var/lib/procauth/store.db  # default ~/.procauth/store.db
//! PROCAUTH_ACTOR=0192...                                     # user recorded as grantedBy
//! PROCAUTH_LOG=procauth_core=debug                           # falls back to RUST_LOG, then "info"
//! ```
//!
//! Command-line flags take precedence over the environment.

use std::env;
use std::str::FromStr;

use procauth_storage::UserId;
use thiserror::Error;

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// `None` selects the default database under the home directory.
    pub database_url: Option<String>,
    pub actor: Option<UserId>,
    pub log_filter: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid actor id '{0}': expected a UUID")]
    InvalidActor(String),

    #[error("Database URL must not be empty")]
    EmptyDatabaseUrl,

    #[error("No acting user: pass --actor or set PROCAUTH_ACTOR")]
    MissingActor,
}

impl CliConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = match env::var("PROCAUTH_DATABASE_URL") {
            Ok(url) if url.trim().is_empty() => return Err(ConfigError::EmptyDatabaseUrl),
            Ok(url) => Some(url),
            Err(_) => None,
        };

        let actor = match env::var("PROCAUTH_ACTOR") {
            Ok(raw) => {
                Some(UserId::from_str(raw.trim()).map_err(|_| ConfigError::InvalidActor(raw))?)
            }
            Err(_) => None,
        };

        let log_filter = env::var("PROCAUTH_LOG")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            database_url,
            actor,
            log_filter,
        })
    }

    /// Apply command-line overrides.
    pub fn with_flags(mut self, database_url: Option<String>, actor: Option<UserId>) -> Self {
        if database_url.is_some() {
            self.database_url = database_url;
        }
        if actor.is_some() {
            self.actor = actor;
        }
        self
    }

    pub fn require_actor(&self) -> Result<UserId, ConfigError> {
        self.actor.clone().ok_or(ConfigError::MissingActor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests below mutate process-wide environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: &[&str] = &[
        "PROCAUTH_DATABASE_URL",
        "PROCAUTH_ACTOR",
        "PROCAUTH_LOG",
        "RUST_LOG",
    ];

    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
    }

    impl<'a> EnvGuard<'a> {
        fn new() -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            for var in ENV_VARS {
                env::remove_var(var);
            }
            Self { _lock: lock }
        }

        fn set(&self, key: &str, value: &str) {
            env::set_var(key, value);
        }
    }

    impl<'a> Drop for EnvGuard<'a> {
        fn drop(&mut self) {
            for var in ENV_VARS {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let _guard = EnvGuard::new();

        let config = CliConfig::from_env().unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.actor, None);
        assert_eq!(config.log_filter, "info");
        assert!(matches!(
            config.require_actor(),
            Err(ConfigError::MissingActor)
        ));
    }

    #[test]
    fn test_reads_all_vars() {
        let guard = EnvGuard::new();
        let actor = UserId::new();
        guard.set("PROCAUTH_DATABASE_URL", "sqlite::memory:");
        guard.set("PROCAUTH_ACTOR", &actor.to_string());
        guard.set("PROCAUTH_LOG", "procauth_core=debug");
        guard.set("RUST_LOG", "warn");

        let config = CliConfig::from_env().unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.require_actor().unwrap(), actor);
        assert_eq!(config.log_filter, "procauth_core=debug");
    }

    #[test]
    fn test_rust_log_fallback() {
        let guard = EnvGuard::new();
        guard.set("RUST_LOG", "warn");

        let config = CliConfig::from_env().unwrap();
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_invalid_actor() {
        let guard = EnvGuard::new();
        guard.set("PROCAUTH_ACTOR", "alice");

        assert!(matches!(
            CliConfig::from_env(),
            Err(ConfigError::InvalidActor(ref v)) if v == "alice"
        ));
    }

    #[test]
    fn test_empty_database_url() {
        let guard = EnvGuard::new();
        guard.set("PROCAUTH_DATABASE_URL", "  ");

        assert!(matches!(
            CliConfig::from_env(),
            Err(ConfigError::EmptyDatabaseUrl)
        ));
    }

    #[test]
    fn test_flags_override_environment() {
        let guard = EnvGuard::new();
        guard.set("PROCAUTH_DATABASE_URL", "sqlite://env.db");
        let flag_actor = UserId::new();

        let config = CliConfig::from_env()
            .unwrap()
            .with_flags(Some("sqlite://flag.db".into()), Some(flag_actor.clone()));
        assert_eq!(config.database_url.as_deref(), Some("sqlite://flag.db"));
        assert_eq!(config.actor, Some(flag_actor));

        let config = CliConfig::from_env().unwrap().with_flags(None, None);
        assert_eq!(config.database_url.as_deref(), Some("sqlite://env.db"));
    }
}
