use facegate_core::policy::{Policy, PolicyError};
use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Optional TOML policy file; defaults apply when unset.
    pub policy_file: Option<PathBuf>,
    /// Serve on the session bus instead of the system bus.
    pub session_bus: bool,
}

impl Config {
    /// Load configuration from `FACEGATE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("facegate");

        let db_path = std::env::var("FACEGATE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("gallery.db"));

        Self {
            db_path,
            policy_file: std::env::var("FACEGATE_POLICY_FILE").ok().map(PathBuf::from),
            session_bus: env_bool("FACEGATE_SESSION_BUS", false),
        }
    }

    pub fn load_policy(&self) -> Result<Policy, PolicyError> {
        match &self.policy_file {
            Some(path) => Policy::load(path),
            None => Ok(Policy::default()),
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_without_file() {
        let config = Config {
            db_path: PathBuf::from(":memory:"),
            policy_file: None,
            session_bus: true,
        };
        assert_eq!(config.load_policy().unwrap(), Policy::default());
    }

    #[test]
    fn test_missing_policy_file_errors() {
        let config = Config {
            db_path: PathBuf::from(":memory:"),
            policy_file: Some(PathBuf::from("/nonexistent/facegate/policy.toml")),
            session_bus: true,
        };
        assert!(matches!(config.load_policy(), Err(PolicyError::Io(_))));
    }
}
