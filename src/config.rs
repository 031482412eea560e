use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::auth::credential::{CredentialService, DEFAULT_ROUNDS, MIN_ROUNDS};
use crate::model::session::DEFAULT_TTL_MINUTES;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReviewhubConfig {
    pub database: Option<String>,
    pub session_ttl_minutes: Option<i64>,
    pub pbkdf2_rounds: Option<u32>,
}

impl ReviewhubConfig {
    /// Session lifetime, defaulting to one hour
    pub fn session_ttl(&self) -> anyhow::Result<chrono::Duration> {
        let minutes = self.session_ttl_minutes.unwrap_or(DEFAULT_TTL_MINUTES);
        if minutes <= 0 {
            anyhow::bail!("session_ttl_minutes must be positive, got {}", minutes);
        }
        Ok(chrono::Duration::minutes(minutes))
    }

    /// Credential service with the configured iteration count
    pub fn credentials(&self) -> anyhow::Result<CredentialService> {
        let rounds = self.pbkdf2_rounds.unwrap_or(DEFAULT_ROUNDS);
        if rounds < MIN_ROUNDS {
            anyhow::bail!("pbkdf2_rounds must be at least {}, got {}", MIN_ROUNDS, rounds);
        }
        Ok(CredentialService::with_rounds(rounds))
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        self.session_ttl()?;
        self.credentials()?;
        if self.database.as_deref().is_some_and(|db| db.trim().is_empty()) {
            anyhow::bail!("database path must not be empty");
        }
        Ok(())
    }

    /// Configured database path, relative paths resolved against `base`
    pub fn database_path_in(&self, base: &Path) -> PathBuf {
        match &self.database {
            Some(db) => base.join(db),
            None => default_database_path_in(base),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("reviewhub.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".reviewhub").join("reviewhub.db")
}

/// Read and validate a config file. A missing file is `Ok(None)` so callers
/// fall back to defaults; a present but invalid one is an error.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ReviewhubConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        tracing::debug!("no config at {}, using defaults", path.display());
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: ReviewhubConfig =
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid settings in {}", path.display()))?;
    Ok(Some(config))
}

/// Write `config`, refusing to clobber an existing file unless `force`.
/// Settings are validated first so a broken file is never produced.
pub fn write_config(path: &Path, config: &ReviewhubConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }
    config.validate()?;

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Create the directory the database file lives in
pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if !parent.exists() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
        tracing::debug!("created database directory {}", parent.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviewhub.toml");
        let config = ReviewhubConfig {
            database: Some("data/app.db".to_string()),
            session_ttl_minutes: Some(30),
            pbkdf2_rounds: None,
        };
        write_config(&path, &config, false).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), Some(config.clone()));

        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();
    }

    #[test]
    fn test_defaults_resolve() {
        let config = ReviewhubConfig::default();
        assert_eq!(config.session_ttl().unwrap(), chrono::Duration::hours(1));
        assert_eq!(config.credentials().unwrap().rounds(), DEFAULT_ROUNDS);
        assert_eq!(
            config.database_path_in(Path::new("/srv")),
            PathBuf::from("/srv/.reviewhub/reviewhub.db")
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = ReviewhubConfig {
            database: None,
            session_ttl_minutes: Some(0),
            pbkdf2_rounds: Some(10),
        };
        assert!(config.session_ttl().is_err());
        assert!(config.credentials().is_err());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviewhub.toml");
        std::fs::write(&path, "session_ttl_minutes = -5\n").unwrap();
        assert!(load_config(Some(&path)).is_err());

        std::fs::write(&path, "pbkdf2_rounds = 1000\n").unwrap();
        assert!(load_config(Some(&path)).is_err());

        std::fs::write(&path, "database = \"  \"\n").unwrap();
        assert!(load_config(Some(&path)).is_err());

        std::fs::write(&path, "session_ttl_minutes = 15\npbkdf2_rounds = 200000\n").unwrap();
        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.session_ttl().unwrap(), chrono::Duration::minutes(15));
        assert_eq!(config.credentials().unwrap().rounds(), 200_000);
    }

    #[test]
    fn test_write_refuses_invalid_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviewhub.toml");
        let config = ReviewhubConfig {
            session_ttl_minutes: Some(0),
            ..ReviewhubConfig::default()
        };
        assert!(write_config(&path, &config, false).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_ensure_db_dir_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("deeper").join("app.db");
        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
    }
}
