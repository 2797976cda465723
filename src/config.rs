use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::error::ConfigError;
use crate::match_tracker::CorrectionPolicy;
use crate::sentence_bank::SentenceBank;
use crate::session::{Mode, SessionConfig, TimeLimit};

/// Stored user preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub correction: CorrectionPolicy,
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: u64,
    #[serde(default = "default_sentence_bank")]
    pub sentence_bank: String,
}

fn default_time_limit_secs() -> u64 {
    TimeLimit::default().secs()
}

fn default_sentence_bank() -> String {
    "classic".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            correction: CorrectionPolicy::default(),
            time_limit_secs: default_time_limit_secs(),
            sentence_bank: default_sentence_bank(),
        }
    }
}

impl Config {
    /// Validates the stored values into engine settings.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        Ok(SessionConfig {
            mode: self.mode,
            correction: self.correction,
            time_limit: TimeLimit::from_secs(self.time_limit_secs)?,
        })
    }

    pub fn load_sentence_bank(&self) -> Result<SentenceBank, ConfigError> {
        SentenceBank::by_name(&self.sentence_bank)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing or unreadable files fall back to defaults.
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "ignoring unreadable config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nested/deeper/config.json"));
        let cfg = Config {
            mode: Mode::Timed,
            correction: CorrectionPolicy::Permissive,
            time_limit_secs: 30,
            sentence_bank: "pangrams".into(),
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("absent.json"));
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "mode": "timed" }"#).unwrap();
        assert_eq!(cfg.mode, Mode::Timed);
        assert_eq!(cfg.correction, CorrectionPolicy::StrictPrefix);
        assert_eq!(cfg.time_limit_secs, 60);
        assert_eq!(cfg.sentence_bank, "classic");
    }

    #[test]
    fn policy_names_are_kebab_case() {
        let cfg: Config = serde_json::from_str(r#"{ "correction": "strict-prefix" }"#).unwrap();
        assert_eq!(cfg.correction, CorrectionPolicy::StrictPrefix);
        let json = serde_json::to_string(&Config {
            correction: CorrectionPolicy::Permissive,
            ..Config::default()
        })
        .unwrap();
        assert!(json.contains("\"permissive\""));
    }

    #[test]
    fn unsupported_time_limit_fails_validation() {
        let cfg = Config {
            time_limit_secs: 45,
            ..Config::default()
        };
        assert_eq!(
            cfg.session_config(),
            Err(ConfigError::UnsupportedTimeLimit(45))
        );
    }

    #[test]
    fn unknown_bank_fails_to_load() {
        let cfg = Config {
            sentence_bank: "missing".into(),
            ..Config::default()
        };
        assert_eq!(
            cfg.load_sentence_bank(),
            Err(ConfigError::UnknownSentenceBank("missing".into()))
        );
    }
}
