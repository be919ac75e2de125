//! Configuration for internhub.
//!
//! [`Config::load`] layers the embedded defaults, then the optional
//! `<config_dir>/config.toml`, then `INTERNHUB_*` environment variables
//! (`INTERNHUB_WORKFLOW__POLICY=lenient`). [`Config::defaults`] returns the
//! embedded defaults without touching the filesystem.

use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;

use crate::workflow::TransitionPolicy;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[store]
# data_dir = "/var/lib/internhub"
# path     = "/var/lib/internhub/internhub.db"

[search]
max_input_len = 100

[workflow]
policy = "forward_only"

[log]
level = "info"

[storage]
resume_max_bytes = 5242880
logo_max_bytes   = 2097152
"#;

const DB_FILE: &str = "internhub.db";
const SESSION_FILE: &str = "session.json";

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[store]`: where the database, session file and uploads live.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Database file; defaults to `<data_dir>/internhub.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_input_len")]
    pub max_input_len: usize,
}

fn default_max_input_len() -> usize { crate::filter::DEFAULT_MAX_INPUT_LEN }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_input_len: default_max_input_len(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub policy: TransitionPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_resume_max_bytes")]
    pub resume_max_bytes: u64,
    #[serde(default = "default_logo_max_bytes")]
    pub logo_max_bytes: u64,
}

fn default_resume_max_bytes() -> u64 { 5 * 1024 * 1024 }
fn default_logo_max_bytes() -> u64 { 2 * 1024 * 1024 }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            resume_max_bytes: default_resume_max_bytes(),
            logo_max_bytes: default_logo_max_bytes(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));
        if let Some(path) = config_path() {
            builder = builder.add_source(config::File::from(path.as_path()).required(false));
        }
        builder
            .add_source(
                config::Environment::with_prefix("INTERNHUB")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// The embedded defaults. Falls back to the serde defaults, which carry
    /// the same values, if the embedded text ever fails to parse.
    pub fn defaults() -> Self {
        Self::from_toml(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            store: StoreConfig::default(),
            search: SearchConfig::default(),
            workflow: WorkflowConfig::default(),
            log: LogConfig::default(),
            storage: StorageConfig::default(),
        })
    }

    /// Build from TOML text layered over the embedded defaults.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.store
            .data_dir
            .clone()
            .or_else(|| ProjectDirs::from("", "", "internhub").map(|d| d.data_dir().to_path_buf()))
            .unwrap_or_else(|| PathBuf::from(".internhub"))
    }

    pub fn db_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| self.data_dir().join(DB_FILE))
    }

    pub fn storage_root(&self) -> PathBuf {
        self.data_dir().join("storage")
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir().join(SESSION_FILE)
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "internhub").map(|d| d.config_dir().join("config.toml"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load() {
        let cfg = Config::defaults();
        assert_eq!(cfg.search.max_input_len, 100);
        assert_eq!(cfg.workflow.policy, TransitionPolicy::ForwardOnly);
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.storage.resume_max_bytes, 5 * 1024 * 1024);
        assert_eq!(cfg.storage.logo_max_bytes, 2 * 1024 * 1024);
        assert!(cfg.store.path.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let cfg = Config::from_toml(
            r#"
            [store]
            data_dir = "/tmp/hub"

            [workflow]
            policy = "lenient"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.workflow.policy, TransitionPolicy::Lenient);
        assert_eq!(cfg.search.max_input_len, 100);
        assert_eq!(cfg.db_path(), PathBuf::from("/tmp/hub/internhub.db"));
        assert_eq!(cfg.storage_root(), PathBuf::from("/tmp/hub/storage"));
        assert_eq!(cfg.session_path(), PathBuf::from("/tmp/hub/session.json"));
    }

    #[test]
    fn explicit_db_path_wins() {
        let cfg = Config::from_toml(
            r#"
            [store]
            data_dir = "/tmp/hub"
            path = "/srv/hub.db"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.db_path(), PathBuf::from("/srv/hub.db"));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(Config::from_toml("[workflow]\npolicy = \"strict\"\n").is_err());
    }

    #[test]
    fn policy_accepts_the_same_spellings_as_the_parser() {
        for text in ["forward-only", "Forward_Only", " lenient "] {
            let cfg = Config::from_toml(&format!("[workflow]\npolicy = \"{}\"\n", text)).unwrap();
            assert_eq!(cfg.workflow.policy, text.parse::<TransitionPolicy>().unwrap());
        }
    }
}
