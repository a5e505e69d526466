//! Command-line configuration: a JSON file under the user's config directory, with
//! environment variables taking precedence. The pipeline itself never reads this; the
//! binary resolves everything here and passes explicit values down.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, IngestResult};

pub const ENV_TOKEN: &str = "MESONET_AIRTABLE_TOKEN";
pub const ENV_TOKEN_FALLBACK: &str = "AIRTABLE_API_KEY";
pub const ENV_SCHEMA_FILE: &str = "MESONET_SCHEMA_FILE";
pub const ENV_TIMEOUT_MS: &str = "MESONET_TIMEOUT_MS";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IngestConfig {
    /// Schema catalog descriptor (`at_schema.json`).
    #[serde(default = "IngestConfig::default_schema_file")]
    pub schema_file: PathBuf,
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,
    /// Per-request timeout handed to the HTTP transport.
    #[serde(default = "IngestConfig::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Directory for CLI output when no explicit output file is given.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { schema_file: Self::default_schema_file(), api_token: None, timeout_ms: Self::default_timeout_ms(), data_dir: None }
    }
}

impl IngestConfig {
    fn default_schema_file() -> PathBuf { config_dir().join("at_schema.json") }
    fn default_timeout_ms() -> u64 { 30_000 }

    /// `$HOME/.config/mesonet/config.json`
    pub fn default_path() -> PathBuf { config_dir().join("config.json") }

    /// Missing file means defaults; an unreadable or invalid file is an error.
    pub fn load_or_default(path: &Path) -> IngestResult<Self> {
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| IngestError::Config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(IngestError::Config(format!("{}: {}", path.display(), e))),
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> IngestResult<()> {
        self.apply_overrides(|k| std::env::var(k).ok())
    }

    /// Apply overrides from any key lookup. Empty values are ignored.
    pub fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) -> IngestResult<()> {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        if let Some(t) = get(ENV_TOKEN).or_else(|| get(ENV_TOKEN_FALLBACK)) {
            self.api_token = Some(t);
        }
        if let Some(p) = get(ENV_SCHEMA_FILE) {
            self.schema_file = PathBuf::from(p);
        }
        if let Some(ms) = get(ENV_TIMEOUT_MS) {
            self.timeout_ms = ms
                .trim()
                .parse()
                .map_err(|_| IngestError::Config(format!("{} must be a whole number of milliseconds, got '{}'", ENV_TIMEOUT_MS, ms)))?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 { None } else { Some(Duration::from_millis(self.timeout_ms)) }
    }

    /// `{data_dir}/{table}.{ext}`, or `None` when no data directory is configured.
    pub fn output_path(&self, table: &str, ext: &str) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|d| d.join(format!("{}.{}", table, ext)))
    }

    pub fn require_token(&self) -> IngestResult<&str> {
        self.api_token
            .as_deref()
            .ok_or_else(|| IngestError::Config(format!("no API token configured; set {} or {}", ENV_TOKEN, ENV_TOKEN_FALLBACK)))
    }
}

fn config_dir() -> PathBuf {
    let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")).unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config").join("mesonet")
}
