//! Application configuration management

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use crate::schema::SchemaDeclaration;

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => bail!("unknown log format {other:?} (expected json or pretty)"),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Schema declaration file (YAML or JSON)
    pub schema_path: PathBuf,

    /// Log output format
    pub log_format: LogFormat,

    /// Limit applied to list operations that request none
    pub default_limit: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            schema_path: lookup("AUTOCRUD_SCHEMA_PATH")
                .unwrap_or_else(|| "./schema.yaml".to_string())
                .into(),

            log_format: lookup("AUTOCRUD_LOG_FORMAT")
                .map(|v| v.parse())
                .transpose()
                .context("Invalid AUTOCRUD_LOG_FORMAT")?
                .unwrap_or_default(),

            default_limit: lookup("AUTOCRUD_DEFAULT_LIMIT")
                .map(|v| v.trim().parse())
                .transpose()
                .context("Invalid AUTOCRUD_DEFAULT_LIMIT")?,
        })
    }
}

/// Read a schema declaration, as JSON for `.json` files and YAML otherwise.
pub fn load_schema(path: &Path) -> Result<SchemaDeclaration> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid JSON schema in {}", path.display()))
    } else {
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid YAML schema in {}", path.display()))
    }
}
