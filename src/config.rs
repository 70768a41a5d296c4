//! User configuration loading from `~/.threadline/config.toml`.

use crate::history::DEFAULT_MAX_ENTRIES;
use crate::thread::{DEFAULT_PAGE_SIZE, DEFAULT_REPLY_BATCH, ThreadOptions};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const CONFIG_DIR: &str = ".threadline";
const CONFIG_FILE: &str = "config.toml";
const HISTORY_FILE: &str = "history.json";

const DEFAULT_CONFIG_TOML: &str = r##"# threadline configuration

[api]
# Comment backend; endpoints live under {base_url}/{kind}s/{id}/comments.
base_url = "http://localhost:8080/api"
# Bearer token sent with every request. Leave empty to browse anonymously.
token = ""
timeout_secs = 10
page_size = 20
reply_batch = 10

[history]
max_entries = 100
"##;

/// Application configuration loaded from disk.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub history_max_entries: usize,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<SecretString>,
    pub timeout: Duration,
    pub thread: ThreadOptions,
}

/// Returns the config file path and creates default config if missing.
pub fn ensure_config_file() -> Result<PathBuf> {
    let path = config_path()?;
    ensure_default_config(&path)?;
    Ok(path)
}

/// Loads configuration from `~/.threadline/config.toml`, creating defaults if missing.
pub fn load_or_create() -> Result<AppConfig> {
    let path = ensure_config_file()?;
    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;

    parse_config(&content).with_context(|| format!("invalid config in {}", path.display()))
}

fn parse_config(content: &str) -> Result<AppConfig> {
    let raw: RawConfig = toml::from_str(content).context("failed to parse TOML")?;
    raw.into_config()
}

/// Where the view history is persisted, next to the config file.
pub fn history_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(HISTORY_FILE))
}

fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

fn config_dir() -> Result<PathBuf> {
    let home =
        env::var_os("HOME").ok_or_else(|| anyhow!("HOME environment variable is not set"))?;
    Ok(PathBuf::from(home).join(CONFIG_DIR))
}

fn ensure_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }

    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("invalid config path: {}", path.display()))?;
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    fs::write(path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("failed to write default config file {}", path.display()))?;
    info!(path = %path.display(), "wrote default config");
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    api: RawApi,
    history: RawHistory,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApi {
    base_url: Option<String>,
    token: Option<String>,
    timeout_secs: Option<u64>,
    page_size: Option<u32>,
    reply_batch: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHistory {
    max_entries: Option<usize>,
}

impl RawConfig {
    fn into_config(self) -> Result<AppConfig> {
        let base_url = self
            .api
            .base_url
            .map(|url| url.trim().trim_end_matches('/').to_owned())
            .unwrap_or_else(|| "http://localhost:8080/api".to_owned());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(anyhow!("`api.base_url` must be an http(s) URL: {base_url}"));
        }

        let token = self
            .api
            .token
            .map(|token| token.trim().to_owned())
            .filter(|token| !token.is_empty())
            .map(SecretString::from);

        let timeout_secs = self.api.timeout_secs.unwrap_or(10);
        if timeout_secs == 0 {
            return Err(anyhow!("`api.timeout_secs` must be greater than zero"));
        }

        Ok(AppConfig {
            api: ApiConfig {
                base_url,
                token,
                timeout: Duration::from_secs(timeout_secs),
                thread: ThreadOptions {
                    page_size: positive(self.api.page_size, DEFAULT_PAGE_SIZE, "api.page_size")?,
                    reply_batch: positive(
                        self.api.reply_batch,
                        DEFAULT_REPLY_BATCH,
                        "api.reply_batch",
                    )?,
                },
            },
            history_max_entries: match self.history.max_entries {
                Some(0) => return Err(anyhow!("`history.max_entries` must be greater than zero")),
                Some(max) => max,
                None => DEFAULT_MAX_ENTRIES,
            },
        })
    }
}

fn positive(value: Option<u32>, default: u32, field: &str) -> Result<u32> {
    match value {
        Some(0) => Err(anyhow!("`{field}` must be greater than zero")),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_CONFIG_TOML, parse_config};
    use secrecy::ExposeSecret;
    use std::time::Duration;

    #[test]
    fn default_file_parses_to_defaults() {
        let config = parse_config(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080/api");
        assert!(config.api.token.is_none());
        assert_eq!(config.api.timeout, Duration::from_secs(10));
        assert_eq!(config.api.thread.page_size, 20);
        assert_eq!(config.api.thread.reply_batch, 10);
        assert_eq!(config.history_max_entries, 100);
    }

    #[test]
    fn missing_sections_fall_back_and_token_is_kept() {
        let config = parse_config(
            r#"
[api]
base_url = "https://comments.example.com/api/"
token = " abc "
"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://comments.example.com/api");
        assert_eq!(
            config.api.token.as_ref().map(|t| t.expose_secret().to_owned()),
            Some("abc".to_owned())
        );
        assert_eq!(config.history_max_entries, 100);
    }

    #[test]
    fn zero_values_are_rejected() {
        let err = parse_config("[api]\npage_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("api.page_size"));
        assert!(parse_config("[history]\nmax_entries = 0\n").is_err());
        assert!(parse_config("[api]\nbase_url = \"ftp://x\"\n").is_err());
    }
}
