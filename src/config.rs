use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_EDITOR_ROUTE: &str = "/compiler/{link}";
pub const DEFAULT_COPY_ACK_MILLIS: u64 = 2000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub ledger: LedgerConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_secs: 10,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Overrides `<data_dir>/snipshare/liked_snippets.json`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Route template for "open in editor"; `{link}` is replaced by the link token.
    pub editor_route: String,
    pub copy_ack_millis: u64,
    pub theme: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            editor_route: DEFAULT_EDITOR_ROUTE.to_string(),
            copy_ack_millis: DEFAULT_COPY_ACK_MILLIS,
            theme: "base16-ocean.dark".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// `<config_dir>/snipshare/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("snipshare").join("config.toml"))
    }

    /// Load from `path` (or the default location), then apply environment overrides.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Config::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SNIPSHARE_GATEWAY_URL") {
            self.gateway.base_url = url;
        }
        if let Some(key) = lookup("SNIPSHARE_API_KEY") {
            self.gateway.api_key = Some(key);
        }
        if let Some(path) = lookup("SNIPSHARE_LEDGER_PATH") {
            self.ledger.path = Some(PathBuf::from(path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let config: Config = toml::from_str(
            r#"
            [gateway]
            base_url = "https://snippets.example.com/api"

            [ui]
            copy_ack_millis = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway.base_url, "https://snippets.example.com/api");
        assert_eq!(config.gateway.timeout_secs, 10);
        assert_eq!(config.ui.copy_ack_millis, 500);
        assert_eq!(config.ui.editor_route, DEFAULT_EDITOR_ROUTE);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "SNIPSHARE_GATEWAY_URL" => Some("https://other.example.com".to_string()),
            "SNIPSHARE_LEDGER_PATH" => Some("/tmp/liked.json".to_string()),
            _ => None,
        });

        assert_eq!(config.gateway.base_url, "https://other.example.com");
        assert_eq!(config.ledger.path, Some(PathBuf::from("/tmp/liked.json")));
        assert_eq!(config.gateway.api_key, None);
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().join("absent.toml").as_path())).unwrap();
        assert_eq!(config.ui, UiConfig::default());
    }
}
