use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `[backend] base_url`.
pub const BACKEND_URL_ENV: &str = "TWEETDASH_BACKEND_URL";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend root, without the `/api` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    #[serde(default = "default_browser_title")]
    pub title: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            title: default_browser_title(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_title")]
    pub title: String,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_session_limit")]
    pub session_limit: u32,
    #[serde(default = "default_scrape_refresh_delay")]
    pub scrape_refresh_delay_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: default_dashboard_title(),
            refresh_interval_secs: default_refresh_interval(),
            session_limit: default_session_limit(),
            scrape_refresh_delay_secs: default_scrape_refresh_delay(),
        }
    }
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn scrape_refresh_delay(&self) -> Duration {
        Duration::from_secs(self.scrape_refresh_delay_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_browser_title() -> String {
    "Bookmarks".to_string()
}

fn default_page_size() -> u32 {
    20
}

fn default_dashboard_title() -> String {
    "Operations".to_string()
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_session_limit() -> u32 {
    10
}

fn default_scrape_refresh_delay() -> u64 {
    2
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        Ok(home.join(".tweetdash").join("config.toml"))
    }

    /// Reads the config file if it exists; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the default config, refusing to clobber an existing file.
    pub fn write_default(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("config file {} already exists", path.display());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Applies environment overrides. Takes a lookup function so tests do not
    /// have to touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.backend.base_url = url.trim().to_string();
        }
    }

    fn validate(&self) -> Result<()> {
        if self.browser.page_size == 0 {
            anyhow::bail!("[browser] page_size must be at least 1");
        }
        if self.dashboard.session_limit == 0 {
            anyhow::bail!("[dashboard] session_limit must be at least 1");
        }
        if self.backend.timeout_secs == 0 {
            anyhow::bail!("[backend] timeout_secs must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:8001");
        assert_eq!(config.browser.page_size, 20);
        assert_eq!(config.dashboard.refresh_interval_secs, 30);
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[backend]\nbase_url = \"https://scraper.example.com\"\n\n[dashboard]\nsession_limit = 5"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.backend.base_url, "https://scraper.example.com");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.dashboard.session_limit, 5);
        assert_eq!(config.dashboard.scrape_refresh_delay_secs, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[browser]\npage_size = 0").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_env_override() {
        let mut config = Config::default();
        config.apply_env(|key| {
            (key == BACKEND_URL_ENV).then(|| " http://10.0.0.2:8001 ".to_string())
        });
        assert_eq!(config.backend.base_url, "http://10.0.0.2:8001");

        config.apply_env(|_| Some(String::new()));
        assert_eq!(config.backend.base_url, "http://10.0.0.2:8001");
    }

    #[test]
    fn test_write_default_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::write_default(&path).unwrap();
        assert!(Config::write_default(&path).is_err());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.browser.title, "Bookmarks");
    }
}
