use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::plugin::planner::Classification;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub hooks: HooksConfig,
    pub network: NetworkConfig,
    pub catalog: CatalogConfig,
    pub updater: UpdaterConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub install_root: String,
    pub host_dir: String,
    #[serde(default)]
    pub classification: Classification,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HooksConfig {
    #[serde(default)]
    pub rebuild: String,
    #[serde(default)]
    pub reload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub extra: String,
    pub new_window_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdaterConfig {
    pub check_on_startup: bool,
    pub version_url: String,
    pub archive_url: String,
    pub manual_download_url: String,
    #[serde(default)]
    pub restart_command: String,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let mut config = Self::defaults()?;

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "pluginrepo") {
            let config_path = proj_dirs.config_dir().join("config.toml");
            if config_path.exists() {
                let user_str = fs::read_to_string(&config_path)?;
                config = toml::from_str(&user_str)?; // TODO: deep merge instead of full replace
            }
        }

        config.expand_paths();
        Ok(config)
    }

    pub fn defaults() -> Result<Self> {
        let defaults = include_str!("../../config/default.toml");
        Ok(toml::from_str(defaults)?)
    }

    fn expand_paths(&mut self) {
        self.general.install_root = expand_tilde(&self.general.install_root);
        self.general.host_dir = expand_tilde(&self.general.host_dir);
        self.catalog.extra = expand_tilde(&self.catalog.extra);
    }

    pub fn install_root(&self) -> PathBuf {
        PathBuf::from(&self.general.install_root)
    }

    pub fn host_dir(&self) -> PathBuf {
        PathBuf::from(&self.general.host_dir)
    }

    pub fn extra_catalog_path(&self) -> Option<&Path> {
        let extra = self.catalog.extra.trim();
        (!extra.is_empty()).then(|| Path::new(extra))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout_secs.max(1))
    }
}

fn expand_tilde(path: &str) -> String {
    if !path.starts_with('~') {
        return path.to_string();
    }

    match directories::BaseDirs::new() {
        Some(base_dirs) => path.replacen('~', &base_dirs.home_dir().to_string_lossy(), 1),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_defaults_parse() {
        let config = AppConfig::defaults().expect("default config parses");
        assert_eq!(config.catalog.new_window_days, 7);
        assert_eq!(config.hooks.rebuild, "pnpm build");
        assert_eq!(config.hooks.reload, "pnpm inject");
        assert_eq!(config.general.classification, Classification::Markers);
        assert!(config.extra_catalog_path().is_none());
    }

    #[test]
    fn tilde_is_expanded_only_at_the_start() {
        assert_eq!(expand_tilde("/opt/plugins"), "/opt/plugins");
        assert_eq!(expand_tilde("a~b"), "a~b");
        if let Some(base_dirs) = directories::BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy().to_string();
            assert_eq!(expand_tilde("~/x"), format!("{home}/x"));
        }
    }

    #[test]
    fn classification_defaults_to_markers_when_omitted() {
        let raw = r#"
            [general]
            install_root = "/tmp/plugins"
            host_dir = "/tmp"

            [hooks]

            [network]
            timeout_secs = 0
            user_agent = "test"

            [catalog]
            new_window_days = 3

            [updater]
            check_on_startup = false
            version_url = "http://localhost/version"
            archive_url = "http://localhost/self.zip"
            manual_download_url = "http://localhost"
        "#;
        let config: AppConfig = toml::from_str(raw).expect("minimal config parses");
        assert_eq!(config.general.classification, Classification::Markers);
        assert!(config.hooks.rebuild.is_empty());
        assert_eq!(config.fetch_timeout(), Duration::from_secs(1));
    }
}
