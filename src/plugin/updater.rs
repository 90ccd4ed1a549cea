//! Self-update: compare against a remote version marker, then reinstall the
//! repository package itself through the regular installer.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::config::UpdaterConfig;
use crate::plugin::descriptor::PackageDescriptor;
use crate::plugin::fetch::Fetcher;
use crate::plugin::manager::PluginManager;

pub const LOCAL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const SELF_NAME: &str = "Plugins Repo";
pub const SELF_KEY: &str = "PluginsRepo";

static VERSION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"VERSION\s*=\s*"([^"]+)""#).expect("valid version marker regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UpdateState {
    #[default]
    Idle,
    CheckingVersion,
    UpdateAvailable(String),
    Updating,
    Restarting,
    Failed {
        reason: String,
        manual_link: String,
    },
}

impl UpdateState {
    pub fn label(&self) -> String {
        match self {
            UpdateState::Idle => "up to date".to_string(),
            UpdateState::CheckingVersion => "checking for updates...".to_string(),
            UpdateState::UpdateAvailable(version) => format!("update available: {version}"),
            UpdateState::Updating => "updating...".to_string(),
            UpdateState::Restarting => "restarting host...".to_string(),
            UpdateState::Failed {
                reason,
                manual_link,
            } => format!("update failed: {reason} (download manually: {manual_link})"),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            UpdateState::CheckingVersion | UpdateState::Updating | UpdateState::Restarting
        )
    }
}

/// `(major, minor, patch)` from the leading digits of each component.
pub fn parse_version(raw: &str) -> Option<(u64, u64, u64)> {
    let mut parts = raw.trim().split('.').map(|part| {
        let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<u64>().ok()
    });
    Some((parts.next()??, parts.next()??, parts.next()??))
}

/// Any remote component strictly greater than the local one counts, so
/// `2.0.0` against `1.5.0` is available and so is `1.0.9` against `2.0.0`.
pub fn is_update_available(local: &str, remote: &str) -> bool {
    let (Some(local), Some(remote)) = (parse_version(local), parse_version(remote)) else {
        return false;
    };
    remote.0 > local.0 || remote.1 > local.1 || remote.2 > local.2
}

pub fn extract_version_marker(text: &str) -> Option<&str> {
    VERSION_MARKER
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|version| version.as_str())
}

#[derive(Debug, Clone)]
pub struct SelfUpdater {
    local_version: String,
    version_url: String,
    manual_download_url: String,
    restart_command: String,
    descriptor: PackageDescriptor,
}

impl SelfUpdater {
    pub fn from_config(config: &UpdaterConfig) -> Self {
        Self {
            local_version: LOCAL_VERSION.to_string(),
            version_url: config.version_url.clone(),
            manual_download_url: config.manual_download_url.clone(),
            restart_command: config.restart_command.clone(),
            descriptor: PackageDescriptor::new(SELF_NAME, SELF_KEY, SELF_KEY, &config.archive_url),
        }
    }

    pub fn with_local_version(mut self, version: impl Into<String>) -> Self {
        self.local_version = version.into();
        self
    }

    /// Ends in `UpdateAvailable`, `Idle` or `Failed`.
    pub fn check(&self, fetcher: &Fetcher) -> UpdateState {
        tracing::info!("checking {} for a newer version", self.version_url);
        let text = match fetcher.fetch_text(&self.version_url) {
            Ok(text) => text,
            Err(err) => return self.failed(err.to_string()),
        };

        let Some(remote) = extract_version_marker(&text) else {
            tracing::warn!("no version marker found at {}", self.version_url);
            return UpdateState::Idle;
        };

        if is_update_available(&self.local_version, remote) {
            tracing::info!("update available: {} -> {remote}", self.local_version);
            UpdateState::UpdateAvailable(remote.to_string())
        } else {
            tracing::debug!("remote version {remote} is not newer than {}", self.local_version);
            UpdateState::Idle
        }
    }

    /// Reinstall the repository package and restart the host.
    ///
    /// `on_state` sees every intermediate state. The return value is the
    /// final one, `Idle` or `Failed`.
    pub fn apply(
        &self,
        manager: &PluginManager,
        mut on_state: impl FnMut(&UpdateState),
    ) -> UpdateState {
        on_state(&UpdateState::Updating);
        if let Err(err) = manager.reinstall(&self.descriptor) {
            tracing::error!("self update failed: {err}");
            return self.failed(err.to_string());
        }

        if self.restart_command.trim().is_empty() {
            tracing::info!("self update installed, restart required");
            return UpdateState::Idle;
        }

        on_state(&UpdateState::Restarting);
        match manager.hooks().run(&self.restart_command) {
            Ok(()) => UpdateState::Idle,
            Err(err) => {
                tracing::error!("restart failed: {err}");
                self.failed(err.to_string())
            }
        }
    }

    fn failed(&self, reason: String) -> UpdateState {
        UpdateState::Failed {
            reason,
            manual_link: self.manual_download_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::AppConfig;
    use crate::plugin::hooks::tests::RecordingRunner;
    use crate::plugin::test_support::{tree, zip_file_url};
    use httpmock::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn fetcher() -> Fetcher {
        Fetcher::new(Duration::from_secs(5), "pluginrepo-test").expect("client builds")
    }

    fn updater_config(version_url: String, archive_url: String, restart: &str) -> UpdaterConfig {
        UpdaterConfig {
            check_on_startup: false,
            version_url,
            archive_url,
            manual_download_url: "https://example.invalid/manual".to_string(),
            restart_command: restart.to_string(),
        }
    }

    #[test]
    fn patch_bump_is_available_and_equal_is_not() {
        assert!(is_update_available("1.0.1", "1.0.2"));
        assert!(!is_update_available("1.0.1", "1.0.1"));
        assert!(!is_update_available("1.0.1", "1.0.0"));
    }

    #[test]
    fn comparison_is_per_component() {
        assert!(is_update_available("2.0.0", "1.0.9"));
        assert!(is_update_available("1.5.0", "2.0.0"));
        assert!(!is_update_available("1.0.1", "1.0"));
        assert!(!is_update_available("1.0.1", "x.y.z"));
    }

    #[test]
    fn marker_is_found_in_source_text() {
        let text = "import x;\nexport const VERSION = \"1.2.3\";\n";
        assert_eq!(extract_version_marker(text), Some("1.2.3"));
        assert_eq!(extract_version_marker("nothing here"), None);
        assert_eq!(parse_version("1.2.3-beta"), Some((1, 2, 3)));
    }

    #[test]
    fn check_reports_newer_remote_version() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/versionCheck.tsx");
            then.status(200).body("export const VERSION = \"1.0.2\";");
        });

        let config = updater_config(server.url("/versionCheck.tsx"), String::new(), "");
        let updater = SelfUpdater::from_config(&config).with_local_version("1.0.1");
        assert_eq!(
            updater.check(&fetcher()),
            UpdateState::UpdateAvailable("1.0.2".to_string())
        );
        mock.assert();

        let current = updater.clone().with_local_version("1.0.2");
        assert_eq!(current.check(&fetcher()), UpdateState::Idle);
    }

    #[test]
    fn check_failure_carries_the_manual_link() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/versionCheck.tsx");
            then.status(500);
        });

        let config = updater_config(server.url("/versionCheck.tsx"), String::new(), "");
        let state = SelfUpdater::from_config(&config).check(&fetcher());
        assert!(matches!(
            state,
            UpdateState::Failed { ref manual_link, .. } if manual_link == "https://example.invalid/manual"
        ));
    }

    fn manager_in(dir: &std::path::Path, runner: Arc<RecordingRunner>) -> PluginManager {
        let mut config = AppConfig::defaults().expect("defaults parse");
        config.general.install_root = dir.join("plugins").to_string_lossy().into_owned();
        config.general.host_dir = dir.to_string_lossy().into_owned();
        PluginManager::with_runner(&config, runner).expect("manager builds")
    }

    #[test]
    fn apply_replaces_the_previous_install_and_restarts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(RecordingRunner::default());
        let manager = manager_in(dir.path(), runner.clone());
        std::fs::create_dir_all(manager.root().join("PluginsRepo")).expect("mkdir");
        std::fs::write(manager.root().join("PluginsRepo/old.ts"), b"old").expect("write");

        let url = zip_file_url(
            dir.path(),
            "self.zip",
            &[("PluginsRepo-main/index.tsx", Some("new"))],
        );
        let config = updater_config(String::new(), url, "pnpm restart");
        let updater = SelfUpdater::from_config(&config);

        let mut seen = Vec::new();
        let state = updater.apply(&manager, |state| seen.push(state.clone()));

        assert_eq!(state, UpdateState::Idle);
        assert_eq!(seen, vec![UpdateState::Updating, UpdateState::Restarting]);
        assert_eq!(
            tree(manager.root()),
            vec!["PluginsRepo/", "PluginsRepo/index.tsx"]
        );
        let calls = runner.calls.lock().expect("calls");
        assert_eq!(calls.last().map(|(c, _)| c.as_str()), Some("pnpm restart"));
    }

    #[test]
    fn failed_restart_falls_back_to_manual_download() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(RecordingRunner {
            failing: vec!["pnpm restart".to_string()],
            ..Default::default()
        });
        let manager = manager_in(dir.path(), runner);
        let url = zip_file_url(dir.path(), "self.zip", &[("r/index.tsx", Some("x"))]);
        let updater = SelfUpdater::from_config(&updater_config(String::new(), url, "pnpm restart"));

        let state = updater.apply(&manager, |_| {});
        assert!(matches!(state, UpdateState::Failed { .. }));
        assert!(state.label().contains("https://example.invalid/manual"));
    }

    #[test]
    fn no_restart_command_ends_idle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager_in(dir.path(), Arc::new(RecordingRunner::default()));
        let url = zip_file_url(dir.path(), "self.zip", &[("r/index.tsx", Some("x"))]);
        let updater = SelfUpdater::from_config(&updater_config(String::new(), url, ""));

        assert_eq!(updater.apply(&manager, |_| {}), UpdateState::Idle);
    }
}
