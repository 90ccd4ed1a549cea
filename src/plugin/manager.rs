use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::model::config::AppConfig;
use crate::plugin::descriptor::{LookupKey, PackageDescriptor};
use crate::plugin::error::InstallResult;
use crate::plugin::fetch::Fetcher;
use crate::plugin::hooks::{CommandRunner, HostHooks, ShellRunner};
use crate::plugin::index;
use crate::plugin::installer::{InstallReport, Installer};
use crate::plugin::uninstaller::{self, UninstallReport};

/// Entry point for everything that touches the installation root.
///
/// Install and uninstall of the same lookup key are serialized. Different
/// packages run independently.
#[derive(Debug)]
pub struct PluginManager {
    installer: Installer,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PluginManager {
    pub fn new(installer: Installer) -> Self {
        Self {
            installer,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AppConfig) -> InstallResult<Self> {
        Self::with_runner(config, Arc::new(ShellRunner))
    }

    pub fn with_runner(config: &AppConfig, runner: Arc<dyn CommandRunner>) -> InstallResult<Self> {
        let fetcher = Fetcher::new(config.fetch_timeout(), &config.network.user_agent)?;
        let hooks = HostHooks::new(
            config.hooks.rebuild.clone(),
            config.hooks.reload.clone(),
            config.host_dir(),
            runner,
        );
        let installer = Installer::new(
            config.install_root(),
            fetcher,
            config.general.classification.classifier(),
            hooks,
        );
        Ok(Self::new(installer))
    }

    pub fn root(&self) -> &Path {
        self.installer.root()
    }

    pub fn fetcher(&self) -> &Fetcher {
        self.installer.fetcher()
    }

    pub fn hooks(&self) -> &HostHooks {
        self.installer.hooks()
    }

    pub fn install(&self, descriptor: &PackageDescriptor) -> InstallResult<InstallReport> {
        let lock = self.lock_for(&descriptor.lookup_key);
        let _guard = acquire(&lock);
        self.installer.install(descriptor)
    }

    pub fn uninstall(&self, descriptor: &PackageDescriptor) -> InstallResult<UninstallReport> {
        let lock = self.lock_for(&descriptor.lookup_key);
        let _guard = acquire(&lock);
        uninstaller::uninstall(self.root(), descriptor)
    }

    /// Uninstall then install under one lock, so nothing observes the gap.
    pub fn reinstall(&self, descriptor: &PackageDescriptor) -> InstallResult<InstallReport> {
        let lock = self.lock_for(&descriptor.lookup_key);
        let _guard = acquire(&lock);
        if self.is_installed(&descriptor.lookup_key)? {
            uninstaller::uninstall(self.root(), descriptor)?;
        }
        self.installer.install(descriptor)
    }

    pub fn list_installed(&self) -> InstallResult<Vec<String>> {
        index::list_installed(self.root())
    }

    pub fn is_installed(&self, key: &LookupKey) -> InstallResult<bool> {
        Ok(self
            .list_installed()?
            .iter()
            .any(|name| name == key.as_str()))
    }

    fn lock_for(&self, key: &LookupKey) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(key.as_str().to_string()).or_default().clone()
    }
}

fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
