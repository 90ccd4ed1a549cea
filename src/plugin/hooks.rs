use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::plugin::error::{InstallError, InstallResult};

/// Runs an opaque shell command in a working directory.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str, cwd: &Path) -> InstallResult<String>;
}

#[derive(Debug, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, cwd: &Path) -> InstallResult<String> {
        tracing::info!("running `{command}` in {}", cwd.display());
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .output()
            .map_err(|err| InstallError::Command {
                command: command.to_string(),
                detail: err.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = match stderr.trim() {
            "" => output.status.to_string(),
            trimmed => format!("{}: {trimmed}", output.status),
        };
        Err(InstallError::Command {
            command: command.to_string(),
            detail,
        })
    }
}

/// The host application's rebuild and reload steps. An empty command is
/// skipped.
#[derive(Clone)]
pub struct HostHooks {
    pub rebuild: String,
    pub reload: String,
    pub working_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl HostHooks {
    pub fn new(
        rebuild: impl Into<String>,
        reload: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            rebuild: rebuild.into(),
            reload: reload.into(),
            working_dir: working_dir.into(),
            runner,
        }
    }

    /// Rebuild, then reload. Stops at the first failing step.
    pub fn rebuild_and_reload(&self) -> InstallResult<()> {
        for command in [&self.rebuild, &self.reload] {
            self.run(command)?;
        }
        Ok(())
    }

    pub fn run(&self, command: &str) -> InstallResult<()> {
        let command = command.trim();
        if command.is_empty() {
            return Ok(());
        }
        let stdout = self.runner.run(command, &self.working_dir)?;
        tracing::debug!("`{command}` finished: {}", stdout.trim());
        Ok(())
    }
}

impl std::fmt::Debug for HostHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostHooks")
            .field("rebuild", &self.rebuild)
            .field("reload", &self.reload)
            .field("working_dir", &self.working_dir)
            .finish_non_exhaustive()
    }
}
