use std::path::PathBuf;

use thiserror::Error;

/// Coarse failure classes surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Archive,
    Filesystem,
    Planning,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Archive => "archive",
            ErrorKind::Filesystem => "filesystem",
            ErrorKind::Planning => "planning",
        }
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("corrupt archive: {0}")]
    Corrupt(#[from] zip::result::ZipError),
    #[error("failed to read archive entry {name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("archive entry escapes the installation root: {0}")]
    EscapesRoot(String),
    #[error("destination name must be a single path segment: {0:?}")]
    InvalidDestination(String),
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("network: {0}")]
    Network(String),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Planning(#[from] PlanError),
    #[error("{action} {}: {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("command `{command}` failed: {detail}")]
    Command { command: String, detail: String },
}

impl InstallError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InstallError::Network(_) => ErrorKind::Network,
            InstallError::Archive(_) => ErrorKind::Archive,
            InstallError::Planning(_) => ErrorKind::Planning,
            InstallError::Filesystem { .. } | InstallError::Command { .. } => {
                ErrorKind::Filesystem
            }
        }
    }

    pub(crate) fn fs(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallError::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type InstallResult<T> = Result<T, InstallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_failures_are_reported_as_filesystem_kind() {
        let err = InstallError::Command {
            command: "pnpm build".to_string(),
            detail: "exit status 1".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert_eq!(err.to_string(), "command `pnpm build` failed: exit status 1");
    }

    #[test]
    fn filesystem_error_names_the_path() {
        let err = InstallError::fs(
            "create directory",
            "/tmp/x",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert!(err.to_string().starts_with("create directory /tmp/x: "));
    }

    #[test]
    fn plan_errors_convert_into_planning_kind() {
        let err: InstallError = PlanError::EscapesRoot("../etc/passwd".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Planning);
    }
}
