/// Application interaction modes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Moving through the catalog.
    #[default]
    Browse,
    /// Typing a search query (`/`).
    Search,
    /// Command palette (`:` prefix).
    Command,
    /// Info overlay for the selected entry.
    Info,
    /// Waiting for y/n before uninstalling.
    ConfirmUninstall,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Browse => "BROWSE",
            Mode::Search => "SEARCH",
            Mode::Command => "COMMAND",
            Mode::Info => "INFO",
            Mode::ConfirmUninstall => "CONFIRM",
        }
    }
}
