use crossterm::event::KeyEvent;

use crate::plugin::error::ErrorKind;
use crate::plugin::installer::InstallReport;
use crate::plugin::updater::UpdateState;

/// Package operations that run off the UI thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Install,
    Uninstall,
}

impl Operation {
    pub fn progress_label(self) -> &'static str {
        match self {
            Operation::Install => "Installing...",
            Operation::Uninstall => "Uninstalling...",
        }
    }
}

/// Outcome of a worker-thread operation, keyed by lookup key.
#[derive(Debug)]
pub enum OperationResult {
    Installed(InstallReport),
    Uninstalled,
    Failed { kind: ErrorKind, message: String },
}

/// All possible messages that drive state transitions.
#[derive(Debug)]
pub enum Msg {
    // -- Input events (raw)
    Key(KeyEvent),
    Resize(u16, u16),

    // -- Commands
    PaletteCommand(String),
    Start(Operation, String),

    // -- Worker results
    Finished {
        key: String,
        operation: Operation,
        result: OperationResult,
    },
    Update(UpdateState),

    // -- File system
    InstalledChanged,

    // -- System
    Tick,
}
