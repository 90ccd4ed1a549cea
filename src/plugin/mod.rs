pub mod archive;
pub mod descriptor;
pub mod error;
pub mod fetch;
pub mod hooks;
pub mod index;
pub mod installer;
pub mod manager;
pub mod planner;
pub mod uninstaller;
pub mod updater;

#[cfg(test)]
pub(crate) mod test_support;

pub use manager::PluginManager;
