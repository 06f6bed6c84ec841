mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod fs;
pub mod host;
pub mod loader;
pub mod plugin;
pub mod types;
mod utils;

pub use cli::{BootAction, PartArgs, PrepareArgs};
pub use commands::run;
pub use error::{ExecError, PluginError};
pub use plugin::{BootimgEfi, SourceDirs, SourcePlugin};
pub use utils::disk_usage_kb;
