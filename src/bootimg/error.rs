use std::process::ExitStatus;
use thiserror::Error;

/// Failure of the plugin. Both kinds are fatal and abort the build.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("configure failed: {0}")]
    Config(String),

    #[error("prepare failed: {0}")]
    Prepare(String),
}

impl PluginError {
    pub fn config(msg: impl Into<String>) -> Self {
        PluginError::Config(msg.into())
    }

    pub fn prepare(msg: impl Into<String>) -> Self {
        PluginError::Prepare(msg.into())
    }
}

/// Failure of an external command.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    Status {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{command} failed: {message}")]
    Other { command: String, message: String },
}

pub type Result<T> = std::result::Result<T, PluginError>;
