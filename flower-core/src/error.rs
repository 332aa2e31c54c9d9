use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Malformed configuration file {}: {source}", path.display())]
    ConfigFileMalformed {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    #[error("Invalid value for option `{name}`: {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("Unrecognized option: {0}")]
    UnknownOption(String),

    #[error("Option registry error: {0}")]
    Registry(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Service failure: {0}")]
    Service(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_option(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_option(name: impl Into<String>) -> Self {
        Self::UnknownOption(name.into())
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
