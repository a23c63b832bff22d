use std::path::Path;

use thiserror::Error;

/// Main error type for installer operations
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("No such file: {path}")]
    MissingFile { path: String },

    #[error("Missing configuration key: {key}")]
    MissingKey { key: String },

    #[error("Unknown configuration parameter: {key}")]
    UnknownParameter { key: String },

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No such file or directory: {path}")]
    TemplateNotFound { path: String },

    #[error("Failed to start '{command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' failed with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),
}

impl InstallError {
    pub fn missing_file<P: AsRef<Path>>(path: P) -> Self {
        Self::MissingFile {
            path: path.as_ref().display().to_string(),
        }
    }

    pub fn missing_key<S: Into<String>>(key: S) -> Self {
        Self::MissingKey { key: key.into() }
    }

    pub fn unknown_parameter<S: Into<String>>(key: S) -> Self {
        Self::UnknownParameter { key: key.into() }
    }

    pub fn invalid_value<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn template_not_found<P: AsRef<Path>>(path: P) -> Self {
        Self::TemplateNotFound {
            path: path.as_ref().display().to_string(),
        }
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::SerializationError(msg.into())
    }

    /// True for errors caused by a template or command referencing an
    /// unknown key.
    pub fn is_missing_key(&self) -> bool {
        matches!(self, Self::MissingKey { .. })
    }
}

/// Result type alias for installer operations
pub type Result<T> = std::result::Result<T, InstallError>;
