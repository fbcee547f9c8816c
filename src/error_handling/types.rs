//! Error type definitions.
//!
//! This module defines the typed errors that may propagate to the caller and
//! the failure/info categories recorded for site probes.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// A required setting is missing or malformed.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// A stored JSON column could not be encoded or decoded.
    #[error("JSON column error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Error types for the transient cache backends.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing table could not be read or written.
    #[error("Cache backend error: {0}")]
    Backend(#[from] sqlx::Error),

    /// A cached value could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reasons a site probe ends with `available = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ProbeFailure {
    /// The stats endpoint answered 404 to the placeholder key
    PluginNotActive,
    /// The licensed call answered with a non-2xx status
    HttpStatus,
    /// The body carried an error `code`
    ApiErrorCode,
    /// The body had no `plugins` list
    InvalidResponseStructure,
    /// The placeholder probe got neither a 404 nor the invalid-parameter error
    UnexpectedResponse,
    /// Connection refused, reset, or timed out
    ConnectionFailed,
    /// Any other transport or body-read failure
    RequestFailed,
}

/// Notable probe outcomes that are not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ProbeInfo {
    /// Plugin answered the placeholder key, so it is active but unlicensed
    ActiveWithoutLicense,
    /// Plugin listed without a version
    VersionMissing,
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProbeFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeFailure::PluginNotActive => "Plugin not active",
            ProbeFailure::HttpStatus => "HTTP error status",
            ProbeFailure::ApiErrorCode => "API error code",
            ProbeFailure::InvalidResponseStructure => "Invalid response structure",
            ProbeFailure::UnexpectedResponse => "Unexpected response",
            ProbeFailure::ConnectionFailed => "Connection timeout or refused",
            ProbeFailure::RequestFailed => "Request failed",
        }
    }
}

impl ProbeInfo {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeInfo::ActiveWithoutLicense => "Active without license",
            ProbeInfo::VersionMissing => "Plugin version missing",
        }
    }
}
