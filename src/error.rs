//! # Error Handling
//!
//! This module defines the worker's fatal-tier error type. Protocol-level
//! failures (bad JSON, unknown commands, processing errors) never use this
//! type: they become error envelopes on stdout and the loop keeps running.
//! `WorkerError` is for the failures that should stop the process, surfaced
//! from `main` with a non-zero exit.
//!
//! ## Key Rust Concepts for Error Handling:
//!
//! ### Result<T, E> Type
//! - **Purpose**: Forces you to handle both success and failure cases
//! - **T**: The success type (what you get when everything works)
//! - **E**: The error type (what you get when something goes wrong)
//! - **No exceptions**: Rust doesn't have try/catch, it uses Result instead
//!
//! ### Enums for Error Types
//! - **Variants**: Each enum variant represents a different kind of error
//! - **Data**: Each variant holds the underlying error message
//!
//! ### Traits for Error Conversion
//! - **From trait**: Automatically converts between error types
//! - **Display trait**: Defines how errors are formatted as strings

use std::fmt;  // For implementing Display trait

/// Fatal error categories for the worker process.
///
/// ## Rust Concepts:
/// - **enum**: A type that can be one of several variants
/// - **String**: Each variant holds an error message
/// - **#[derive(Debug)]**: Automatically implements debug printing
///
/// ## Error Categories:
/// - **Internal**: Unexpected failures inside the worker
/// - **Io**: Broken stdin/stdout streams
/// - **Protocol**: A response failed to serialize
/// - **ConfigError**: Configuration loading or validation problems
#[derive(Debug)]
pub enum WorkerError {
    /// Unexpected internal failures
    Internal(String),

    /// The standard streams failed mid-loop
    Io(String),

    /// A response value could not be serialized to JSON
    Protocol(String),

    /// Configuration file or environment variable problems
    ConfigError(String),
}

/// Implementation of the Display trait for WorkerError.
///
/// ## Purpose:
/// This trait defines how errors are formatted as human-readable strings.
/// `main` prints this to stderr right before the non-zero exit.
///
/// ## Rust Concepts:
/// - **impl Trait for Type**: Implementing a trait for our custom type
/// - **match**: Pattern matching to handle each error variant
/// - **write!**: Macro for formatting strings (like printf in C)
impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::Internal(msg) => write!(f, "Internal error: {}", msg),
            WorkerError::Io(msg) => write!(f, "I/O error: {}", msg),
            WorkerError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            WorkerError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for WorkerError {}

/// Automatic conversion from anyhow::Error to WorkerError.
///
/// ## Purpose:
/// The anyhow crate provides general-purpose error handling. This conversion
/// allows internals to use anyhow errors and automatically convert them to
/// our custom error type when they cross into the fatal tier.
///
/// ## Usage:
/// When you use `?` with an anyhow::Error, it automatically becomes a
/// WorkerError::Internal.
impl From<anyhow::Error> for WorkerError {
    fn from(err: anyhow::Error) -> Self {
        WorkerError::Internal(err.to_string())
    }
}

/// Automatic conversion from JSON serialization errors to WorkerError.
///
/// ## Why Protocol:
/// The only JSON work on the fatal tier is serializing our own response
/// structs. If that fails the wire contract is unfulfillable, which is a
/// protocol-level defect rather than anything the caller sent.
impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        WorkerError::Protocol(format!("JSON serialization error: {}", err))
    }
}

/// Automatic conversion from configuration errors to WorkerError.
///
/// ## When this happens:
/// - config.toml file has invalid syntax
/// - Environment overrides fail to deserialize
/// - Configuration values fail validation
impl From<config::ConfigError> for WorkerError {
    fn from(err: config::ConfigError) -> Self {
        WorkerError::ConfigError(err.to_string())
    }
}

/// Automatic conversion from std::io::Error to WorkerError.
///
/// ## When this happens:
/// Reading a line from stdin or flushing a response to stdout failed.
/// With the streams gone there is nobody left to answer, so the loop
/// stops and the process exits.
impl From<std::io::Error> for WorkerError {
    fn from(err: std::io::Error) -> Self {
        WorkerError::Io(err.to_string())
    }
}

/// Type alias for Results that use our custom error type.
///
/// ## Purpose:
/// This creates a shorthand for `Result<T, WorkerError>` so you can write
/// `WorkerResult<()>` instead of `Result<(), WorkerError>`.
pub type WorkerResult<T> = Result<T, WorkerError>;
