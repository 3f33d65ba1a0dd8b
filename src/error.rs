//! Error types for `CyberLabs`
//!
//! This module provides the error hierarchy for content loading, storage,
//! and lab progression, together with the exit codes used by the CLI.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `CyberLabs` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Content error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Storage collaborator failure
    pub const STORE_ERROR: i32 = 4;

    /// Progression error (invalid transition, unknown lab)
    pub const PROGRESSION_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing login)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `CyberLabs` operations.
///
/// Aggregates all domain-specific errors and provides a unified
/// interface for exit code mapping.
#[derive(Debug, Error)]
pub enum CyberLabsError {
    /// Content loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage collaborator error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Lab progression error
    #[error(transparent)]
    Progression(#[from] ProgressionError),

    /// Referenced lab does not exist
    #[error("lab not found: {0}")]
    LabNotFound(u64),

    /// Invalid invocation (no session, insufficient role, bad argument)
    #[error("{0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CyberLabsError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Store(_) => ExitCode::STORE_ERROR,
            Self::Progression(_) | Self::LabNotFound(_) => ExitCode::PROGRESSION_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Content Errors
// ============================================================================

/// Content loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the content file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Content validation failed
    #[error("validation failed for {path}: {}", summarize(errors))]
    ValidationError {
        /// Path to the content file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced content file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during content validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "labs[2].steps[0].answer")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Prevents the content from being used
    Error,
    /// Informational; content still loads
    Warning,
}

// ============================================================================
// Storage Errors
// ============================================================================

/// Errors raised by the key-value storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure in a file-backed store
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be (de)serialized
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key contains characters the backend cannot represent
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

// ============================================================================
// Progression Errors
// ============================================================================

/// Lab progression state machine errors.
#[derive(Debug, Error)]
pub enum ProgressionError {
    /// Attempted a transition that is not allowed from the current state
    #[error("invalid progression transition: {0}")]
    InvalidTransition(String),

    /// The lab has no steps to answer (labs created through authoring)
    #[error("lab {0} has no steps")]
    NoSteps(u64),

    /// The session state belongs to a different lab
    #[error("session is for lab {expected}, got lab {actual}")]
    LabMismatch {
        /// Lab the session was opened for
        expected: u64,
        /// Lab passed to the operation
        actual: u64,
    },

    /// Storage failure while refreshing the user after an award
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `CyberLabs` operations.
pub type Result<T> = std::result::Result<T, CyberLabsError>;

// ============================================================================
// Tests
// ============================================================================
