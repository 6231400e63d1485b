//! Error types for the migration library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Query error reported by either engine
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Connection error with context
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Schema extraction failed
    #[error("Schema extraction failed: {0}")]
    SchemaExtraction(String),

    /// The SQLite target already exists and overwriting was not allowed
    #[error(
        "File {} already exists. Delete it first or rename it, \
         or set options.delete_existing_data to true to allow overwriting",
        path.display()
    )]
    TargetExists { path: PathBuf },

    /// Too many row-level insert failures in one run
    #[error("Aborting: {count} row insert failures exceeded the limit for this run")]
    ErrorThresholdExceeded { count: usize },

    /// The operator declined the confirmation gate
    #[error("Migration aborted by operator")]
    Aborted,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        MigrateError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a SchemaExtraction error naming the catalog step that failed
    pub fn extraction(err: impl std::fmt::Display, context: &str) -> Self {
        MigrateError::SchemaExtraction(format!("{}: {}", context, err))
    }

    /// Process exit code for this error.
    ///
    /// Codes are stable so wrapper scripts can distinguish an abort before any
    /// mutation (3) from a mid-run abort (4).
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 2,
            MigrateError::TargetExists { .. } => 3,
            MigrateError::ErrorThresholdExceeded { .. } => 4,
            MigrateError::Aborted => 5,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_for_fatal_cases() {
        let exists = MigrateError::TargetExists {
            path: PathBuf::from("db.sqlite"),
        };
        let threshold = MigrateError::ErrorThresholdExceeded { count: 11 };

        assert_eq!(exists.exit_code(), 3);
        assert_eq!(threshold.exit_code(), 4);
        assert_eq!(MigrateError::Aborted.exit_code(), 5);
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 2);
        assert_eq!(MigrateError::SchemaExtraction("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_target_exists_message_names_file_and_option() {
        let err = MigrateError::TargetExists {
            path: PathBuf::from("/tmp/out.db"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out.db"));
        assert!(msg.contains("delete_existing_data"));
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = MigrateError::from(io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: IO error: missing"));
    }
}
