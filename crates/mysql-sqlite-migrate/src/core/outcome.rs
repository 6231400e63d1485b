//! Outcome types for per-table and per-row steps.
//!
//! Recoverable failures are values, not errors: the caller decides whether to
//! log and continue or to stop.

/// Result of checking a table before its metadata is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableCheck {
    /// The table can be read.
    Valid,
    /// The table is skipped; the reason is logged.
    Rejected(String),
}

impl TableCheck {
    /// Reject names no statement can address.
    pub fn check_name(name: &str) -> Self {
        if name.trim().is_empty() {
            TableCheck::Rejected("empty table name".to_string())
        } else {
            TableCheck::Valid
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, TableCheck::Valid)
    }
}

/// Result of inserting one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// The row was written.
    Inserted,
    /// The row collided with a uniqueness constraint and was skipped.
    Ignored,
    /// The statement failed.
    Failed { statement: String, error: String },
}

impl RowOutcome {
    /// Classify an execute result by affected row count.
    pub fn from_affected(result: std::result::Result<u64, String>, statement: String) -> Self {
        match result {
            Ok(0) => RowOutcome::Ignored,
            Ok(_) => RowOutcome::Inserted,
            Err(error) => RowOutcome::Failed { statement, error },
        }
    }
}

/// Decision after recording a row failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetVerdict {
    Continue,
    Abort,
}
