//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.mysql.host.is_empty() {
        return Err(MigrateError::Config("mysql.host is required".into()));
    }
    if config.mysql.database.is_empty() {
        return Err(MigrateError::Config("mysql.database is required".into()));
    }
    if config.mysql.user.is_empty() {
        return Err(MigrateError::Config("mysql.user is required".into()));
    }
    if config.sqlite.file.as_os_str().is_empty() {
        return Err(MigrateError::Config("sqlite.file is required".into()));
    }

    let source = config.options.source.trim().to_lowercase();
    if !matches!(source.as_str(), "" | "mysql" | "sqlite") {
        return Err(MigrateError::Config(format!(
            "options.source must be 'mysql', 'sqlite' or empty, got '{}'",
            config.options.source
        )));
    }

    Ok(())
}
