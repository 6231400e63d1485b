//! MySQL/MariaDB SQL dialect (Strategy pattern).

use crate::core::traits::Dialect;
use crate::dialect::{sqlite_to_mysql, TypeMapping};

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // Handle names that contain backticks by doubling them
        format!("`{}`", name.replace('`', "``"))
    }

    fn map_column_type(&self, source_type: &str) -> TypeMapping {
        sqlite_to_mysql(source_type)
    }

    fn quote_text(&self, value: &str) -> String {
        // Backslash is an escape character unless NO_BACKSLASH_ESCAPES is set
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn insert_ignore(&self) -> &str {
        "INSERT IGNORE INTO"
    }

    fn foreign_key_checks(&self, enabled: bool) -> String {
        format!("SET FOREIGN_KEY_CHECKS={}", u8::from(enabled))
    }

    fn build_truncate(&self, table: &str) -> String {
        format!("TRUNCATE TABLE {}", self.quote_ident(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::NormalizedIndex;
    use crate::core::value::SqlValue;

    #[test]
    fn test_quote_ident() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.quote_ident("name"), "`name`");
        assert_eq!(dialect.quote_ident("table`name"), "`table``name`");
        assert_eq!(dialect.quote_ident("Users"), "`Users`");
    }

    #[test]
    fn test_build_select() {
        let dialect = MysqlDialect::new();
        let cols = vec!["Id".to_string(), "Name".to_string()];
        assert_eq!(
            dialect.build_select("Users", &cols),
            "SELECT `Id`, `Name` FROM `Users`"
        );
        assert_eq!(dialect.build_select("Users", &[]), "SELECT * FROM `Users`");
    }

    #[test]
    fn test_build_insert_ignore() {
        let dialect = MysqlDialect::new();
        let sql = dialect.build_insert(
            "users",
            &["id".to_string(), "name".to_string(), "bio".to_string()],
            &[SqlValue::Int(1), SqlValue::from("O'Brien"), SqlValue::Null],
        );
        assert_eq!(
            sql,
            "INSERT IGNORE INTO `users` (`id`, `name`, `bio`) VALUES(1, 'O''Brien', NULL)"
        );
    }

    #[test]
    fn test_build_create_index() {
        let dialect = MysqlDialect::new();
        let idx = NormalizedIndex {
            name: "name".to_string(),
            columns: vec!["last".to_string(), "first".to_string()],
            unique: false,
            nullable: true,
        };
        assert_eq!(
            dialect.build_create_index("people", &idx),
            "CREATE INDEX `people_name` ON `people`(`last`, `first`)"
        );
    }

    #[test]
    fn test_session_statements() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.foreign_key_checks(false), "SET FOREIGN_KEY_CHECKS=0");
        assert_eq!(dialect.foreign_key_checks(true), "SET FOREIGN_KEY_CHECKS=1");
        assert_eq!(dialect.build_truncate("logs"), "TRUNCATE TABLE `logs`");
    }
}
