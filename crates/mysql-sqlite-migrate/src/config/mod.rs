//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
mysql:
  host: db.local
  user: app
  passwd: secret
  database: shop
sqlite:
  file: shop.db
options:
  delete_existing_data: 1
  source: ""
  tables: "users, orders,"
"#;

    #[test]
    fn test_from_yaml_full() {
        let config = Config::from_yaml(FULL).unwrap();
        assert_eq!(config.mysql.port, 3306);
        assert_eq!(config.mysql.password, "secret");
        assert!(config.options.delete_existing_data);
        assert_eq!(config.options.direction(), Direction::MysqlToSqlite);
        assert_eq!(
            config.options.selected_tables(),
            vec!["users".to_string(), "orders".to_string()]
        );
        assert_eq!(
            config.options.log_path(),
            std::path::PathBuf::from("mysql-sqlite.log")
        );
    }

    #[test]
    fn test_from_yaml_defaults_and_list_tables() {
        let yaml = r#"
mysql: { host: h, user: u, database: d }
sqlite: { file: out.db }
options:
  source: sqlite
  tables: [a, b]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(!config.options.delete_existing_data);
        assert_eq!(config.options.direction(), Direction::SqliteToMysql);
        assert_eq!(config.options.selected_tables(), vec!["a", "b"]);
        assert_eq!(
            config.options.log_path(),
            std::path::PathBuf::from("sqlite-mysql.log")
        );
    }

    #[test]
    fn test_from_yaml_without_options_selects_everything() {
        let yaml = "mysql: { host: h, user: u, database: d }\nsqlite: { file: out.db }\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.options.selected_tables().is_empty());
    }

    #[test]
    fn test_from_yaml_rejects_missing_section() {
        assert!(Config::from_yaml("mysql: { host: h, user: u, database: d }\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load("/definitely/not/here.yaml").is_err());
    }
}
