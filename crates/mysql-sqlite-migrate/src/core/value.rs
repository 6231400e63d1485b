//! SQL value representation for row transfer.
//!
//! Rows are moved between engines as generated `INSERT` statements, so every
//! value must know how to render itself as a SQL literal in the target dialect.

use rust_decimal::Decimal;

use super::traits::Dialect;

/// Classification used when rendering a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    /// Rendered as the bare keyword `NULL`.
    Null,
    /// Rendered single-quoted with quotes escaped.
    Text,
    /// Rendered as the value's canonical representation.
    Other,
}

/// One cell of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Character data, and temporal values in their engine text form.
    Text(String),

    /// Signed integer.
    Int(i64),

    /// Unsigned integer (MySQL `BIGINT UNSIGNED` and friends).
    UInt(u64),

    /// Floating point.
    Float(f64),

    /// Exact numeric.
    Decimal(Decimal),

    /// Boolean, stored as 1/0 by both engines.
    Bool(bool),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Classify the value for literal rendering.
    pub fn class(&self) -> ValueClass {
        match self {
            SqlValue::Null => ValueClass::Null,
            SqlValue::Float(v) if !v.is_finite() => ValueClass::Null,
            SqlValue::Text(_) => ValueClass::Text,
            _ => ValueClass::Other,
        }
    }

    /// Render the value as a SQL literal for `dialect`.
    ///
    /// Non-finite floats have no literal form in either engine and become `NULL`.
    pub fn to_sql_literal<D: Dialect + ?Sized>(&self, dialect: &D) -> String {
        match (self.class(), self) {
            (ValueClass::Null, _) => "NULL".to_string(),
            (_, SqlValue::Text(s)) => dialect.quote_text(s),
            (_, SqlValue::Int(v)) => v.to_string(),
            (_, SqlValue::UInt(v)) => v.to_string(),
            (_, SqlValue::Float(v)) => format!("{:?}", v),
            (_, SqlValue::Decimal(v)) => v.to_string(),
            (_, SqlValue::Bool(v)) => if *v { "1" } else { "0" }.to_string(),
            (_, SqlValue::Bytes(b)) => format!("X'{}'", hex::encode_upper(b)),
            (_, SqlValue::Null) => "NULL".to_string(),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{MysqlDialect, SqliteDialect};
    use std::str::FromStr;

    #[test]
    fn test_classification() {
        assert_eq!(SqlValue::Null.class(), ValueClass::Null);
        assert_eq!(SqlValue::from("x").class(), ValueClass::Text);
        assert_eq!(SqlValue::Int(3).class(), ValueClass::Other);
        assert_eq!(SqlValue::Float(f64::NAN).class(), ValueClass::Null);
        assert_eq!(SqlValue::from(None::<i64>).class(), ValueClass::Null);
    }

    #[test]
    fn test_text_literal_doubles_quotes() {
        let v = SqlValue::from("O'Brien");
        assert_eq!(v.to_sql_literal(&SqliteDialect), "'O''Brien'");
        assert_eq!(v.to_sql_literal(&MysqlDialect), "'O''Brien'");
    }

    #[test]
    fn test_mysql_text_literal_escapes_backslash() {
        let v = SqlValue::from(r"C:\temp");
        assert_eq!(v.to_sql_literal(&MysqlDialect), r"'C:\\temp'");
        assert_eq!(v.to_sql_literal(&SqliteDialect), r"'C:\temp'");
    }

    #[test]
    fn test_other_literals() {
        let d = &SqliteDialect;
        assert_eq!(SqlValue::Int(-7).to_sql_literal(d), "-7");
        assert_eq!(SqlValue::UInt(u64::MAX).to_sql_literal(d), "18446744073709551615");
        assert_eq!(SqlValue::Float(1.5).to_sql_literal(d), "1.5");
        assert_eq!(SqlValue::Float(2.0).to_sql_literal(d), "2.0");
        assert_eq!(SqlValue::Float(f64::INFINITY).to_sql_literal(d), "NULL");
        assert_eq!(
            SqlValue::Decimal(Decimal::from_str("12.50").unwrap()).to_sql_literal(d),
            "12.50"
        );
        assert_eq!(SqlValue::Bool(true).to_sql_literal(d), "1");
        assert_eq!(SqlValue::Bytes(vec![0xde, 0xad]).to_sql_literal(d), "X'DEAD'");
        assert_eq!(SqlValue::Null.to_sql_literal(d), "NULL");
    }
}
