//! Column type mapping in both directions.
//!
//! SQLite only cares about type affinity, so the forward mapping folds
//! MySQL's many integer and text variants onto a handful of keywords. The
//! reverse mapping resolves a SQLite declaration by the same affinity rules
//! and picks the widest MySQL type of that family. Rules are applied in order
//! and the first match wins.

/// Type assigned to columns whose MySQL type is not recognized.
pub const FALLBACK_TYPE: &str = "varchar";

/// Types SQLite accepts unchanged.
const PASSTHROUGH: &[&str] = &[
    "text",
    "integer",
    "boolean",
    "date",
    "datetime",
    "time",
    "timestamp",
    "real",
    "double",
    "float",
    "blob",
];

/// Size-limited integer families.
const SIZED_INTEGERS: &[&str] = &["mediumint", "smallint", "tinyint", "bigint"];

/// Target types whose DEFAULT can be emitted as a bare number.
const NUMERIC_TYPES: &[&str] = &[
    "integer", "real", "double", "float", "boolean", "bigint", "decimal",
];

/// Type assigned to SQLite columns whose declaration is not recognized.
pub const MYSQL_FALLBACK_TYPE: &str = "longtext";

/// Length given to SQLite `varchar` columns declared without one.
const MYSQL_VARCHAR: &str = "varchar(255)";

/// SQLite declarations MySQL accepts unchanged.
const MYSQL_PASSTHROUGH: &[&str] = &["date", "datetime", "time", "timestamp", "boolean"];

/// Result of mapping a type from source to target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// Target type string (e.g., "varchar(50)", "integer").
    pub target_type: String,
    /// Whether this mapping loses information.
    pub is_lossy: bool,
    /// Warning message for lossy mappings.
    pub warning: Option<String>,
}

impl TypeMapping {
    /// Create a lossless type mapping.
    pub fn lossless(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: false,
            warning: None,
        }
    }

    /// Create a lossy type mapping with a warning.
    pub fn lossy(target_type: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: true,
            warning: Some(warning.into()),
        }
    }

    /// Whether a DEFAULT on this type may be written as a bare number.
    pub fn is_numeric(&self) -> bool {
        let base = self.target_type.split('(').next().unwrap_or_default();
        NUMERIC_TYPES.contains(&base)
    }
}

/// Map a MySQL `COLUMN_TYPE` string to a SQLite column type.
///
/// Never fails: unknown types become [`FALLBACK_TYPE`] with a warning that
/// names the original type string.
pub fn mysql_to_sqlite(mysql_type: &str) -> TypeMapping {
    let ty = mysql_type.trim().to_lowercase();

    if PASSTHROUGH.contains(&ty.as_str()) {
        return TypeMapping::lossless(ty);
    }

    match ty.as_str() {
        "longtext" | "mediumtext" | "tinytext" => return TypeMapping::lossless("text"),
        "longblob" | "mediumblob" | "tinyblob" => return TypeMapping::lossless("blob"),
        _ => {}
    }

    if SIZED_INTEGERS.iter().any(|prefix| ty.starts_with(prefix)) || ty.starts_with("int") {
        return TypeMapping::lossless("integer");
    }

    if ty.starts_with("varchar") {
        return TypeMapping::lossless(ty);
    }

    if ty.starts_with("char") {
        return TypeMapping::lossless(format!("var{}", ty));
    }

    TypeMapping::lossy(
        FALLBACK_TYPE,
        format!("type error : {}; set to {}", ty, FALLBACK_TYPE),
    )
}

/// Map a SQLite declared column type to a MySQL column type.
///
/// Sized character and decimal types keep their arguments. Other
/// declarations go by SQLite affinity: integers become `bigint`, text
/// `longtext`, blobs (and untyped columns) `longblob`, and reals `double`.
/// Anything left becomes [`MYSQL_FALLBACK_TYPE`] with a warning.
pub fn sqlite_to_mysql(sqlite_type: &str) -> TypeMapping {
    let ty = sqlite_type.trim().to_lowercase();

    if MYSQL_PASSTHROUGH.contains(&ty.as_str()) {
        return TypeMapping::lossless(ty);
    }

    let sized = |prefix: &str| ty.starts_with(prefix) && ty.ends_with(')');
    if sized("varchar(") || sized("char(") || sized("decimal(") || sized("numeric(") {
        return TypeMapping::lossless(ty);
    }
    if ty == "varchar" {
        return TypeMapping::lossless(MYSQL_VARCHAR);
    }

    if ty.contains("int") {
        return TypeMapping::lossless("bigint");
    }
    if ["char", "clob", "text"].iter().any(|k| ty.contains(k)) {
        return TypeMapping::lossless("longtext");
    }
    if ty.is_empty() || ty.contains("blob") {
        return TypeMapping::lossless("longblob");
    }
    if ["real", "floa", "doub"].iter().any(|k| ty.contains(k)) {
        return TypeMapping::lossless("double");
    }

    TypeMapping::lossy(
        MYSQL_FALLBACK_TYPE,
        format!("type error : {}; set to {}", ty, MYSQL_FALLBACK_TYPE),
    )
}
