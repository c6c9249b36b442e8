use sqlx::Error as SqlxError;

/// SQLSTATE codes that mean "another transaction got there first": retrying
/// the whole unit of work is safe and expected to succeed.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Table definition for a PostgreSQL-backed record.
pub trait SqlxSchema {
    const TABLE_NAME: &'static str;
    const INDEXES_SQL: &'static [&'static str];

    fn table_name() -> &'static str { Self::TABLE_NAME }
    fn indexes_sql() -> &'static [&'static str] { Self::INDEXES_SQL }

    /// `CREATE TABLE IF NOT EXISTS ...` for this record.
    fn create_table_sql() -> String;

    fn drop_table_sql() -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE;", Self::TABLE_NAME)
    }

    /// Every statement needed to bring an empty database up to this table,
    /// in execution order.
    fn schema_statements() -> Vec<String> {
        let mut statements = vec![Self::create_table_sql()];
        statements.extend(Self::INDEXES_SQL.iter().map(|s| s.to_string()));
        statements
    }
}

/// True when the error is a lock timeout, deadlock or serialization failure.
pub fn is_retryable_conflict(err: &SqlxError) -> bool {
    match err {
        SqlxError::Database(db_err) => matches!(
            db_err.code().as_deref(),
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) | Some(LOCK_NOT_AVAILABLE)
        ),
        SqlxError::PoolTimedOut => true,
        _ => false,
    }
}
