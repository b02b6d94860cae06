use txidx_errors::CoreError;

/// Map a `sqlx` error onto the core's taxonomy. A unique-violation becomes
/// [`CoreError::Conflict`]; everything else becomes [`CoreError::StorageError`].
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return CoreError::Conflict(db_err.message().to_string());
        }
    }
    CoreError::StorageError(err.to_string())
}
