// sqlx::Error -> AppError mapping (orphan rules keep this out of core)

use signal_core::error::AppError;

/// Map a sqlx error onto the application error type with the SQLite result code kept
pub fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            // SQLite result codes: https://www.sqlite.org/rescode.html
            match db_err.code().as_deref() {
                Some("2067") | Some("1555") => AppError::Conflict(format!(
                    "Unique constraint violation: {}",
                    db_err.message()
                )),
                Some("787") | Some("3850") => AppError::Database(format!(
                    "Foreign key constraint violation: {}",
                    db_err.message()
                )),
                Some("5") | Some("517") => AppError::Database(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                Some("13") => AppError::Database(format!("Database full: {}", db_err.message())),
                Some(code) => {
                    AppError::Database(format!("Database error [{}]: {}", code, db_err.message()))
                }
                None => AppError::Database(format!("Database error: {}", db_err.message())),
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Database(format!("Column not found: {}", col)),
        _ => AppError::Database(err.to_string()),
    }
}

/// A stored row that no longer parses into the domain model
pub fn corrupt_row(table: &str, id: &str, detail: impl std::fmt::Display) -> AppError {
    AppError::Database(format!("Corrupt {} row {}: {}", table, id, detail))
}
