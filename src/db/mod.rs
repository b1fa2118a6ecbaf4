pub mod issue_repository;
pub mod mock_db;
pub mod postgres_issue_repository;
pub mod postgres_user_repository;
pub mod user_repository;

/// Postgres unique-constraint violation, the signal the find-or-create path
/// retries on.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code == "23505";
        }
    }
    false
}
