//! Classification of database errors.

/// Name of the partial unique index guarding live short codes.
pub const LIVE_SHORT_CONSTRAINT: &str = "urls_short_live_key";

/// Returns true if `e` is a unique violation on the live short-code index.
///
/// This is how a lost race between two concurrent creations of the same code
/// surfaces from PostgreSQL.
pub fn is_unique_violation_on_short(e: &sqlx::Error) -> bool {
    let Some(db_err) = e.as_database_error() else {
        return false;
    };

    if !db_err.is_unique_violation() {
        return false;
    }

    matches!(db_err.constraint(), Some(LIVE_SHORT_CONSTRAINT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_violations() {
        assert!(!is_unique_violation_on_short(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation_on_short(&sqlx::Error::PoolTimedOut));
    }
}
