//! Transactions with bounded lock waits.
//!
//! Every ledger write runs inside a transaction that first sets
//! `lock_timeout` and `statement_timeout` with `SET LOCAL`, so the settings
//! end with the transaction and a stuck row lock fails the request instead of
//! hanging it.

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};

/// Begins a transaction with both timeouts set to `timeout_ms`.
///
/// # Errors
///
/// Returns an error if the transaction cannot be started or configured.
pub async fn begin_with_timeouts(
    db: &DatabaseConnection,
    timeout_ms: u64,
) -> Result<DatabaseTransaction, DbErr> {
    let txn = db.begin().await?;
    set_timeouts(&txn, timeout_ms).await?;
    Ok(txn)
}

/// Sets the timeouts on an existing transaction.
///
/// # Errors
///
/// Returns an error if the statements fail.
pub async fn set_timeouts(txn: &DatabaseTransaction, timeout_ms: u64) -> Result<(), DbErr> {
    txn.execute_unprepared(&timeout_sql(timeout_ms)).await?;
    Ok(())
}

fn timeout_sql(timeout_ms: u64) -> String {
    format!("SET LOCAL lock_timeout = '{timeout_ms}ms'; SET LOCAL statement_timeout = '{timeout_ms}ms'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_sql_format() {
        assert_eq!(
            timeout_sql(10_000),
            "SET LOCAL lock_timeout = '10000ms'; SET LOCAL statement_timeout = '10000ms'"
        );
    }
}
