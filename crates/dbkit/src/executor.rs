//! Execution driver seam.
//!
//! dbkit produces text and bound parameters; an [`Executor`] owns the
//! connection, the transaction and result materialization. Implement it over
//! a connection, a pool or a transaction alike.

use crate::error::DbResult;
use crate::value::{Record, Value};
use std::future::Future;

/// Runs compiled statements.
///
/// `params` are `(placeholder name without prefix, value)` pairs in the order
/// the placeholders first appear in `sql`.
pub trait Executor: Send + Sync {
    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[(String, Value)],
    ) -> impl Future<Output = DbResult<u64>> + Send;

    /// Execute a query and return all rows of its (last) result set.
    fn query(
        &self,
        sql: &str,
        params: &[(String, Value)],
    ) -> impl Future<Output = DbResult<Vec<Record>>> + Send;

    /// Execute a multi-statement text and return one row set per statement.
    fn query_multiple(
        &self,
        sql: &str,
        params: &[(String, Value)],
    ) -> impl Future<Output = DbResult<Vec<Vec<Record>>>> + Send;

    /// Execute a query and return the first column of the first row.
    ///
    /// No row yields [`Value::Null`].
    fn scalar(
        &self,
        sql: &str,
        params: &[(String, Value)],
    ) -> impl Future<Output = DbResult<Value>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            Ok(rows
                .first()
                .and_then(|row| row.iter().next())
                .map(|(_, value)| value.clone())
                .unwrap_or_default())
        }
    }
}
