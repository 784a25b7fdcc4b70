//! Query Executor contract
//!
//! Executors run exactly one statement and never fail past their boundary:
//! every problem comes back as `QueryResult::Failed`.

use crate::execution::result::QueryResult;
use async_trait::async_trait;

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executor name used in logs (e.g. "mysql").
    fn name(&self) -> &'static str;

    /// Run a single statement and materialize all rows.
    async fn execute(&self, sql: &str) -> QueryResult;
}
