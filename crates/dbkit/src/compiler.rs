//! Request compilation with structural caching.
//!
//! A [`Compiler`] pairs one dialect's [`StatementBuilder`] with one
//! [`StatementCache`]. It is `Send + Sync`; share it through `Arc`.
//!
//! # Example
//!
//! ```
//! use dbkit::{Compiler, DbField, Field, Request};
//! use dbkit::request::InsertRequest;
//!
//! let compiler = Compiler::sql_server();
//! let request: Request = InsertRequest::new("Customer", Field::from_names(["Id", "Name"]))
//!     .primary(DbField::primary_identity("Id"))
//!     .into();
//! let cmd = compiler.compile(&request).unwrap();
//! assert_eq!(
//!     cmd.text,
//!     "INSERT INTO [Customer] ( [Name] ) VALUES ( @Name ) ; SELECT SCOPE_IDENTITY() AS [Result] ;"
//! );
//! assert!(std::sync::Arc::ptr_eq(&cmd, &compiler.compile(&request).unwrap()));
//! ```

use crate::cache::{CacheStats, StatementCache};
use crate::config::CompilerConfig;
use crate::error::DbResult;
use crate::query_builder::CommandText;
use crate::request::Request;
use crate::statement::{
    MySqlStatementBuilder, PostgresStatementBuilder, SqlServerStatementBuilder,
    SqliteStatementBuilder, StatementBuilder,
};
use std::sync::Arc;

/// Dialect statement builder plus structural cache.
#[derive(Debug)]
pub struct Compiler {
    builder: Arc<dyn StatementBuilder>,
    cache: StatementCache,
}

impl Compiler {
    /// Create a compiler with the default configuration.
    pub fn new(builder: impl StatementBuilder + 'static) -> Self {
        Self::with_config(builder, CompilerConfig::default())
    }

    pub fn with_config(builder: impl StatementBuilder + 'static, config: CompilerConfig) -> Self {
        Self {
            builder: Arc::new(builder),
            cache: StatementCache::new(config.cache),
        }
    }

    pub fn sql_server() -> Self {
        Self::new(SqlServerStatementBuilder)
    }

    pub fn mysql() -> Self {
        Self::new(MySqlStatementBuilder)
    }

    pub fn postgres() -> Self {
        Self::new(PostgresStatementBuilder)
    }

    pub fn sqlite() -> Self {
        Self::new(SqliteStatementBuilder)
    }

    pub fn builder(&self) -> &dyn StatementBuilder {
        self.builder.as_ref()
    }

    pub fn dialect(&self) -> &'static str {
        self.builder.dialect()
    }

    /// Compile a request, serving repeated shapes from the cache.
    pub fn compile(&self, request: &Request) -> DbResult<Arc<CommandText>> {
        let mut compiled = false;
        let cmd = self.cache.get_or_try_insert(request, |r| {
            compiled = true;
            self.builder.create(r)
        })?;

        log_compile(self.builder.dialect(), request, &cmd, compiled);
        Ok(cmd)
    }

    /// Drop every cached statement (e.g. after a schema change).
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Number of cached statements.
    pub fn cached_statements(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(feature = "tracing")]
fn log_compile(dialect: &'static str, request: &Request, cmd: &CommandText, compiled: bool) {
    if compiled {
        tracing::debug!(
            target: "dbkit.sql",
            dialect,
            request = %request,
            param_count = cmd.parameters.len(),
            sql = %cmd.text,
            "compiled statement"
        );
    } else {
        tracing::trace!(
            target: "dbkit.sql",
            dialect,
            request = %request,
            "statement cache hit"
        );
    }
}

#[cfg(not(feature = "tracing"))]
fn log_compile(_dialect: &'static str, _request: &Request, _cmd: &CommandText, _compiled: bool) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::field::{Field, OrderField};
    use crate::predicate::{QueryField, QueryGroup};
    use crate::request::{BatchQueryRequest, QueryRequest};

    fn query(value: i64) -> Request {
        QueryRequest::new("T", Field::from_names(["A", "B"]))
            .filter(QueryGroup::from(QueryField::eq("A", value)))
            .into()
    }

    #[test]
    fn structurally_equal_requests_share_one_entry() {
        let compiler = Compiler::sql_server();
        let first = compiler.compile(&query(1)).unwrap();
        let second = compiler.compile(&query(2)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(compiler.cache_stats().hits, 1);
        assert_eq!(compiler.cached_statements(), 1);
    }

    #[test]
    fn differing_shape_recompiles() {
        let compiler = Compiler::sql_server();
        let page0 = BatchQueryRequest::new("T", Field::from_names(["A"]), vec![OrderField::asc("A")], 0, 10);
        let page1 = BatchQueryRequest { page: 1, ..page0.clone() };
        let a = compiler.compile(&page0.into()).unwrap();
        let b = compiler.compile(&page1.into()).unwrap();
        assert_ne!(a.text, b.text);
        assert_eq!(compiler.cache_stats().misses, 2);
    }

    #[test]
    fn null_shape_is_part_of_the_key() {
        let compiler = Compiler::sql_server();
        let is_null: Request = QueryRequest::new("T", Field::from_names(["A"]))
            .filter(QueryGroup::from(QueryField::is_null("A")))
            .into();
        let text = compiler.compile(&is_null).unwrap();
        assert_eq!(text.text, "SELECT [A] FROM [T] WHERE ([A] IS NULL) ;");
        let eq = compiler.compile(&query(1)).unwrap();
        assert!(eq.text.contains("@A"));
    }

    #[test]
    fn errors_propagate_and_are_not_cached() {
        let compiler = Compiler::postgres();
        let err = compiler.compile(&Request::truncate(" ")).unwrap_err();
        assert_eq!(err, DbError::MissingTableName);
        assert_eq!(compiler.cached_statements(), 0);
    }

    #[test]
    fn clear_cache_forces_recompile() {
        let compiler = Compiler::mysql();
        let first = compiler.compile(&query(1)).unwrap();
        compiler.clear_cache();
        let second = compiler.compile(&query(1)).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.text, second.text);
    }

    #[test]
    fn disabled_cache_compiles_every_time() {
        let compiler = Compiler::with_config(SqliteStatementBuilder, CompilerConfig::new().no_cache());
        compiler.compile(&query(1)).unwrap();
        compiler.compile(&query(1)).unwrap();
        assert_eq!(compiler.cached_statements(), 0);
        assert_eq!(compiler.dialect(), "SQLite");
    }

    #[test]
    fn compiler_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Compiler>();
    }
}
