//! # dbkit
//!
//! Dialect-aware SQL statement compilation with a structural statement cache.
//!
//! ## Features
//!
//! - **Deterministic text**: one operation shape always compiles to the same
//!   byte-exact SQL, with single-space token separation and ` ;` terminators
//! - **Four dialects**: SQL Server, MySQL, PostgreSQL and SQLite builders over
//!   shared templates (paging, upserts, insert result selection, hints)
//! - **Field resolution**: qualifier fallback to the primary key, identity
//!   exclusion from INSERT, covered keys excluded from SET
//! - **Batching**: multi-row statements with `_k` placeholder suffixes
//! - **Structural cache**: requests that differ only in values share one
//!   compiled statement
//! - **Seams**: bring your own schema provider and execution driver
//!
//! ## Compiling
//!
//! ```
//! use dbkit::{Compiler, Field, OrderField, Request};
//! use dbkit::request::BatchQueryRequest;
//!
//! let compiler = Compiler::sql_server();
//! let request: Request = BatchQueryRequest::new(
//!     "Table",
//!     Field::from_names(["Field1", "Field2"]),
//!     vec![OrderField::asc("Field1")],
//!     0,
//!     10,
//! )
//! .into();
//! let cmd = compiler.compile(&request).unwrap();
//! assert_eq!(
//!     cmd.text,
//!     "WITH CTE AS ( SELECT ROW_NUMBER() OVER ( ORDER BY [Field1] ASC ) AS [RowNumber], \
//!      [Field1], [Field2] FROM [Table] ) SELECT [Field1], [Field2] FROM CTE \
//!      WHERE ([RowNumber] BETWEEN 1 AND 10) ORDER BY [Field1] ASC ;"
//! );
//! ```
//!
//! ## Binding
//!
//! A compiled [`CommandText`] lists its placeholders and where their values
//! come from; [`CommandText::bind`] resolves them against records and the
//! request's filter:
//!
//! ```
//! use dbkit::{Compiler, Field, QueryField, QueryGroup, Record, Request, Value};
//! use dbkit::request::UpdateRequest;
//!
//! let filter = QueryGroup::from(QueryField::eq("Id", 7));
//! let request: Request = UpdateRequest::new("Customer", Field::from_names(["Name"]))
//!     .filter(filter.clone())
//!     .into();
//! let cmd = Compiler::postgres().compile(&request).unwrap();
//! assert_eq!(cmd.text, r#"UPDATE "Customer" SET "Name" = @Name WHERE ("Id" = @_Id) ;"#);
//!
//! let row = Record::new().with("Name", "Ada");
//! let params = cmd.bind(&[row], Some(&filter)).unwrap();
//! assert_eq!(params[1], ("_Id".to_string(), Value::Int(7)));
//! ```

pub mod batch;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod error;
pub mod executor;
pub mod field;
pub mod ident;
pub mod predicate;
pub mod prelude;
pub mod query_builder;
pub mod request;
pub mod resolver;
pub mod schema;
pub mod session;
pub mod statement;
pub mod value;

pub use cache::{CacheStats, StatementCache};
pub use compiler::Compiler;
pub use config::{CompilerConfig, SessionConfig, StatementCacheConfig};
pub use error::{DbError, DbResult};
pub use executor::Executor;
pub use field::{DbField, DbFields, Direction, Field, OrderField};
pub use ident::{Quoting, parameter_name};
pub use predicate::{Conjunction, Operation, QueryField, QueryGroup, QueryItem};
pub use query_builder::{CommandText, Parameter, ParameterSource, QueryBuilder};
pub use request::{AggregateKind, Request};
pub use resolver::FieldSets;
pub use schema::{DbFieldCache, SchemaProvider, StaticSchema};
pub use session::Session;
pub use statement::{
    MySqlStatementBuilder, PostgresStatementBuilder, SqlServerStatementBuilder,
    SqliteStatementBuilder, StatementBuilder,
};
pub use value::{Record, Value};
