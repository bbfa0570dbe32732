//! Convenient imports for typical `dbkit` usage.
//!
//! ```
//! use dbkit::prelude::*;
//!
//! let compiler = Compiler::sqlite();
//! let cmd = compiler.compile(&Request::delete_all("Logs")).unwrap();
//! assert_eq!(cmd.text, "DELETE FROM [Logs] ;");
//! ```

pub use crate::request::{
    BatchQueryRequest, CountRequest, DeleteRequest, InsertRequest, KeyedRequest, MergeRequest,
    QueryAllRequest, QueryRequest, UpdateRequest,
};
pub use crate::{
    AggregateKind, CommandText, Compiler, CompilerConfig, DbError, DbField, DbResult, Executor,
    Field, OrderField, QueryField, QueryGroup, Record, Request, SchemaProvider, Session,
    SessionConfig, StatementBuilder, Value,
};
