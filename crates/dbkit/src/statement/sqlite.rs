use super::{StatementBuilder, check_table, write_on_conflict_merge};
use crate::error::{DbError, DbResult};
use crate::ident::Quoting;
use crate::query_builder::{CommandText, QueryBuilder};
use crate::request::KeyedRequest;
use crate::resolver::FieldSets;

/// SQLite: `[name]` quoting, `LIMIT rows OFFSET offset` paging and
/// `ON CONFLICT` upserts. There is no TRUNCATE statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteStatementBuilder;

impl StatementBuilder for SqliteStatementBuilder {
    fn dialect(&self) -> &'static str {
        "SQLite"
    }

    fn quoting(&self) -> Quoting {
        Quoting::SQUARE_BRACKET
    }

    fn identity_function(&self) -> &'static str {
        "last_insert_rowid()"
    }

    fn write_merge(&self, q: &mut QueryBuilder, request: &KeyedRequest, sets: &FieldSets) -> DbResult<()> {
        write_on_conflict_merge(q, request, sets)
    }

    /// Always `Unsupported`. `DeleteAll` clears the rows without resetting
    /// the rowid sequence.
    fn create_truncate(&self, table: &str) -> DbResult<CommandText> {
        check_table(table)?;
        Err(DbError::unsupported(self.dialect(), "TRUNCATE TABLE"))
    }
}
