use super::{StatementBuilder, check_table, write_on_conflict_merge};
use crate::error::DbResult;
use crate::field::DbField;
use crate::ident::Quoting;
use crate::query_builder::{CommandText, QueryBuilder};
use crate::request::KeyedRequest;
use crate::resolver::FieldSets;

/// PostgreSQL: `"name"` quoting, `LIMIT rows OFFSET offset` paging,
/// `ON CONFLICT` upserts and `RETURNING` for the insert result.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresStatementBuilder;

impl StatementBuilder for PostgresStatementBuilder {
    fn dialect(&self) -> &'static str {
        "PostgreSQL"
    }

    fn quoting(&self) -> Quoting {
        Quoting::DOUBLE_QUOTE
    }

    /// Never rendered; the insert result comes from `RETURNING`.
    fn identity_function(&self) -> &'static str {
        "LASTVAL()"
    }

    /// `RETURNING "Key" AS "Result" ;` or `RETURNING NULL AS "Result" ;`
    fn write_insert_result(
        &self,
        q: &mut QueryBuilder,
        primary: Option<&DbField>,
        identity: Option<&DbField>,
    ) {
        let result = primary
            .or(identity)
            .map_or_else(|| "NULL".to_string(), |key| q.quote(&key.name));
        let alias = q.quote("Result");
        q.push("RETURNING")
            .push(&result)
            .push("AS")
            .push(&alias)
            .end();
    }

    fn write_merge(&self, q: &mut QueryBuilder, request: &KeyedRequest, sets: &FieldSets) -> DbResult<()> {
        write_on_conflict_merge(q, request, sets)
    }

    /// `TRUNCATE TABLE "T" RESTART IDENTITY ;`
    fn create_truncate(&self, table: &str) -> DbResult<CommandText> {
        check_table(table)?;
        let mut q = self.query_builder();
        q.push("TRUNCATE TABLE")
            .push_ident(table)
            .push("RESTART IDENTITY")
            .end();
        Ok(q.build())
    }
}
