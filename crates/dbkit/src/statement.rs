//! Per-dialect statement builders.
//!
//! [`StatementBuilder`] carries the shared templates as provided methods and
//! leaves the dialect-specific pieces (quoting, row limits, paging, upsert
//! syntax, insert result selection) to small hook methods. Each dialect type
//! overrides only what differs from the shared template.
//!
//! Every operation validates its request before emitting any text: a blank
//! table name is [`DbError::MissingTableName`], an empty field list is
//! [`DbError::MissingFields`], table hints on a dialect without hint syntax
//! are [`DbError::Unsupported`].
//!
//! # Example
//!
//! ```
//! use dbkit::{Field, OrderField, StatementBuilder};
//! use dbkit::request::BatchQueryRequest;
//! use dbkit::statement::SqlServerStatementBuilder;
//!
//! let request = BatchQueryRequest::new(
//!     "Table",
//!     Field::from_names(["Field1", "Field2"]),
//!     vec![OrderField::asc("Field1")],
//!     1,
//!     10,
//! );
//! let cmd = SqlServerStatementBuilder.create_batch_query(&request).unwrap();
//! assert!(cmd.text.contains("([RowNumber] BETWEEN 11 AND 20)"));
//! ```

mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MySqlStatementBuilder;
pub use postgres::PostgresStatementBuilder;
pub use sqlite::SqliteStatementBuilder;
pub use sqlserver::SqlServerStatementBuilder;

use crate::batch;
use crate::error::{DbError, DbResult};
use crate::field::{DbField, Field, OrderField};
use crate::ident::Quoting;
use crate::query_builder::{CommandText, QueryBuilder};
use crate::request::{
    AggregateRequest, BatchQueryRequest, CountRequest, DeleteRequest, InsertAllRequest,
    InsertRequest, KeyedRequest, MergeAllRequest, QueryAllRequest, QueryMultipleRequest,
    QueryRequest, Request, UpdateAllRequest, UpdateRequest,
};
use crate::resolver::{self, FieldSets};
use std::fmt;

/// Emits one complete statement per operation kind for a target dialect.
pub trait StatementBuilder: fmt::Debug + Send + Sync {
    /// Dialect name used in errors and logs.
    fn dialect(&self) -> &'static str;

    /// Identifier quote style.
    fn quoting(&self) -> Quoting;

    /// Placeholder prefix character.
    fn parameter_prefix(&self) -> char {
        '@'
    }

    /// Whether table hints (`WITH (NOLOCK)`) are expressible.
    fn supports_hints(&self) -> bool {
        false
    }

    /// `SELECT TOP (n)` instead of a trailing `LIMIT n`.
    fn uses_top(&self) -> bool {
        false
    }

    /// Database function returning the last generated identity value.
    fn identity_function(&self) -> &'static str;

    /// Row-count expression of COUNT statements.
    fn count_expression(&self) -> &'static str {
        "COUNT (*)"
    }

    /// Paging clause appended after ORDER BY in a batch query.
    fn paging_clause(&self, offset: usize, rows: usize) -> String {
        format!("LIMIT {rows} OFFSET {offset}")
    }

    /// A fresh token assembler for this dialect.
    fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(self.quoting(), self.parameter_prefix())
    }

    /// Reject hints this dialect cannot express.
    fn check_hints(&self, hints: Option<&str>) -> DbResult<()> {
        match hints {
            Some(h) if !h.trim().is_empty() && !self.supports_hints() => {
                Err(DbError::unsupported(self.dialect(), "table hints"))
            }
            _ => Ok(()),
        }
    }

    /// Compile any request.
    fn create(&self, request: &Request) -> DbResult<CommandText> {
        match request {
            Request::Query(r) => self.create_query(r),
            Request::QueryAll(r) => self.create_query_all(r),
            Request::QueryMultiple(r) => self.create_query_multiple(r),
            Request::BatchQuery(r) => self.create_batch_query(r),
            Request::Insert(r) => self.create_insert(r),
            Request::InsertAll(r) => self.create_insert_all(r),
            Request::Update(r) => self.create_update(r),
            Request::UpdateAll(r) => self.create_update_all(r),
            Request::Delete(r) => self.create_delete(r),
            Request::DeleteAll { table, hints } => self.create_delete_all(table, hints.as_deref()),
            Request::Merge(r) => self.create_merge(r),
            Request::MergeAll(r) => self.create_merge_all(r),
            Request::Truncate { table } => self.create_truncate(table),
            Request::Count(r) => self.create_count(r),
            Request::CountAll { table, hints } => {
                self.create_count(&CountRequest {
                    table: table.clone(),
                    filter: None,
                    hints: hints.clone(),
                })
            }
            Request::Aggregate(r) => self.create_aggregate(r),
            Request::Exists(r) => self.create_exists(r),
        }
    }

    /// `SELECT [F..] FROM [T] [hints] [ORDER BY ..] ;`
    fn create_query_all(&self, request: &QueryAllRequest) -> DbResult<CommandText> {
        check_table(&request.table)?;
        check_fields(&request.fields, "QueryAll")?;
        self.check_hints(request.hints.as_deref())?;

        let mut q = self.query_builder();
        q.select_clause(&request.fields)
            .from_clause(&request.table)
            .hints(request.hints.as_deref())
            .order_by_clause(&request.order_by)
            .end();
        Ok(q.build())
    }

    /// `SELECT [TOP (n)] [F..] FROM [T] [hints] [WHERE (..)] [ORDER BY ..] [LIMIT n] ;`
    fn create_query(&self, request: &QueryRequest) -> DbResult<CommandText> {
        let mut q = self.query_builder();
        self.write_query(&mut q, request)?;
        Ok(q.build())
    }

    /// Every query of the request in one text, separated by a single space.
    fn create_query_multiple(&self, request: &QueryMultipleRequest) -> DbResult<CommandText> {
        if request.queries.is_empty() {
            return Err(DbError::InvalidArgument {
                name: "queries",
                value: "0".to_string(),
            });
        }
        let mut q = self.query_builder();
        for query in &request.queries {
            self.write_query(&mut q, query)?;
        }
        Ok(q.build())
    }

    fn write_query(&self, q: &mut QueryBuilder, request: &QueryRequest) -> DbResult<()> {
        check_table(&request.table)?;
        check_fields(&request.fields, "Query")?;
        self.check_hints(request.hints.as_deref())?;
        if request.top == Some(0) {
            return Err(DbError::InvalidArgument {
                name: "top",
                value: "0".to_string(),
            });
        }

        q.push("SELECT");
        if let (true, Some(top)) = (self.uses_top(), request.top) {
            q.push(&format!("TOP ({top})"));
        }
        q.push_fields(&request.fields)
            .from_clause(&request.table)
            .hints(request.hints.as_deref())
            .where_clause(request.filter.as_ref(), "")?
            .order_by_clause(&request.order_by);
        if let (false, Some(top)) = (self.uses_top(), request.top) {
            q.push(&format!("LIMIT {top}"));
        }
        q.end();
        Ok(())
    }

    /// `SELECT [F..] FROM [T] [WHERE (..)] ORDER BY .. <paging> ;`
    fn create_batch_query(&self, request: &BatchQueryRequest) -> DbResult<CommandText> {
        let bounds = PageBounds::of(request)?;
        self.check_hints(request.hints.as_deref())?;

        let mut q = self.query_builder();
        q.select_clause(&request.fields)
            .from_clause(&request.table)
            .hints(request.hints.as_deref())
            .where_clause(request.filter.as_ref(), "")?
            .order_by_clause(&request.order_by)
            .push(&self.paging_clause(bounds.offset, request.rows_per_batch))
            .end();
        Ok(q.build())
    }

    /// `INSERT INTO [T] ( [F..] ) VALUES ( @F.. ) ; SELECT <result> AS [Result] ;`
    fn create_insert(&self, request: &InsertRequest) -> DbResult<CommandText> {
        let mut q = self.query_builder();
        self.write_insert(&mut q, request)?;
        Ok(q.build())
    }

    /// The single-row insert repeated once per batch row.
    fn create_insert_all(&self, request: &InsertAllRequest) -> DbResult<CommandText> {
        batch::repeat(self.query_builder(), request.batch_size, |q| {
            self.write_insert(q, &request.insert)
        })
    }

    fn write_insert(&self, q: &mut QueryBuilder, request: &InsertRequest) -> DbResult<()> {
        check_table(&request.table)?;
        check_fields(&request.fields, "Insert")?;
        self.check_hints(request.hints.as_deref())?;

        let fields = resolver::insertable_fields(
            &request.fields,
            request.identity.as_ref(),
            request.include_identity,
        );
        check_fields(&fields, "Insert (after excluding the identity)")?;

        let params = q.parameter_list(&fields);
        q.push("INSERT INTO")
            .push_ident(&request.table)
            .hints(request.hints.as_deref())
            .open_paren()
            .push_fields(&fields)
            .close_paren()
            .push("VALUES")
            .open_paren()
            .push(&params)
            .close_paren();
        self.write_insert_result(q, request.primary.as_ref(), request.identity.as_ref());
        Ok(())
    }

    /// Terminate the INSERT and select the new row's key as `Result`.
    ///
    /// A caller-supplied primary echoes its own placeholder; a generated key
    /// comes from the identity function.
    fn write_insert_result(
        &self,
        q: &mut QueryBuilder,
        primary: Option<&DbField>,
        identity: Option<&DbField>,
    ) {
        let result = match (primary, identity) {
            (Some(primary), identity) if !is_identity_key(primary, identity) => {
                q.row_parameter(&primary.as_field())
            }
            (None, None) => "NULL".to_string(),
            _ => self.identity_function().to_string(),
        };
        let alias = q.quote("Result");
        q.end()
            .push("SELECT")
            .push(&result)
            .push("AS")
            .push(&alias)
            .end();
    }

    /// `UPDATE [T] [hints] SET [F] = @F, .. [WHERE (..)] ;`
    ///
    /// Predicate placeholders carry a `_` prefix so they never collide with
    /// SET placeholders. A primary or identity column referenced by the
    /// filter is not assigned.
    fn create_update(&self, request: &UpdateRequest) -> DbResult<CommandText> {
        check_table(&request.table)?;
        check_fields(&request.fields, "Update")?;
        self.check_hints(request.hints.as_deref())?;

        let filtered: Vec<Field> = request
            .filter
            .as_ref()
            .map(|filter| filter.query_fields().into_iter().map(|qf| qf.field.clone()).collect())
            .unwrap_or_default();
        let updatable = resolver::updatable_fields(
            &request.fields,
            &filtered,
            request.primary.as_ref(),
            request.identity.as_ref(),
        );
        check_fields(&updatable, "Update (after excluding filtered keys)")?;

        let mut q = self.query_builder();
        q.push("UPDATE")
            .push_ident(&request.table)
            .hints(request.hints.as_deref())
            .set_clause(&updatable)
            .where_clause(request.filter.as_ref(), "_")?
            .end();
        Ok(q.build())
    }

    /// `UPDATE [T] SET <updatable> WHERE ([Q1] = @Q1 AND ..) ;` per batch row.
    fn create_update_all(&self, request: &UpdateAllRequest) -> DbResult<CommandText> {
        let keyed = &request.keyed;
        let sets = self.resolve_keyed(keyed)?;
        check_fields(&sets.updatable, "UpdateAll (after excluding qualified keys)")?;

        batch::repeat(self.query_builder(), request.batch_size, |q| {
            q.push("UPDATE")
                .push_ident(&keyed.table)
                .hints(keyed.hints.as_deref())
                .set_clause(&sets.updatable)
                .push("WHERE");
            let predicate = qualifier_predicate(q, &sets.qualifiers);
            q.push(&predicate).end();
            Ok(())
        })
    }

    /// `DELETE FROM [T] [hints] [WHERE (..)] ;`
    fn create_delete(&self, request: &DeleteRequest) -> DbResult<CommandText> {
        check_table(&request.table)?;
        self.check_hints(request.hints.as_deref())?;

        let mut q = self.query_builder();
        q.push("DELETE")
            .from_clause(&request.table)
            .hints(request.hints.as_deref())
            .where_clause(request.filter.as_ref(), "")?
            .end();
        Ok(q.build())
    }

    /// `DELETE FROM [T] ;`
    fn create_delete_all(&self, table: &str, hints: Option<&str>) -> DbResult<CommandText> {
        self.create_delete(&DeleteRequest {
            table: table.to_string(),
            filter: None,
            hints: hints.map(str::to_string),
        })
    }

    /// Upsert of one row keyed by the effective qualifiers.
    fn create_merge(&self, request: &KeyedRequest) -> DbResult<CommandText> {
        let sets = self.resolve_keyed(request)?;
        let mut q = self.query_builder();
        self.write_merge(&mut q, request, &sets)?;
        Ok(q.build())
    }

    /// The single-row merge repeated once per batch row.
    fn create_merge_all(&self, request: &MergeAllRequest) -> DbResult<CommandText> {
        let sets = self.resolve_keyed(&request.merge)?;
        batch::repeat(self.query_builder(), request.batch_size, |q| {
            self.write_merge(q, &request.merge, &sets)
        })
    }

    /// Dialect upsert syntax for one row.
    fn write_merge(&self, q: &mut QueryBuilder, request: &KeyedRequest, sets: &FieldSets) -> DbResult<()>;

    /// `TRUNCATE TABLE [T] ;`
    fn create_truncate(&self, table: &str) -> DbResult<CommandText> {
        check_table(table)?;
        let mut q = self.query_builder();
        q.push("TRUNCATE TABLE").push_ident(table).end();
        Ok(q.build())
    }

    /// `SELECT <count> AS [CountValue] FROM [T] [hints] [WHERE (..)] ;`
    fn create_count(&self, request: &CountRequest) -> DbResult<CommandText> {
        check_table(&request.table)?;
        self.check_hints(request.hints.as_deref())?;

        let mut q = self.query_builder();
        let alias = q.quote("CountValue");
        q.push("SELECT")
            .push(self.count_expression())
            .push("AS")
            .push(&alias)
            .from_clause(&request.table)
            .hints(request.hints.as_deref())
            .where_clause(request.filter.as_ref(), "")?
            .end();
        Ok(q.build())
    }

    /// `SELECT MAX ([F]) AS [MaxValue] FROM [T] [hints] [WHERE (..)] ;`
    fn create_aggregate(&self, request: &AggregateRequest) -> DbResult<CommandText> {
        check_table(&request.table)?;
        if request.field.name.trim().is_empty() {
            return Err(DbError::missing_fields(format!(
                "{} requires a field",
                request.kind.function()
            )));
        }
        self.check_hints(request.hints.as_deref())?;

        let mut q = self.query_builder();
        let expression = format!("{} ({})", request.kind.function(), q.quote(&request.field.name));
        let alias = q.quote(request.kind.alias());
        q.push("SELECT")
            .push(&expression)
            .push("AS")
            .push(&alias)
            .from_clause(&request.table)
            .hints(request.hints.as_deref())
            .where_clause(request.filter.as_ref(), "")?
            .end();
        Ok(q.build())
    }

    /// `SELECT TOP (1) 1 AS [ExistsValue] ..` or `SELECT 1 AS .. LIMIT 1 ;`
    fn create_exists(&self, request: &CountRequest) -> DbResult<CommandText> {
        check_table(&request.table)?;
        self.check_hints(request.hints.as_deref())?;

        let mut q = self.query_builder();
        let alias = q.quote("ExistsValue");
        q.push("SELECT");
        if self.uses_top() {
            q.push("TOP (1)");
        }
        q.push("1")
            .push("AS")
            .push(&alias)
            .from_clause(&request.table)
            .hints(request.hints.as_deref())
            .where_clause(request.filter.as_ref(), "")?;
        if !self.uses_top() {
            q.push("LIMIT 1");
        }
        q.end();
        Ok(q.build())
    }

    /// Validate a keyed request and partition its fields.
    fn resolve_keyed(&self, request: &KeyedRequest) -> DbResult<FieldSets> {
        check_table(&request.table)?;
        check_fields(&request.fields, "a keyed write")?;
        self.check_hints(request.hints.as_deref())?;
        resolver::resolve(
            &request.table,
            &request.fields,
            &request.qualifiers,
            request.primary.as_ref(),
            request.identity.as_ref(),
        )
    }
}

/// Reject a blank table name.
pub fn check_table(table: &str) -> DbResult<()> {
    if table.trim().is_empty() {
        return Err(DbError::MissingTableName);
    }
    Ok(())
}

/// Reject an empty field list.
pub fn check_fields(fields: &[Field], operation: &str) -> DbResult<()> {
    if fields.is_empty() {
        return Err(DbError::missing_fields(format!(
            "{operation} requires at least one field"
        )));
    }
    Ok(())
}

/// Whether the primary key is generated by the database: flagged identity,
/// or the same column as the table's identity.
pub(crate) fn is_identity_key(primary: &DbField, identity: Option<&DbField>) -> bool {
    primary.is_identity || identity.is_some_and(|i| i.name.eq_ignore_ascii_case(&primary.name))
}

/// `([Q1] = @Q1 AND [Q2] = @Q2)` over row placeholders.
pub(crate) fn qualifier_predicate(q: &mut QueryBuilder, qualifiers: &[Field]) -> String {
    let parts = qualifiers
        .iter()
        .map(|f| {
            let column = q.quote(&f.name);
            let param = q.row_parameter(f);
            format!("{column} = {param}")
        })
        .collect::<Vec<_>>();
    format!("({})", parts.join(" AND "))
}

/// Columns of the INSERT branch of an upsert: the insertable fields plus the
/// qualifiers, in declaration order. The conflict key is always supplied,
/// even when it is the identity column.
pub(crate) fn upsert_fields(request: &KeyedRequest, sets: &FieldSets) -> Vec<Field> {
    request
        .fields
        .iter()
        .filter(|f| sets.insertable.contains(f) || sets.qualifiers.contains(f))
        .cloned()
        .collect()
}

/// `INSERT .. ON CONFLICT ( <qualifiers> ) DO UPDATE SET [U] = EXCLUDED.[U] ;`
///
/// Shared by the dialects with `ON CONFLICT` upserts. Nothing updatable
/// renders `DO NOTHING`.
pub(crate) fn write_on_conflict_merge(
    q: &mut QueryBuilder,
    request: &KeyedRequest,
    sets: &FieldSets,
) -> DbResult<()> {
    let fields = upsert_fields(request, sets);
    check_fields(&fields, "Merge")?;
    let params = q.parameter_list(&fields);
    let conflict = q.field_list(&sets.qualifiers);
    q.insert_clause(&request.table, &fields)
        .push("VALUES")
        .open_paren()
        .push(&params)
        .close_paren()
        .push("ON CONFLICT")
        .open_paren()
        .push(&conflict)
        .close_paren();
    if sets.updatable.is_empty() {
        q.push("DO NOTHING");
    } else {
        let assignments = sets
            .updatable
            .iter()
            .map(|f| {
                let column = q.quote(&f.name);
                format!("{column} = EXCLUDED.{column}")
            })
            .collect::<Vec<_>>()
            .join(", ");
        q.push("DO UPDATE SET").push(&assignments);
    }
    q.end();
    Ok(())
}

/// Validated row window of a batch query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageBounds {
    /// Rows skipped before the page.
    pub offset: usize,
    /// 1-based inclusive first row.
    pub first: usize,
    /// 1-based inclusive last row.
    pub last: usize,
}

impl PageBounds {
    pub(crate) fn of(request: &BatchQueryRequest) -> DbResult<Self> {
        check_table(&request.table)?;
        check_fields(&request.fields, "BatchQuery")?;
        check_order(&request.table, &request.order_by)?;
        if request.rows_per_batch == 0 {
            return Err(DbError::InvalidArgument {
                name: "rows_per_batch",
                value: "0".to_string(),
            });
        }
        let overflow = || DbError::InvalidArgument {
            name: "page",
            value: request.page.to_string(),
        };
        let offset = request
            .page
            .checked_mul(request.rows_per_batch)
            .ok_or_else(overflow)?;
        let last = offset
            .checked_add(request.rows_per_batch)
            .ok_or_else(overflow)?;
        Ok(Self {
            offset,
            first: offset + 1,
            last,
        })
    }
}

fn check_order(table: &str, order_by: &[OrderField]) -> DbResult<()> {
    if order_by.is_empty() {
        return Err(DbError::MissingOrderBy {
            table: table.to_string(),
        });
    }
    Ok(())
}
