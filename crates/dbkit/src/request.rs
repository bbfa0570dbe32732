//! Structural request descriptors.
//!
//! A request carries every input that influences the compiled text and
//! nothing else: row values never enter a request, and predicate values only
//! through their shape (see [`QueryField`](crate::QueryField) equality). Two
//! requests built independently with the same shape therefore compare and
//! hash equal and share one cache entry.
//!
//! # Example
//!
//! ```
//! use dbkit::{DbField, Field, Request};
//! use dbkit::request::MergeRequest;
//!
//! let a: Request = MergeRequest::new("Customer", Field::from_names(["Id", "Name"]))
//!     .primary(DbField::primary_identity("Id"))
//!     .into();
//! let b: Request = MergeRequest::new("Customer", Field::from_names(["Id", "Name"]))
//!     .primary(DbField::primary_identity("Id"))
//!     .into();
//! assert_eq!(a, b);
//! ```

use crate::field::{DbField, Field, OrderField};
use crate::predicate::QueryGroup;
use std::fmt;

/// `SELECT ... [TOP (n)] ... [WHERE] [ORDER BY]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryRequest {
    pub table: String,
    pub fields: Vec<Field>,
    pub filter: Option<QueryGroup>,
    pub order_by: Vec<OrderField>,
    pub top: Option<usize>,
    pub hints: Option<String>,
}

impl QueryRequest {
    pub fn new(table: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            table: table.into(),
            fields,
            filter: None,
            order_by: Vec::new(),
            top: None,
            hints: None,
        }
    }

    pub fn filter(mut self, filter: QueryGroup) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, order_by: Vec<OrderField>) -> Self {
        self.order_by = order_by;
        self
    }

    /// Limit the number of rows returned.
    pub fn top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    pub fn hints(mut self, hints: impl Into<String>) -> Self {
        self.hints = Some(hints.into());
        self
    }
}

/// `SELECT` of every row of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryAllRequest {
    pub table: String,
    pub fields: Vec<Field>,
    pub order_by: Vec<OrderField>,
    pub hints: Option<String>,
}

impl QueryAllRequest {
    pub fn new(table: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            table: table.into(),
            fields,
            order_by: Vec::new(),
            hints: None,
        }
    }

    pub fn order_by(mut self, order_by: Vec<OrderField>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn hints(mut self, hints: impl Into<String>) -> Self {
        self.hints = Some(hints.into());
        self
    }
}

/// Several queries sent as one text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryMultipleRequest {
    pub queries: Vec<QueryRequest>,
}

impl QueryMultipleRequest {
    pub fn new(queries: Vec<QueryRequest>) -> Self {
        Self { queries }
    }

    /// The filters of all queries merged into one group, in query order.
    ///
    /// Binding the compiled text against this group feeds each query's
    /// predicate placeholders from its own filter.
    pub fn combined_filter(&self) -> QueryGroup {
        QueryGroup::and(
            self.queries
                .iter()
                .filter_map(|q| q.filter.clone())
                .map(Into::into)
                .collect(),
        )
    }
}

/// One page of an ordered query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchQueryRequest {
    pub table: String,
    pub fields: Vec<Field>,
    pub filter: Option<QueryGroup>,
    pub order_by: Vec<OrderField>,
    /// Zero-based page number.
    pub page: usize,
    pub rows_per_batch: usize,
    pub hints: Option<String>,
}

impl BatchQueryRequest {
    pub fn new(
        table: impl Into<String>,
        fields: Vec<Field>,
        order_by: Vec<OrderField>,
        page: usize,
        rows_per_batch: usize,
    ) -> Self {
        Self {
            table: table.into(),
            fields,
            filter: None,
            order_by,
            page,
            rows_per_batch,
            hints: None,
        }
    }

    pub fn filter(mut self, filter: QueryGroup) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn hints(mut self, hints: impl Into<String>) -> Self {
        self.hints = Some(hints.into());
        self
    }
}

/// Single-row INSERT followed by the result selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InsertRequest {
    pub table: String,
    pub fields: Vec<Field>,
    pub primary: Option<DbField>,
    pub identity: Option<DbField>,
    /// Insert the identity column explicitly instead of letting the database
    /// generate it.
    pub include_identity: bool,
    pub hints: Option<String>,
}

impl InsertRequest {
    pub fn new(table: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            table: table.into(),
            fields,
            primary: None,
            identity: None,
            include_identity: false,
            hints: None,
        }
    }

    /// Set the primary field. A primary flagged as identity also becomes the
    /// identity field unless one was set explicitly.
    pub fn primary(mut self, primary: DbField) -> Self {
        if primary.is_identity && self.identity.is_none() {
            self.identity = Some(primary.clone());
        }
        self.primary = Some(primary);
        self
    }

    pub fn identity(mut self, identity: DbField) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn include_identity(mut self, include: bool) -> Self {
        self.include_identity = include;
        self
    }

    pub fn hints(mut self, hints: impl Into<String>) -> Self {
        self.hints = Some(hints.into());
        self
    }

    /// Repeat this insert for `batch_size` rows.
    pub fn batched(self, batch_size: usize) -> InsertAllRequest {
        InsertAllRequest {
            insert: self,
            batch_size,
        }
    }
}

/// Multi-row INSERT: the single-row statement repeated `batch_size` times.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InsertAllRequest {
    pub insert: InsertRequest,
    pub batch_size: usize,
}

/// UPDATE of the rows matched by a filter.
///
/// A primary or identity column that the filter references is a key, not an
/// assignment, and is left out of the SET list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpdateRequest {
    pub table: String,
    pub fields: Vec<Field>,
    pub filter: Option<QueryGroup>,
    pub primary: Option<DbField>,
    pub identity: Option<DbField>,
    pub hints: Option<String>,
}

impl UpdateRequest {
    pub fn new(table: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            table: table.into(),
            fields,
            filter: None,
            primary: None,
            identity: None,
            hints: None,
        }
    }

    pub fn filter(mut self, filter: QueryGroup) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the primary field. A primary flagged as identity also becomes the
    /// identity field unless one was set explicitly.
    pub fn primary(mut self, primary: DbField) -> Self {
        if primary.is_identity && self.identity.is_none() {
            self.identity = Some(primary.clone());
        }
        self.primary = Some(primary);
        self
    }

    pub fn identity(mut self, identity: DbField) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn hints(mut self, hints: impl Into<String>) -> Self {
        self.hints = Some(hints.into());
        self
    }
}

/// Keyed single-row write shared by UpdateAll, Merge and MergeAll.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyedRequest {
    pub table: String,
    pub fields: Vec<Field>,
    pub qualifiers: Vec<Field>,
    pub primary: Option<DbField>,
    pub identity: Option<DbField>,
    pub hints: Option<String>,
}

impl KeyedRequest {
    pub fn new(table: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            table: table.into(),
            fields,
            qualifiers: Vec::new(),
            primary: None,
            identity: None,
            hints: None,
        }
    }

    pub fn qualifiers(mut self, qualifiers: Vec<Field>) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    /// Set the primary field. A primary flagged as identity also becomes the
    /// identity field unless one was set explicitly.
    pub fn primary(mut self, primary: DbField) -> Self {
        if primary.is_identity && self.identity.is_none() {
            self.identity = Some(primary.clone());
        }
        self.primary = Some(primary);
        self
    }

    pub fn identity(mut self, identity: DbField) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn hints(mut self, hints: impl Into<String>) -> Self {
        self.hints = Some(hints.into());
        self
    }

    /// Repeat as a multi-row UPDATE keyed by the qualifiers.
    pub fn update_all(self, batch_size: usize) -> UpdateAllRequest {
        UpdateAllRequest {
            keyed: self,
            batch_size,
        }
    }

    /// Repeat as a multi-row MERGE.
    pub fn merge_all(self, batch_size: usize) -> MergeAllRequest {
        MergeAllRequest {
            merge: self,
            batch_size,
        }
    }
}

/// Single-row MERGE (upsert) keyed by qualifiers.
pub type MergeRequest = KeyedRequest;

/// Multi-row UPDATE keyed by qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpdateAllRequest {
    pub keyed: KeyedRequest,
    pub batch_size: usize,
}

/// Multi-row MERGE (upsert).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeAllRequest {
    pub merge: MergeRequest,
    pub batch_size: usize,
}

/// DELETE of the rows matched by a filter; no filter deletes every row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeleteRequest {
    pub table: String,
    pub filter: Option<QueryGroup>,
    pub hints: Option<String>,
}

impl DeleteRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            hints: None,
        }
    }

    pub fn filter(mut self, filter: QueryGroup) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn hints(mut self, hints: impl Into<String>) -> Self {
        self.hints = Some(hints.into());
        self
    }
}

/// Row count, optionally filtered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountRequest {
    pub table: String,
    pub filter: Option<QueryGroup>,
    pub hints: Option<String>,
}

impl CountRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            hints: None,
        }
    }

    pub fn filter(mut self, filter: QueryGroup) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn hints(mut self, hints: impl Into<String>) -> Self {
        self.hints = Some(hints.into());
        self
    }
}

/// Aggregate function applied by [`AggregateRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Max,
    Min,
    Average,
    Sum,
}

impl AggregateKind {
    pub fn function(self) -> &'static str {
        match self {
            AggregateKind::Max => "MAX",
            AggregateKind::Min => "MIN",
            AggregateKind::Average => "AVG",
            AggregateKind::Sum => "SUM",
        }
    }

    /// Result column alias.
    pub fn alias(self) -> &'static str {
        match self {
            AggregateKind::Max => "MaxValue",
            AggregateKind::Min => "MinValue",
            AggregateKind::Average => "AverageValue",
            AggregateKind::Sum => "SumValue",
        }
    }
}

/// `MAX/MIN/AVG/SUM` of one field; without a filter this is the "All" form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateRequest {
    pub kind: AggregateKind,
    pub table: String,
    pub field: Field,
    pub filter: Option<QueryGroup>,
    pub hints: Option<String>,
}

impl AggregateRequest {
    pub fn new(kind: AggregateKind, table: impl Into<String>, field: impl Into<Field>) -> Self {
        Self {
            kind,
            table: table.into(),
            field: field.into(),
            filter: None,
            hints: None,
        }
    }

    pub fn filter(mut self, filter: QueryGroup) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn hints(mut self, hints: impl Into<String>) -> Self {
        self.hints = Some(hints.into());
        self
    }
}

/// One variant per compiled operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Request {
    Query(QueryRequest),
    QueryAll(QueryAllRequest),
    QueryMultiple(QueryMultipleRequest),
    BatchQuery(BatchQueryRequest),
    Insert(InsertRequest),
    InsertAll(InsertAllRequest),
    Update(UpdateRequest),
    UpdateAll(UpdateAllRequest),
    Delete(DeleteRequest),
    /// `DELETE FROM [T] ;`
    DeleteAll { table: String, hints: Option<String> },
    Merge(MergeRequest),
    MergeAll(MergeAllRequest),
    Truncate { table: String },
    Count(CountRequest),
    /// `Count` without a filter.
    CountAll { table: String, hints: Option<String> },
    Aggregate(AggregateRequest),
    /// `SELECT 1` probe for a matching row.
    Exists(CountRequest),
}

impl Request {
    pub fn delete_all(table: impl Into<String>) -> Self {
        Request::DeleteAll {
            table: table.into(),
            hints: None,
        }
    }

    pub fn truncate(table: impl Into<String>) -> Self {
        Request::Truncate {
            table: table.into(),
        }
    }

    pub fn count_all(table: impl Into<String>) -> Self {
        Request::CountAll {
            table: table.into(),
            hints: None,
        }
    }

    /// Operation name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Query(_) => "Query",
            Request::QueryAll(_) => "QueryAll",
            Request::QueryMultiple(_) => "QueryMultiple",
            Request::BatchQuery(_) => "BatchQuery",
            Request::Insert(_) => "Insert",
            Request::InsertAll(_) => "InsertAll",
            Request::Update(_) => "Update",
            Request::UpdateAll(_) => "UpdateAll",
            Request::Delete(_) => "Delete",
            Request::DeleteAll { .. } => "DeleteAll",
            Request::Merge(_) => "Merge",
            Request::MergeAll(_) => "MergeAll",
            Request::Truncate { .. } => "Truncate",
            Request::Count(_) => "Count",
            Request::CountAll { .. } => "CountAll",
            Request::Aggregate(_) => "Aggregate",
            Request::Exists(_) => "Exists",
        }
    }

    /// Target table; the first query's table for `QueryMultiple`.
    pub fn table(&self) -> &str {
        match self {
            Request::Query(r) => &r.table,
            Request::QueryAll(r) => &r.table,
            Request::QueryMultiple(r) => r.queries.first().map_or("", |q| q.table.as_str()),
            Request::BatchQuery(r) => &r.table,
            Request::Insert(r) => &r.table,
            Request::InsertAll(r) => &r.insert.table,
            Request::Update(r) => &r.table,
            Request::UpdateAll(r) => &r.keyed.table,
            Request::Delete(r) => &r.table,
            Request::DeleteAll { table, .. } => table,
            Request::Merge(r) => &r.table,
            Request::MergeAll(r) => &r.merge.table,
            Request::Truncate { table } => table,
            Request::Count(r) => &r.table,
            Request::CountAll { table, .. } => table,
            Request::Aggregate(r) => &r.table,
            Request::Exists(r) => &r.table,
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.table())
    }
}

macro_rules! impl_from_request {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Request {
                fn from(request: $ty) -> Self {
                    Request::$variant(request)
                }
            }
        )*
    };
}

impl_from_request!(
    QueryRequest => Query,
    QueryAllRequest => QueryAll,
    QueryMultipleRequest => QueryMultiple,
    BatchQueryRequest => BatchQuery,
    InsertRequest => Insert,
    InsertAllRequest => InsertAll,
    UpdateRequest => Update,
    UpdateAllRequest => UpdateAll,
    DeleteRequest => Delete,
    MergeRequest => Merge,
    MergeAllRequest => MergeAll,
    CountRequest => Count,
    AggregateRequest => Aggregate,
);
