//! High-level operations over a schema provider, a compiler and an executor.
//!
//! Each operation looks up the table's columns, builds the request from the
//! columns present in the supplied records, compiles it through the shared
//! [`Compiler`] (and its structural cache), binds the record values and hands
//! the text to the [`Executor`].
//!
//! Multi-row writes (`insert_all`, `update_all`, `merge_all`) are sent in
//! chunks of [`SessionConfig::batch_size`] rows, one multi-statement text per
//! chunk. A short final chunk compiles its own, smaller batch.

use crate::compiler::Compiler;
use crate::config::SessionConfig;
use crate::error::{DbError, DbResult};
use crate::executor::Executor;
use crate::field::{DbFields, Field, OrderField};
use crate::predicate::QueryGroup;
use crate::query_builder::CommandText;
use crate::request::{
    AggregateKind, AggregateRequest, BatchQueryRequest, CountRequest, DeleteRequest,
    InsertRequest, KeyedRequest, QueryAllRequest, QueryMultipleRequest, QueryRequest, Request,
    UpdateRequest,
};
use crate::schema::{DbFieldCache, SchemaProvider};
use crate::value::{Record, Value};
use std::sync::Arc;

/// Entry point for record-level database operations.
#[derive(Debug)]
pub struct Session<E, P> {
    executor: E,
    schema: DbFieldCache<P>,
    compiler: Arc<Compiler>,
    config: SessionConfig,
}

impl<E: Executor, P: SchemaProvider> Session<E, P> {
    pub fn new(executor: E, schema: P, compiler: Arc<Compiler>) -> Self {
        Self {
            executor,
            schema: DbFieldCache::new(schema),
            compiler,
            config: SessionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn schema(&self) -> &DbFieldCache<P> {
        &self.schema
    }

    /// Insert one row; returns the generated identity, the echoed primary
    /// value or null.
    pub async fn insert(&self, table: &str, record: &Record) -> DbResult<Value> {
        let columns = self.schema.get(table)?;
        let request: Request = self.insert_request(&columns, record).into();
        let (cmd, params) = self.bind(&request, std::slice::from_ref(record), None)?;
        self.executor.scalar(&cmd.text, &params).await
    }

    /// Insert many rows in batches; returns the affected row count.
    pub async fn insert_all(&self, table: &str, records: &[Record]) -> DbResult<u64> {
        let Some(first) = records.first() else {
            return Ok(0);
        };
        let columns = self.schema.get(table)?;
        let insert = self.insert_request(&columns, first);

        let mut affected = 0;
        for chunk in records.chunks(self.batch_size()?) {
            let request: Request = insert.clone().batched(chunk.len()).into();
            let (cmd, params) = self.bind(&request, chunk, None)?;
            affected += self.executor.execute(&cmd.text, &params).await?;
        }
        Ok(affected)
    }

    /// Update the columns present in `record` on every row matching `filter`.
    pub async fn update(&self, table: &str, record: &Record, filter: QueryGroup) -> DbResult<u64> {
        let columns = self.schema.get(table)?;
        let fields = columns.intersect(record.names());
        let mut request = UpdateRequest::new(columns.table(), fields).filter(filter.clone());
        request.primary = columns.primary().cloned();
        request.identity = columns.identity().cloned();
        let (cmd, params) = self.bind(&request.into(), std::slice::from_ref(record), Some(&filter))?;
        self.executor.execute(&cmd.text, &params).await
    }

    /// Update many rows matched on `qualifiers` (the primary key when empty).
    pub async fn update_all(&self, table: &str, records: &[Record], qualifiers: &[Field]) -> DbResult<u64> {
        let Some(first) = records.first() else {
            return Ok(0);
        };
        let keyed = self.keyed_request(table, first, qualifiers)?;

        let mut affected = 0;
        for chunk in records.chunks(self.batch_size()?) {
            let request: Request = keyed.clone().update_all(chunk.len()).into();
            let (cmd, params) = self.bind(&request, chunk, None)?;
            affected += self.executor.execute(&cmd.text, &params).await?;
        }
        Ok(affected)
    }

    /// Insert or update one row matched on `qualifiers` (the primary key when
    /// empty).
    pub async fn merge(&self, table: &str, record: &Record, qualifiers: &[Field]) -> DbResult<u64> {
        let request: Request = self.keyed_request(table, record, qualifiers)?.into();
        let (cmd, params) = self.bind(&request, std::slice::from_ref(record), None)?;
        self.executor.execute(&cmd.text, &params).await
    }

    /// Insert or update many rows in batches.
    pub async fn merge_all(&self, table: &str, records: &[Record], qualifiers: &[Field]) -> DbResult<u64> {
        let Some(first) = records.first() else {
            return Ok(0);
        };
        let keyed = self.keyed_request(table, first, qualifiers)?;

        let mut affected = 0;
        for chunk in records.chunks(self.batch_size()?) {
            let request: Request = keyed.clone().merge_all(chunk.len()).into();
            let (cmd, params) = self.bind(&request, chunk, None)?;
            affected += self.executor.execute(&cmd.text, &params).await?;
        }
        Ok(affected)
    }

    pub async fn delete(&self, table: &str, filter: QueryGroup) -> DbResult<u64> {
        let request: Request = DeleteRequest::new(table).filter(filter.clone()).into();
        let (cmd, params) = self.bind(&request, &[], Some(&filter))?;
        self.executor.execute(&cmd.text, &params).await
    }

    pub async fn delete_all(&self, table: &str) -> DbResult<u64> {
        let (cmd, params) = self.bind(&Request::delete_all(table), &[], None)?;
        self.executor.execute(&cmd.text, &params).await
    }

    pub async fn truncate(&self, table: &str) -> DbResult<u64> {
        let (cmd, params) = self.bind(&Request::truncate(table), &[], None)?;
        self.executor.execute(&cmd.text, &params).await
    }

    /// Rows matching `filter`, all columns, optionally ordered and limited.
    pub async fn query(
        &self,
        table: &str,
        filter: Option<QueryGroup>,
        order_by: Vec<OrderField>,
        top: Option<usize>,
    ) -> DbResult<Vec<Record>> {
        let columns = self.schema.get(table)?;
        let mut request = QueryRequest::new(columns.table(), columns.as_fields()).order_by(order_by);
        request.filter = filter.clone();
        request.top = top;
        let (cmd, params) = self.bind(&request.into(), &[], filter.as_ref())?;
        self.executor.query(&cmd.text, &params).await
    }

    pub async fn query_all(&self, table: &str, order_by: Vec<OrderField>) -> DbResult<Vec<Record>> {
        let columns = self.schema.get(table)?;
        let request: Request = QueryAllRequest::new(columns.table(), columns.as_fields())
            .order_by(order_by)
            .into();
        let (cmd, params) = self.bind(&request, &[], None)?;
        self.executor.query(&cmd.text, &params).await
    }

    /// Several queries in one round trip; one row set per query.
    ///
    /// A query with no fields selects every column of its table.
    pub async fn query_multiple(&self, queries: Vec<QueryRequest>) -> DbResult<Vec<Vec<Record>>> {
        let mut resolved = Vec::with_capacity(queries.len());
        for mut query in queries {
            if query.fields.is_empty() {
                query.fields = self.schema.get(&query.table)?.as_fields();
            }
            resolved.push(query);
        }
        let request = QueryMultipleRequest::new(resolved);
        let filter = request.combined_filter();
        let (cmd, params) = self.bind(&request.into(), &[], Some(&filter))?;
        self.executor.query_multiple(&cmd.text, &params).await
    }

    /// One page (zero-based) of rows in `order_by` order.
    pub async fn batch_query(
        &self,
        table: &str,
        page: usize,
        rows_per_batch: usize,
        order_by: Vec<OrderField>,
        filter: Option<QueryGroup>,
    ) -> DbResult<Vec<Record>> {
        let columns = self.schema.get(table)?;
        let mut request =
            BatchQueryRequest::new(columns.table(), columns.as_fields(), order_by, page, rows_per_batch);
        request.filter = filter.clone();
        let (cmd, params) = self.bind(&request.into(), &[], filter.as_ref())?;
        self.executor.query(&cmd.text, &params).await
    }

    pub async fn count(&self, table: &str, filter: Option<QueryGroup>) -> DbResult<i64> {
        let request = match &filter {
            Some(f) => Request::Count(CountRequest::new(table).filter(f.clone())),
            None => Request::count_all(table),
        };
        let (cmd, params) = self.bind(&request, &[], filter.as_ref())?;
        match self.executor.scalar(&cmd.text, &params).await? {
            Value::Int(n) => Ok(n),
            Value::Null => Ok(0),
            other => Err(DbError::execution(format!(
                "COUNT returned a non-integer value: {other:?}"
            ))),
        }
    }

    pub async fn exists(&self, table: &str, filter: Option<QueryGroup>) -> DbResult<bool> {
        let mut request = CountRequest::new(table);
        request.filter = filter.clone();
        let (cmd, params) = self.bind(&Request::Exists(request), &[], filter.as_ref())?;
        let rows = self.executor.query(&cmd.text, &params).await?;
        Ok(!rows.is_empty())
    }

    /// `MAX/MIN/AVG/SUM` of one column; null when no row matches.
    pub async fn aggregate(
        &self,
        kind: AggregateKind,
        table: &str,
        field: impl Into<Field>,
        filter: Option<QueryGroup>,
    ) -> DbResult<Value> {
        let mut request = AggregateRequest::new(kind, table, field);
        request.filter = filter.clone();
        let (cmd, params) = self.bind(&request.into(), &[], filter.as_ref())?;
        self.executor.scalar(&cmd.text, &params).await
    }

    fn batch_size(&self) -> DbResult<usize> {
        match self.config.batch_size {
            0 => Err(DbError::InvalidArgument {
                name: "batch_size",
                value: "0".to_string(),
            }),
            n => Ok(n),
        }
    }

    fn insert_request(&self, columns: &DbFields, record: &Record) -> InsertRequest {
        let mut request = InsertRequest::new(columns.table(), columns.intersect(record.names()));
        request.primary = columns.primary().cloned();
        request.identity = columns.identity().cloned();
        request
    }

    fn keyed_request(&self, table: &str, record: &Record, qualifiers: &[Field]) -> DbResult<KeyedRequest> {
        let columns = self.schema.get(table)?;
        let mut request = KeyedRequest::new(columns.table(), columns.intersect(record.names()))
            .qualifiers(qualifiers.to_vec());
        request.primary = columns.primary().cloned();
        request.identity = columns.identity().cloned();
        Ok(request)
    }

    /// Compile `request` and bind its placeholders.
    fn bind(
        &self,
        request: &Request,
        rows: &[Record],
        filter: Option<&QueryGroup>,
    ) -> DbResult<(Arc<CommandText>, Vec<(String, Value)>)> {
        let cmd = self.compiler.compile(request)?;
        let params = cmd.bind(rows, filter)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "dbkit.sql",
            operation = request.kind(),
            table = request.table(),
            rows = rows.len(),
            param_count = params.len(),
            sql = %cmd.text,
            "executing statement"
        );

        Ok((cmd, params))
    }
}
