//! Predicate trees for WHERE clauses.
//!
//! A [`QueryGroup`] is an AND/OR node over an ordered sequence of
//! [`QueryField`] leaves and nested groups. Groups are produced by the caller
//! (or a predicate translator) and handed to the compiler as-is.
//!
//! Structural equality and hashing ignore bound values: two predicates on the
//! same field with the same operation and the same value *shape* (NULL,
//! scalar, or a list of `n` items) compile to identical SQL text and share one
//! cache entry.
//!
//! # Example
//! ```
//! use dbkit::{QueryField, QueryGroup};
//!
//! let filter = QueryGroup::and(vec![
//!     QueryField::eq("Status", "active").into(),
//!     QueryGroup::or(vec![
//!         QueryField::gt("Age", 18).into(),
//!         QueryField::is_null("Age").into(),
//!     ])
//!     .into(),
//! ]);
//! assert_eq!(filter.values().len(), 2);
//! ```

use crate::error::{DbError, DbResult};
use crate::field::Field;
use crate::value::{Record, Value};
use std::hash::{Hash, Hasher};

/// Comparison operation of a [`QueryField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Like,
    NotLike,
    Between,
    NotBetween,
    In,
    NotIn,
}

impl Operation {
    /// SQL operator text.
    pub fn as_sql(self) -> &'static str {
        match self {
            Operation::Equal => "=",
            Operation::NotEqual => "<>",
            Operation::LessThan => "<",
            Operation::LessThanOrEqual => "<=",
            Operation::GreaterThan => ">",
            Operation::GreaterThanOrEqual => ">=",
            Operation::Like => "LIKE",
            Operation::NotLike => "NOT LIKE",
            Operation::Between => "BETWEEN",
            Operation::NotBetween => "NOT BETWEEN",
            Operation::In => "IN",
            Operation::NotIn => "NOT IN",
        }
    }
}

/// Boolean connective of a [`QueryGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// Shape of a bound value, the only part of a value that affects SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ValueShape {
    Null,
    Scalar,
    List(usize),
}

/// A single `column <op> value` predicate.
#[derive(Debug, Clone)]
pub struct QueryField {
    pub field: Field,
    pub operation: Operation,
    pub value: Value,
}

impl QueryField {
    /// Create a predicate.
    pub fn new(field: impl Into<Field>, operation: Operation, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operation,
            value: value.into(),
        }
    }

    /// column = value (`IS NULL` when value is NULL)
    pub fn eq(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, Operation::Equal, value)
    }

    /// column <> value (`IS NOT NULL` when value is NULL)
    pub fn ne(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, Operation::NotEqual, value)
    }

    pub fn lt(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, Operation::LessThan, value)
    }

    pub fn lte(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, Operation::LessThanOrEqual, value)
    }

    pub fn gt(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, Operation::GreaterThan, value)
    }

    pub fn gte(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, Operation::GreaterThanOrEqual, value)
    }

    pub fn like(field: impl Into<Field>, pattern: impl Into<Value>) -> Self {
        Self::new(field, Operation::Like, pattern)
    }

    pub fn not_like(field: impl Into<Field>, pattern: impl Into<Value>) -> Self {
        Self::new(field, Operation::NotLike, pattern)
    }

    pub fn is_null(field: impl Into<Field>) -> Self {
        Self::new(field, Operation::Equal, Value::Null)
    }

    pub fn is_not_null(field: impl Into<Field>) -> Self {
        Self::new(field, Operation::NotEqual, Value::Null)
    }

    /// column BETWEEN from AND to
    pub fn between(field: impl Into<Field>, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self::new(
            field,
            Operation::Between,
            Value::List(vec![from.into(), to.into()]),
        )
    }

    pub fn not_between(
        field: impl Into<Field>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Self::new(
            field,
            Operation::NotBetween,
            Value::List(vec![from.into(), to.into()]),
        )
    }

    /// column IN (values...)
    pub fn in_list<T: Into<Value>>(field: impl Into<Field>, values: impl IntoIterator<Item = T>) -> Self {
        Self::new(field, Operation::In, Value::list(values))
    }

    /// column NOT IN (values...)
    pub fn not_in<T: Into<Value>>(field: impl Into<Field>, values: impl IntoIterator<Item = T>) -> Self {
        Self::new(field, Operation::NotIn, Value::list(values))
    }

    pub(crate) fn shape(&self) -> ValueShape {
        match &self.value {
            Value::Null => ValueShape::Null,
            Value::List(items) => ValueShape::List(items.len()),
            _ => ValueShape::Scalar,
        }
    }

    /// Values bound by this predicate, in placeholder order.
    pub fn bound_values(&self) -> Vec<&Value> {
        match self.operation {
            Operation::Equal | Operation::NotEqual if self.value.is_null() => Vec::new(),
            Operation::In | Operation::NotIn | Operation::Between | Operation::NotBetween => {
                self.value.as_list().iter().collect()
            }
            _ => vec![&self.value],
        }
    }
}

impl PartialEq for QueryField {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
            && self.operation == other.operation
            && self.shape() == other.shape()
    }
}

impl Eq for QueryField {}

impl Hash for QueryField {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.field.hash(state);
        self.operation.hash(state);
        self.shape().hash(state);
    }
}

/// A child of a [`QueryGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryItem {
    Field(QueryField),
    Group(QueryGroup),
}

impl From<QueryField> for QueryItem {
    fn from(field: QueryField) -> Self {
        QueryItem::Field(field)
    }
}

impl From<QueryGroup> for QueryItem {
    fn from(group: QueryGroup) -> Self {
        QueryItem::Group(group)
    }
}

/// An AND/OR predicate tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QueryGroup {
    pub conjunction: Conjunction,
    pub is_not: bool,
    pub items: Vec<QueryItem>,
}

impl QueryGroup {
    /// Create an empty AND group (renders no WHERE clause).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(items: Vec<QueryItem>) -> Self {
        Self {
            conjunction: Conjunction::And,
            is_not: false,
            items,
        }
    }

    pub fn or(items: Vec<QueryItem>) -> Self {
        Self {
            conjunction: Conjunction::Or,
            is_not: false,
            items,
        }
    }

    /// AND group over plain predicates.
    pub fn from_fields(fields: impl IntoIterator<Item = QueryField>) -> Self {
        Self::and(fields.into_iter().map(QueryItem::Field).collect())
    }

    /// Equality predicates for every entry of a record, in record order.
    pub fn from_record(record: &Record) -> Self {
        Self::from_fields(
            record
                .iter()
                .map(|(name, value)| QueryField::eq(name, value.clone())),
        )
    }

    /// Negate this group.
    pub fn not(mut self) -> Self {
        self.is_not = !self.is_not;
        self
    }

    /// Append a child predicate or group.
    pub fn push(&mut self, item: impl Into<QueryItem>) -> &mut Self {
        self.items.push(item.into());
        self
    }

    /// Append a child (consuming version).
    pub fn with(mut self, item: impl Into<QueryItem>) -> Self {
        self.items.push(item.into());
        self
    }

    /// Check if the tree holds no predicate at any depth.
    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|item| match item {
            QueryItem::Field(_) => false,
            QueryItem::Group(g) => g.is_empty(),
        })
    }

    /// Every leaf predicate, depth-first in declaration order.
    pub fn query_fields(&self) -> Vec<&QueryField> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a QueryField>) {
        for item in &self.items {
            match item {
                QueryItem::Field(f) => out.push(f),
                QueryItem::Group(g) => g.collect_fields(out),
            }
        }
    }

    /// Reject malformed leaves (BETWEEN needs exactly two bounds).
    pub fn validate(&self) -> DbResult<()> {
        for field in self.query_fields() {
            let is_range = matches!(field.operation, Operation::Between | Operation::NotBetween);
            if is_range && field.shape() != ValueShape::List(2) {
                return Err(DbError::InvalidPredicate {
                    field: field.field.name.clone(),
                    message: format!("{} requires exactly two values", field.operation.as_sql()),
                });
            }
        }
        Ok(())
    }

    /// Every bound value, flattened in placeholder order.
    pub fn values(&self) -> Vec<&Value> {
        self.query_fields()
            .into_iter()
            .flat_map(QueryField::bound_values)
            .collect()
    }
}

impl From<QueryField> for QueryGroup {
    fn from(field: QueryField) -> Self {
        QueryGroup::from_fields([field])
    }
}
