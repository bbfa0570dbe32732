//! Token assembler used by the statement builders.
//!
//! `QueryBuilder` appends SQL tokens separated by exactly one space and records
//! every placeholder it renders. Placeholder names are computed while building,
//! never patched into the text afterwards, so the text and the parameter list
//! cannot drift apart.
//!
//! # Example
//!
//! ```
//! use dbkit::{Field, QueryBuilder, Quoting};
//!
//! let fields = Field::from_names(["Id", "Name"]);
//! let mut q = QueryBuilder::new(Quoting::SQUARE_BRACKET, '@');
//! q.select_clause(&fields).from_clause("dbo.Customer").end();
//! assert_eq!(q.text(), "SELECT [Id], [Name] FROM [dbo].[Customer] ;");
//! ```

use crate::error::{DbError, DbResult};
use crate::field::{Field, OrderField};
use crate::ident::{Quoting, parameter_name};
use crate::predicate::{Operation, QueryField, QueryGroup, QueryItem};
use crate::value::{Record, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Where the value of a placeholder comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterSource {
    /// Column `field` of row `row` of the supplied records.
    Field { field: String, row: usize },
    /// The `index`-th value of the flattened predicate tree.
    Predicate { index: usize },
}

/// A named placeholder in compiled text (name is without the prefix character).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub name: String,
    pub source: ParameterSource,
}

/// Compiled statement text plus the placeholders it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandText {
    pub text: String,
    pub parameters: Vec<Parameter>,
}

impl CommandText {
    /// Placeholder names in first-appearance order.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// Resolve every placeholder to a value.
    ///
    /// `rows[k]` feeds placeholders of batch repetition `k`; `filter` feeds
    /// predicate placeholders and must have the same shape as the compiled
    /// request's filter.
    pub fn bind(&self, rows: &[Record], filter: Option<&QueryGroup>) -> DbResult<Vec<(String, Value)>> {
        let predicate_values = filter.map(QueryGroup::values).unwrap_or_default();
        self.parameters
            .iter()
            .map(|p| {
                let value = match &p.source {
                    ParameterSource::Field { field, row } => {
                        rows.get(*row).and_then(|r| r.get(field))
                    }
                    ParameterSource::Predicate { index } => predicate_values.get(*index).copied(),
                };
                value
                    .cloned()
                    .map(|v| (p.name.clone(), v))
                    .ok_or_else(|| DbError::MissingParameter {
                        name: p.name.clone(),
                    })
            })
            .collect()
    }
}

impl fmt::Display for CommandText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Dialect-agnostic SQL token assembler.
#[must_use]
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    quoting: Quoting,
    prefix: char,
    batch_index: usize,
    buffer: String,
    parameters: Vec<Parameter>,
    seen: HashSet<String>,
    row_names: HashMap<(String, usize), String>,
    predicate_names: HashSet<String>,
    predicate_index: usize,
}

impl QueryBuilder {
    /// Create an empty builder for a quote style and parameter prefix.
    pub fn new(quoting: Quoting, prefix: char) -> Self {
        Self {
            quoting,
            prefix,
            batch_index: 0,
            buffer: String::new(),
            parameters: Vec::new(),
            seen: HashSet::new(),
            row_names: HashMap::new(),
            predicate_names: HashSet::new(),
            predicate_index: 0,
        }
    }

    /// Render row placeholders for batch repetition `index` (`@Name_index`).
    ///
    /// Repetition 0 is unsuffixed.
    pub fn with_batch_index(mut self, index: usize) -> Self {
        self.batch_index = index;
        self
    }

    /// Switch the batch repetition for subsequently rendered placeholders.
    pub fn set_batch_index(&mut self, index: usize) -> &mut Self {
        self.batch_index = index;
        self
    }

    pub fn batch_index(&self) -> usize {
        self.batch_index
    }

    pub fn quoting(&self) -> Quoting {
        self.quoting
    }

    /// Text assembled so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Reset to an empty buffer, keeping quote style and batch index.
    pub fn clear(&mut self) -> &mut Self {
        self.buffer.clear();
        self.parameters.clear();
        self.seen.clear();
        self.row_names.clear();
        self.predicate_names.clear();
        self.predicate_index = 0;
        self
    }

    /// Finish building.
    pub fn build(self) -> CommandText {
        CommandText {
            text: self.buffer,
            parameters: self.parameters,
        }
    }

    /// Append one token, separated from the previous token by a single space.
    pub fn push(&mut self, token: &str) -> &mut Self {
        if token.is_empty() {
            return self;
        }
        if !self.buffer.is_empty() {
            self.buffer.push(' ');
        }
        self.buffer.push_str(token);
        self
    }

    /// Append the statement terminator.
    pub fn end(&mut self) -> &mut Self {
        self.push(";")
    }

    pub fn open_paren(&mut self) -> &mut Self {
        self.push("(")
    }

    pub fn close_paren(&mut self) -> &mut Self {
        self.push(")")
    }

    /// Quote an identifier in this builder's style.
    pub fn quote(&self, name: &str) -> String {
        self.quoting.quote(name)
    }

    /// Append a quoted identifier.
    pub fn push_ident(&mut self, name: &str) -> &mut Self {
        let quoted = self.quote(name);
        self.push(&quoted)
    }

    /// `[A], [B], ...`
    pub fn field_list(&self, fields: &[Field]) -> String {
        self.join_fields(fields, |q, f| q.quote(&f.name))
    }

    /// `[A], [B], ...` appended as one token.
    pub fn push_fields(&mut self, fields: &[Field]) -> &mut Self {
        let list = self.field_list(fields);
        self.push(&list)
    }

    /// Render (and record) the row placeholder of `field`.
    ///
    /// The same column of the same row always renders the same placeholder.
    /// Columns whose sanitized names coincide (`A B` and `A_B`) get a numeric
    /// suffix so every placeholder keeps a single source.
    pub fn row_parameter(&mut self, field: &Field) -> String {
        let key = (field.name.clone(), self.batch_index);
        if let Some(name) = self.row_names.get(&key) {
            return format!("{}{}", self.prefix, name);
        }

        let mut base = parameter_name(&field.name);
        if self.batch_index > 0 {
            base.push('_');
            base.push_str(&self.batch_index.to_string());
        }
        let name = self.unused_name(&base, |_| true);
        self.record(
            name.clone(),
            ParameterSource::Field {
                field: field.name.clone(),
                row: self.batch_index,
            },
        );
        self.row_names.insert(key, name.clone());
        format!("{}{}", self.prefix, name)
    }

    /// `@A, @B, ...`
    pub fn parameter_list(&mut self, fields: &[Field]) -> String {
        fields
            .iter()
            .map(|f| self.row_parameter(f))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `SELECT [A], [B]`
    pub fn select_clause(&mut self, fields: &[Field]) -> &mut Self {
        self.push("SELECT").push_fields(fields)
    }

    /// `FROM [Table]`
    pub fn from_clause(&mut self, table: &str) -> &mut Self {
        self.push("FROM").push_ident(table)
    }

    /// Append table hints verbatim (e.g. `WITH (NOLOCK)`).
    pub fn hints(&mut self, hints: Option<&str>) -> &mut Self {
        match hints.map(str::trim) {
            Some(h) if !h.is_empty() => self.push(h),
            _ => self,
        }
    }

    /// `WHERE (...)`; nothing when the group holds no predicate.
    ///
    /// `prefix` is prepended to every predicate placeholder name (`_` keeps
    /// them distinct from SET placeholders in UPDATE statements).
    ///
    /// Predicate indexes and names continue across calls on the same builder,
    /// so several filtered statements in one text bind against the
    /// concatenation of their filters' values.
    pub fn where_clause(&mut self, group: Option<&QueryGroup>, prefix: &str) -> DbResult<&mut Self> {
        let Some(group) = group.filter(|g| !g.is_empty()) else {
            return Ok(self);
        };
        group.validate()?;
        let mut names = std::mem::take(&mut self.predicate_names);
        let mut index = self.predicate_index;
        let rendered = self.render_group(group, prefix, &mut names, &mut index);
        self.predicate_names = names;
        self.predicate_index = index;
        Ok(self.push("WHERE").push(&rendered))
    }

    /// `ORDER BY [A] ASC, [B] DESC`; nothing when empty.
    pub fn order_by_clause(&mut self, orders: &[OrderField]) -> &mut Self {
        if orders.is_empty() {
            return self;
        }
        let list = self.order_list(orders);
        self.push("ORDER BY").push(&list)
    }

    /// `[A] ASC, [B] DESC`
    pub fn order_list(&self, orders: &[OrderField]) -> String {
        orders
            .iter()
            .map(|o| format!("{} {}", self.quote(&o.name), o.direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `SET [A] = @A, [B] = @B`
    pub fn set_clause(&mut self, fields: &[Field]) -> &mut Self {
        let assignments = fields
            .iter()
            .map(|f| {
                let column = self.quote(&f.name);
                let param = self.row_parameter(f);
                format!("{column} = {param}")
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.push("SET").push(&assignments)
    }

    /// `INSERT INTO [Table] ( [A], [B] )`
    pub fn insert_clause(&mut self, table: &str, fields: &[Field]) -> &mut Self {
        self.push("INSERT INTO")
            .push_ident(table)
            .open_paren()
            .push_fields(fields)
            .close_paren()
    }

    /// `VALUES ( @A, @B )`
    pub fn values_clause(&mut self, fields: &[Field]) -> &mut Self {
        let params = self.parameter_list(fields);
        self.push("VALUES").open_paren().push(&params).close_paren()
    }

    fn join_fields(&self, fields: &[Field], render: impl Fn(&Self, &Field) -> String) -> String {
        fields
            .iter()
            .map(|f| render(self, f))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `base`, else the first `base_n` that no recorded placeholder uses and
    /// `free` accepts.
    fn unused_name(&self, base: &str, free: impl Fn(&str) -> bool) -> String {
        let mut n = 0;
        loop {
            let candidate = if n == 0 {
                base.to_string()
            } else {
                format!("{base}_{n}")
            };
            if !self.seen.contains(&candidate) && free(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn record(&mut self, name: String, source: ParameterSource) {
        if self.seen.insert(name.clone()) {
            self.parameters.push(Parameter { name, source });
        }
    }

    fn render_group(
        &mut self,
        group: &QueryGroup,
        prefix: &str,
        names: &mut HashSet<String>,
        index: &mut usize,
    ) -> String {
        let mut parts = Vec::with_capacity(group.items.len());
        for item in &group.items {
            match item {
                QueryItem::Field(field) => parts.push(self.render_field(field, prefix, names, index)),
                QueryItem::Group(child) if !child.is_empty() => {
                    parts.push(self.render_group(child, prefix, names, index));
                }
                QueryItem::Group(_) => {}
            }
        }
        let sep = format!(" {} ", group.conjunction.as_sql());
        let body = format!("({})", parts.join(&sep));
        if group.is_not {
            format!("NOT {body}")
        } else {
            body
        }
    }

    fn render_field(
        &mut self,
        field: &QueryField,
        prefix: &str,
        names: &mut HashSet<String>,
        index: &mut usize,
    ) -> String {
        let column = self.quote(&field.field.name);
        let base = format!("{prefix}{}", parameter_name(&field.field.name));
        let op = field.operation;

        match op {
            Operation::Equal if field.value.is_null() => format!("{column} IS NULL"),
            Operation::NotEqual if field.value.is_null() => format!("{column} IS NOT NULL"),
            Operation::In | Operation::NotIn => {
                let count = field.value.as_list().len();
                if count == 0 {
                    return if op == Operation::In { "1 = 0" } else { "1 = 1" }.to_string();
                }
                let params = (0..count)
                    .map(|i| self.predicate_parameter(&format!("{base}_In_{i}"), names, index))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{column} {} ({params})", op.as_sql())
            }
            Operation::Between | Operation::NotBetween => {
                let left = self.predicate_parameter(&format!("{base}_Left"), names, index);
                let right = self.predicate_parameter(&format!("{base}_Right"), names, index);
                format!("{column} {} {left} AND {right}", op.as_sql())
            }
            _ => {
                let param = self.predicate_parameter(&base, names, index);
                format!("{column} {} {param}", op.as_sql())
            }
        }
    }

    fn predicate_parameter(&mut self, base: &str, names: &mut HashSet<String>, index: &mut usize) -> String {
        let name = self.unused_name(base, |candidate| !names.contains(candidate));
        names.insert(name.clone());
        self.record(name.clone(), ParameterSource::Predicate { index: *index });
        *index += 1;
        format!("{}{}", self.prefix, name)
    }
}

#[cfg(test)]
mod tests;
