//! Schema metadata providers.
//!
//! The compiler never inspects types; column metadata comes from a
//! [`SchemaProvider`]. [`DbFieldCache`] memoizes a provider per table, and
//! [`StaticSchema`] is an in-memory provider that can be loaded from JSON:
//!
//! ```json
//! {
//!   "tables": {
//!     "Customer": [
//!       { "name": "Id", "is_primary": true, "is_identity": true, "is_nullable": false },
//!       { "name": "Name", "type_name": "NVARCHAR", "size": 128 }
//!     ]
//!   }
//! }
//! ```

use crate::error::{DbError, DbResult};
use crate::field::{DbField, DbFields};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Supplies column metadata for a table.
pub trait SchemaProvider: Send + Sync {
    /// Columns of `table` in declaration order.
    ///
    /// Returns [`DbError::UnknownTable`] when the table does not exist.
    fn db_fields(&self, table: &str) -> DbResult<Vec<DbField>>;
}

impl<P: SchemaProvider + ?Sized> SchemaProvider for Arc<P> {
    fn db_fields(&self, table: &str) -> DbResult<Vec<DbField>> {
        (**self).db_fields(table)
    }
}

/// Per-table memoization of a [`SchemaProvider`], validated into [`DbFields`].
#[derive(Debug)]
pub struct DbFieldCache<P> {
    provider: P,
    tables: RwLock<HashMap<String, Arc<DbFields>>>,
}

impl<P: SchemaProvider> DbFieldCache<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Validated columns of `table`, asking the provider only once per table.
    pub fn get(&self, table: &str) -> DbResult<Arc<DbFields>> {
        if let Some(fields) = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
        {
            return Ok(Arc::clone(fields));
        }

        let fields = Arc::new(DbFields::new(table, self.provider.db_fields(table)?)?);
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            tables.entry(table.to_string()).or_insert(fields),
        ))
    }

    /// Forget every table (e.g. after a migration).
    pub fn clear(&self) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

/// In-memory schema keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticSchema {
    tables: BTreeMap<String, Vec<DbField>>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a table.
    pub fn with_table(mut self, table: impl Into<String>, fields: Vec<DbField>) -> Self {
        self.tables.insert(table.into(), fields);
        self
    }

    /// Load from a JSON document.
    pub fn from_json(json: &str) -> DbResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> DbResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl SchemaProvider for StaticSchema {
    /// Exact table name first, then a case-insensitive match.
    fn db_fields(&self, table: &str) -> DbResult<Vec<DbField>> {
        self.tables
            .get(table)
            .or_else(|| {
                self.tables
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(table))
                    .map(|(_, fields)| fields)
            })
            .cloned()
            .ok_or_else(|| DbError::UnknownTable(table.to_string()))
    }
}
