//! Column descriptors: [`Field`], schema metadata [`DbField`] and ordering.

use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};

/// A column reference (name plus an optional type tag).
///
/// Derived equality and hashing are exact because names are rendered verbatim
/// into statement text. Use [`Field::name_eq`] for qualifier matching, which
/// is ASCII case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

impl Field {
    /// Create a field without a type tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
        }
    }

    /// Create a field with a type tag.
    pub fn typed(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
        }
    }

    /// Build a field list from names.
    ///
    /// ```
    /// use dbkit::Field;
    ///
    /// let fields = Field::from_names(["Id", "Name"]);
    /// assert_eq!(fields[1].name, "Name");
    /// ```
    pub fn from_names<I, S>(names: I) -> Vec<Field>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().map(Field::new).collect()
    }

    /// Case-insensitive name comparison used for qualifier matching.
    pub fn name_eq(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl From<&str> for Field {
    fn from(name: &str) -> Self {
        Field::new(name)
    }
}

impl From<String> for Field {
    fn from(name: String) -> Self {
        Field::new(name)
    }
}

impl From<&DbField> for Field {
    fn from(field: &DbField) -> Self {
        Field {
            name: field.name.clone(),
            type_name: field.type_name.clone(),
        }
    }
}

/// Column metadata as reported by the schema provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DbField {
    pub name: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub is_identity: bool,
    #[serde(default = "default_nullable")]
    pub is_nullable: bool,
    /// Native database type name (e.g. `INT`, `NVARCHAR`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u8>,
}

fn default_nullable() -> bool {
    true
}

impl DbField {
    /// Create a plain nullable, non-key column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_primary: false,
            is_identity: false,
            is_nullable: true,
            type_name: None,
            size: None,
            precision: None,
            scale: None,
        }
    }

    /// Create a primary-key column.
    pub fn primary(name: impl Into<String>) -> Self {
        Self::new(name).with_primary(true).with_nullable(false)
    }

    /// Create a column that is both primary key and identity.
    pub fn primary_identity(name: impl Into<String>) -> Self {
        Self::primary(name).with_identity(true)
    }

    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    pub fn with_identity(mut self, is_identity: bool) -> Self {
        self.is_identity = is_identity;
        self
    }

    pub fn with_nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Convert to a plain [`Field`].
    pub fn as_field(&self) -> Field {
        Field::from(self)
    }
}

/// The validated column set of one table.
///
/// Invariant: at most one primary and at most one identity column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbFields {
    table: String,
    fields: Vec<DbField>,
}

impl DbFields {
    /// Validate and wrap a table's column metadata.
    pub fn new(table: impl Into<String>, fields: Vec<DbField>) -> DbResult<Self> {
        let table = table.into();
        let primaries = fields.iter().filter(|f| f.is_primary).count();
        if primaries > 1 {
            return Err(DbError::InvalidSchema {
                table,
                message: format!("{primaries} primary columns"),
            });
        }
        let identities = fields.iter().filter(|f| f.is_identity).count();
        if identities > 1 {
            return Err(DbError::InvalidSchema {
                table,
                message: format!("{identities} identity columns"),
            });
        }
        Ok(Self { table, fields })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary(&self) -> Option<&DbField> {
        self.fields.iter().find(|f| f.is_primary)
    }

    pub fn identity(&self) -> Option<&DbField> {
        self.fields.iter().find(|f| f.is_identity)
    }

    /// Find a column by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&DbField> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// All columns as plain fields, in declaration order.
    pub fn as_fields(&self) -> Vec<Field> {
        self.fields.iter().map(Field::from).collect()
    }

    /// Columns that also appear in `names`, in declaration order.
    ///
    /// Column spelling comes from the schema, not from `names`.
    pub fn intersect<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<Field> {
        let names: Vec<&str> = names.into_iter().collect();
        self.fields
            .iter()
            .filter(|f| names.iter().any(|n| f.name.eq_ignore_ascii_case(n)))
            .map(Field::from)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DbField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

/// One `ORDER BY` term. Order of appearance is significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderField {
    pub name: String,
    #[serde(default)]
    pub direction: Direction,
}

impl OrderField {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
        }
    }

    pub fn asc(name: impl Into<String>) -> Self {
        Self::new(name, Direction::Ascending)
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self::new(name, Direction::Descending)
    }
}
