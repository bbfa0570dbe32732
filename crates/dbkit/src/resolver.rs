//! Field and qualifier resolution for INSERT / UPDATE / MERGE statements.
//!
//! Rules:
//! 1. Effective qualifiers are the explicit qualifiers when non-empty, else the
//!    primary field, else [`DbError::MissingQualifiers`].
//! 2. Each qualifier must name a field of the field list (case-insensitive),
//!    else [`DbError::InvalidQualifier`].
//! 3. Insertable fields are the fields minus the identity column.
//! 4. Updatable fields are the fields minus every qualifier that is also the
//!    primary or identity column. A key that is not a qualifier stays.
//!
//! Resolved qualifiers follow field declaration order and carry the declared
//! spelling, whatever order and case they were passed in.

use crate::error::{DbError, DbResult};
use crate::field::{DbField, Field};

/// Field partitions for one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSets {
    pub qualifiers: Vec<Field>,
    pub insertable: Vec<Field>,
    pub updatable: Vec<Field>,
}

/// Resolve the effective qualifier set (rules 1 and 2).
pub fn resolve_qualifiers(
    table: &str,
    fields: &[Field],
    qualifiers: &[Field],
    primary: Option<&DbField>,
) -> DbResult<Vec<Field>> {
    let fallback;
    let effective: &[Field] = if !qualifiers.is_empty() {
        qualifiers
    } else if let Some(primary) = primary {
        fallback = [primary.as_field()];
        &fallback
    } else {
        return Err(DbError::MissingQualifiers {
            table: table.to_string(),
        });
    };

    if let Some(missing) = effective
        .iter()
        .find(|q| !fields.iter().any(|f| f.name_eq(&q.name)))
    {
        return Err(DbError::InvalidQualifier {
            field: missing.name.clone(),
        });
    }

    Ok(fields
        .iter()
        .filter(|f| effective.iter().any(|q| f.name_eq(&q.name)))
        .cloned()
        .collect())
}

/// Fields an INSERT may list (rule 3).
pub fn insertable_fields(
    fields: &[Field],
    identity: Option<&DbField>,
    include_identity: bool,
) -> Vec<Field> {
    fields
        .iter()
        .filter(|f| include_identity || !is_key(f, identity))
        .cloned()
        .collect()
}

/// Fields an UPDATE SET list may assign (rule 4).
pub fn updatable_fields(
    fields: &[Field],
    qualifiers: &[Field],
    primary: Option<&DbField>,
    identity: Option<&DbField>,
) -> Vec<Field> {
    fields
        .iter()
        .filter(|f| {
            let covered = qualifiers.iter().any(|q| q.name_eq(&f.name));
            !(covered && (is_key(f, primary) || is_key(f, identity)))
        })
        .cloned()
        .collect()
}

/// Resolve qualifiers and both field partitions at once.
pub fn resolve(
    table: &str,
    fields: &[Field],
    qualifiers: &[Field],
    primary: Option<&DbField>,
    identity: Option<&DbField>,
) -> DbResult<FieldSets> {
    let qualifiers = resolve_qualifiers(table, fields, qualifiers, primary)?;
    let insertable = insertable_fields(fields, identity, false);
    let updatable = updatable_fields(fields, &qualifiers, primary, identity);
    Ok(FieldSets {
        qualifiers,
        insertable,
        updatable,
    })
}

fn is_key(field: &Field, key: Option<&DbField>) -> bool {
    key.is_some_and(|k| field.name_eq(&k.name))
}
