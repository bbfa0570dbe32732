//! Multi-row statement batching.
//!
//! A batched request repeats one single-row statement template `batch_size`
//! times in one command text. Repetition `k` renders its row placeholders with
//! an `_k` suffix (repetition 0 is unsuffixed) and binds to row `k`; table
//! names and clause structure are identical across repetitions.
//!
//! ```
//! use dbkit::{Field, QueryBuilder, Quoting};
//! use dbkit::batch::repeat;
//!
//! let fields = Field::from_names(["Name"]);
//! let q = QueryBuilder::new(Quoting::SQUARE_BRACKET, '@');
//! let cmd = repeat(q, 2, |q| {
//!     q.push("UPDATE").push_ident("T").set_clause(&fields).end();
//!     Ok(())
//! })
//! .unwrap();
//! assert_eq!(cmd.text, "UPDATE [T] SET [Name] = @Name ; UPDATE [T] SET [Name] = @Name_1 ;");
//! ```

use crate::error::{DbError, DbResult};
use crate::query_builder::{CommandText, QueryBuilder};

/// Emit `statement` once per row of the batch into one command text.
///
/// Every repetition must end with a terminator (`end()`); the single-space
/// token separation of [`QueryBuilder`] then yields `... ; ... ;`.
pub fn repeat<F>(mut builder: QueryBuilder, batch_size: usize, mut statement: F) -> DbResult<CommandText>
where
    F: FnMut(&mut QueryBuilder) -> DbResult<()>,
{
    check_batch_size(batch_size)?;
    for index in 0..batch_size {
        builder.set_batch_index(index);
        statement(&mut builder)?;
    }
    Ok(builder.build())
}

/// Reject a zero batch size.
pub fn check_batch_size(batch_size: usize) -> DbResult<()> {
    if batch_size == 0 {
        return Err(DbError::InvalidArgument {
            name: "batch_size",
            value: batch_size.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::ident::Quoting;
    use crate::query_builder::ParameterSource;

    fn update(q: &mut QueryBuilder) -> DbResult<()> {
        let set = Field::from_names(["Field2"]);
        let key = Field::from_names(["Field1"]);
        q.push("UPDATE").push_ident("Table").set_clause(&set).push("WHERE");
        let param = q.row_parameter(&key[0]);
        q.push(&format!("([Field1] = {param})")).end();
        Ok(())
    }

    #[test]
    fn single_row_is_unsuffixed() {
        let q = QueryBuilder::new(Quoting::SQUARE_BRACKET, '@');
        let cmd = repeat(q, 1, update).unwrap();
        assert_eq!(
            cmd.text,
            "UPDATE [Table] SET [Field2] = @Field2 WHERE ([Field1] = @Field1) ;"
        );
    }

    #[test]
    fn repetitions_are_suffixed_and_tagged_with_row() {
        let q = QueryBuilder::new(Quoting::SQUARE_BRACKET, '@');
        let cmd = repeat(q, 3, update).unwrap();
        let statements: Vec<&str> = cmd.text.split(" ; ").collect();
        assert_eq!(statements.len(), 3);
        assert_eq!(
            statements[2],
            "UPDATE [Table] SET [Field2] = @Field2_2 WHERE ([Field1] = @Field1_2) ;"
        );
        assert_eq!(
            cmd.parameter_names(),
            vec!["Field2", "Field1", "Field2_1", "Field1_1", "Field2_2", "Field1_2"]
        );
        assert_eq!(
            cmd.parameters[5].source,
            ParameterSource::Field {
                field: "Field1".into(),
                row: 2
            }
        );
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let q = QueryBuilder::new(Quoting::SQUARE_BRACKET, '@');
        let err = repeat(q, 0, update).unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn statement_errors_propagate() {
        let q = QueryBuilder::new(Quoting::SQUARE_BRACKET, '@');
        let err = repeat(q, 2, |_| Err(DbError::MissingTableName)).unwrap_err();
        assert_eq!(err, DbError::MissingTableName);
    }
}
