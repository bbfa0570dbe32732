use super::{StatementBuilder, check_fields, upsert_fields};
use crate::error::{DbError, DbResult};
use crate::field::DbField;
use crate::ident::Quoting;
use crate::query_builder::QueryBuilder;
use crate::request::KeyedRequest;
use crate::resolver::FieldSets;

/// MySQL: `` `name` `` quoting, `LIMIT offset, rows` paging and
/// `ON DUPLICATE KEY UPDATE` upserts.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlStatementBuilder;

impl StatementBuilder for MySqlStatementBuilder {
    fn dialect(&self) -> &'static str {
        "MySQL"
    }

    fn quoting(&self) -> Quoting {
        Quoting::BACKTICK
    }

    fn identity_function(&self) -> &'static str {
        "LAST_INSERT_ID()"
    }

    fn paging_clause(&self, offset: usize, rows: usize) -> String {
        format!("LIMIT {offset}, {rows}")
    }

    /// `INSERT INTO .. VALUES ( .. ) ON DUPLICATE KEY UPDATE <column> = @<column>, .. ;`
    ///
    /// The server matches on its own unique keys, so the qualifiers must be
    /// the primary or identity column. Nothing updatable renders
    /// `INSERT IGNORE`.
    fn write_merge(&self, q: &mut QueryBuilder, request: &KeyedRequest, sets: &FieldSets) -> DbResult<()> {
        if let Some(other) = sets.qualifiers.iter().find(|f| {
            let is_key = |key: Option<&DbField>| key.is_some_and(|k| f.name_eq(&k.name));
            !is_key(request.primary.as_ref()) && !is_key(request.identity.as_ref())
        }) {
            return Err(DbError::unsupported(
                self.dialect(),
                format!("merge qualifier '{}' that is not the primary or identity key", other.name),
            ));
        }
        let fields = upsert_fields(request, sets);
        check_fields(&fields, "Merge")?;

        let params = q.parameter_list(&fields);
        let columns = q.field_list(&fields);
        q.push(if sets.updatable.is_empty() {
            "INSERT IGNORE INTO"
        } else {
            "INSERT INTO"
        })
        .push_ident(&request.table)
        .open_paren()
        .push(&columns)
        .close_paren()
        .push("VALUES")
        .open_paren()
        .push(&params)
        .close_paren();

        if !sets.updatable.is_empty() {
            let assignments = sets
                .updatable
                .iter()
                .map(|f| {
                    let column = q.quote(&f.name);
                    let param = q.row_parameter(f);
                    format!("{column} = {param}")
                })
                .collect::<Vec<_>>()
                .join(", ");
            q.push("ON DUPLICATE KEY UPDATE").push(&assignments);
        }
        q.end();
        Ok(())
    }
}
