use super::{PageBounds, StatementBuilder, check_fields};
use crate::error::DbResult;
use crate::ident::Quoting;
use crate::query_builder::{CommandText, QueryBuilder};
use crate::request::{BatchQueryRequest, KeyedRequest};
use crate::resolver::FieldSets;

/// SQL Server: `[name]` quoting, `TOP (n)`, CTE paging, `MERGE`, table hints.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerStatementBuilder;

impl StatementBuilder for SqlServerStatementBuilder {
    fn dialect(&self) -> &'static str {
        "SQL Server"
    }

    fn quoting(&self) -> Quoting {
        Quoting::SQUARE_BRACKET
    }

    fn supports_hints(&self) -> bool {
        true
    }

    fn uses_top(&self) -> bool {
        true
    }

    fn identity_function(&self) -> &'static str {
        "SCOPE_IDENTITY()"
    }

    fn count_expression(&self) -> &'static str {
        "COUNT_BIG (1)"
    }

    fn create_batch_query(&self, request: &BatchQueryRequest) -> DbResult<CommandText> {
        let bounds = PageBounds::of(request)?;

        let mut q = self.query_builder();
        let order = q.order_list(&request.order_by);
        let row_number = q.quote("RowNumber");
        q.push("WITH CTE AS")
            .open_paren()
            .push("SELECT ROW_NUMBER() OVER")
            .open_paren()
            .push("ORDER BY")
            .push(&order)
            .close_paren()
            .push(&format!("AS {row_number},"))
            .push_fields(&request.fields)
            .from_clause(&request.table)
            .hints(request.hints.as_deref())
            .where_clause(request.filter.as_ref(), "")?
            .close_paren()
            .select_clause(&request.fields)
            .push("FROM CTE WHERE")
            .push(&format!(
                "({row_number} BETWEEN {} AND {})",
                bounds.first, bounds.last
            ))
            .order_by_clause(&request.order_by)
            .end();
        Ok(q.build())
    }

    /// `MERGE [T] AS T USING ( SELECT @F AS [F], .. ) AS S ON ( .. )
    /// WHEN NOT MATCHED THEN INSERT .. [WHEN MATCHED THEN UPDATE SET ..] ;`
    fn write_merge(&self, q: &mut QueryBuilder, request: &KeyedRequest, sets: &FieldSets) -> DbResult<()> {
        check_fields(&sets.insertable, "Merge (after excluding the identity)")?;

        let source = request
            .fields
            .iter()
            .map(|f| {
                let param = q.row_parameter(f);
                format!("{param} AS {}", q.quote(&f.name))
            })
            .collect::<Vec<_>>()
            .join(", ");
        let on = sets
            .qualifiers
            .iter()
            .map(|f| {
                let column = q.quote(&f.name);
                format!("S.{column} = T.{column}")
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        let insert_columns = q.field_list(&sets.insertable);
        let insert_values = sets
            .insertable
            .iter()
            .map(|f| format!("S.{}", q.quote(&f.name)))
            .collect::<Vec<_>>()
            .join(", ");

        q.push("MERGE")
            .push_ident(&request.table)
            .hints(request.hints.as_deref())
            .push("AS T USING")
            .open_paren()
            .push("SELECT")
            .push(&source)
            .close_paren()
            .push("AS S ON")
            .open_paren()
            .push(&on)
            .close_paren()
            .push("WHEN NOT MATCHED THEN INSERT")
            .open_paren()
            .push(&insert_columns)
            .close_paren()
            .push("VALUES")
            .open_paren()
            .push(&insert_values)
            .close_paren();

        if !sets.updatable.is_empty() {
            let assignments = sets
                .updatable
                .iter()
                .map(|f| {
                    let column = q.quote(&f.name);
                    format!("{column} = S.{column}")
                })
                .collect::<Vec<_>>()
                .join(", ");
            q.push("WHEN MATCHED THEN UPDATE SET").push(&assignments);
        }
        q.end();
        Ok(())
    }
}
