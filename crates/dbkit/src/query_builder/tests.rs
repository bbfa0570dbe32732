use super::*;
use crate::field::OrderField;
use crate::predicate::QueryField;

fn square() -> QueryBuilder {
    QueryBuilder::new(Quoting::SQUARE_BRACKET, '@')
}

#[test]
fn test_tokens_are_single_space_separated() {
    let mut q = square();
    q.push("SELECT").push("").push("1").end();
    assert_eq!(q.text(), "SELECT 1 ;");
}

#[test]
fn test_select_from_order_by() {
    let fields = Field::from_names(["Field1", "Field2"]);
    let mut q = square();
    q.select_clause(&fields)
        .from_clause("Table")
        .order_by_clause(&[OrderField::asc("Field1"), OrderField::desc("Field2")])
        .end();
    assert_eq!(
        q.text(),
        "SELECT [Field1], [Field2] FROM [Table] ORDER BY [Field1] ASC, [Field2] DESC ;"
    );
}

#[test]
fn test_empty_order_by_renders_nothing() {
    let mut q = square();
    q.push("X").order_by_clause(&[]).end();
    assert_eq!(q.text(), "X ;");
}

#[test]
fn test_insert_and_values_clause() {
    let fields = Field::from_names(["Field1", "Field2"]);
    let mut q = square();
    q.insert_clause("Table", &fields).values_clause(&fields).end();
    let cmd = q.build();
    assert_eq!(
        cmd.text,
        "INSERT INTO [Table] ( [Field1], [Field2] ) VALUES ( @Field1, @Field2 ) ;"
    );
    assert_eq!(cmd.parameter_names(), vec!["Field1", "Field2"]);
}

#[test]
fn test_set_clause_with_batch_index() {
    let fields = Field::from_names(["Field1"]);
    let mut q = square().with_batch_index(2);
    q.set_clause(&fields);
    let cmd = q.build();
    assert_eq!(cmd.text, "SET [Field1] = @Field1_2");
    assert_eq!(
        cmd.parameters[0].source,
        ParameterSource::Field {
            field: "Field1".into(),
            row: 2
        }
    );
}

#[test]
fn test_where_clause_empty_group_renders_nothing() {
    let mut q = square();
    q.push("DELETE").where_clause(Some(&QueryGroup::new()), "").unwrap();
    q.where_clause(None, "").unwrap();
    assert_eq!(q.text(), "DELETE");
}

#[test]
fn test_where_clause_nested_groups() {
    let group = QueryGroup::and(vec![
        QueryField::eq("Status", "active").into(),
        QueryGroup::or(vec![
            QueryField::gt("Age", 18).into(),
            QueryField::is_null("Age").into(),
        ])
        .into(),
    ]);
    let mut q = square();
    q.where_clause(Some(&group), "").unwrap();
    assert_eq!(
        q.text(),
        "WHERE ([Status] = @Status AND ([Age] > @Age OR [Age] IS NULL))"
    );
}

#[test]
fn test_where_clause_duplicate_fields_get_unique_names() {
    let group = QueryGroup::from_fields([QueryField::gt("Id", 1), QueryField::lt("Id", 10)]);
    let mut q = square();
    q.where_clause(Some(&group), "").unwrap();
    let cmd = q.build();
    assert_eq!(cmd.text, "WHERE ([Id] > @Id AND [Id] < @Id_1)");
    assert_eq!(
        cmd.parameters[1].source,
        ParameterSource::Predicate { index: 1 }
    );
}

#[test]
fn test_where_clause_in_between_and_prefix() {
    let group = QueryGroup::from_fields([
        QueryField::in_list("Kind", ["a", "b"]),
        QueryField::between("Age", 1, 9),
    ]);
    let mut q = square();
    q.where_clause(Some(&group), "_").unwrap();
    assert_eq!(
        q.text(),
        "WHERE ([Kind] IN (@_Kind_In_0, @_Kind_In_1) AND [Age] BETWEEN @_Age_Left AND @_Age_Right)"
    );
}

#[test]
fn test_where_clause_empty_in_lists() {
    let group = QueryGroup::from_fields([
        QueryField::in_list("A", Vec::<i32>::new()),
        QueryField::not_in("B", Vec::<i32>::new()),
    ]);
    let mut q = square();
    q.where_clause(Some(&group), "").unwrap();
    let cmd = q.build();
    assert_eq!(cmd.text, "WHERE (1 = 0 AND 1 = 1)");
    assert!(cmd.parameters.is_empty());
}

#[test]
fn test_where_clause_not_group() {
    let group = QueryGroup::from(QueryField::eq("A", 1)).not();
    let mut q = square();
    q.where_clause(Some(&group), "").unwrap();
    assert_eq!(q.text(), "WHERE NOT ([A] = @A)");
}

#[test]
fn test_bind_resolves_rows_and_predicates() {
    let fields = Field::from_names(["Name"]);
    let group = QueryGroup::from(QueryField::eq("Id", 5));
    let mut q = square();
    q.push("UPDATE")
        .push_ident("T")
        .set_clause(&fields)
        .where_clause(Some(&group), "_")
        .unwrap();
    let cmd = q.build();
    assert_eq!(cmd.text, "UPDATE [T] SET [Name] = @Name WHERE ([Id] = @_Id)");

    let row = Record::new().with("Name", "x");
    let bound = cmd.bind(&[row], Some(&group)).unwrap();
    assert_eq!(
        bound,
        vec![
            ("Name".to_string(), Value::from("x")),
            ("_Id".to_string(), Value::Int(5)),
        ]
    );
}

#[test]
fn test_bind_reports_missing_value() {
    let fields = Field::from_names(["Name"]);
    let mut q = square();
    q.values_clause(&fields);
    let cmd = q.build();
    let err = cmd.bind(&[Record::new()], None).unwrap_err();
    assert_eq!(
        err,
        DbError::MissingParameter {
            name: "Name".into()
        }
    );
}

#[test]
fn test_clear_resets_buffer_and_parameters() {
    let fields = Field::from_names(["A"]);
    let mut q = square();
    q.values_clause(&fields);
    q.clear();
    q.push("X");
    let cmd = q.build();
    assert_eq!(cmd.text, "X");
    assert!(cmd.parameters.is_empty());
}

#[test]
fn test_where_clause_continues_names_across_statements() {
    let first = QueryGroup::from(QueryField::eq("Id", 1));
    let second = QueryGroup::from(QueryField::eq("Id", 2));
    let mut q = square();
    q.push("A").where_clause(Some(&first), "").unwrap().end();
    q.push("B").where_clause(Some(&second), "").unwrap().end();
    let cmd = q.build();
    assert_eq!(cmd.text, "A WHERE ([Id] = @Id) ; B WHERE ([Id] = @Id_1) ;");

    let combined = QueryGroup::and(vec![first.into(), second.into()]);
    let bound = cmd.bind(&[], Some(&combined)).unwrap();
    assert_eq!(bound[1], ("Id_1".to_string(), Value::Int(2)));
}

#[test]
fn test_colliding_sanitized_names_get_distinct_placeholders() {
    let fields = Field::from_names(["A B", "A_B"]);
    let mut q = square();
    q.insert_clause("Table", &fields).values_clause(&fields).end();
    let cmd = q.build();
    assert_eq!(
        cmd.text,
        "INSERT INTO [Table] ( [A B], [A_B] ) VALUES ( @A_B, @A_B_1 ) ;"
    );

    let row = Record::new().with("A B", 1).with("A_B", 2);
    assert_eq!(
        cmd.bind(&[row], None).unwrap(),
        vec![
            ("A_B".to_string(), Value::Int(1)),
            ("A_B_1".to_string(), Value::Int(2)),
        ]
    );
}

#[test]
fn test_repeated_row_field_reuses_its_placeholder() {
    let fields = Field::from_names(["A B", "A_B"]);
    let mut q = square();
    q.set_clause(&fields);
    let again = q.row_parameter(&Field::new("A B"));
    assert_eq!(again, "@A_B");
    assert_eq!(q.build().parameter_names(), vec!["A_B", "A_B_1"]);
}

#[test]
fn test_predicate_placeholder_avoids_row_placeholders() {
    let fields = Field::from_names(["Id"]);
    let filter = QueryGroup::from(QueryField::eq("Id", 7));
    let mut q = square();
    q.set_clause(&fields).where_clause(Some(&filter), "").unwrap();
    let cmd = q.build();
    assert_eq!(cmd.text, "SET [Id] = @Id WHERE ([Id] = @Id_1)");

    let row = Record::new().with("Id", 1);
    assert_eq!(
        cmd.bind(&[row], Some(&filter)).unwrap(),
        vec![
            ("Id".to_string(), Value::Int(1)),
            ("Id_1".to_string(), Value::Int(7)),
        ]
    );
}
