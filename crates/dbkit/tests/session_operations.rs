use dbkit::request::QueryRequest;
use dbkit::{
    AggregateKind, Compiler, DbError, DbResult, DbField, Executor, Field, OrderField, QueryField,
    QueryGroup, Record, Session, SessionConfig, StaticSchema, Value,
};
use std::sync::{Arc, Mutex};

type Call = (String, Vec<(String, Value)>);

/// Records every statement and answers queries from a canned row set.
#[derive(Debug, Default)]
struct Capture {
    calls: Mutex<Vec<Call>>,
    rows: Vec<Record>,
}

impl Capture {
    fn returning(rows: Vec<Record>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            rows,
        }
    }

    fn push(&self, sql: &str, params: &[(String, Value)]) {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl Executor for Capture {
    async fn execute(&self, sql: &str, params: &[(String, Value)]) -> DbResult<u64> {
        self.push(sql, params);
        Ok(sql.matches(" ;").count() as u64)
    }

    async fn query(&self, sql: &str, params: &[(String, Value)]) -> DbResult<Vec<Record>> {
        self.push(sql, params);
        Ok(self.rows.clone())
    }

    async fn query_multiple(&self, sql: &str, params: &[(String, Value)]) -> DbResult<Vec<Vec<Record>>> {
        self.push(sql, params);
        Ok(vec![self.rows.clone(); sql.matches(" ;").count()])
    }
}

fn schema() -> StaticSchema {
    StaticSchema::new()
        .with_table(
            "Customer",
            vec![
                DbField::primary_identity("Id"),
                DbField::new("Name"),
                DbField::new("Email").with_nullable(true),
            ],
        )
        .with_table(
            "Order",
            vec![DbField::primary("OrderNo"), DbField::new("CustomerId")],
        )
}

fn session(executor: Capture) -> Session<Capture, StaticSchema> {
    Session::new(executor, schema(), Arc::new(Compiler::sql_server()))
}

fn customers(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| Record::new().with("Name", format!("c{i}")).with("Email", Value::Null))
        .collect()
}

#[tokio::test]
async fn insert_returns_scalar_from_result_select() {
    let session = session(Capture::returning(vec![Record::new().with("Result", 42)]));
    let id = session
        .insert("Customer", &Record::new().with("Id", 0).with("Name", "Ada"))
        .await
        .unwrap();
    assert_eq!(id, Value::Int(42));

    let calls = session.executor().calls();
    assert_eq!(
        calls[0].0,
        "INSERT INTO [Customer] ( [Name] ) VALUES ( @Name ) ; SELECT SCOPE_IDENTITY() AS [Result] ;"
    );
    assert_eq!(calls[0].1, vec![("Name".to_string(), Value::from("Ada"))]);
}

#[tokio::test]
async fn insert_all_sends_batches() {
    let session = session(Capture::default()).with_config(SessionConfig::new().batch_size(2));
    let rows = customers(5);
    session.insert_all("Customer", &rows).await.unwrap();

    let calls = session.executor().calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].1.len(), 4);
    assert_eq!(calls[2].1.len(), 2);
    assert_eq!(calls[1].1[2], ("Name_1".to_string(), Value::from("c3")));
    assert!(calls[2].0.starts_with("INSERT INTO [Customer] ( [Name], [Email] ) VALUES ( @Name, @Email ) ;"));

    // Full chunks reuse one compiled statement; the short tail compiles its own.
    assert_eq!(session.compiler().cached_statements(), 2);
}

#[tokio::test]
async fn merge_all_keys_on_primary_by_default() {
    let session = session(Capture::default());
    let rows = vec![
        Record::new().with("OrderNo", 1).with("CustomerId", 10),
        Record::new().with("OrderNo", 2).with("CustomerId", 20),
    ];
    session.merge_all("Order", &rows, &[]).await.unwrap();

    let calls = session.executor().calls();
    assert_eq!(
        calls[0].0,
        "MERGE [Order] AS T USING ( SELECT @OrderNo AS [OrderNo], @CustomerId AS [CustomerId] ) AS S ON ( S.[OrderNo] = T.[OrderNo] ) WHEN NOT MATCHED THEN INSERT ( [OrderNo], [CustomerId] ) VALUES ( S.[OrderNo], S.[CustomerId] ) WHEN MATCHED THEN UPDATE SET [CustomerId] = S.[CustomerId] ; \
         MERGE [Order] AS T USING ( SELECT @OrderNo_1 AS [OrderNo], @CustomerId_1 AS [CustomerId] ) AS S ON ( S.[OrderNo] = T.[OrderNo] ) WHEN NOT MATCHED THEN INSERT ( [OrderNo], [CustomerId] ) VALUES ( S.[OrderNo], S.[CustomerId] ) WHEN MATCHED THEN UPDATE SET [CustomerId] = S.[CustomerId] ;"
    );
    assert_eq!(calls[0].1[2], ("OrderNo_1".to_string(), Value::Int(2)));
}

#[tokio::test]
async fn update_all_with_explicit_qualifier() {
    let session = session(Capture::default());
    let rows = vec![Record::new().with("Id", 1).with("Name", "x").with("Email", "e")];
    session
        .update_all("Customer", &rows, &[Field::new("Email")])
        .await
        .unwrap();

    let calls = session.executor().calls();
    assert_eq!(
        calls[0].0,
        "UPDATE [Customer] SET [Id] = @Id, [Name] = @Name, [Email] = @Email WHERE ([Email] = @Email) ;"
    );
}

#[tokio::test]
async fn update_does_not_assign_the_filtered_primary_key() {
    let session = session(Capture::default());
    let record = Record::new().with("Id", 7).with("Name", "x");
    session
        .update("Customer", &record, QueryGroup::from(QueryField::eq("Id", 7)))
        .await
        .unwrap();

    let calls = session.executor().calls();
    assert_eq!(calls[0].0, "UPDATE [Customer] SET [Name] = @Name WHERE ([Id] = @_Id) ;");
    assert_eq!(
        calls[0].1,
        vec![
            ("Name".to_string(), Value::from("x")),
            ("_Id".to_string(), Value::Int(7)),
        ]
    );
}

#[tokio::test]
async fn query_multiple_binds_each_filter_in_order() {
    let session = session(Capture::default());
    let results = session
        .query_multiple(vec![
            QueryRequest::new("Customer", Vec::new()).filter(QueryField::eq("Id", 1).into()),
            QueryRequest::new("Order", Field::from_names(["OrderNo"]))
                .filter(QueryField::eq("CustomerId", 1).into()),
            QueryRequest::new("Customer", Field::from_names(["Name"]))
                .filter(QueryField::eq("Id", 2).into()),
        ])
        .await
        .unwrap();
    assert_eq!(results.len(), 3);

    let calls = session.executor().calls();
    assert_eq!(
        calls[0].0,
        "SELECT [Id], [Name], [Email] FROM [Customer] WHERE ([Id] = @Id) ; \
         SELECT [OrderNo] FROM [Order] WHERE ([CustomerId] = @CustomerId) ; \
         SELECT [Name] FROM [Customer] WHERE ([Id] = @Id_1) ;"
    );
    assert_eq!(
        calls[0].1,
        vec![
            ("Id".to_string(), Value::Int(1)),
            ("CustomerId".to_string(), Value::Int(1)),
            ("Id_1".to_string(), Value::Int(2)),
        ]
    );
}

#[tokio::test]
async fn count_and_exists() {
    let session = session(Capture::returning(vec![Record::new().with("CountValue", 3)]));
    let filter = QueryGroup::from(QueryField::like("Name", "A%"));

    assert_eq!(session.count("Customer", Some(filter.clone())).await.unwrap(), 3);
    assert!(session.exists("Customer", Some(filter)).await.unwrap());

    let calls = session.executor().calls();
    assert_eq!(
        calls[0].0,
        "SELECT COUNT_BIG (1) AS [CountValue] FROM [Customer] WHERE ([Name] LIKE @Name) ;"
    );
    assert_eq!(
        calls[1].0,
        "SELECT TOP (1) 1 AS [ExistsValue] FROM [Customer] WHERE ([Name] LIKE @Name) ;"
    );
    assert_eq!(calls[1].1, vec![("Name".to_string(), Value::from("A%"))]);
}

#[tokio::test]
async fn count_rejects_a_non_integer_result() {
    let session = session(Capture::returning(vec![Record::new().with("CountValue", "42")]));
    let err = session.count("Customer", None).await.unwrap_err();
    assert!(matches!(err, DbError::Execution(_)), "{err}");
}

#[tokio::test]
async fn count_of_no_rows_is_zero() {
    let session = session(Capture::default());
    assert_eq!(session.count("Customer", None).await.unwrap(), 0);
}

#[tokio::test]
async fn exists_is_false_without_rows() {
    let session = session(Capture::default());
    assert!(!session.exists("Customer", None).await.unwrap());
}

#[tokio::test]
async fn batch_query_and_aggregate() {
    let session = session(Capture::default());
    session
        .batch_query("Order", 2, 5, vec![OrderField::desc("OrderNo")], None)
        .await
        .unwrap();
    let max = session
        .aggregate(AggregateKind::Max, "Order", "OrderNo", None)
        .await
        .unwrap();
    assert!(max.is_null());

    let calls = session.executor().calls();
    assert_eq!(
        calls[0].0,
        "WITH CTE AS ( SELECT ROW_NUMBER() OVER ( ORDER BY [OrderNo] DESC ) AS [RowNumber], [OrderNo], [CustomerId] FROM [Order] ) SELECT [OrderNo], [CustomerId] FROM CTE WHERE ([RowNumber] BETWEEN 11 AND 15) ORDER BY [OrderNo] DESC ;"
    );
    assert_eq!(calls[1].0, "SELECT MAX ([OrderNo]) AS [MaxValue] FROM [Order] ;");
}

#[tokio::test]
async fn delete_and_truncate() {
    let session = Session::new(Capture::default(), schema(), Arc::new(Compiler::postgres()));
    session
        .delete("Customer", QueryGroup::from(QueryField::eq("Id", 5)))
        .await
        .unwrap();
    session.delete_all("Order").await.unwrap();
    session.truncate("Order").await.unwrap();

    let calls = session.executor().calls();
    assert_eq!(calls[0].0, r#"DELETE FROM "Customer" WHERE ("Id" = @Id) ;"#);
    assert_eq!(calls[0].1, vec![("Id".to_string(), Value::Int(5))]);
    assert_eq!(calls[1].0, r#"DELETE FROM "Order" ;"#);
    assert_eq!(calls[2].0, r#"TRUNCATE TABLE "Order" RESTART IDENTITY ;"#);
}

#[tokio::test]
async fn shared_compiler_caches_across_sessions() {
    let compiler = Arc::new(Compiler::sql_server());
    let a = Session::new(Capture::default(), schema(), Arc::clone(&compiler));
    let b = Session::new(Capture::default(), schema(), Arc::clone(&compiler));

    a.query("Customer", Some(QueryField::eq("Id", 1).into()), Vec::new(), None)
        .await
        .unwrap();
    b.query("Customer", Some(QueryField::eq("Id", 9).into()), Vec::new(), None)
        .await
        .unwrap();

    assert_eq!(compiler.cached_statements(), 1);
    assert_eq!(compiler.cache_stats().hits, 1);
}
