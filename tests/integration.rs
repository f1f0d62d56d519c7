//! Integration tests for schemaforge
//!
//! Every test runs against its own in-memory SQLite database. The pool is
//! limited to one connection so all statements see the same database.
//!
//! Set `RUST_LOG=schemaforge=debug` to see the compiled statements.

use serde_json::{Value, json};

use schemaforge::{
    FieldDefinition, FieldType, Filter, ModelDefinition, QueryParams, Record, SchemaDefinition,
    SortField, Store, StoreConfig, StoreError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn definition() -> SchemaDefinition {
    SchemaDefinition::new()
        .model(
            "User",
            ModelDefinition::new()
                .field(FieldDefinition::new("id", FieldType::Id).primary())
                .field(FieldDefinition::new("name", FieldType::Text).required().max(50))
                .field(FieldDefinition::new("age", FieldType::Number).min(0).max(120)),
        )
        .model(
            "Member",
            ModelDefinition::new()
                .field(FieldDefinition::new("id", FieldType::Id))
                .field(FieldDefinition::new("name", FieldType::Text).required())
                .field(FieldDefinition::new("email", FieldType::Email).unique())
                .field(
                    FieldDefinition::new("role", FieldType::Enum)
                        .options(["admin", "user"])
                        .default_value("user")
                        .indexed(),
                )
                .field(FieldDefinition::new("active", FieldType::Boolean).default_value(true))
                .field(FieldDefinition::new("password", FieldType::Password))
                .field(FieldDefinition::new("joined", FieldType::Datetime).auto_now_add()),
        )
        .model(
            "Post",
            ModelDefinition::new()
                .field(FieldDefinition::new("id", FieldType::Id))
                .field(FieldDefinition::new("title", FieldType::Text).required())
                .field(
                    FieldDefinition::new("author", FieldType::Relation)
                        .relation_to("Member")
                        .on_delete("cascade")
                        .required(),
                ),
        )
        .model(
            "Country",
            ModelDefinition::new()
                .field(FieldDefinition::new("code", FieldType::Slug).primary().required())
                .field(FieldDefinition::new("label", FieldType::Text)),
        )
        .model(
            "Event",
            ModelDefinition::new()
                .field(FieldDefinition::new("id", FieldType::Id))
                .field(FieldDefinition::new("title", FieldType::Text).required())
                .field(FieldDefinition::new("day", FieldType::Date))
                .field(FieldDefinition::new("at", FieldType::Time)),
        )
}

async fn create_test_store() -> Store {
    init_tracing();
    let schema = definition().build().expect("schema builds");
    let config = StoreConfig::builder("sqlite::memory:")
        .max_connections(1)
        .build();
    let store = Store::new(config, schema).await.expect("store connects");
    store.create_schema().await.expect("schema synthesized");
    store
}

fn record(value: Value) -> Record {
    value.as_object().cloned().expect("object payload")
}

async fn seed_members(store: &Store, members: &[(&str, &str)]) -> Vec<Value> {
    let mut ids = Vec::new();
    for (name, role) in members {
        let id = store
            .create("Member", record(json!({"name": name, "role": role})))
            .await
            .expect("member created");
        ids.push(id);
    }
    ids
}

// ==================== Schema Tests ====================

#[tokio::test]
async fn test_empty_tables_return_empty_results() {
    let store = create_test_store().await;

    for model in ["User", "Member", "Post", "Country", "Event"] {
        let rows = store.query(model, &QueryParams::new()).await.unwrap();
        assert!(rows.is_empty(), "{model} should be empty");
        assert_eq!(store.count(model, &[]).await.unwrap(), 0);
    }

    let err = store.get("User", &json!(1)).await.unwrap_err();
    assert!(matches!(err, StoreError::RecordNotFound(_)));
}

#[tokio::test]
async fn test_create_schema_is_idempotent() {
    let store = create_test_store().await;
    store.create("User", record(json!({"name": "Ann"}))).await.unwrap();

    store.create_schema().await.unwrap();
    store.create_schema().await.unwrap();

    assert_eq!(store.count("User", &[]).await.unwrap(), 1);
}

#[tokio::test]
async fn test_indexes_created() {
    let store = create_test_store().await;

    let names: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%' ORDER BY name",
    )
    .fetch_all(store.pool())
    .await
    .unwrap();
    let names: Vec<String> = names.into_iter().map(|(n,)| n).collect();

    assert_eq!(names, vec!["idx_Member_role", "idx_Post_author"]);
}

// ==================== User Scenario Tests ====================

#[tokio::test]
async fn test_user_create_and_get() {
    let store = create_test_store().await;

    let id = store
        .create("User", record(json!({"name": "Ann", "age": 30})))
        .await
        .unwrap();
    assert!(id.is_i64());

    let user = store.get("User", &id).await.unwrap();
    assert_eq!(
        Value::Object(user),
        json!({"id": id, "name": "Ann", "age": 30})
    );
}

#[tokio::test]
async fn test_user_create_validation() {
    let store = create_test_store().await;

    let err = store
        .create("User", record(json!({"age": 200})))
        .await
        .unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(err.field(), Some("name"));

    let err = store
        .create("User", record(json!({"name": "Ann", "age": 200})))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("age"));

    assert_eq!(store.count("User", &[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_user_update_primary_key_rejected() {
    let store = create_test_store().await;
    let id = store
        .create("User", record(json!({"name": "Ann", "age": 30})))
        .await
        .unwrap();

    let err = store
        .update("User", &id, record(json!({"id": 99})))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("id"));
    assert!(err.to_string().contains("cannot update primary key"));

    let err = store
        .validator()
        .validate_update("User", &record(json!({"id": 99, "name": "Bob"})))
        .unwrap_err();
    assert!(err.to_string().contains("cannot update primary key"));
}

// ==================== Query Tests ====================

#[tokio::test]
async fn test_role_filter_query_and_count_agree() {
    let store = create_test_store().await;
    seed_members(&store, &[("Ann", "admin"), ("Bob", "user"), ("Cid", "admin")]).await;

    let filters = vec![Filter::new("role", "=", "admin")];
    let rows = store
        .query("Member", &QueryParams { filters: filters.clone(), ..QueryParams::new() })
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["role"] == json!("admin")));
    assert_eq!(store.count("Member", &filters).await.unwrap(), 2);
}

#[tokio::test]
async fn test_count_matches_unbounded_query() {
    let store = create_test_store().await;
    seed_members(
        &store,
        &[("Ann", "admin"), ("Bob", "user"), ("Cid", "admin"), ("Dee", "user"), ("Eve", "user")],
    )
    .await;

    let filter_sets = vec![
        vec![],
        vec![Filter::eq("role", "user")],
        vec![Filter::like("name", "e")],
        vec![Filter::is_in("name", ["Ann", "Eve", "Zed"])],
        vec![Filter::eq("role", "user"), Filter::like("name", "e")],
        vec![Filter::is_in("name", Vec::<String>::new())],
        vec![Filter::new("id", ">", 2)],
    ];

    for filters in filter_sets {
        let count = store.count("Member", &filters).await.unwrap();
        let rows = store
            .query("Member", &QueryParams { filters: filters.clone(), ..QueryParams::new().unbounded() })
            .await
            .unwrap();
        assert_eq!(count, rows.len() as i64, "filters: {filters:?}");
    }
}

#[tokio::test]
async fn test_pagination_is_disjoint_and_ordered() {
    let store = create_test_store().await;
    let names = ["a", "b", "c", "d", "e", "f", "g"];
    for name in names {
        store
            .create("Member", record(json!({"name": name})))
            .await
            .unwrap();
    }

    let all = store
        .query("Member", &QueryParams::new().unbounded())
        .await
        .unwrap();
    let page1 = store
        .query("Member", &QueryParams::new().page(1).page_size(3))
        .await
        .unwrap();
    let page2 = store
        .query("Member", &QueryParams::new().page(2).page_size(3))
        .await
        .unwrap();

    assert_eq!(page1.len(), 3);
    assert_eq!(page2.len(), 3);
    assert!(page1.iter().all(|r| !page2.contains(r)));

    let combined: Vec<Record> = page1.into_iter().chain(page2).collect();
    assert_eq!(combined, all[..6].to_vec());

    // default order is newest first
    assert_eq!(all[0]["name"], json!("g"));
}

#[tokio::test]
async fn test_sort_fields() {
    let store = create_test_store().await;
    seed_members(&store, &[("Bob", "user"), ("Ann", "admin"), ("Cid", "user")]).await;

    let rows = store
        .query(
            "Member",
            &QueryParams::new()
                .sort(SortField::asc("role"))
                .sort(SortField::desc("name")),
        )
        .await
        .unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Ann", "Cid", "Bob"]);
}

#[tokio::test]
async fn test_search_narrows_filters() {
    let store = create_test_store().await;
    seed_members(
        &store,
        &[("Anna", "admin"), ("Hannah", "user"), ("Bob", "admin"), ("Joanne", "admin")],
    )
    .await;

    let searched = store
        .query("Member", &QueryParams::new().search("ann"))
        .await
        .unwrap();
    assert_eq!(searched.len(), 3);

    let params = QueryParams::new()
        .filter(Filter::eq("role", "admin"))
        .search("ann");
    let rows = store.query("Member", &params).await.unwrap();
    let mut names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    names.sort();
    assert_eq!(names, vec!["Anna", "Joanne"]);

    let page = store.list("Member", &params).await.unwrap();
    assert_eq!(page.meta.total_count, 2);
}

#[tokio::test]
async fn test_wire_params() {
    let store = create_test_store().await;
    seed_members(&store, &[("Ann", "admin"), ("Bob", "user"), ("Cid", "admin")]).await;

    let params = QueryParams::from_query_pairs([
        ("filter.role", "admin"),
        ("sort", "-name"),
        ("page_size", "1"),
        ("page", "2"),
    ]);
    let page = store.list("Member", &params).await.unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0]["name"], json!("Ann"));
    assert_eq!(page.meta.page, 2);
    assert_eq!(page.meta.page_size, 1);
    assert_eq!(page.meta.total_count, 2);
    assert_eq!(page.meta.total_pages, 2);
}

#[tokio::test]
async fn test_invalid_queries_rejected() {
    let store = create_test_store().await;

    let err = store
        .query("Member", &QueryParams::new().filter(Filter::new("role", "~", "admin")))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidQuery(_)));

    let err = store
        .query("Member", &QueryParams::new().filter(Filter::eq("salary", 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidQuery(_)));

    let err = store
        .query("Member", &QueryParams::new().sort(SortField::asc("salary")))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidQuery(_)));

    let err = store.query("Ghost", &QueryParams::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::ModelNotFound(_)));
}

#[tokio::test]
async fn test_search_and_like_match_wildcards_literally() {
    let store = create_test_store().await;
    seed_members(
        &store,
        &[("50% off", "user"), ("500 club", "user"), ("a_b", "user"), ("axb", "user")],
    )
    .await;

    let rows = store
        .query("Member", &QueryParams::new().search("50%"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("50% off"));

    let rows = store
        .query("Member", &QueryParams::new().filter(Filter::like("name", "a_b")))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("a_b"));
}

#[tokio::test]
async fn test_pages_stable_when_sort_keys_tie() {
    let store = create_test_store().await;
    let members: Vec<(String, &str)> = (0..9)
        .map(|i| (format!("m{i}"), if i % 2 == 0 { "admin" } else { "user" }))
        .collect();
    let members: Vec<(&str, &str)> = members.iter().map(|(n, r)| (n.as_str(), *r)).collect();
    seed_members(&store, &members).await;

    let sorted = QueryParams::new().sort(SortField::asc("role"));
    let all = store
        .query("Member", &sorted.clone().unbounded())
        .await
        .unwrap();

    let mut paged = Vec::new();
    for page in 1..=5 {
        let rows = store
            .query("Member", &sorted.clone().page(page).page_size(2))
            .await
            .unwrap();
        paged.extend(rows);
    }

    assert_eq!(paged.len(), 9);
    assert_eq!(paged, all);
    // ties fall back to newest first
    assert_eq!(all[0]["name"], json!("m8"));
}

// ==================== Type Mapping Tests ====================

#[tokio::test]
async fn test_temporal_values_read_back_as_strings() {
    let store = create_test_store().await;
    let id = store
        .create("Event", record(json!({"title": "launch", "day": "2024", "at": "1230"})))
        .await
        .unwrap();

    let mut event = store.get("Event", &id).await.unwrap();
    assert_eq!(event["day"], json!("2024"));
    assert_eq!(event["at"], json!("1230"));

    // a fetched record is a valid update payload
    event.remove("id");
    store.update("Event", &id, event.clone()).await.unwrap();

    let again = store.get("Event", &id).await.unwrap();
    assert_eq!(again["day"], json!("2024"));
    assert_eq!(again["title"], json!("launch"));
}

#[tokio::test]
async fn test_defaults_and_booleans() {
    let store = create_test_store().await;
    let id = store
        .create("Member", record(json!({"name": "Ann"})))
        .await
        .unwrap();

    let member = store.get("Member", &id).await.unwrap();
    assert_eq!(member["role"], json!("user"));
    assert_eq!(member["active"], json!(true));
    assert!(member["joined"].is_string());
    assert_eq!(member["email"], Value::Null);

    store
        .update("Member", &id, record(json!({"active": false})))
        .await
        .unwrap();
    let member = store.get("Member", &id).await.unwrap();
    assert_eq!(member["active"], json!(false));

    let inactive = store
        .count("Member", &[Filter::eq("active", "false")])
        .await
        .unwrap();
    assert_eq!(inactive, 1);
}

#[tokio::test]
async fn test_text_primary_key() {
    let store = create_test_store().await;

    let code = store
        .create("Country", record(json!({"code": "fr", "label": "France"})))
        .await
        .unwrap();
    assert_eq!(code, json!("fr"));

    let country = store.get("Country", &code).await.unwrap();
    assert_eq!(Value::Object(country), json!({"code": "fr", "label": "France"}));

    let err = store
        .create("Country", record(json!({"label": "Nowhere"})))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("code"));
}

// ==================== Update and Delete Tests ====================

#[tokio::test]
async fn test_update_record() {
    let store = create_test_store().await;
    let id = store
        .create("Member", record(json!({"name": "Ann", "password": "hunter2"})))
        .await
        .unwrap();

    store
        .update("Member", &id, record(json!({"name": "Anne", "password": ""})))
        .await
        .unwrap();

    let member = store.get("Member", &id).await.unwrap();
    assert_eq!(member["name"], json!("Anne"));
    assert_eq!(member["password"], json!("hunter2"));

    // only blank passwords: nothing to write
    store
        .update("Member", &id, record(json!({"password": null})))
        .await
        .unwrap();

    let err = store
        .update("Member", &id, record(json!({"nickname": "A"})))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("nickname"));

    let err = store
        .update("Member", &json!(999), record(json!({"name": "Ghost"})))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::RecordNotFound(_)));
}

#[tokio::test]
async fn test_delete_record() {
    let store = create_test_store().await;
    let ids = seed_members(&store, &[("Ann", "admin"), ("Bob", "user")]).await;

    store.delete("Member", &ids[0]).await.unwrap();
    assert_eq!(store.count("Member", &[]).await.unwrap(), 1);

    let err = store.get("Member", &ids[0]).await.unwrap_err();
    assert!(matches!(err, StoreError::RecordNotFound(_)));

    let err = store.delete("Member", &ids[0]).await.unwrap_err();
    assert!(matches!(err, StoreError::RecordNotFound(_)));
}

// ==================== Constraint Tests ====================

#[tokio::test]
async fn test_foreign_key_cascade() {
    let store = create_test_store().await;
    let ids = seed_members(&store, &[("Ann", "admin"), ("Bob", "user")]).await;

    for (title, author) in [("one", &ids[0]), ("two", &ids[0]), ("three", &ids[1])] {
        store
            .create("Post", record(json!({"title": title, "author": author})))
            .await
            .unwrap();
    }

    store.delete("Member", &ids[0]).await.unwrap();

    let posts = store.query("Post", &QueryParams::new()).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], json!("three"));
}

#[tokio::test]
async fn test_storage_constraints_surface_as_execution_errors() {
    let store = create_test_store().await;

    let err = store
        .create("Post", record(json!({"title": "orphan", "author": 404})))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Sql(_)));
    assert!(!err.is_client_error());

    store
        .create("Member", record(json!({"name": "Ann", "email": "ann@example.com"})))
        .await
        .unwrap();
    let err = store
        .create("Member", record(json!({"name": "Bob", "email": "ann@example.com"})))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Sql(_)));
}
