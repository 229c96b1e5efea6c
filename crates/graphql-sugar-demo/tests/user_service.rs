//! End-to-end tests for the user service schema.

use std::sync::Once;

use async_graphql::dynamic::Schema;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use graphql_sugar::ParserRegistry;
use graphql_sugar_demo::config::{AppConfig, GraphQLConfig};
use graphql_sugar_demo::{UserStore, build_app, build_schema, register_parsers};
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tower::ServiceExt;

fn registry() -> &'static ParserRegistry {
    static INIT: Once = Once::new();
    INIT.call_once(register_parsers);
    graphql_sugar::registry::freeze()
}

fn schema_with(store: UserStore) -> Schema {
    build_schema(registry(), store, &GraphQLConfig::default()).expect("schema should build")
}

#[tokio::test]
async fn test_query_seeded_user() {
    let schema = schema_with(UserStore::seeded());
    let response = schema
        .execute(r#"{ user(id: "bob") { id name joinedAt numberOfChildren favoriteMovies } }"#)
        .await;

    assert!(response.errors.is_empty(), "errors: {:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({
            "user": {
                "id": "bob",
                "name": "Bob Loblaw",
                "joinedAt": "2012-02-03T09:19:38.000004213Z",
                "numberOfChildren": 7,
                "favoriteMovies": ["The Shawshank Redemption", "Weekend at Bernie's 2"]
            }
        })
    );
}

#[tokio::test]
async fn test_query_unknown_user() {
    let schema = schema_with(UserStore::seeded());
    let response = schema.execute(r#"{ user(id: "gob") { id } }"#).await;

    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "user gob not found");
}

#[tokio::test]
async fn test_save_user_assigns_joined_at() {
    let store = UserStore::seeded();
    let schema = schema_with(store.clone());
    let before = OffsetDateTime::now_utc();

    let response = schema
        .execute(
            r#"mutation {
                saveUser(id: "lindsay", name: "Lindsay Bluth", favoriteMovies: ["Wee Britain"]) {
                    id
                    name
                    numberOfChildren
                    favoriteMovies
                    joinedAt
                }
            }"#,
        )
        .await;

    assert!(response.errors.is_empty(), "errors: {:?}", response.errors);
    let data = response.data.into_json().unwrap();
    let saved = &data["saveUser"];
    assert_eq!(saved["id"], "lindsay");
    assert_eq!(saved["name"], "Lindsay Bluth");
    assert_eq!(saved["numberOfChildren"], 0);
    assert_eq!(saved["favoriteMovies"], json!(["Wee Britain"]));

    let joined_at =
        OffsetDateTime::parse(saved["joinedAt"].as_str().unwrap(), &Rfc3339).unwrap();
    assert!(joined_at >= before);

    let stored = store.get("lindsay").expect("user should be stored");
    assert_eq!(stored.joined_at, joined_at);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_saved_user_is_queryable() {
    let schema = schema_with(UserStore::default());
    let response = schema
        .execute(r#"mutation { saveUser(id: "tobias", name: "Tobias Fünke", numberOfChildren: 1) { id } }"#)
        .await;
    assert!(response.errors.is_empty(), "errors: {:?}", response.errors);

    let response = schema
        .execute(r#"{ user(id: "tobias") { name numberOfChildren } }"#)
        .await;
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({ "user": { "name": "Tobias Fünke", "numberOfChildren": 1 } })
    );
}

#[tokio::test]
async fn test_save_user_missing_required_argument() {
    let schema = schema_with(UserStore::default());
    let response = schema
        .execute(r#"mutation { saveUser(name: "Bob Loblaw") { id } }"#)
        .await;

    // Non-null argument types reject the request before the resolver runs.
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].message.contains("id"));
}

#[tokio::test]
async fn test_save_user_argument_schema() {
    let schema = schema_with(UserStore::default());
    let sdl = schema.sdl();

    assert!(sdl.contains("id: String!"));
    assert!(sdl.contains("name: String!"));
    assert!(sdl.contains("numberOfChildren: Int"));
    assert!(sdl.contains("favoriteMovies: [String]"));
    assert!(sdl.contains("scalar DateTime"));
}

#[tokio::test]
async fn test_graphql_endpoint() {
    let app = build_app(&AppConfig::default(), schema_with(UserStore::seeded()));

    let body = json!({ "query": r#"{ user(id: "bob") { name } }"# }).to_string();
    let response = app
        .oneshot(
            Request::post("/graphql")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json, json!({ "data": { "user": { "name": "Bob Loblaw" } } }));
}

#[tokio::test]
async fn test_graphiql_can_be_disabled() {
    let mut cfg = AppConfig::default();
    cfg.graphql.graphiql = false;
    let app = build_app(&cfg, schema_with(UserStore::default()));

    let response = app
        .oneshot(Request::get("/graphql").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
