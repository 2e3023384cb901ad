//! API integration tests, run in process against the router

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use lending_library_server::{
    api,
    config::AppConfig,
    repository::PgStore,
    AppState, LendingLibrary,
};

const KR: &str = "0-13-110362-8";

fn app_with(library: LendingLibrary) -> Router {
    api::router(AppState {
        library: Arc::new(library),
    })
}

fn app() -> Router {
    app_with(LendingLibrary::in_memory(&AppConfig::default().library))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn kr() -> Value {
    json!({
        "isbn": KR,
        "title": "The C Programming Language",
        "authors": ["Kernighan", "Ritchie"],
        "pages": 272,
        "year": 1978,
        "publisher": "Prentice Hall",
        "nCopies": 2
    })
}

fn lend(patron: &str) -> Option<Value> {
    Some(json!({ "isbn": KR, "patronId": patron }))
}

fn first_error(body: &Value) -> (&str, Option<&str>) {
    let error = &body["errors"][0];
    (error["code"].as_str().unwrap(), error["widget"].as_str())
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_checkout_scenario() {
    let app = app();

    let (status, body) = send(&app, Method::PUT, "/api/books", Some(kr())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["nCopies"], 2);

    let (status, _) = send(&app, Method::PUT, "/api/lendings", lend("alice")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::PUT, "/api/lendings", lend("alice")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body), ("BAD_REQ", Some("isbn")));

    let (status, _) = send(&app, Method::PUT, "/api/lendings", lend("bob")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::PUT, "/api/lendings", lend("carol")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body).0, "BAD_REQ");

    let (status, _) = send(&app, Method::DELETE, "/api/lendings", lend("alice")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::PUT, "/api/lendings", lend("carol")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, "/api/books?search=kernighan%20c", None).await;
    assert_eq!(status, StatusCode::OK);
    let books = body.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["isbn"], KR);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/lendings?findBy=isbn&isbn={}", KR),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "isbn": KR, "patronId": "bob" },
            { "isbn": KR, "patronId": "carol" }
        ])
    );
}

#[tokio::test]
async fn test_add_book_reports_all_field_errors() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/books",
        Some(json!({ "isbn": KR, "title": 42, "pages": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let widgets: Vec<_> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| (e["code"].as_str().unwrap(), e["widget"].as_str().unwrap()))
        .collect();
    assert_eq!(
        widgets,
        vec![
            ("BAD_TYPE", "title"),
            ("MISSING", "authors"),
            ("BAD_REQ", "pages"),
            ("MISSING", "year"),
            ("MISSING", "publisher"),
        ]
    );
}

#[tokio::test]
async fn test_malformed_json_body() {
    let app = app();
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/api/books")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inconsistent_readd() {
    let app = app();
    send(&app, Method::PUT, "/api/books", Some(kr())).await;

    let mut changed = kr();
    changed["year"] = json!(1988);
    let (status, body) = send(&app, Method::PUT, "/api/books", Some(changed)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body).0, "BAD_REQ");

    let (status, body) = send(&app, Method::GET, &format!("/api/books/{}", KR), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["year"], 1978);
    assert_eq!(body["nCopies"], 2);
}

#[tokio::test]
async fn test_find_books_query_errors() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api/books", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body), ("MISSING", Some("search")));

    let (status, body) = send(&app, Method::GET, "/api/books?search=x", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body), ("BAD_REQ", Some("search")));

    let (status, body) = send(&app, Method::GET, "/api/books?search=rust&count=many", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body), ("BAD_TYPE", Some("count")));

    let (status, body) = send(&app, Method::GET, "/api/books?search=rust&index=1.5", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body), ("BAD_REQ", Some("index")));

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/books?search=rust&count=99999999999999999999",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body), ("BAD_REQ", Some("count")));
}

#[tokio::test]
async fn test_unknown_book() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/books/nope", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body), ("BAD_REQ", Some("isbn")));

    let (status, _) = send(&app, Method::DELETE, "/api/lendings", lend("alice")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore] // Run with: DATABASE_URL=... cargo test -- --ignored
async fn test_postgres_backend_scenario() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    let store = PgStore::new(pool);
    store.migrate().await.expect("Failed to run migrations");

    let library = LendingLibrary::new(Arc::new(store), &AppConfig::default().library);
    library.clear().await.unwrap();
    let app = app_with(library);

    let (status, _) = send(&app, Method::PUT, "/api/books", Some(kr())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, Method::PUT, "/api/books", Some(kr())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["nCopies"], 4);

    for patron in ["alice", "bob", "carol", "dave"] {
        let (status, _) = send(&app, Method::PUT, "/api/lendings", lend(patron)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    let (status, _) = send(&app, Method::PUT, "/api/lendings", lend("erin")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/api/books?search=RITCHIE%20programming", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::DELETE, "/api/lendings", lend("alice")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
