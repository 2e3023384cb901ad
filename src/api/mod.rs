//! API handlers for the lending library REST endpoints

pub mod books;
pub mod health;
pub mod lendings;
pub mod openapi;

use std::collections::HashMap;

use axum::{
    extract::rejection::JsonRejection,
    routing::get,
    Json, Router,
};
use serde_json::{Map, Number, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult, ErrorCode, FieldError},
    AppState,
};

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books
        .route("/books", get(books::find_books).put(books::add_book))
        .route("/books/:isbn", get(books::get_book))
        // Lendings
        .route(
            "/lendings",
            get(lendings::find_lendings)
                .put(lendings::checkout_book)
                .delete(lendings::return_book),
        )
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Unwrap a JSON body, reporting unparsable input in the API error format
pub(crate) fn json_body(body: Result<Json<Value>, JsonRejection>) -> AppResult<Value> {
    body.map(|Json(value)| value).map_err(|rejection| {
        AppError::Validation(vec![FieldError::global(
            ErrorCode::BadType,
            rejection.body_text(),
        )])
    })
}

/// Turn query parameters into a request object. Parameters named in
/// `numeric` become JSON numbers when they parse as such and stay strings
/// otherwise, so the validator can report them as BAD_TYPE.
pub(crate) fn query_object(params: HashMap<String, String>, numeric: &[&str]) -> Value {
    let object: Map<String, Value> = params
        .into_iter()
        .map(|(key, raw)| {
            let value = if numeric.contains(&key.as_str()) {
                parse_number(&raw).unwrap_or(Value::String(raw))
            } else {
                Value::String(raw)
            };
            (key, value)
        })
        .collect();
    Value::Object(object)
}

/// Integer or finite float, as a JSON body would carry it
fn parse_number(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Value::from(n));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_object() {
        let params = HashMap::from([
            ("search".to_string(), "10 rust".to_string()),
            ("index".to_string(), "3".to_string()),
            ("count".to_string(), "lots".to_string()),
        ]);
        let value = query_object(params, &["index", "count"]);
        assert_eq!(value["search"], "10 rust");
        assert_eq!(value["index"], 3);
        assert_eq!(value["count"], "lots");
    }

    #[test]
    fn test_query_object_non_integer_numbers() {
        let params = HashMap::from([
            ("index".to_string(), "1.5".to_string()),
            ("count".to_string(), "99999999999999999999".to_string()),
            ("search".to_string(), "inf".to_string()),
        ]);
        let value = query_object(params, &["index", "count", "search"]);
        assert_eq!(value["index"], 1.5);
        assert!(value["count"].is_f64());
        assert_eq!(value["search"], "inf");
    }
}
