//! Book inventory and search endpoints

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::{error::AppResult, models::Book, AppState};

use super::{json_body, query_object};

/// Add one or more copies of a book
#[utoipa::path(
    put,
    path = "/books",
    tag = "books",
    request_body = Book,
    responses(
        (status = 201, description = "Book created or copies added", body = Book),
        (status = 400, description = "Invalid or inconsistent book", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_book(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let req = json_body(body)?;
    let book = state.library.add_book(&req).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Find books matching all search words
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(
        ("search" = String, Query, description = "Words to match in title and authors"),
        ("index" = Option<i64>, Query, description = "Offset into sorted results (default: 0)"),
        ("count" = Option<i64>, Query, description = "Maximum results (default: page size)")
    ),
    responses(
        (status = 200, description = "Matching books sorted by title", body = Vec<Book>),
        (status = 400, description = "Invalid search", body = crate::error::ErrorResponse)
    )
)]
pub async fn find_books(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<Book>>> {
    let req = query_object(params, &["index", "count"]);
    let books = state.library.find_books(&req).await?;
    Ok(Json(books))
}

/// Get a book by ISBN
#[utoipa::path(
    get,
    path = "/books/{isbn}",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 400, description = "Unknown book", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.library.get_book(&isbn).await?;
    Ok(Json(book))
}
