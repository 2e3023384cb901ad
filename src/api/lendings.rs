//! Checkout and return endpoints

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::{error::AppResult, models::Lend, AppState};

use super::{json_body, query_object};

/// Check out a book to a patron
#[utoipa::path(
    put,
    path = "/lendings",
    tag = "lendings",
    request_body = Lend,
    responses(
        (status = 204, description = "Book checked out"),
        (status = 400, description = "Unknown book, no copy available or already checked out", body = crate::error::ErrorResponse)
    )
)]
pub async fn checkout_book(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<StatusCode> {
    let req = json_body(body)?;
    state.library.checkout_book(&req).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Return a book checked out by a patron
#[utoipa::path(
    delete,
    path = "/lendings",
    tag = "lendings",
    request_body = Lend,
    responses(
        (status = 204, description = "Book returned"),
        (status = 400, description = "No such checkout", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<StatusCode> {
    let req = json_body(body)?;
    state.library.return_book(&req).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List active loans of a book or of a patron
#[utoipa::path(
    get,
    path = "/lendings",
    tag = "lendings",
    params(
        ("findBy" = String, Query, description = "Either `isbn` or `patronId`"),
        ("isbn" = Option<String>, Query, description = "Book ISBN when findBy=isbn"),
        ("patronId" = Option<String>, Query, description = "Patron when findBy=patronId")
    ),
    responses(
        (status = 200, description = "Active loans", body = Vec<Lend>),
        (status = 400, description = "Invalid query", body = crate::error::ErrorResponse)
    )
)]
pub async fn find_lendings(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<Lend>>> {
    let req = query_object(params, &[]);
    let loans = state.library.find_lendings(&req).await?;
    Ok(Json(loans))
}
