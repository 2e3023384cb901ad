//! Loan (lend) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// An active loan: `patron_id` currently holds a copy of `isbn`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lend {
    pub isbn: String,
    pub patron_id: String,
}

impl Lend {
    pub fn new(isbn: impl Into<String>, patron_id: impl Into<String>) -> Self {
        Self {
            isbn: isbn.into(),
            patron_id: patron_id.into(),
        }
    }
}
