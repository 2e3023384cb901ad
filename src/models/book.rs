//! Book (inventory record) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Book record. `isbn` is the immutable key; everything but `n_copies` is
/// fixed once the book exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub authors: Vec<String>,
    pub pages: i32,
    pub year: i32,
    pub publisher: String,
    /// Number of copies owned, independent of loans
    #[serde(rename = "nCopies")]
    pub n_copies: i32,
}

impl Book {
    /// Text fed to the search index: title followed by the authors
    pub fn search_text(&self) -> String {
        let mut text = self.title.clone();
        for author in &self.authors {
            text.push(' ');
            text.push_str(author);
        }
        text
    }

    /// First bibliographic field on which `other` disagrees with this record,
    /// checked in the order title, authors, pages, year, publisher.
    /// `n_copies` is never compared.
    pub fn inconsistent_field(&self, other: &Book) -> Option<&'static str> {
        if self.title != other.title {
            Some("title")
        } else if self.authors != other.authors {
            Some("authors")
        } else if self.pages != other.pages {
            Some("pages")
        } else if self.year != other.year {
            Some("year")
        } else if self.publisher != other.publisher {
            Some("publisher")
        } else {
            None
        }
    }
}
