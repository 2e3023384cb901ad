//! Data models for the lending library

pub mod book;
pub mod loan;

// Re-export commonly used types
pub use book::Book;
pub use loan::Lend;
