//! Business logic services

pub mod library;
pub mod locks;
pub mod validation;

pub use library::LendingLibrary;
