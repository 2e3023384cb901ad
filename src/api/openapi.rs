//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, lendings};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lending Library API",
        version = "0.1.0",
        description = "Book inventory, search and checkout REST API"
    ),
    servers(
        (url = "/api", description = "Library API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::add_book,
        books::find_books,
        books::get_book,
        // Lendings
        lendings::checkout_book,
        lendings::return_book,
        lendings::find_lendings,
    ),
    components(
        schemas(
            crate::models::Book,
            crate::models::Lend,
            health::HealthResponse,
            crate::error::ErrorCode,
            crate::error::FieldError,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book inventory and search"),
        (name = "lendings", description = "Checkouts and returns")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_library_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
        assert!(paths.contains(&"/books".to_string()));
        assert!(paths.contains(&"/books/{isbn}".to_string()));
        assert!(paths.contains(&"/lendings".to_string()));
    }
}
