use axum::{
    http::{Method, StatusCode},
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    api::AppState,
    middleware::{make_span_with_request_id, request_id_middleware},
};

pub mod status;
pub mod titles;
pub mod tracked;
pub mod updates;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        // Outermost so the trace span sees the request ID
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors_layer())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/titles/search", get(titles::search))
        .route("/users/:user/titles/:show_type/:id", get(titles::details))
        .route(
            "/users/:user/titles/:show_type/:id/status",
            post(status::fetch_status),
        )
        .route(
            "/users/:user/tracked",
            get(tracked::list).delete(tracked::clear),
        )
        .route("/users/:user/tracked/toggle", post(tracked::toggle))
        .route("/users/:user/tracked/:id", put(tracked::update))
        .route("/users/:user/updates", get(updates::feeds))
        .route("/users/:user/updates/upcoming", get(updates::upcoming))
        .route("/users/:user/updates/recent", get(updates::recent))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::library::MockPersistedLibrary,
        middleware::request_id::REQUEST_ID_HEADER,
        services::{catalog::MockCatalogClient, status::MockStatusClient},
    };
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;
    use std::sync::Arc;

    fn test_server() -> TestServer {
        let mut library = MockPersistedLibrary::new();
        library.expect_load().returning(|_| Ok(None));
        library.expect_name().return_const("mock");

        let router = create_router(AppState::new(
            Arc::new(MockCatalogClient::new()),
            Arc::new(MockStatusClient::new()),
            Arc::new(library),
            7,
        ));
        TestServer::new(router).unwrap()
    }

    #[tokio::test]
    async fn test_health_generates_request_id() {
        let response = test_server().get("/health").await;

        response.assert_status_ok();
        let request_id = response.header(REQUEST_ID_HEADER);
        assert!(uuid::Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_client_request_id_is_echoed() {
        let response = test_server()
            .get("/health")
            .add_header(
                HeaderName::from_static(REQUEST_ID_HEADER),
                HeaderValue::from_static("ios-1234"),
            )
            .await;

        assert_eq!(response.header(REQUEST_ID_HEADER), "ios-1234");
    }

    #[tokio::test]
    async fn test_unknown_show_type_is_rejected() {
        let response = test_server()
            .get("/api/v1/users/alice/titles/podcast/1")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
