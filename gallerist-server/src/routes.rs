use std::any::Any;

use axum::{
    Router,
    body::Body,
    http::{Method, Response, StatusCode},
    response::IntoResponse,
    routing::get,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers,
    infra::{app_state::AppState, errors::AppError},
};

/// Full application router with middleware, ready to serve.
pub fn create_app(state: AppState) -> Router {
    with_middleware(create_api_router().with_state(state))
}

/// CORS, request tracing and panic recovery, outermost first.
pub fn with_middleware(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(handlers::ping_handler))
        .route("/gallery", get(handlers::get_gallery))
        .route("/filters", get(handlers::get_filters))
        .route("/image", get(handlers::get_image))
        .route("/video", get(handlers::get_video))
        .fallback(not_found)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ]))
}

async fn not_found() -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "route not found")
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };
    AppError::internal(detail).into_response()
}
