mod support;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    routing::get,
};
use gallerist_server::routes::{create_api_router, with_middleware};
use serde_json::json;
use support::{TestApp, build_test_app, encode, write_png};

#[tokio::test]
async fn empty_gallery_has_no_next_page() {
    let app = build_test_app(10).unwrap();

    let response = app.get("/gallery").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({ "items": [], "hasNext": false, "offset": 1 })
    );
    assert_eq!(
        response.header("cache-control"),
        Some("public, max-age=31536000, immutable")
    );
}

#[tokio::test]
async fn pages_through_two_images_one_at_a_time() {
    let app = build_test_app(1).unwrap();
    write_png(&app.path("a.png"), 100, 100);
    write_png(&app.path("b.png"), 200, 200);
    let root = encode(app.media_root());

    let first = app
        .get(&format!("/gallery?galleryId={root}&offset=0&sort=name"))
        .await
        .json();
    assert_eq!(first["hasNext"], true);
    assert_eq!(first["offset"], 1);
    assert_eq!(first["items"][0]["name"], "a.png");
    assert_eq!(first["items"][0]["width"], 100);
    assert_eq!(first["items"][0]["urls"][1]["width"], 25);

    let second = app
        .get(&format!("/gallery?galleryId={root}&offset=1&sort=name"))
        .await
        .json();
    assert_eq!(second["hasNext"], false);
    assert_eq!(second["offset"], 2);
    assert_eq!(second["items"][0]["name"], "b.png");
    assert_eq!(second["items"][0]["isGallery"], false);
}

#[tokio::test]
async fn folders_are_galleries_with_cover_dimensions() {
    let app = build_test_app(10).unwrap();
    write_png(&app.path("trip/day1/cover.png"), 40, 20);

    let body = app
        .get("/gallery?filters%5B%5D=type%7Cdirectory")
        .await
        .json();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "trip");
    assert_eq!(items[0]["isGallery"], true);
    assert_eq!(items[0]["width"], 40);
    assert_eq!(items[0]["height"], 20);
}

#[tokio::test]
async fn content_filter_hides_images() {
    let app = build_test_app(10).unwrap();
    write_png(&app.path("a.png"), 8, 8);

    let response = app.get("/gallery?filters=contentType%7Cvideo").await;
    assert_eq!(
        response.json(),
        json!({ "items": [], "hasNext": false, "offset": 1 })
    );
}

#[tokio::test]
async fn rejects_bad_sort_filter_and_missing_gallery() {
    let app = build_test_app(10).unwrap();

    assert_eq!(app.get("/gallery?sort=sideways").await.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        app.get("/gallery?filters=colour%7Cred").await.status,
        StatusCode::BAD_REQUEST
    );

    let missing = app.path("nope");
    let response = app
        .get(&format!("/gallery?galleryId={}", encode(&missing)))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.json()["message"].is_string());
}

#[tokio::test]
async fn lists_filters_by_section() {
    let app = build_test_app(10).unwrap();

    let all = app.get("/filters").await.json();
    assert_eq!(all.as_array().unwrap().len(), 4);

    let content = app.get("/filters?filter=contentType").await.json();
    assert_eq!(
        content,
        json!([
            { "id": "contentType|image", "filterSectionId": "contentType", "name": "Image" },
            { "id": "contentType|video", "filterSectionId": "contentType", "name": "Video" },
        ])
    );

    let unknown = app.get("/filters?filter=colour").await.json();
    assert_eq!(unknown, json!([]));
}

#[tokio::test]
async fn unknown_routes_and_methods() {
    let app = build_test_app(10).unwrap();

    let missing = app.get("/nowhere").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json()["message"], "route not found");

    let post = app
        .request(Request::post("/gallery").body(Body::empty()).unwrap())
        .await;
    assert_eq!(post.status, StatusCode::METHOD_NOT_ALLOWED);

    let ping = app.get("/ping").await.json();
    assert_eq!(ping["status"], "ok");
}

#[tokio::test]
async fn repeated_requests_reuse_the_cached_crawl() {
    let app = build_test_app(10).unwrap();
    write_png(&app.path("a.png"), 8, 8);

    app.get("/gallery").await;
    app.get("/gallery?offset=0").await;
    assert_eq!(app.state.cache().len(), 1);

    app.get("/gallery?sort=size").await;
    assert_eq!(app.state.cache().len(), 2);
}

#[tokio::test]
async fn cross_origin_requests_are_allowed() {
    let app = build_test_app(10).unwrap();

    let simple = app
        .request(
            Request::get("/ping")
                .header("origin", "http://viewer.local")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(simple.status, StatusCode::OK);
    assert_eq!(simple.header("access-control-allow-origin"), Some("*"));

    let preflight = app
        .request(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/gallery")
                .header("origin", "http://viewer.local")
                .header("access-control-request-method", "DELETE")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert!(preflight.status.is_success());
    assert_eq!(preflight.header("access-control-allow-origin"), Some("*"));
    let methods: Vec<String> = preflight
        .header("access-control-allow-methods")
        .unwrap()
        .split(',')
        .map(|method| method.trim().to_string())
        .collect();
    assert_eq!(methods, ["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE"]);
}

async fn explode() -> &'static str {
    panic!("kaboom")
}

#[tokio::test]
async fn handler_panics_become_internal_errors() {
    let app = build_test_app(10).unwrap();
    let router = with_middleware(
        create_api_router()
            .route("/explode", get(explode))
            .with_state(app.state.clone()),
    );
    let app = TestApp { router, ..app };

    let response = app.get("/explode").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json();
    assert_eq!(body["message"], "kaboom");
    assert!(body["stack"].is_string());

    // The server keeps serving after a panic.
    assert_eq!(app.get("/ping").await.status, StatusCode::OK);
}
