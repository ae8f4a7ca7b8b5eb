#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode},
};
use gallerist_server::{
    infra::{app_context::AppContext, app_state::AppState, config::Config},
    routes::create_app,
};
use image::{ImageBuffer, Rgb};
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Debug)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub media: TempDir,
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    pub fn media_root(&self) -> &Path {
        self.media.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.media.path().join(relative)
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_with_range(&self, uri: &str, range: &str) -> TestResponse {
        self.request(
            Request::get(uri)
                .header("range", range)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// App over an empty temporary media root with a small page size.
pub fn build_test_app(page_size: usize) -> Result<TestApp> {
    let media = tempfile::tempdir().context("failed to create media directory")?;
    let config = Config {
        media_root: Some(media.path().to_path_buf()),
        page_size,
        cache_capacity: 8,
        probe_concurrency: 2,
        ..Config::default()
    };
    config.validate()?;

    let state = AppState::new(AppContext::new(config));
    Ok(TestApp {
        router: create_app(state.clone()),
        state,
        media,
    })
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    ImageBuffer::from_pixel(width, height, Rgb([120u8, 60, 30]))
        .save(path)
        .unwrap();
}

pub fn encode(value: &Path) -> String {
    url::form_urlencoded::byte_serialize(value.to_string_lossy().as_bytes()).collect()
}
