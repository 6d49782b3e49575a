use crate::test_app;
use axum::{
    Router,
    body::{Body, Bytes, HttpBody},
    http::{Request, Response, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use libqrtrack::storage::{DynBackend, JsonFileBackend};
use std::sync::Arc;
use tempfile::TempDir;
use test_log::test;
use tower::Service;


const MAP_KEY: &str = "test-map-key";

/// collects a response body into a string. Note that this consumes the body.
async fn body_string<B>(body: B) -> String
where
    B: HttpBody<Data = Bytes>,
    B::Error: std::fmt::Debug,
{
    let bytes = body
        .collect()
        .await
        .expect("failed to collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("body is not utf8")
}

/// An app that stores its location in a json file in a fresh temporary
/// directory. Keep the directory alive for as long as the app is used.
fn json_file_app() -> (Router, DynBackend, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let storage: DynBackend = Arc::new(JsonFileBackend::new(dir.path().join("location.json")));
    let (app, _state) = test_app(storage.clone(), Some(MAP_KEY));
    (app, storage, dir)
}

async fn get(app: &mut Router, uri: &str) -> Response<Body> {
    let req = Request::builder()
        .uri(uri)
        .method("GET")
        .body(Body::empty())
        .expect("Failed to build request");
    app.as_service()
        .call(req)
        .await
        .expect("Failed to execute request")
}

async fn post_json(app: &mut Router, uri: &str, body: &str) -> Response<Body> {
    let req = Request::builder()
        .uri(uri)
        .method("POST")
        .header(CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .expect("Failed to build request");
    app.as_service()
        .call(req)
        .await
        .expect("Failed to execute request")
}

#[test(tokio::test)]
async fn test_health() {
    let (mut app, _storage, _dir) = json_file_app();
    let response = get(&mut app, "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_str(&body_string(response.into_body()).await).expect("json body");
    assert_eq!(body["status"], "healthy");
}

#[test(tokio::test)]
async fn test_static_files() {
    let (mut app, _storage, _dir) = json_file_app();
    let response = get(&mut app, "/static/style.css").await;
    assert_eq!(response.status(), StatusCode::OK);
}
