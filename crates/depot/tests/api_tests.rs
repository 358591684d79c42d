//! API integration tests.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tower::ServiceExt;

mod common;
use common::test_app;

const BOUNDARY: &str = "X-DEPOT-TEST-BOUNDARY";

/// Build a multipart/form-data body by hand.
fn multipart_body(file: Option<(&str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some((filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(file: Option<(&str, &[u8])>, fields: &[(&str, &str)]) -> Request<Body> {
    Request::builder()
        .uri("/packages")
        .method(Method::POST)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(file, fields)))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_catalog_starts_empty() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/packages")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_upload_creates_catalog_record() {
    let (app, _dir) = test_app().await;
    let data = b"MZ fake installer bytes";

    let response = app
        .clone()
        .oneshot(upload_request(
            Some(("setup.exe", data)),
            &[("name", "Tool"), ("version", "1.0")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let package = body_json(response).await;
    assert_eq!(package["name"], "Tool");
    assert_eq!(package["version"], "1.0");
    assert_eq!(package["typeHint"], "exe");
    assert_eq!(package["sizeBytes"], data.len() as u64);
    assert_eq!(
        package["sha256"].as_str().unwrap(),
        hex::encode(Sha256::digest(data))
    );
    let filename = package["filename"].as_str().unwrap();
    let id = package["id"].as_str().unwrap();
    assert!(filename.starts_with(id));
    assert!(filename.ends_with("_setup.exe"));

    // The record is listed afterwards.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/packages")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], package["id"]);

    // And the stored bytes come back unmodified.
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/packages/{filename}"))
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
        .await
        .unwrap();
    assert_eq!(&bytes[..], data);
}

#[tokio::test]
async fn test_repeated_uploads_of_same_name_stay_distinct() {
    let (app, _dir) = test_app().await;

    for payload in [b"first".as_slice(), b"second".as_slice()] {
        let response = app
            .clone()
            .oneshot(upload_request(Some(("setup.exe", payload)), &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/packages")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let listed = body_json(response).await;
    let packages = listed.as_array().unwrap();
    assert_eq!(packages.len(), 2);
    assert_ne!(packages[0]["id"], packages[1]["id"]);
    assert_ne!(packages[0]["filename"], packages[1]["filename"]);
}

#[tokio::test]
async fn test_upload_without_file_is_client_error() {
    let (app, _dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(upload_request(None, &[("name", "Tool")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");

    // No record was created.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/packages")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_download_unknown_package_not_found() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/packages/no-such-file.exe")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_agents_starts_empty() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/agents")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}
