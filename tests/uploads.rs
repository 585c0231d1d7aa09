mod common;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use common::{login, seed_user, send, setup, TestApp};

const BOUNDARY: &str = "x-test-boundary";

fn multipart_body(kind: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"kind\"\r\n\r\n{kind}\r\n"
        )
        .as_bytes(),
    );
    out.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    out.extend_from_slice(data);
    out.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    out
}

async fn upload(
    t: &TestApp,
    token: &str,
    property_id: i64,
    kind: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/properties/{property_id}/images"))
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(kind, filename, content_type, data)))?;

    let response = t.app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

async fn seeded_property(t: &TestApp, token: &str) -> Result<i64> {
    let (_, created) = send(
        &t.app,
        "POST",
        "/api/properties",
        Some(token),
        Some(json!({ "title": "Casa com fotos", "price": 1000 })),
    )
    .await?;
    Ok(created["id"].as_i64().unwrap())
}

#[tokio::test]
async fn gallery_upload_stores_file_and_appends_url() -> Result<()> {
    let t = setup().await?;
    seed_user(&t.pool, "Ana", "ana@example.com", "password123", "corretor", true).await?;
    let ana = login(&t.app, "ana@example.com", "password123").await?;
    let id = seeded_property(&t, &ana).await?;

    let (status, body) = upload(&t, &ana, id, "gallery", "sala.jpg", "image/jpeg", b"jpegdata").await?;
    assert_eq!(status, StatusCode::CREATED);
    let url = body["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/"));

    // the blob is on disk under the upload root
    let relative = url.strip_prefix("/uploads/").unwrap();
    assert!(t.upload_dir.join(relative).exists());

    // and the property carries the URL
    let (_, property) = send(&t.app, "GET", &format!("/api/properties/{id}"), Some(&ana), None).await?;
    assert_eq!(property["gallery_images"], json!([url]));

    Ok(())
}

#[tokio::test]
async fn banner_upload_replaces_previous_banner() -> Result<()> {
    let t = setup().await?;
    seed_user(&t.pool, "Ana", "ana@example.com", "password123", "corretor", true).await?;
    let ana = login(&t.app, "ana@example.com", "password123").await?;
    let id = seeded_property(&t, &ana).await?;

    let (_, first) = upload(&t, &ana, id, "banner", "a.png", "image/png", b"one").await?;
    let (status, second) = upload(&t, &ana, id, "banner", "b.png", "image/png", b"two").await?;
    assert_eq!(status, StatusCode::CREATED);

    let first_url = first["url"].as_str().unwrap();
    let second_url = second["url"].as_str().unwrap();

    let (_, property) = send(&t.app, "GET", &format!("/api/properties/{id}"), Some(&ana), None).await?;
    assert_eq!(property["banner_image"], second_url);

    // the replaced blob is gone from disk
    let relative = first_url.strip_prefix("/uploads/").unwrap();
    assert!(!t.upload_dir.join(relative).exists());

    Ok(())
}

#[tokio::test]
async fn upload_rejects_bad_kind_and_bad_type() -> Result<()> {
    let t = setup().await?;
    seed_user(&t.pool, "Ana", "ana@example.com", "password123", "corretor", true).await?;
    let ana = login(&t.app, "ana@example.com", "password123").await?;
    let id = seeded_property(&t, &ana).await?;

    let (status, _) = upload(&t, &ana, id, "poster", "a.jpg", "image/jpeg", b"x").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = upload(&t, &ana, id, "gallery", "a.pdf", "application/pdf", b"x").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = upload(&t, &ana, id, "gallery", "empty.jpg", "image/jpeg", b"").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn only_the_owner_or_admin_manages_images() -> Result<()> {
    let t = setup().await?;
    seed_user(&t.pool, "Ana", "ana@example.com", "password123", "corretor", true).await?;
    seed_user(&t.pool, "Beto", "beto@example.com", "password123", "corretor", true).await?;
    seed_user(&t.pool, "Admin", "admin@example.com", "password123", "admin", true).await?;
    let ana = login(&t.app, "ana@example.com", "password123").await?;
    let beto = login(&t.app, "beto@example.com", "password123").await?;
    let admin = login(&t.app, "admin@example.com", "password123").await?;
    let id = seeded_property(&t, &ana).await?;

    let (status, _) = upload(&t, &beto, id, "gallery", "a.jpg", "image/jpeg", b"x").await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = upload(&t, &admin, id, "gallery", "a.jpg", "image/jpeg", b"x").await?;
    assert_eq!(status, StatusCode::CREATED);

    Ok(())
}

#[tokio::test]
async fn delete_image_removes_url_and_blob() -> Result<()> {
    let t = setup().await?;
    seed_user(&t.pool, "Ana", "ana@example.com", "password123", "corretor", true).await?;
    let ana = login(&t.app, "ana@example.com", "password123").await?;
    let id = seeded_property(&t, &ana).await?;

    let (_, uploaded) = upload(&t, &ana, id, "floor_plan", "planta.png", "image/png", b"plan").await?;
    let url = uploaded["url"].as_str().unwrap().to_string();

    let (status, _) = send(
        &t.app,
        "DELETE",
        &format!("/api/properties/{id}/images"),
        Some(&ana),
        Some(json!({ "kind": "floor_plan", "url": url })),
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, property) = send(&t.app, "GET", &format!("/api/properties/{id}"), Some(&ana), None).await?;
    assert_eq!(property["floor_plans"], json!([]));

    let relative = url.strip_prefix("/uploads/").unwrap();
    assert!(!t.upload_dir.join(relative).exists());

    // deleting a URL the property never had is a 404
    let (status, _) = send(
        &t.app,
        "DELETE",
        &format!("/api/properties/{id}/images"),
        Some(&ana),
        Some(json!({ "kind": "gallery", "url": "/uploads/1/nope.jpg" })),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn uploaded_file_is_served_publicly() -> Result<()> {
    let t = setup().await?;
    seed_user(&t.pool, "Ana", "ana@example.com", "password123", "corretor", true).await?;
    let ana = login(&t.app, "ana@example.com", "password123").await?;
    let id = seeded_property(&t, &ana).await?;

    let (_, uploaded) = upload(&t, &ana, id, "gallery", "sala.webp", "image/webp", b"webpdata").await?;
    let url = uploaded["url"].as_str().unwrap();

    // no session needed to fetch the image itself
    let request = Request::builder().method("GET").uri(url).body(Body::empty())?;
    let response = t.app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body::to_bytes(response.into_body(), 10_485_760).await?;
    assert_eq!(&bytes[..], b"webpdata");

    Ok(())
}
