#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

use imovia::create_app_with_store;
use imovia::storage::LocalImageStore;
use imovia::utils::hash_password;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub upload_dir: PathBuf,
    // tempdir is dropped (and deleted) together with the app
    _dir: TempDir,
}

pub async fn setup() -> Result<TestApp> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    std::env::set_var("SESSION_SECRET", "test-secret");

    let upload_dir = dir.path().join("uploads");
    let store = LocalImageStore::new(&upload_dir);
    let app = create_app_with_store(pool.clone(), Arc::new(store), upload_dir.clone()).await?;

    Ok(TestApp {
        app,
        pool,
        upload_dir,
        _dir: dir,
    })
}

/// Insert a user directly; registration always produces an inactive corretor,
/// so tests needing an admin or an active account seed one here.
pub async fn seed_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
    active: bool,
) -> Result<i64> {
    let password_hash = hash_password(password)?;
    let now = chrono::Utc::now();

    let result = sqlx::query(
        "INSERT INTO users (name, email, password_hash, role, active, equipe, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, NULL, ?, ?)",
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(active)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn login(app: &Router, email: &str, password: &str) -> Result<String> {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::OK, "login failed: {status} - {body}");

    body.get("token")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .context("missing token in login response")
}

/// Fire a JSON request through the router and parse the JSON response body
/// (Null when the response has no body).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    payload: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    let request = match payload {
        Some(payload) => builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };

    Ok((status, value))
}
