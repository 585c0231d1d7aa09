mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{login, seed_user, send, setup};

#[tokio::test]
async fn contact_form_requires_name_and_phone() -> Result<()> {
    let t = setup().await?;

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/leads",
        None,
        Some(json!({ "name": "", "phone": "+55 11 90000-0000" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/leads",
        None,
        Some(json!({ "name": "Visitante", "phone": "  " })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn contact_form_rejects_unknown_property() -> Result<()> {
    let t = setup().await?;

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/leads",
        None,
        Some(json!({ "name": "Visitante", "phone": "+55 11 90000-0000", "property_id": 999 })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn new_leads_start_in_status_new() -> Result<()> {
    let t = setup().await?;

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/leads",
        None,
        Some(json!({ "name": "Visitante", "phone": "+55 11 90000-0000", "email": "v@example.com" })),
    )
    .await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "new");
    assert_eq!(body["property_id"], json!(null));

    Ok(())
}

#[tokio::test]
async fn corretor_only_sees_leads_on_own_listings() -> Result<()> {
    let t = setup().await?;
    seed_user(&t.pool, "Admin", "admin@example.com", "password123", "admin", true).await?;
    seed_user(&t.pool, "Ana", "ana@example.com", "password123", "corretor", true).await?;
    seed_user(&t.pool, "Beto", "beto@example.com", "password123", "corretor", true).await?;
    let admin = login(&t.app, "admin@example.com", "password123").await?;
    let ana = login(&t.app, "ana@example.com", "password123").await?;
    let beto = login(&t.app, "beto@example.com", "password123").await?;

    let (_, ana_prop) = send(
        &t.app,
        "POST",
        "/api/properties",
        Some(&ana),
        Some(json!({ "title": "Casa da Ana", "price": 1000 })),
    )
    .await?;
    let (_, beto_prop) = send(
        &t.app,
        "POST",
        "/api/properties",
        Some(&beto),
        Some(json!({ "title": "Casa do Beto", "price": 2000 })),
    )
    .await?;

    send(
        &t.app,
        "POST",
        "/api/leads",
        None,
        Some(json!({ "name": "L1", "phone": "1", "property_id": ana_prop["id"] })),
    )
    .await?;
    send(
        &t.app,
        "POST",
        "/api/leads",
        None,
        Some(json!({ "name": "L2", "phone": "2", "property_id": beto_prop["id"] })),
    )
    .await?;
    // a lead with no property at all
    send(
        &t.app,
        "POST",
        "/api/leads",
        None,
        Some(json!({ "name": "L3", "phone": "3" })),
    )
    .await?;

    let (_, ana_leads) = send(&t.app, "GET", "/api/leads", Some(&ana), None).await?;
    let ana_leads = ana_leads.as_array().unwrap().clone();
    assert_eq!(ana_leads.len(), 1);
    assert_eq!(ana_leads[0]["name"], "L1");

    let (_, all_leads) = send(&t.app, "GET", "/api/leads", Some(&admin), None).await?;
    assert_eq!(all_leads.as_array().unwrap().len(), 3);

    Ok(())
}

#[tokio::test]
async fn lead_status_updates_follow_listing_ownership() -> Result<()> {
    let t = setup().await?;
    seed_user(&t.pool, "Admin", "admin@example.com", "password123", "admin", true).await?;
    seed_user(&t.pool, "Ana", "ana@example.com", "password123", "corretor", true).await?;
    seed_user(&t.pool, "Beto", "beto@example.com", "password123", "corretor", true).await?;
    let admin = login(&t.app, "admin@example.com", "password123").await?;
    let ana = login(&t.app, "ana@example.com", "password123").await?;
    let beto = login(&t.app, "beto@example.com", "password123").await?;

    let (_, prop) = send(
        &t.app,
        "POST",
        "/api/properties",
        Some(&ana),
        Some(json!({ "title": "Casa da Ana", "price": 1000 })),
    )
    .await?;
    let (_, lead) = send(
        &t.app,
        "POST",
        "/api/leads",
        None,
        Some(json!({ "name": "L1", "phone": "1", "property_id": prop["id"] })),
    )
    .await?;
    let lead_id = lead["id"].as_i64().unwrap();

    // the owner works the lead
    let (status, updated) = send(
        &t.app,
        "PUT",
        &format!("/api/leads/{lead_id}"),
        Some(&ana),
        Some(json!({ "status": "contacted" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "contacted");

    // another corretor does not
    let (status, _) = send(
        &t.app,
        "PUT",
        &format!("/api/leads/{lead_id}"),
        Some(&beto),
        Some(json!({ "status": "closed" })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // a propertyless lead belongs to nobody; only admin may work it
    let (_, orphan) = send(
        &t.app,
        "POST",
        "/api/leads",
        None,
        Some(json!({ "name": "L2", "phone": "2" })),
    )
    .await?;
    let orphan_id = orphan["id"].as_i64().unwrap();

    let (status, _) = send(
        &t.app,
        "PUT",
        &format!("/api/leads/{orphan_id}"),
        Some(&ana),
        Some(json!({ "status": "contacted" })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &t.app,
        "PUT",
        &format!("/api/leads/{orphan_id}"),
        Some(&admin),
        Some(json!({ "status": "contacted" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}
