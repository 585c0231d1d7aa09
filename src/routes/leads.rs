use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{can_perform, Action, Resource};
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::models::lead::{DbLead, Lead, LeadCreateRequest, LeadUpdateRequest};
use crate::session::CurrentUser;
use crate::utils::utc_now;

#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "Leads",
    request_body = LeadCreateRequest,
    responses(
        (status = 201, description = "Lead captured", body = Lead),
        (status = 400, description = "Missing name or phone")
    )
)]
pub async fn create_lead(
    State(state): State<AppState>,
    Json(payload): Json<LeadCreateRequest>,
) -> AppResult<(StatusCode, Json<Lead>)> {
    // public endpoint: visitors submit the contact form without a session
    if payload.name.trim().is_empty() || payload.phone.trim().is_empty() {
        return Err(AppError::bad_request("name and phone are required"));
    }

    if let Some(property_id) = payload.property_id {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM properties WHERE id = ?")
            .bind(property_id)
            .fetch_one(&state.pool)
            .await?;
        if exists == 0 {
            return Err(AppError::bad_request("unknown property"));
        }
    }

    let now = utc_now();
    let result = sqlx::query(
        "INSERT INTO leads (name, phone, email, property_id, status, created_at) \
         VALUES (?, ?, ?, ?, 'new', ?)",
    )
    .bind(&payload.name)
    .bind(&payload.phone)
    .bind(&payload.email)
    .bind(payload.property_id)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let lead: Lead = fetch_lead(&state, result.last_insert_rowid()).await?.try_into()?;

    log_activity(&state.events, "captured", None, &lead, None);

    Ok((StatusCode::CREATED, Json(lead)))
}

#[utoipa::path(
    get,
    path = "/api/leads",
    tag = "Leads",
    responses((status = 200, description = "Leads visible to the caller", body = [Lead]))
)]
pub async fn list_leads(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> AppResult<Json<Vec<Lead>>> {
    // admin sees the full inbox; a corretor only leads on its own listings
    let rows = if session.is_admin() {
        sqlx::query_as::<_, DbLead>(
            "SELECT id, name, phone, email, property_id, status, created_at \
             FROM leads ORDER BY created_at DESC",
        )
        .fetch_all(&state.pool)
        .await?
    } else {
        sqlx::query_as::<_, DbLead>(
            "SELECT l.id, l.name, l.phone, l.email, l.property_id, l.status, l.created_at \
             FROM leads l JOIN properties p ON l.property_id = p.id \
             WHERE p.author_id = ? ORDER BY l.created_at DESC",
        )
        .bind(session.user_id)
        .fetch_all(&state.pool)
        .await?
    };

    let leads: Vec<Lead> = rows.into_iter().map(Lead::try_from).collect::<Result<_, _>>()?;

    Ok(Json(leads))
}

#[utoipa::path(
    put,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = i64, Path, description = "Lead id")),
    request_body = LeadUpdateRequest,
    responses(
        (status = 200, description = "Lead updated", body = Lead),
        (status = 403, description = "Lead belongs to another corretor's listing")
    )
)]
pub async fn update_lead(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<LeadUpdateRequest>,
) -> AppResult<Json<Lead>> {
    if payload.status.trim().is_empty() {
        return Err(AppError::bad_request("status is required"));
    }

    let mut lead: Lead = fetch_lead(&state, id).await?.try_into()?;
    let old = lead.clone();

    // ownership flows through the lead's property; a lead with no property
    // is only workable by an admin
    let owner_id = match lead.property_id {
        Some(property_id) => {
            sqlx::query_scalar::<_, i64>("SELECT author_id FROM properties WHERE id = ?")
                .bind(property_id)
                .fetch_optional(&state.pool)
                .await?
        }
        None => None,
    };

    if !can_perform(&session, Resource::Lead, Action::Update, owner_id) {
        return Err(AppError::forbidden("not allowed to update this lead"));
    }

    sqlx::query("UPDATE leads SET status = ? WHERE id = ?")
        .bind(&payload.status)
        .bind(lead.id)
        .execute(&state.pool)
        .await?;

    lead.status = payload.status;

    log_activity(&state.events, "updated", Some(session.user_id), &lead, Some(&old));

    Ok(Json(lead))
}

async fn fetch_lead(state: &AppState, lead_id: i64) -> AppResult<DbLead> {
    sqlx::query_as::<_, DbLead>(
        "SELECT id, name, phone, email, property_id, status, created_at FROM leads WHERE id = ?",
    )
    .bind(lead_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("lead not found"))
}
