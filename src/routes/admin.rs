use axum::extract::State;
use axum::response::Html;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::events::ActivityEntry;
use crate::session::CurrentUser;

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub properties: i64,
    pub published_properties: i64,
    pub leads: i64,
    pub new_leads: i64,
    pub users: i64,
    pub pending_users: i64,
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    tag = "Admin",
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardResponse),
        (status = 403, description = "Admin only")
    )
)]
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> AppResult<Json<DashboardResponse>> {
    if !session.is_admin() {
        return Err(AppError::forbidden("admin access required"));
    }

    let properties: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM properties")
        .fetch_one(&state.pool)
        .await?;
    let published_properties: i64 =
        sqlx::query_scalar("SELECT COUNT(1) FROM properties WHERE status = 'published'")
            .fetch_one(&state.pool)
            .await?;
    let leads: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM leads")
        .fetch_one(&state.pool)
        .await?;
    let new_leads: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM leads WHERE status = 'new'")
        .fetch_one(&state.pool)
        .await?;
    let users: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users")
        .fetch_one(&state.pool)
        .await?;
    let pending_users: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE active = 0")
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(DashboardResponse {
        properties,
        published_properties,
        leads,
        new_leads,
        users,
        pending_users,
    }))
}

#[utoipa::path(
    get,
    path = "/api/activity",
    tag = "Admin",
    responses(
        (status = 200, description = "Recent activity entries", body = [ActivityEntry]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_activity(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> AppResult<Json<Vec<ActivityEntry>>> {
    if !session.is_admin() {
        return Err(AppError::forbidden("admin access required"));
    }

    let entries = sqlx::query_as::<_, ActivityEntry>(
        "SELECT id, event_name, actor_id, subject_id, severity, occurred_at \
         FROM activity_log ORDER BY occurred_at DESC, id DESC LIMIT 100",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(entries))
}

/// Shell page for the admin SPA; requests only reach here once the gate has
/// resolved a session, so an anonymous hit redirects to /login instead.
pub async fn admin_panel() -> Html<&'static str> {
    Html(
        "<!doctype html>\n<html>\n<head><title>Imovia Admin</title></head>\n\
         <body><div id=\"app\"></div><script src=\"/assets/admin.js\"></script></body>\n</html>",
    )
}
