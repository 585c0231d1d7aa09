use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::authz::{can_perform, clamp_property_update, Action, Resource};
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::models::property::{
    DbProperty, Property, PropertyCreateRequest, PropertyStatus, PropertyUpdateRequest,
};
use crate::models::user::Role;
use crate::session::{CurrentUser, MaybeUser};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/api/properties",
    tag = "Properties",
    responses((status = 200, description = "List properties", body = [Property]))
)]
pub async fn list_properties(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
) -> AppResult<Json<Vec<Property>>> {
    const COLUMNS: &str = "id, author_id, title, description, price, status, featured, \
                           banner_image, gallery_images, floor_plans, created_at, updated_at";

    // Anonymous callers browse the published catalog; a corretor manages its
    // own listings; admin sees everything.
    let rows = match session {
        Some(ref s) if s.role == Role::Admin => {
            sqlx::query_as::<_, DbProperty>(&format!(
                "SELECT {COLUMNS} FROM properties ORDER BY created_at DESC"
            ))
            .fetch_all(&state.pool)
            .await?
        }
        Some(ref s) => {
            sqlx::query_as::<_, DbProperty>(&format!(
                "SELECT {COLUMNS} FROM properties WHERE author_id = ? ORDER BY created_at DESC"
            ))
            .bind(s.user_id)
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DbProperty>(&format!(
                "SELECT {COLUMNS} FROM properties WHERE status = 'published' ORDER BY created_at DESC"
            ))
            .fetch_all(&state.pool)
            .await?
        }
    };

    let properties: Vec<Property> = rows
        .into_iter()
        .map(Property::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(properties))
}

#[utoipa::path(
    get,
    path = "/api/properties/{id}",
    tag = "Properties",
    params(("id" = i64, Path, description = "Property id")),
    responses(
        (status = 200, description = "Property detail", body = Property),
        (status = 404, description = "Not found or not visible to the caller")
    )
)]
pub async fn get_property(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Property>> {
    let property: Property = fetch_property(&state.pool, id).await?.try_into()?;

    // Unpublished listings are only visible to the author or an admin; the
    // catalog does not leak drafts via 403.
    let visible = property.status == PropertyStatus::Published
        || session
            .as_ref()
            .map(|s| s.is_admin() || s.user_id == property.author_id)
            .unwrap_or(false);

    if !visible {
        return Err(AppError::not_found("property not found"));
    }

    Ok(Json(property))
}

#[utoipa::path(
    post,
    path = "/api/properties",
    tag = "Properties",
    request_body = PropertyCreateRequest,
    responses((status = 201, description = "Property created", body = Property))
)]
pub async fn create_property(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(payload): Json<PropertyCreateRequest>,
) -> AppResult<(StatusCode, Json<Property>)> {
    if !can_perform(&session, Resource::Property, Action::Create, None) {
        return Err(AppError::forbidden("not allowed to create properties"));
    }

    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if payload.price < 0 {
        return Err(AppError::bad_request("price must not be negative"));
    }

    // Only an admin may place a listing directly into a non-draft state or
    // feature it.
    let (status, featured) = if session.is_admin() {
        (
            payload.status.unwrap_or(PropertyStatus::Draft),
            payload.featured.unwrap_or(false),
        )
    } else {
        (PropertyStatus::Draft, false)
    };

    let now = utc_now();
    let result = sqlx::query(
        "INSERT INTO properties (author_id, title, description, price, status, featured, \
         gallery_images, floor_plans, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(session.user_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.price)
    .bind(status.as_str())
    .bind(featured)
    .bind("[]")
    .bind("[]")
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let property: Property = fetch_property(&state.pool, result.last_insert_rowid())
        .await?
        .try_into()?;

    log_activity(&state.events, "created", Some(session.user_id), &property, None);

    Ok((StatusCode::CREATED, Json(property)))
}

#[utoipa::path(
    put,
    path = "/api/properties/{id}",
    tag = "Properties",
    params(("id" = i64, Path, description = "Property id")),
    request_body = PropertyUpdateRequest,
    responses(
        (status = 200, description = "Property updated", body = Property),
        (status = 403, description = "Caller does not own this listing")
    )
)]
pub async fn update_property(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<PropertyUpdateRequest>,
) -> AppResult<Json<Property>> {
    let mut property: Property = fetch_property(&state.pool, id).await?.try_into()?;
    let old = property.clone();

    if !can_perform(&session, Resource::Property, Action::Update, Some(property.author_id)) {
        return Err(AppError::forbidden("not allowed to modify this property"));
    }

    if let Some(price) = payload.price {
        if price < 0 {
            return Err(AppError::bad_request("price must not be negative"));
        }
    }

    let payload = clamp_property_update(&session, &property, payload);

    if let Some(title) = payload.title.as_ref() {
        property.title = title.clone();
    }
    if payload.description.is_some() {
        property.description = payload.description.clone();
    }
    if let Some(price) = payload.price {
        property.price = price;
    }
    if let Some(status) = payload.status {
        property.status = status;
    }
    if let Some(featured) = payload.featured {
        property.featured = featured;
    }

    let now = utc_now();

    // author_id is immutable after creation and never part of the update set
    sqlx::query(
        "UPDATE properties SET title = ?, description = ?, price = ?, status = ?, featured = ?, \
         updated_at = ? WHERE id = ?",
    )
    .bind(&property.title)
    .bind(&property.description)
    .bind(property.price)
    .bind(property.status.as_str())
    .bind(property.featured)
    .bind(now)
    .bind(property.id)
    .execute(&state.pool)
    .await?;

    property.updated_at = now;

    log_activity(&state.events, "updated", Some(session.user_id), &property, Some(&old));

    Ok(Json(property))
}

#[utoipa::path(
    delete,
    path = "/api/properties/{id}",
    tag = "Properties",
    params(("id" = i64, Path, description = "Property id")),
    responses(
        (status = 204, description = "Property deleted"),
        (status = 403, description = "Caller does not own this listing")
    )
)]
pub async fn delete_property(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let property: Property = fetch_property(&state.pool, id).await?.try_into()?;

    if !can_perform(&session, Resource::Property, Action::Delete, Some(property.author_id)) {
        return Err(AppError::forbidden("not allowed to delete this property"));
    }

    sqlx::query("DELETE FROM leads WHERE property_id = ?")
        .bind(property.id)
        .execute(&state.pool)
        .await?;

    sqlx::query("DELETE FROM properties WHERE id = ?")
        .bind(property.id)
        .execute(&state.pool)
        .await?;

    // stored images are cleaned up best-effort; a stale blob is not worth a 500
    let urls = property
        .banner_image
        .iter()
        .chain(property.gallery_images.iter())
        .chain(property.floor_plans.iter());
    for url in urls {
        if let Err(err) = state.images.delete(url).await {
            tracing::warn!(error = %err, %url, "failed to delete stored image");
        }
    }

    log_activity(&state.events, "deleted", Some(session.user_id), &property, None);

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_property(pool: &SqlitePool, property_id: i64) -> AppResult<DbProperty> {
    sqlx::query_as::<_, DbProperty>(
        "SELECT id, author_id, title, description, price, status, featured, banner_image, \
         gallery_images, floor_plans, created_at, updated_at FROM properties WHERE id = ?",
    )
    .bind(property_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("property not found"))
}
