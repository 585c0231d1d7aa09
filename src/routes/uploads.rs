use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::app::AppState;
use crate::authz::{can_perform, Action, Resource};
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::models::property::Property;
use crate::routes::properties::fetch_property;
use crate::session::CurrentUser;
use crate::storage::object_key;
use crate::utils::utc_now;

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Which slot on the property an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    Banner,
    Gallery,
    FloorPlan,
}

impl std::str::FromStr for ImageKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "banner" => Ok(ImageKind::Banner),
            "gallery" => Ok(ImageKind::Gallery),
            "floor_plan" => Ok(ImageKind::FloorPlan),
            other => Err(AppError::bad_request(format!("unknown image kind: {other}"))),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
    pub kind: ImageKind,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImageDeleteRequest {
    pub kind: ImageKind,
    pub url: String,
}

#[utoipa::path(
    post,
    path = "/api/properties/{id}/images",
    tag = "Properties",
    params(("id" = i64, Path, description = "Property id")),
    request_body(content = Vec<u8>, description = "form fields: `kind` and `file`", content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Missing file, bad kind or unsupported type"),
        (status = 403, description = "Caller does not own this listing")
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let mut property: Property = fetch_property(&state.pool, id).await?.try_into()?;

    if !can_perform(&session, Resource::Image, Action::Create, Some(property.author_id)) {
        return Err(AppError::forbidden("not allowed to manage images on this property"));
    }

    let mut kind: Option<ImageKind> = None;
    let mut file: Option<(String, String, axum::body::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid multipart body: {err}")))?
    {
        match field.name() {
            Some("kind") => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(format!("invalid kind field: {err}")))?;
                kind = Some(value.parse()?);
            }
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(|f| f.to_string())
                    .ok_or_else(|| AppError::bad_request("file field needs a filename"))?;
                let content_type = field
                    .content_type()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(format!("failed to read upload: {err}")))?;
                file = Some((filename, content_type, bytes));
            }
            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| AppError::bad_request("missing kind field"))?;
    let (filename, content_type, bytes) =
        file.ok_or_else(|| AppError::bad_request("missing file field"))?;

    if bytes.is_empty() {
        return Err(AppError::bad_request("uploaded file is empty"));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::bad_request("uploaded file is too large"));
    }
    if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::bad_request("unsupported image type"));
    }

    let key = object_key(property.id, &filename);
    let url = state.images.put(&key, bytes, &content_type).await?;

    let old = property.clone();
    match kind {
        ImageKind::Banner => {
            // a new banner replaces the old one; clean the old blob up too
            if let Some(previous) = property.banner_image.replace(url.clone()) {
                if let Err(err) = state.images.delete(&previous).await {
                    tracing::warn!(error = %err, url = %previous, "failed to delete replaced banner");
                }
            }
        }
        ImageKind::Gallery => property.gallery_images.push(url.clone()),
        ImageKind::FloorPlan => property.floor_plans.push(url.clone()),
    }

    persist_images(&state, &property).await?;

    log_activity(&state.events, "image_added", Some(session.user_id), &property, Some(&old));

    Ok((StatusCode::CREATED, Json(UploadResponse { url, kind })))
}

#[utoipa::path(
    delete,
    path = "/api/properties/{id}/images",
    tag = "Properties",
    params(("id" = i64, Path, description = "Property id")),
    request_body = ImageDeleteRequest,
    responses(
        (status = 204, description = "Image removed"),
        (status = 403, description = "Caller does not own this listing"),
        (status = 404, description = "URL not attached to this property")
    )
)]
pub async fn delete_image(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ImageDeleteRequest>,
) -> AppResult<StatusCode> {
    let mut property: Property = fetch_property(&state.pool, id).await?.try_into()?;

    if !can_perform(&session, Resource::Image, Action::Delete, Some(property.author_id)) {
        return Err(AppError::forbidden("not allowed to manage images on this property"));
    }

    let old = property.clone();
    let removed = match payload.kind {
        ImageKind::Banner => {
            if property.banner_image.as_deref() == Some(payload.url.as_str()) {
                property.banner_image = None;
                true
            } else {
                false
            }
        }
        ImageKind::Gallery => remove_url(&mut property.gallery_images, &payload.url),
        ImageKind::FloorPlan => remove_url(&mut property.floor_plans, &payload.url),
    };

    if !removed {
        return Err(AppError::not_found("image not attached to this property"));
    }

    persist_images(&state, &property).await?;

    if let Err(err) = state.images.delete(&payload.url).await {
        tracing::warn!(error = %err, url = %payload.url, "failed to delete stored image");
    }

    log_activity(&state.events, "image_removed", Some(session.user_id), &property, Some(&old));

    Ok(StatusCode::NO_CONTENT)
}

fn remove_url(urls: &mut Vec<String>, url: &str) -> bool {
    let before = urls.len();
    urls.retain(|u| u != url);
    urls.len() != before
}

async fn persist_images(state: &AppState, property: &Property) -> AppResult<()> {
    let gallery = serde_json::to_string(&property.gallery_images)
        .map_err(|err| AppError::internal(format!("failed to encode gallery: {err}")))?;
    let floor_plans = serde_json::to_string(&property.floor_plans)
        .map_err(|err| AppError::internal(format!("failed to encode floor plans: {err}")))?;

    sqlx::query(
        "UPDATE properties SET banner_image = ?, gallery_images = ?, floor_plans = ?, \
         updated_at = ? WHERE id = ?",
    )
    .bind(&property.banner_image)
    .bind(gallery)
    .bind(floor_plans)
    .bind(utc_now())
    .bind(property.id)
    .execute(&state.pool)
    .await?;

    Ok(())
}
