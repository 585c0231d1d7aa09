use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{can_perform, check_user_delete, Action, Resource};
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::models::user::{DbUser, Role, User, UserCreateRequest, UserUpdateRequest};
use crate::routes::auth::fetch_user_by_id;
use crate::session::CurrentUser;
use crate::utils::{hash_password, utc_now};

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses(
        (status = 200, description = "List users", body = [User]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    if !can_perform(&session, Resource::User, Action::Read, None) {
        return Err(AppError::forbidden("admin access required"));
    }

    let rows = sqlx::query_as::<_, DbUser>(
        "SELECT id, name, email, password_hash, role, active, equipe, created_at, updated_at \
         FROM users ORDER BY created_at ASC",
    )
    .fetch_all(&state.pool)
    .await?;

    let users: Vec<User> = rows.into_iter().map(User::try_from).collect::<Result<_, _>>()?;

    Ok(Json(users))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(payload): Json<UserCreateRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    if !can_perform(&session, Resource::User, Action::Create, None) {
        return Err(AppError::forbidden("admin access required"));
    }

    if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(AppError::bad_request("name and email are required"));
    }

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
        .bind(&payload.email)
        .fetch_one(&state.pool)
        .await?;
    if existing > 0 {
        return Err(AppError::conflict("email already in use"));
    }

    let password_hash = hash_password(&payload.password)?;
    let role = payload.role.unwrap_or(Role::Corretor);
    // admin-created accounts default to active, unlike self-registration
    let active = payload.active.unwrap_or(true);
    let now = utc_now();

    let result = sqlx::query(
        "INSERT INTO users (name, email, password_hash, role, active, equipe, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(active)
    .bind(&payload.equipe)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let user: User = fetch_user_by_id(&state.pool, result.last_insert_rowid())
        .await?
        .try_into()?;

    log_activity(&state.events, "created", Some(session.user_id), &user, None);

    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Admin only")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    if !can_perform(&session, Resource::User, Action::Update, Some(id)) {
        return Err(AppError::forbidden("admin access required"));
    }

    let mut user: User = fetch_user_by_id(&state.pool, id).await?.try_into()?;
    let old = user.clone();

    if let Some(name) = payload.name.as_ref() {
        if name.trim().is_empty() {
            return Err(AppError::bad_request("name must not be empty"));
        }
        user.name = name.clone();
    }
    if let Some(role) = payload.role {
        user.role = role;
    }
    if let Some(active) = payload.active {
        user.active = active;
    }
    if payload.equipe.is_some() {
        user.equipe = payload.equipe.clone();
    }

    let now = utc_now();
    sqlx::query("UPDATE users SET name = ?, role = ?, active = ?, equipe = ?, updated_at = ? WHERE id = ?")
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(&user.equipe)
        .bind(now)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    user.updated_at = now;

    log_activity(&state.events, "updated", Some(session.user_id), &user, Some(&old));

    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Cannot delete own account"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "User still owns properties")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if !can_perform(&session, Resource::User, Action::Delete, Some(id)) {
        return Err(AppError::forbidden("admin access required"));
    }

    let user: User = fetch_user_by_id(&state.pool, id).await?.try_into()?;

    let owned: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM properties WHERE author_id = ?")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    check_user_delete(&session, &user, owned)?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;

    log_activity(&state.events, "deleted", Some(session.user_id), &user, None);

    Ok(StatusCode::NO_CONTENT)
}
