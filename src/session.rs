//! Session resolution.
//!
//! The session is stateless: all claims live inside a signed HS256 token
//! carried in the `session` cookie or an `Authorization: Bearer` header.
//! Decoding validates the signature and expiry; anything malformed resolves
//! to "no session" rather than an error.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use crate::app::AppState;
use crate::errors::AppError;
use crate::models::user::{Role, User};

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: Arc<Vec<u8>>,
    pub exp_hours: i64,
}

impl SessionConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("SESSION_SECRET")
            .map_err(|_| AppError::configuration("SESSION_SECRET not set"))?;
        let exp_hours = std::env::var("SESSION_EXP_HOURS")
            .map(|val| val.parse::<i64>())
            .unwrap_or(Ok(24))
            .map_err(|_| AppError::configuration("SESSION_EXP_HOURS must be a valid integer"))?;

        Ok(Self {
            secret: Arc::new(secret.into_bytes()),
            exp_hours,
        })
    }

    pub fn encode(&self, user: &User) -> Result<String, AppError> {
        use chrono::{Duration, Utc};

        let now = Utc::now();
        let exp = now + Duration::hours(self.exp_hours);

        let claims = Claims {
            sub: user.id,
            role: user.role,
            active: user.active,
            equipe: user.equipe.clone(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| AppError::token(err.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| AppError::token(err.to_string()))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role: Role,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipe: Option<String>,
    pub iat: usize,
    pub exp: usize,
}

/// The decoded identity carried through a request.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub role: Role,
    pub active: bool,
    pub equipe: Option<String>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Session {
            user_id: claims.sub,
            role: claims.role,
            active: claims.active,
            equipe: claims.equipe,
        }
    }
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(value.to_string());
    }

    // Fall back to the session cookie.
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Resolve a request's session. An inactive account is treated the same as
/// no session, even when the token signature is valid.
pub fn resolve_session(headers: &HeaderMap, config: &SessionConfig) -> Option<Session> {
    let token = token_from_headers(headers)?;
    let claims = config.decode(&token).ok()?;
    if !claims.active {
        tracing::debug!(user_id = claims.sub, "session rejected: inactive account");
        return None;
    }
    Some(claims.into())
}

/// Extractor for handlers that require an authenticated caller.
///
/// The gate middleware attaches the resolved [`Session`] to request
/// extensions; decoding directly is the fallback for routes mounted outside
/// the gate.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(CurrentUser(session.clone()));
        }

        resolve_session(&parts.headers, &state.sessions)
            .map(CurrentUser)
            .ok_or_else(|| AppError::unauthorized("authentication required"))
    }
}

/// Extractor for handlers with public-read exemptions: yields the session
/// when one resolves, `None` otherwise, and never rejects.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Session>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(MaybeUser(Some(session.clone())));
        }

        Ok(MaybeUser(resolve_session(&parts.headers, &state.sessions)))
    }
}
