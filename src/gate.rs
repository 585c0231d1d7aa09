//! Route gate: path/method matching in front of every handler.
//!
//! A static table declares which prefixes are protected, which sub-paths are
//! exempt, and where anonymous reads are allowed. The decision itself is a
//! pure function so it can be tested without a router.

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::app::AppState;
use crate::errors::AppError;
use crate::session::{resolve_session, Session};

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixKind {
    /// Denials answer with 401 JSON.
    Api,
    /// Denials redirect to the login page, preserving the requested path.
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectToLogin,
    Unauthorized,
}

#[derive(Debug, Clone)]
pub struct ProtectedPrefix {
    pub prefix: &'static str,
    pub kind: PrefixKind,
    /// Sub-paths that bypass the gate entirely (login, register).
    pub exempt: &'static [&'static str],
    /// Prefixes under which GET is public (catalog browsing).
    pub public_read: &'static [&'static str],
    /// (method, path-prefix) pairs that bypass the gate, e.g. the public
    /// contact form.
    pub exempt_methods: &'static [(&'static str, &'static str)],
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    prefixes: Vec<ProtectedPrefix>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            prefixes: vec![
                ProtectedPrefix {
                    prefix: "/api",
                    kind: PrefixKind::Api,
                    exempt: &["/api/auth/login", "/api/auth/register", "/api/health"],
                    public_read: &["/api/properties"],
                    exempt_methods: &[("POST", "/api/leads")],
                },
                ProtectedPrefix {
                    prefix: "/admin",
                    kind: PrefixKind::Page,
                    exempt: &[],
                    public_read: &[],
                    exempt_methods: &[],
                },
            ],
        }
    }
}

impl GateConfig {
    /// Decide whether a request may proceed. An inactive or unresolvable
    /// session arrives here as `None`; the resolver has already collapsed
    /// those cases.
    pub fn authorize(&self, path: &str, method: &Method, session: Option<&Session>) -> Decision {
        let Some(rule) = self.prefixes.iter().find(|rule| path.starts_with(rule.prefix)) else {
            return Decision::Allow;
        };

        if rule.exempt.iter().any(|exempt| path.starts_with(exempt)) {
            return Decision::Allow;
        }

        if method == Method::GET && rule.public_read.iter().any(|public| path.starts_with(public)) {
            return Decision::Allow;
        }

        if rule
            .exempt_methods
            .iter()
            .any(|(m, p)| *m == method.as_str() && path.starts_with(p))
        {
            return Decision::Allow;
        }

        match session {
            Some(_) => Decision::Allow,
            None => {
                tracing::debug!(%path, %method, "gate denied: no session");
                match rule.kind {
                    PrefixKind::Api => Decision::Unauthorized,
                    PrefixKind::Page => Decision::RedirectToLogin,
                }
            }
        }
    }
}

/// Middleware wrapping the whole router. On success the resolved session is
/// attached to request extensions so handlers never re-decode the token.
pub async fn gate_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let session = resolve_session(req.headers(), &state.sessions);
    let decision = state.gate.authorize(req.uri().path(), req.method(), session.as_ref());

    match decision {
        Decision::Allow => {
            if let Some(session) = session {
                req.extensions_mut().insert(session);
            }
            next.run(req).await
        }
        Decision::Unauthorized => {
            AppError::unauthorized("authentication required").into_response()
        }
        Decision::RedirectToLogin => {
            let target = format!("{}?redirect={}", LOGIN_PATH, req.uri().path());
            Redirect::temporary(&target).into_response()
        }
    }
}
