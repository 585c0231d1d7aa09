use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::{middleware, Router};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::events::{self, EventBus};
use crate::gate::{self, GateConfig};
use crate::routes::{admin, auth, health, leads, properties, uploads, users};
use crate::session::SessionConfig;
use crate::storage::{ImageStore, LocalImageStore};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub sessions: Arc<SessionConfig>,
    pub gate: Arc<GateConfig>,
    pub images: Arc<dyn ImageStore>,
    pub events: EventBus,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        sessions: SessionConfig,
        images: Arc<dyn ImageStore>,
        events: EventBus,
    ) -> Self {
        Self {
            pool,
            sessions: Arc::new(sessions),
            gate: Arc::new(GateConfig::default()),
            images,
            events,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let store = LocalImageStore::from_env();
    let upload_root = store.root().to_path_buf();
    create_app_with_store(pool, Arc::new(store), upload_root).await
}

pub async fn create_app_with_store(
    pool: SqlitePool,
    images: Arc<dyn ImageStore>,
    upload_root: PathBuf,
) -> Result<Router, AppError> {
    let session_config = SessionConfig::from_env()?;

    let (event_bus, event_rx) = events::init_event_bus();
    tokio::spawn(events::start_activity_listener(event_rx, pool.clone()));

    let state = AppState::new(pool, session_config, images, event_bus);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let property_routes = Router::new()
        .route("/", get(properties::list_properties))
        .route("/", post(properties::create_property))
        .route("/:id", get(properties::get_property))
        .route("/:id", put(properties::update_property))
        .route("/:id", delete(properties::delete_property))
        .route("/:id/images", post(uploads::upload_image))
        .route("/:id/images", delete(uploads::delete_image));

    let lead_routes = Router::new()
        .route("/", get(leads::list_leads))
        .route("/", post(leads::create_lead))
        .route("/:id", put(leads::update_lead));

    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/", post(users::create_user))
        .route("/:id", put(users::update_user))
        .route("/:id", delete(users::delete_user));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/properties", property_routes)
        .nest("/leads", lead_routes)
        .nest("/users", user_routes)
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/activity", get(admin::list_activity))
        .route("/health", get(health::health));

    let router = Router::new()
        .nest("/api", api)
        // page routes under /admin sit behind the gate; the UI itself is
        // served elsewhere
        .route("/admin", get(admin::admin_panel))
        .route("/admin/*rest", get(admin::admin_panel))
        .nest_service("/uploads", ServeDir::new(upload_root))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, gate::gate_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
