use axum::Router;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::events::ActivityEntry;
use crate::models;
use crate::routes;
use crate::session::SESSION_COOKIE;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::auth::register,
        routes::auth::login,
        routes::auth::me,
        routes::auth::logout,
        routes::properties::list_properties,
        routes::properties::get_property,
        routes::properties::create_property,
        routes::properties::update_property,
        routes::properties::delete_property,
        routes::uploads::upload_image,
        routes::uploads::delete_image,
        routes::leads::create_lead,
        routes::leads::list_leads,
        routes::leads::update_lead,
        routes::users::list_users,
        routes::users::create_user,
        routes::users::update_user,
        routes::users::delete_user,
        routes::admin::dashboard,
        routes::admin::list_activity,
        routes::health::health
    ),
    components(
        schemas(
            models::user::User,
            models::user::Role,
            models::user::AuthResponse,
            models::user::LoginRequest,
            models::user::RegisterRequest,
            models::user::UserCreateRequest,
            models::user::UserUpdateRequest,
            models::property::Property,
            models::property::PropertyStatus,
            models::property::PropertyCreateRequest,
            models::property::PropertyUpdateRequest,
            models::lead::Lead,
            models::lead::LeadCreateRequest,
            models::lead::LeadUpdateRequest,
            routes::uploads::ImageKind,
            routes::uploads::UploadResponse,
            routes::uploads::ImageDeleteRequest,
            routes::admin::DashboardResponse,
            ActivityEntry
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication and session endpoints"),
        (name = "Properties", description = "Listing catalog and management"),
        (name = "Leads", description = "Contact-form lead capture and follow-up"),
        (name = "Users", description = "Broker account administration"),
        (name = "Admin", description = "Dashboard and activity log"),
        (name = "Health", description = "Liveness probe")
    )
)]
pub struct ApiDoc;

/// Registers both ways a session token reaches the API: the `session`
/// cookie set on login and a plain bearer header.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "cookieAuth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
        }
    }
}

pub fn swagger_routes() -> Router {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
