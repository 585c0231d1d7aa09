use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    Draft,
    Published,
    Sold,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Draft => "draft",
            PropertyStatus::Published => "published",
            PropertyStatus::Sold => "sold",
        }
    }
}

impl std::str::FromStr for PropertyStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draft" => Ok(PropertyStatus::Draft),
            "published" => Ok(PropertyStatus::Published),
            "sold" => Ok(PropertyStatus::Sold),
            other => Err(AppError::internal(format!("unknown property status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Property {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Price in centavos.
    pub price: i64,
    pub status: PropertyStatus,
    pub featured: bool,
    pub banner_image: Option<String>,
    pub gallery_images: Vec<String>,
    pub floor_plans: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl crate::events::Loggable for Property {
    fn entity_type() -> &'static str {
        "property"
    }
    fn subject_id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbProperty {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price: i64,
    pub status: String,
    pub featured: bool,
    pub banner_image: Option<String>,
    // ordered URL lists stored as JSON text
    pub gallery_images: String,
    pub floor_plans: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbProperty> for Property {
    type Error = AppError;

    fn try_from(value: DbProperty) -> Result<Self, Self::Error> {
        let gallery_images: Vec<String> = serde_json::from_str(&value.gallery_images)
            .map_err(|err| AppError::internal(format!("corrupt gallery_images column: {err}")))?;
        let floor_plans: Vec<String> = serde_json::from_str(&value.floor_plans)
            .map_err(|err| AppError::internal(format!("corrupt floor_plans column: {err}")))?;

        Ok(Property {
            id: value.id,
            author_id: value.author_id,
            title: value.title,
            description: value.description,
            price: value.price,
            status: value.status.parse()?,
            featured: value.featured,
            banner_image: value.banner_image,
            gallery_images,
            floor_plans,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PropertyCreateRequest {
    #[schema(example = "Apartamento 3 quartos, Pinheiros")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = 85000000)]
    pub price: i64,
    /// Honored only when the caller is an admin; corretor listings start as draft.
    pub status: Option<PropertyStatus>,
    /// Honored only when the caller is an admin.
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PropertyUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub status: Option<PropertyStatus>,
    pub featured: Option<bool>,
}
