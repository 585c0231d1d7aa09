use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub property_id: Option<i64>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl crate::events::Loggable for Lead {
    fn entity_type() -> &'static str {
        "lead"
    }
    fn subject_id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbLead {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub property_id: Option<i64>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbLead> for Lead {
    type Error = AppError;

    fn try_from(value: DbLead) -> Result<Self, Self::Error> {
        Ok(Lead {
            id: value.id,
            name: value.name,
            phone: value.phone,
            email: value.email,
            property_id: value.property_id,
            status: value.status,
            created_at: value.created_at,
        })
    }
}

/// Public contact-form submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LeadCreateRequest {
    #[schema(example = "Carlos Pereira")]
    pub name: String,
    #[schema(example = "+55 11 91234-5678")]
    pub phone: String,
    pub email: Option<String>,
    pub property_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LeadUpdateRequest {
    #[schema(example = "contacted")]
    pub status: String,
}
