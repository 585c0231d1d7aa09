//! Activity log: admin-visible audit trail of mutations.
//!
//! Handlers publish domain events onto a broadcast bus; a background listener
//! projects them into the `activity_log` table, chaining payload hashes so
//! tampering with history is detectable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod loggable;
pub use loggable::{Loggable, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActivityPayload {
    /// The current/new state of the entity
    #[serde(rename = "new")]
    current: Value,
    /// The previous state (for update/delete operations)
    #[serde(skip_serializing_if = "Option::is_none")]
    old: Option<Value>,
    severity: Severity,
}

pub type EventBus = broadcast::Sender<DomainEvent>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<DomainEvent>) {
    broadcast::channel(1024)
}

/// Publish an activity event for any entity implementing [`Loggable`].
/// Fire and forget: logging failures never break the request.
pub fn log_activity<T: Loggable>(
    event_bus: &EventBus,
    action: &str,
    actor_id: Option<i64>,
    entity: &T,
    old_entity: Option<&T>,
) {
    let severity = entity.severity_for_action(action);
    let payload = ActivityPayload {
        current: serde_json::to_value(entity).unwrap_or_default(),
        old: old_entity.map(|e| serde_json::to_value(e).unwrap_or_default()),
        severity,
    };

    let event = DomainEvent {
        id: Uuid::new_v4(),
        name: format!("{}.{}", T::entity_type(), action),
        occurred_at: Utc::now(),
        actor_id,
        subject_id: Some(entity.subject_id()),
        payload: serde_json::to_value(&payload).unwrap_or_default(),
    };

    let _ = event_bus.send(event);
}

/// Row shape served by the admin activity endpoint.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct ActivityEntry {
    pub id: String,
    pub event_name: String,
    pub actor_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub severity: String,
    pub occurred_at: DateTime<Utc>,
}

pub async fn start_activity_listener(mut rx: broadcast::Receiver<DomainEvent>, pool: SqlitePool) {
    tracing::info!("activity listener started");
    while let Ok(event) = rx.recv().await {
        if let Err(err) = persist_event(&pool, &event).await {
            tracing::error!(error = %err, event = %event.name, "failed to save activity entry");
        }
    }
}

async fn persist_event(pool: &SqlitePool, event: &DomainEvent) -> Result<(), sqlx::Error> {
    let payload_str = serde_json::to_string(&event.payload).unwrap_or_default();

    let severity = event
        .payload
        .get("severity")
        .and_then(|s| s.as_str())
        .unwrap_or("important")
        .to_string();

    let prev_hash: Option<String> =
        sqlx::query_scalar("SELECT hash FROM activity_log ORDER BY occurred_at DESC, id DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    // hash chain: SHA256(prev_hash || payload)
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    if let Some(ref ph) = prev_hash {
        hasher.update(ph.as_bytes());
    }
    hasher.update(payload_str.as_bytes());
    let hash = hex::encode(hasher.finalize());

    sqlx::query(
        "INSERT INTO activity_log (id, event_name, actor_id, subject_id, payload, severity, prev_hash, hash, occurred_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(event.id.to_string())
    .bind(&event.name)
    .bind(event.actor_id)
    .bind(event.subject_id)
    .bind(&payload_str)
    .bind(&severity)
    .bind(&prev_hash)
    .bind(&hash)
    .bind(event.occurred_at)
    .execute(pool)
    .await?;

    Ok(())
}
