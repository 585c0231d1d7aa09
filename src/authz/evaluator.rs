use crate::errors::{AppError, AppResult};
use crate::models::property::{Property, PropertyUpdateRequest};
use crate::models::user::{Role, User};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Property,
    User,
    Lead,
    Image,
}

/// Check whether the session may perform `action` on `resource`.
///
/// `owner_id` is the author of the target entity where ownership matters
/// (property update/delete, image upload/delete); `None` means the action is
/// not ownership-scoped.
pub fn can_perform(
    session: &Session,
    resource: Resource,
    action: Action,
    owner_id: Option<i64>,
) -> bool {
    if !session.active {
        return false;
    }

    match session.role {
        // Admin bypasses ownership entirely.
        Role::Admin => true,
        Role::Corretor => match (resource, action) {
            (Resource::Property, Action::Create | Action::Read) => true,
            (Resource::Property, Action::Update | Action::Delete) => {
                owner_id == Some(session.user_id)
            }
            (Resource::Image, Action::Create | Action::Delete) => {
                owner_id == Some(session.user_id)
            }
            (Resource::Lead, Action::Create | Action::Read) => true,
            // a corretor may only work leads on listings it authored
            (Resource::Lead, Action::Update) => owner_id == Some(session.user_id),
            _ => false,
        },
    }
}

/// Apply the clamp policy to a property update: a non-admin change to
/// `status` or `featured` is silently discarded so the persisted values
/// survive, instead of failing the whole request.
pub fn clamp_property_update(
    session: &Session,
    current: &Property,
    mut update: PropertyUpdateRequest,
) -> PropertyUpdateRequest {
    if session.role != Role::Admin {
        if update.status.is_some_and(|status| status != current.status) {
            tracing::debug!(
                property_id = current.id,
                user_id = session.user_id,
                "clamped status change on non-admin update"
            );
        }
        update.status = Some(current.status);
        update.featured = Some(current.featured);
    }
    update
}

/// Deletion guard for users. These are caller-input errors rather than
/// authorization failures, so they surface as 400/409 instead of 403.
pub fn check_user_delete(session: &Session, target: &User, owned_properties: i64) -> AppResult<()> {
    if target.id == session.user_id {
        return Err(AppError::bad_request("cannot delete your own account"));
    }
    if owned_properties > 0 {
        return Err(AppError::conflict(format!(
            "user still owns {owned_properties} properties"
        )));
    }
    Ok(())
}
