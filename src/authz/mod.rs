//! Permission evaluator.
//!
//! Role-to-capability mapping is static: admin can do everything, a corretor
//! manages only self-authored listings. Field-level restrictions on property
//! updates are applied as a silent clamp, never as a hard error.

mod evaluator;

pub use evaluator::{can_perform, check_user_delete, clamp_property_update, Action, Resource};
