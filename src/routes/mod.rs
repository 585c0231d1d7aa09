pub mod admin;
pub mod auth;
pub mod health;
pub mod leads;
pub mod properties;
pub mod uploads;
pub mod users;
