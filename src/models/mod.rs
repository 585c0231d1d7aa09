pub mod lead;
pub mod property;
pub mod user;
