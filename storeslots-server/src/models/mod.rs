pub mod auth;
pub mod configuration;
