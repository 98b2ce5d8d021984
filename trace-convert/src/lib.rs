pub mod config;
pub mod converter;
pub mod json;
