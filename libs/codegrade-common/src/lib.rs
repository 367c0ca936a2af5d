pub mod config;
pub mod error;
pub mod interview;
pub mod languages;
pub mod questions;
pub mod redis;
pub mod scoring;
pub mod store;
pub mod template;
pub mod types;
