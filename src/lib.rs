pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod scripts;
pub mod services;

#[cfg(test)]
pub mod testing;

pub use config::Config;
pub use error::{ApiError, Result};
