//! Shared foundations of civic-rag: the `AppError` taxonomy, layered
//! configuration (defaults, YAML, environment, CLI flags) and tracing setup.

pub mod config;
pub mod error;
pub mod logging;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
