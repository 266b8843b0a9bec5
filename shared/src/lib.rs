//! Shared library for the video platform backend
//!
//! Common pieces used by the service binary and its tests:
//! - Environment-driven configuration
//! - The HTTP-facing error type

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{AppConfig, CacheBackend, CacheConfig, Config, RedisConfig};
pub use error::{AppError, ErrorResponse, Result};
