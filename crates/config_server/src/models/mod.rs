//! HTTP response models
//!
//! These types are distinct from domain types and exist only in the HTTP layer.

pub mod response;

// Re-export commonly used types
pub use response::{ConfigResponse, HealthResponse, PropertySourceResponse};
