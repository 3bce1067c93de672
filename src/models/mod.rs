//! Request and Response models for the control API
//!
//! DTOs serialized to and from the `/__agent` endpoints.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::ClickRequest;
pub use responses::{HealthResponse, StatsResponse};
