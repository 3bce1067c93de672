//! Intercept Module
//!
//! Request model and classification for outbound browser requests.

mod classifier;
mod request;

pub use classifier::{Classification, RequestClassifier};
pub use request::{request_key, Destination, InterceptedRequest, RequestMode};
