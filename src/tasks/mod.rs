//! Background Tasks Module
//!
//! Contains background work that runs outside any single request.
//!
//! # Tasks
//! - Refresh: revalidates served cache entries off the request path

mod refresh;

pub use refresh::{spawn_refresh_worker, RefreshJob, RefreshQueue};
