//! Read-only HTTP surface: liveness, pipeline status and item listings.

pub mod error;
pub mod handlers;
pub mod router;
mod status;

pub use error::{ApiError, ErrorCode};
pub use router::{create_router, serve};
pub use status::{HealthView, Liveness, RoundSummary, StatusService, StatusView};
