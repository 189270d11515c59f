//! HTTP API: the service surface for the review dashboard.
//!
//! Routes live under `/api/`. Handlers use `State<ApiContext>`; pipeline
//! failures surface as structured `{success: false}` payloads rather than
//! transport errors, so the dashboard can render them inline.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use types::ApiContext;
