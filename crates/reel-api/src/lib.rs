//! Axum HTTP API server.
//!
//! Accepts montage requests, reports run progress and streams finished
//! montages. The work itself happens in `reel-worker`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
