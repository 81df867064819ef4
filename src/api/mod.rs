//! HTTP surface
//!
//! Thin axum layer over the job manager: requests are decoded into domain
//! calls, `AppError`s are mapped to status codes in [`error`].

pub mod error;
pub mod handlers;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::build_router;
pub use types::ApiContext;
