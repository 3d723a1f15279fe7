//! Typed HTTP client for the tally API.
//!
//! [`ApiClient`] wraps the `/api/v1` surface. Session-dependent reads wait
//! on an [`AuthGate`] so nothing is fetched before the caller's session is
//! known, and cached responses never survive a login or logout.

pub mod client;
pub mod error;
pub mod gate;
pub mod models;

pub use client::{new_staging_key, ApiClient};
pub use error::{ClientError, ClientResult};
pub use gate::{AuthGate, AuthState, SessionUser};
