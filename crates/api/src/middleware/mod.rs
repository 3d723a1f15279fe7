//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- The authenticated user, from a Bearer token or the session cookie.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.
//! - [`rbac::RequireWriter`] -- Requires a role that may change ledger data.

pub mod auth;
pub mod rbac;
