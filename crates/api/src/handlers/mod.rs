//! Request handlers.
//!
//! Handlers validate input shape, authorise through the extractors in
//! [`crate::middleware`] or the capability policy, delegate to the
//! [`tally_db::Storage`] façade and wrap results in [`crate::response::DataResponse`].

pub mod accounts;
pub mod attachments;
pub mod auth;
pub mod clients;
pub mod entities;
pub mod journal_entries;
pub mod reports;
pub mod scope;
pub mod users;
