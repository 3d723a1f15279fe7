//! Domain rules for the Tally bookkeeping service.
//!
//! Everything in this crate is pure logic with no I/O: lifecycle
//! transitions, balance checks, capability policy, chart-of-accounts
//! hierarchy and upload validation. The storage and HTTP layers call into
//! these functions so each rule lives in exactly one place.

pub mod attachment;
pub mod capabilities;
pub mod chart;
pub mod client_status;
pub mod error;
pub mod filters;
pub mod journal;
pub mod roles;
pub mod selection;
pub mod types;
