//! Postgres implementations of the storage traits.
//!
//! Each repository owns a clone of the connection pool and the SQL for one
//! table (or one aggregate, for journal entries and their lines).

pub mod account_repo;
pub mod attachment_repo;
pub mod client_repo;
pub mod entity_repo;
pub mod journal_entry_repo;
pub mod session_repo;
pub mod user_repo;

pub use account_repo::AccountRepo;
pub use attachment_repo::AttachmentRepo;
pub use client_repo::ClientRepo;
pub use entity_repo::EntityRepo;
pub use journal_entry_repo::JournalEntryRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
