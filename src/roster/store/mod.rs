//! # Storage Layer
//!
//! The [`RecordStore`] trait is the record repository: every read and write of
//! persisted records goes through it, so business logic never knows which
//! backend it is talking to.
//!
//! ## Implementations
//!
//! - [`sqlite::SqliteStore`]: production store backed by a SQLite file
//!   - One `users` table, `email` carries a UNIQUE constraint
//!   - A connection is opened and closed for every operation (no pooling)
//!
//! - [`memory::InMemoryStore`]: in-memory store for testing
//!   - Same semantics, including duplicate-email detection
//!
//! - [`retry::RetryingStore`]: wraps any store and retries connectivity
//!   failures a bounded number of times
//!
//! ## Identifiers
//!
//! Identifiers are assigned by the store and never reused. Email is the only
//! key a caller knows before creation, so stores also answer
//! [`RecordStore::find_id_by_email`].
//!
//! ## Concurrency
//!
//! Operations are not coordinated across connections. A create and a delete
//! racing on the same identifier have no defined relative order.

use crate::error::Result;
use crate::model::{Record, RecordDraft, RecordId};

pub mod memory;
pub mod retry;
pub mod sqlite;

/// Abstract interface for record storage.
pub trait RecordStore {
    /// Create the backing database and table if they do not exist yet.
    fn ensure_schema(&mut self) -> Result<()>;

    /// All records, in store order. Zero rows is a valid, empty result.
    fn fetch_all(&self) -> Result<Vec<Record>>;

    /// Insert a new record and return its assigned identifier.
    fn create(&mut self, draft: &RecordDraft) -> Result<RecordId>;

    /// Insert several records atomically: either every row lands or none do.
    fn create_batch(&mut self, drafts: &[RecordDraft]) -> Result<Vec<RecordId>>;

    /// Replace every mutable field of the record with this identifier.
    /// Missing identifiers are a no-op.
    fn update(&mut self, id: RecordId, draft: &RecordDraft) -> Result<()>;

    /// Remove the record. Missing identifiers are a no-op.
    fn delete(&mut self, id: RecordId) -> Result<()>;

    fn find_id_by_email(&self, email: &str) -> Result<Option<RecordId>>;
}

impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    fn ensure_schema(&mut self) -> Result<()> {
        (**self).ensure_schema()
    }

    fn fetch_all(&self) -> Result<Vec<Record>> {
        (**self).fetch_all()
    }

    fn create(&mut self, draft: &RecordDraft) -> Result<RecordId> {
        (**self).create(draft)
    }

    fn create_batch(&mut self, drafts: &[RecordDraft]) -> Result<Vec<RecordId>> {
        (**self).create_batch(drafts)
    }

    fn update(&mut self, id: RecordId, draft: &RecordDraft) -> Result<()> {
        (**self).update(id, draft)
    }

    fn delete(&mut self, id: RecordId) -> Result<()> {
        (**self).delete(id)
    }

    fn find_id_by_email(&self, email: &str) -> Result<Option<RecordId>> {
        (**self).find_id_by_email(email)
    }
}
