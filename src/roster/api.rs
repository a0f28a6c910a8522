//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. Every client (the
//! CLI today, anything else tomorrow) goes through [`RosterApi`].
//!
//! The facade:
//! - **Dispatches** to the matching `commands::*::run`
//! - **Checks privileges** before any mutation, using the session it was given
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! It does no I/O of its own and holds no business logic. Store selection is a
//! type parameter: `RosterApi<RetryingStore<SqliteStore>>` in production,
//! `RosterApi<InMemoryStore>` in tests.

use crate::commands::{self, RecordPatch};
use crate::error::Result;
use crate::model::{RecordDraft, RecordId};
use crate::session::Session;
use crate::store::RecordStore;

pub struct RosterApi<S: RecordStore> {
    store: S,
    paths: RosterPaths,
    session: Session,
}

impl<S: RecordStore> RosterApi<S> {
    pub fn new(store: S, paths: RosterPaths, session: Session) -> Self {
        Self {
            store,
            paths,
            session,
        }
    }

    pub fn init(&mut self) -> Result<CmdResult> {
        commands::init::run(&mut self.store)
    }

    pub fn list(&self) -> Result<CmdResult> {
        commands::list::run(&self.store)
    }

    pub fn add(&mut self, draft: &RecordDraft) -> Result<CmdResult> {
        self.session.require_write("add records")?;
        commands::create::run(&mut self.store, draft)
    }

    pub fn update(&mut self, id: RecordId, draft: &RecordDraft) -> Result<CmdResult> {
        self.session.require_write("edit records")?;
        commands::update::run(&mut self.store, id, draft)
    }

    pub fn patch(&mut self, id: RecordId, patch: &RecordPatch) -> Result<CmdResult> {
        self.session.require_write("edit records")?;
        commands::update::patch(&mut self.store, id, patch)
    }

    pub fn delete(&mut self, id: RecordId) -> Result<CmdResult> {
        self.session.require_write("delete records")?;
        commands::delete::run(&mut self.store, id)
    }

    pub fn import(&mut self, csv: &str) -> Result<CmdResult> {
        self.session.require_write("import records")?;
        commands::import::run(&mut self.store, csv)
    }

    pub fn export(&self) -> Result<CmdResult> {
        commands::export::run(&self.store)
    }

    pub fn report(&self) -> Result<CmdResult> {
        commands::report::run(&self.store)
    }

    pub fn config(&self, action: ConfigAction) -> Result<CmdResult> {
        commands::config::run(&self.paths, action)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn paths(&self) -> &RosterPaths {
        &self.paths
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

pub use crate::commands::config::ConfigAction;
pub use commands::{CmdMessage, CmdResult, GroupCounts, MessageLevel, RosterPaths};
