//! # View Model
//!
//! [`RosterViewModel`] keeps the in-memory record set, the current selection
//! and the entry form in step with the backing store, and tells a presentation
//! layer what changed through [`RosterObserver`].
//!
//! ## Rules
//!
//! - Every commit goes to the store first. The in-memory set is only touched
//!   once the store call has succeeded; on failure the set is unchanged and
//!   the error is both returned and reported as a status message.
//! - A create appends to the end of the set and clears the form.
//! - An edit replaces the selected record at its current position and keeps
//!   the selection there.
//! - A delete removes the selected record and clears the selection. The
//!   selection never silently moves to a neighbouring row.
//! - Edit and delete are enabled only while a record is selected. Add is
//!   enabled only after a validation pass that found the form valid, and is
//!   disabled again while an edit to the form is waiting for its debounce.
//!
//! Everything here runs on the caller's thread. Uploads report back through
//! [`UploadHandle`] and are only applied when the caller polls.

use crate::commands::{self, CmdMessage, GroupCounts};
use crate::debounce::Debouncer;
use crate::error::{Result, RosterError};
use crate::model::{Field, Record, RecordDraft, RecordId};
use crate::session::Session;
use crate::store::RecordStore;
use crate::upload::{UploadEvent, UploadHandle};
use crate::validation::{validate_draft, ValidationResult};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum RosterChange {
    /// The whole set was replaced.
    Reset,
    Inserted(usize),
    Updated(usize),
    Removed(usize),
    Selection(Option<usize>),
    Validation(ValidationResult),
    Status(CmdMessage),
    UploadProgress(f64),
}

/// The presentation layer's side of the view model.
pub trait RosterObserver {
    fn changed(&mut self, change: &RosterChange);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl RosterObserver for NullObserver {
    fn changed(&mut self, _change: &RosterChange) {}
}

/// Keeps every change it is told about. Handy for tests and for presentation
/// layers that batch redraws.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub changes: Vec<RosterChange>,
}

impl RecordingObserver {
    pub fn take(&mut self) -> Vec<RosterChange> {
        std::mem::take(&mut self.changes)
    }
}

impl RosterObserver for RecordingObserver {
    fn changed(&mut self, change: &RosterChange) {
        self.changes.push(change.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actions {
    pub can_add: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

pub struct RosterViewModel<S: RecordStore, O: RosterObserver = NullObserver> {
    store: S,
    observer: O,
    session: Session,
    records: Vec<Record>,
    selected: Option<usize>,
    form: RecordDraft,
    validation: Option<ValidationResult>,
    debouncer: Debouncer,
    upload: Option<UploadHandle>,
}

impl<S: RecordStore, O: RosterObserver> RosterViewModel<S, O> {
    pub fn new(store: S, session: Session, observer: O) -> Self {
        Self {
            store,
            observer,
            session,
            records: Vec::new(),
            selected: None,
            form: RecordDraft::default(),
            validation: None,
            debouncer: Debouncer::default(),
            upload: None,
        }
    }

    pub fn with_debounce(mut self, quiet: Duration) -> Self {
        self.debouncer = Debouncer::new(quiet);
        self
    }

    // --- Read side ---

    /// Read-only view of the record set, for tables and report renderers.
    pub fn snapshot(&self) -> &[Record] {
        &self.records
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.selected.and_then(|i| self.records.get(i))
    }

    pub fn index_of(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    pub fn form(&self) -> &RecordDraft {
        &self.form
    }

    pub fn validation(&self) -> Option<&ValidationResult> {
        self.validation.as_ref()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn actions(&self) -> Actions {
        let selected = self.selected_record().is_some();
        let form_ok = !self.debouncer.is_pending()
            && self.validation.as_ref().is_some_and(|v| v.is_valid());
        Actions {
            can_add: form_ok && self.session.privileges.can_write(),
            can_edit: selected,
            can_delete: selected,
        }
    }

    pub fn group_counts(&self) -> GroupCounts {
        commands::report::group_counts(&self.records)
    }

    pub fn export_csv(&self) -> String {
        commands::export::render(&self.records)
    }

    // --- Loading and selection ---

    /// Replaces the in-memory set with the store's current contents.
    pub fn load(&mut self) -> Result<usize> {
        let records = self.report(self.store.fetch_all())?;
        self.records = records;
        self.selected = None;
        self.notify(RosterChange::Reset);
        self.notify(RosterChange::Selection(None));
        Ok(self.records.len())
    }

    /// Selects a row and copies it into the form. Out-of-range indexes clear
    /// the selection.
    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index.filter(|i| *i < self.records.len());
        if let Some(fields) = self.selected_record().map(|r| r.fields.clone()) {
            self.form = fields;
            self.debouncer.cancel();
            self.run_validation();
        }
        self.notify(RosterChange::Selection(self.selected));
    }

    // --- Form and validation ---

    pub fn set_field(&mut self, field: Field, value: impl Into<String>, now: Instant) {
        self.form.set(field, value);
        self.debouncer.trigger(now);
    }

    /// Runs validation if the debounce period has elapsed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.debouncer.poll(now) {
            self.run_validation();
            true
        } else {
            false
        }
    }

    /// Runs a pending validation immediately.
    pub fn flush_validation(&mut self) -> bool {
        if self.debouncer.flush() {
            self.run_validation();
            true
        } else {
            false
        }
    }

    pub fn clear_form(&mut self) {
        self.form = RecordDraft::default();
        self.debouncer.cancel();
        self.validation = None;
    }

    fn run_validation(&mut self) {
        let result = validate_draft(&self.form);
        if let Some(message) = result.first_message() {
            self.notify(RosterChange::Status(CmdMessage::error(message)));
        }
        self.notify(RosterChange::Validation(result.clone()));
        self.validation = Some(result);
    }

    // --- Commits ---

    /// Persists the form as a new record and appends it.
    pub fn commit_create(&mut self) -> Result<RecordId> {
        self.report(self.session.require_write("add records"))?;
        let outcome = commands::create::run(&mut self.store, &self.form);
        let result = self.report(outcome)?;
        let record = self.report(first_affected(result.affected_records))?;

        let id = record.id;
        self.records.push(record);
        let index = self.records.len() - 1;
        self.clear_form();
        debug!(id, index, "appended record");

        self.notify(RosterChange::Inserted(index));
        self.notify_messages(result.messages);
        Ok(id)
    }

    /// Persists the form over the selected record, in place.
    pub fn commit_edit(&mut self) -> Result<()> {
        self.report(self.session.require_write("edit records"))?;
        let index = self.report(self.selected.ok_or(RosterError::NoSelection))?;
        let id = self.records[index].id;

        let outcome = commands::update::run(&mut self.store, id, &self.form);
        let result = self.report(outcome)?;
        let record = self.report(first_affected(result.affected_records))?;

        self.records[index] = record;
        self.notify(RosterChange::Updated(index));
        self.notify_messages(result.messages);
        Ok(())
    }

    /// Deletes the selected record and clears the selection.
    pub fn commit_delete(&mut self) -> Result<Record> {
        self.report(self.session.require_write("delete records"))?;
        let index = self.report(self.selected.ok_or(RosterError::NoSelection))?;
        let id = self.records[index].id;

        let outcome = commands::delete::run(&mut self.store, id);
        let result = self.report(outcome)?;

        let removed = self.records.remove(index);
        self.selected = None;
        self.notify(RosterChange::Removed(index));
        self.notify(RosterChange::Selection(None));
        self.notify_messages(result.messages);
        Ok(removed)
    }

    /// Imports CSV text. Nothing is persisted or appended unless every line
    /// is valid and the store accepts the whole batch.
    pub fn import_csv(&mut self, text: &str) -> Result<usize> {
        self.report(self.session.require_write("import records"))?;
        let outcome = commands::import::run(&mut self.store, text);
        let result = self.report(outcome)?;

        let count = result.affected_records.len();
        for record in result.affected_records {
            self.records.push(record);
            self.notify(RosterChange::Inserted(self.records.len() - 1));
        }
        self.notify_messages(result.messages);
        Ok(count)
    }

    // --- Uploads ---

    /// Tracks an upload started by the caller. A previous upload that is still
    /// running is cancelled.
    pub fn attach_image(&mut self, handle: UploadHandle) {
        if let Some(previous) = self.upload.replace(handle) {
            previous.cancel();
        }
    }

    pub fn upload_in_progress(&self) -> bool {
        self.upload.as_ref().is_some_and(|u| !u.is_finished())
    }

    pub fn cancel_upload(&self) {
        if let Some(upload) = &self.upload {
            upload.cancel();
        }
    }

    /// Drains upload events that have arrived. On success the blob reference
    /// goes into the form's image field. Returns the outcome once the upload
    /// has finished.
    pub fn poll_upload(&mut self) -> Option<Result<String>> {
        let mut events = Vec::new();
        if let Some(upload) = self.upload.as_mut() {
            while let Some(event) = upload.try_next() {
                events.push(event);
            }
        }

        let mut outcome = None;
        for event in events {
            match event {
                UploadEvent::Progress(p) => self.notify(RosterChange::UploadProgress(p)),
                UploadEvent::Finished(Ok(reference)) => {
                    self.form.set(Field::ImageRef, reference.clone());
                    self.notify(RosterChange::Status(CmdMessage::success(
                        "Image uploaded successfully.",
                    )));
                    outcome = Some(Ok(reference));
                }
                UploadEvent::Finished(Err(e)) => {
                    self.notify(RosterChange::Status(CmdMessage::error(e.to_string())));
                    outcome = Some(Err(e));
                }
            }
        }
        if outcome.is_some() {
            self.upload = None;
        }
        outcome
    }

    // --- Plumbing ---

    fn notify(&mut self, change: RosterChange) {
        self.observer.changed(&change);
    }

    fn notify_messages(&mut self, messages: Vec<CmdMessage>) {
        for message in messages {
            self.notify(RosterChange::Status(message));
        }
    }

    /// Surfaces failures as a status message before handing them back.
    fn report<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.notify(RosterChange::Status(CmdMessage::error(e.to_string())));
        }
        result
    }
}

fn first_affected(records: Vec<Record>) -> Result<Record> {
    records
        .into_iter()
        .next()
        .ok_or_else(|| RosterError::Store("store did not return the written record".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::fixtures::gated;
    use crate::blob::MemoryBlobStore;
    use crate::session::Privileges;
    use crate::store::memory::fixtures::{student, StoreFixture};
    use crate::store::memory::InMemoryStore;
    use crate::upload::Uploader;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    type Vm = RosterViewModel<InMemoryStore, RecordingObserver>;

    fn vm_with(store: InMemoryStore) -> Vm {
        let mut vm = RosterViewModel::new(
            store,
            Session::new("tester", Privileges::User),
            RecordingObserver::default(),
        );
        vm.load().unwrap();
        vm.observer_mut().take();
        vm
    }

    fn fill(vm: &mut Vm, draft: &RecordDraft) {
        let now = Instant::now();
        for field in Field::ALL {
            vm.set_field(field, draft.get(field), now);
        }
        vm.flush_validation();
    }

    #[test]
    fn load_mirrors_store() {
        let vm = vm_with(StoreFixture::new().with_records(3).store);
        assert_eq!(vm.snapshot().len(), 3);
        assert_eq!(vm.actions(), Actions::default());
    }

    #[test]
    fn load_reports_connectivity_failure() {
        let store = InMemoryStore::new();
        store.simulate_outage(1);
        let session = Session::new("t", Privileges::User);
        let mut vm = RosterViewModel::new(store, session, RecordingObserver::default());
        assert!(matches!(vm.load(), Err(RosterError::Connectivity(_))));
        assert!(matches!(
            vm.observer().changes.last(),
            Some(RosterChange::Status(m)) if m.level == crate::commands::MessageLevel::Error
        ));
    }

    #[test]
    fn selection_drives_edit_and_delete() {
        let mut vm = vm_with(StoreFixture::new().with_records(2).store);
        vm.select(Some(1));
        let actions = vm.actions();
        assert!(actions.can_edit && actions.can_delete);
        assert_eq!(vm.form().email, "student2@uni.edu");

        vm.select(None);
        assert!(!vm.actions().can_edit);

        vm.select(Some(5));
        assert_eq!(vm.selected(), None);
    }

    #[test]
    fn debounce_gates_validation() {
        let mut vm = vm_with(InMemoryStore::new());
        let start = Instant::now();
        let draft = student("Ada", "Lovelace", "Math");
        for field in Field::ALL {
            vm.set_field(field, draft.get(field), start);
        }
        assert!(!vm.tick(start + Duration::from_millis(100)));
        assert!(!vm.actions().can_add);

        // another keystroke restarts the countdown
        vm.set_field(Field::Major, "Mathematics", start + Duration::from_millis(200));
        assert!(!vm.tick(start + Duration::from_millis(400)));
        assert!(vm.tick(start + Duration::from_millis(500)));
        assert!(vm.actions().can_add);

        let validations = vm
            .observer()
            .changes
            .iter()
            .filter(|c| matches!(c, RosterChange::Validation(_)))
            .count();
        assert_eq!(validations, 1);
    }

    #[test]
    fn invalid_form_disables_add_and_reports() {
        let mut vm = vm_with(InMemoryStore::new());
        let mut draft = student("Ada", "Lovelace", "Math");
        draft.first_name = "Ada1".into();
        fill(&mut vm, &draft);

        assert!(!vm.actions().can_add);
        assert!(vm.observer().changes.iter().any(|c| matches!(
            c,
            RosterChange::Status(m) if m.content == "Invalid first name"
        )));
    }

    #[test]
    fn create_appends_and_clears_form() {
        let mut vm = vm_with(StoreFixture::new().with_records(2).store);
        fill(&mut vm, &student("Ada", "Lovelace", "Math"));
        let id = vm.commit_create().unwrap();

        assert_eq!(vm.snapshot().len(), 3);
        assert_eq!(vm.snapshot()[2].id, id);
        assert!(vm.form().is_empty());
        assert!(!vm.actions().can_add);
        assert!(vm.observer().changes.contains(&RosterChange::Inserted(2)));
        assert_eq!(vm.store().fetch_all().unwrap().len(), 3);
    }

    #[test]
    fn duplicate_create_leaves_set_unchanged() {
        let mut vm = vm_with(
            StoreFixture::new()
                .with_record(RecordDraft::new("Ada", "Lovelace", "CS", "Math", "a@x.edu"))
                .store,
        );
        fill(&mut vm, &RecordDraft::new("Alan", "Turing", "CS", "Logic", "a@x.edu"));
        assert!(matches!(
            vm.commit_create(),
            Err(RosterError::DuplicateEmail(_))
        ));
        assert_eq!(vm.snapshot().len(), 1);
        // the form is kept so the user can fix the email
        assert_eq!(vm.form().first_name, "Alan");
    }

    #[test]
    fn store_outage_does_not_touch_memory() {
        let mut vm = vm_with(StoreFixture::new().with_records(1).store);
        fill(&mut vm, &student("Ada", "Lovelace", "Math"));
        vm.store().simulate_outage(1);
        assert!(matches!(
            vm.commit_create(),
            Err(RosterError::Connectivity(_))
        ));
        assert_eq!(vm.snapshot().len(), 1);
    }

    #[test]
    fn edit_replaces_in_place() {
        let mut vm = vm_with(StoreFixture::new().with_records(3).store);
        vm.select(Some(1));
        let id = vm.snapshot()[1].id;
        vm.set_field(Field::Major, "Astronomy", Instant::now());
        vm.commit_edit().unwrap();

        assert_eq!(vm.snapshot().len(), 3);
        assert_eq!(vm.snapshot()[1].id, id);
        assert_eq!(vm.snapshot()[1].fields.major, "Astronomy");
        assert_eq!(vm.selected(), Some(1));
        assert!(vm.observer().changes.contains(&RosterChange::Updated(1)));

        let stored = vm.store().fetch_all().unwrap();
        assert_eq!(stored[1].fields.major, "Astronomy");
    }

    #[test]
    fn edit_without_selection_fails() {
        let mut vm = vm_with(StoreFixture::new().with_records(1).store);
        assert!(matches!(vm.commit_edit(), Err(RosterError::NoSelection)));
        assert!(matches!(vm.commit_delete(), Err(RosterError::NoSelection)));
    }

    #[test]
    fn delete_removes_and_clears_selection() {
        let mut vm = vm_with(StoreFixture::new().with_records(3).store);
        vm.select(Some(1));
        let removed = vm.commit_delete().unwrap();

        assert_eq!(removed.id, 2);
        let ids: Vec<_> = vm.snapshot().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(vm.selected(), None);
        assert!(!vm.actions().can_delete);
        assert!(vm.store().fetch_all().unwrap().iter().all(|r| r.id != 2));
    }

    #[test]
    fn read_only_session_cannot_commit() {
        let mut vm = RosterViewModel::new(
            StoreFixture::new().with_records(1).store,
            Session::anonymous(),
            RecordingObserver::default(),
        );
        vm.load().unwrap();
        fill(&mut vm, &student("Ada", "Lovelace", "Math"));
        assert!(!vm.actions().can_add);
        assert!(matches!(
            vm.commit_create(),
            Err(RosterError::PermissionDenied(_))
        ));
        vm.select(Some(0));
        assert!(vm.commit_delete().is_err());
        assert_eq!(vm.store().len(), 1);
    }

    #[test]
    fn import_rejects_whole_file_on_bad_line() {
        let mut vm = vm_with(StoreFixture::new().with_records(1).store);
        let text = "\
Ada,Lovelace,Computer Science,Math,ada@x.edu,
Alan,Turing,Computer Science,Logic,alan@x.edu,
Grace,Hopper,Navy,Compilers,grace@x.edu,
Edsger,Dijkstra,Computer Science,Algorithms,edsger@x.edu
";
        match vm.import_csv(text) {
            Err(RosterError::MalformedImport { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected malformed import, got {:?}", other),
        }
        assert_eq!(vm.snapshot().len(), 1);
        assert_eq!(vm.store().len(), 1);
    }

    #[test]
    fn import_appends_valid_rows() {
        let mut vm = vm_with(InMemoryStore::new());
        let count = vm
            .import_csv("Ada,Lovelace,CS,Math,ada@x.edu,\nAlan,Turing,CS,Logic,alan@x.edu,\n")
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(vm.snapshot().len(), 2);
        assert_eq!(vm.group_counts().by_major.get("Logic"), Some(&1));
    }

    #[test]
    fn export_matches_snapshot() {
        let vm = vm_with(StoreFixture::new().with_records(2).store);
        let csv = vm.export_csv();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("student2@uni.edu"));
    }

    #[test]
    fn upload_completion_lands_in_form() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ada.png");
        std::fs::write(&path, vec![1u8; 16]).unwrap();

        let mut vm = vm_with(InMemoryStore::new());
        let blobs = MemoryBlobStore::new();
        let handle = Uploader::new(Arc::new(blobs.clone()))
            .with_chunk_size(8)
            .start(runtime.handle(), &path);
        vm.attach_image(handle);

        let mut outcome = None;
        for _ in 0..500 {
            outcome = vm.poll_upload();
            if outcome.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }

        assert_eq!(outcome.unwrap().unwrap(), "memory://ada.png");
        assert_eq!(vm.form().image_ref, "memory://ada.png");
        assert!(!vm.upload_in_progress());
        assert!(vm
            .observer()
            .changes
            .contains(&RosterChange::UploadProgress(1.0)));
        assert!(blobs.contains("ada.png"));
    }

    fn poll_until_done(vm: &mut Vm) -> Result<String> {
        for _ in 0..500 {
            if let Some(outcome) = vm.poll_upload() {
                return outcome;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("upload did not finish");
    }

    #[test]
    fn cancel_upload_stops_the_running_upload() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ada.png");
        std::fs::write(&path, vec![1u8; 16]).unwrap();

        let (blobs, permits) = gated(MemoryBlobStore::new());
        let token = CancellationToken::new();
        let handle = Uploader::new(Arc::new(blobs))
            .with_chunk_size(4)
            .start_with_token(runtime.handle(), &path, token.clone());

        let mut vm = vm_with(InMemoryStore::new());
        vm.attach_image(handle);
        assert!(vm.upload_in_progress());

        vm.cancel_upload();
        assert!(token.is_cancelled());
        // the task may already have finished and dropped the gate
        for _ in 0..2 {
            let _ = permits.send(());
        }

        assert!(matches!(poll_until_done(&mut vm), Err(RosterError::Cancelled)));
        assert!(!vm.upload_in_progress());
        assert_eq!(vm.form().image_ref, "");
        assert!(matches!(
            vm.observer().changes.last(),
            Some(RosterChange::Status(m)) if m.level == crate::commands::MessageLevel::Error
        ));
    }

    #[test]
    fn attaching_a_new_upload_cancels_the_previous_one() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("old.png");
        let second = dir.path().join("new.png");
        std::fs::write(&first, vec![1u8; 16]).unwrap();
        std::fs::write(&second, vec![2u8; 8]).unwrap();

        let (stalled, _permits) = gated(MemoryBlobStore::new());
        let token = CancellationToken::new();
        let old = Uploader::new(Arc::new(stalled))
            .with_chunk_size(4)
            .start_with_token(runtime.handle(), &first, token.clone());

        let blobs = MemoryBlobStore::new();
        let new = Uploader::new(Arc::new(blobs.clone())).start(runtime.handle(), &second);

        let mut vm = vm_with(InMemoryStore::new());
        vm.attach_image(old);
        vm.attach_image(new);
        assert!(token.is_cancelled());

        assert_eq!(poll_until_done(&mut vm).unwrap(), "memory://new.png");
        assert_eq!(vm.form().image_ref, "memory://new.png");
        assert!(blobs.contains("new.png"));
    }
}
