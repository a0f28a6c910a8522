use super::RecordStore;
use crate::error::{Result, RosterError};
use crate::model::{Record, RecordDraft, RecordId};
use std::cell::Cell;

/// In-memory storage for testing and development.
/// Does NOT persist data.
///
/// Mirrors the SQLite store's observable behavior: insertion order, unique
/// emails and never-reused identifiers. It can also pretend to be unreachable
/// for a number of operations, which is how connectivity handling is tested.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Vec<Record>,
    last_id: RecordId,
    outage: Cell<usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `ops` operations fail with a connectivity error.
    pub fn simulate_outage(&self, ops: usize) {
        self.outage.set(ops);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn reach(&self) -> Result<()> {
        let remaining = self.outage.get();
        if remaining > 0 {
            self.outage.set(remaining - 1);
            return Err(RosterError::Connectivity(
                "in-memory store is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn email_taken(&self, email: &str, except: Option<RecordId>) -> bool {
        self.records
            .iter()
            .any(|r| r.fields.email == email && Some(r.id) != except)
    }

    fn insert(&mut self, draft: &RecordDraft) -> RecordId {
        self.last_id += 1;
        self.records.push(draft.clone().with_id(self.last_id));
        self.last_id
    }
}

impl RecordStore for InMemoryStore {
    fn ensure_schema(&mut self) -> Result<()> {
        self.reach()
            .map_err(|e| RosterError::Setup(e.to_string()))
    }

    fn fetch_all(&self) -> Result<Vec<Record>> {
        self.reach()?;
        Ok(self.records.clone())
    }

    fn create(&mut self, draft: &RecordDraft) -> Result<RecordId> {
        self.reach()?;
        if self.email_taken(&draft.email, None) {
            return Err(RosterError::DuplicateEmail(draft.email.clone()));
        }
        Ok(self.insert(draft))
    }

    fn create_batch(&mut self, drafts: &[RecordDraft]) -> Result<Vec<RecordId>> {
        self.reach()?;
        for (i, draft) in drafts.iter().enumerate() {
            let repeated = drafts[..i].iter().any(|d| d.email == draft.email);
            if repeated || self.email_taken(&draft.email, None) {
                return Err(RosterError::DuplicateEmail(draft.email.clone()));
            }
        }
        Ok(drafts.iter().map(|d| self.insert(d)).collect())
    }

    fn update(&mut self, id: RecordId, draft: &RecordDraft) -> Result<()> {
        self.reach()?;
        if self.email_taken(&draft.email, Some(id)) {
            return Err(RosterError::DuplicateEmail(draft.email.clone()));
        }
        if let Some(record) = self.records.iter_mut().find(|r| r.id == id) {
            record.fields = draft.clone();
        }
        Ok(())
    }

    fn delete(&mut self, id: RecordId) -> Result<()> {
        self.reach()?;
        self.records.retain(|r| r.id != id);
        Ok(())
    }

    fn find_id_by_email(&self, email: &str) -> Result<Option<RecordId>> {
        self.reach()?;
        Ok(self
            .records
            .iter()
            .find(|r| r.fields.email == email)
            .map(|r| r.id))
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;

    pub fn student(first: &str, last: &str, major: &str) -> RecordDraft {
        RecordDraft::new(
            first,
            last,
            "Computer Science",
            major,
            format!("{}.{}@uni.edu", first.to_lowercase(), last.to_lowercase()),
        )
    }

    pub struct StoreFixture {
        pub store: InMemoryStore,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
            }
        }

        pub fn with_records(mut self, count: usize) -> Self {
            for i in 0..count {
                let draft = RecordDraft::new(
                    "Test",
                    "Student",
                    "Computer Science",
                    if i % 2 == 0 { "Math" } else { "Physics" },
                    format!("student{}@uni.edu", i + 1),
                );
                self.store.create(&draft).unwrap();
            }
            self
        }

        pub fn with_record(mut self, draft: RecordDraft) -> Self {
            self.store.create(&draft).unwrap();
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{student, StoreFixture};
    use super::*;

    #[test]
    fn create_assigns_increasing_ids() {
        let mut store = InMemoryStore::new();
        let a = store.create(&student("Ada", "Lovelace", "Math")).unwrap();
        let b = store.create(&student("Alan", "Turing", "Math")).unwrap();
        assert!(b > a);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let mut store = InMemoryStore::new();
        let a = store.create(&student("Ada", "Lovelace", "Math")).unwrap();
        store.delete(a).unwrap();
        let b = store.create(&student("Ada", "Lovelace", "Math")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let mut store = StoreFixture::new()
            .with_record(student("Ada", "Lovelace", "Math"))
            .store;
        let err = store
            .create(&student("Ada", "Lovelace", "Physics"))
            .unwrap_err();
        assert!(matches!(err, RosterError::DuplicateEmail(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let mut store = StoreFixture::new().with_records(1).store;
        let batch = vec![
            student("Ada", "Lovelace", "Math"),
            RecordDraft::new("X", "Y", "CS", "Math", "student1@uni.edu"),
        ];
        assert!(store.create_batch(&batch).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_and_delete_missing_are_noops() {
        let mut store = StoreFixture::new().with_records(2).store;
        store.update(99, &student("Ada", "Lovelace", "Math")).unwrap();
        store.delete(99).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn outage_fails_then_recovers() {
        let store = StoreFixture::new().with_records(1).store;
        store.simulate_outage(1);
        assert!(matches!(
            store.fetch_all(),
            Err(RosterError::Connectivity(_))
        ));
        assert_eq!(store.fetch_all().unwrap().len(), 1);
    }
}
