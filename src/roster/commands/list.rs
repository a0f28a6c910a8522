use crate::commands::CmdResult;
use crate::error::Result;
use crate::store::RecordStore;

pub fn run<S: RecordStore>(store: &S) -> Result<CmdResult> {
    let records = store.fetch_all()?;
    Ok(CmdResult::default().with_listed_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;

    #[test]
    fn lists_in_store_order() {
        let store = StoreFixture::new().with_records(3).store;
        let result = run(&store).unwrap();
        let ids: Vec<_> = result.listed_records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn empty_store_is_not_an_error() {
        let store = InMemoryStore::new();
        assert!(run(&store).unwrap().listed_records.is_empty());
    }

    #[test]
    fn connectivity_failure_is_reported() {
        let store = InMemoryStore::new();
        store.simulate_outage(1);
        assert!(run(&store).is_err());
    }
}
