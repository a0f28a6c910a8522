use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::RecordStore;

pub fn run<S: RecordStore>(store: &mut S) -> Result<CmdResult> {
    store.ensure_schema()?;
    let count = store.fetch_all()?.len();

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success("Roster store is ready."));
    if count > 0 {
        result.add_message(CmdMessage::info(format!("{} records on file.", count)));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RosterError;
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;

    #[test]
    fn reports_existing_records() {
        let mut store = StoreFixture::new().with_records(2).store;
        let result = run(&mut store).unwrap();
        assert!(result.messages[1].content.contains("2 records"));
    }

    #[test]
    fn unreachable_store_is_a_setup_error() {
        let mut store = InMemoryStore::new();
        store.simulate_outage(1);
        assert!(matches!(run(&mut store), Err(RosterError::Setup(_))));
    }
}
