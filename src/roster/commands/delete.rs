use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::RecordId;
use crate::store::RecordStore;
use tracing::info;

pub fn run<S: RecordStore>(store: &mut S, id: RecordId) -> Result<CmdResult> {
    let existing = store.fetch_all()?.into_iter().find(|r| r.id == id);
    store.delete(id)?;

    let mut result = CmdResult::default();
    match existing {
        Some(record) => {
            info!(id, "record deleted");
            result.add_message(CmdMessage::success(format!(
                "Record deleted ({}): {}",
                id,
                record.full_name()
            )));
            result.affected_records.push(record);
        }
        None => result.add_message(CmdMessage::info(format!("No record with id {}", id))),
    }
    Ok(result)
}
