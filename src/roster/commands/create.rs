use crate::commands::{prepare, CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::RecordDraft;
use crate::store::RecordStore;
use tracing::info;

pub fn run<S: RecordStore>(store: &mut S, draft: &RecordDraft) -> Result<CmdResult> {
    let draft = prepare(draft)?;
    let id = store.create(&draft)?;
    let record = draft.with_id(id);
    info!(id, email = %record.fields.email, "record added");

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Record added ({}): {}",
        id,
        record.full_name()
    )));
    Ok(result.with_affected_records(vec![record]))
}
