use crate::commands::{prepare, CmdMessage, CmdResult, RecordPatch};
use crate::error::Result;
use crate::model::{RecordDraft, RecordId};
use crate::store::RecordStore;
use tracing::info;

/// Replaces every field of record `id`. Updating an id the store does not
/// know is a no-op; an invalid draft is always rejected.
pub fn run<S: RecordStore>(store: &mut S, id: RecordId, draft: &RecordDraft) -> Result<CmdResult> {
    let draft = prepare(draft)?;
    store.update(id, &draft)?;
    let record = draft.with_id(id);
    info!(id, "record updated");

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Record updated ({}): {}",
        id,
        record.full_name()
    )));
    Ok(result.with_affected_records(vec![record]))
}

/// Applies a partial change on top of the stored record.
pub fn patch<S: RecordStore>(
    store: &mut S,
    id: RecordId,
    patch: &RecordPatch,
) -> Result<CmdResult> {
    let current = store.fetch_all()?.into_iter().find(|r| r.id == id);
    let Some(current) = current else {
        let mut result = CmdResult::default();
        result.add_message(CmdMessage::warning(format!("No record with id {}", id)));
        return Ok(result);
    };

    if patch.is_empty() {
        let mut result = CmdResult::default();
        result.add_message(CmdMessage::info("Nothing to update."));
        return Ok(result);
    }

    run(store, id, &patch.apply(current.draft()))
}
