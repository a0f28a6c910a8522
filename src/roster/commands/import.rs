//! CSV import.
//!
//! The whole file is parsed and validated before anything is written. Any bad
//! line rejects the import and names the line (1-based). Valid rows are then
//! inserted as one batch, so a store failure also leaves nothing behind.
//!
//! Line rules:
//! - blank lines are skipped
//! - the first line is skipped only if it is exactly the export header
//! - every other line needs exactly six comma-separated fields
//! - the first five fields must be non-blank; the image column may be empty
//! - each row must pass field validation
//! - an email may appear only once in the file; the repeat is the bad line
//!
//! A UTF-8 byte order mark before the first line is ignored.

use crate::commands::export::CSV_HEADER;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{Result, RosterError};
use crate::model::{Field, RecordDraft};
use crate::store::RecordStore;
use crate::validation::validate_draft;
use std::collections::HashMap;
use tracing::{info, warn};

const COLUMNS: usize = 6;

pub fn parse(text: &str) -> Result<Vec<RecordDraft>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut drafts = Vec::new();
    let mut first_seen: HashMap<String, usize> = HashMap::new();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || (i == 0 && line == CSV_HEADER) {
            continue;
        }
        let reject = |reason: String| {
            warn!(line = line_no, %reason, "import rejected");
            RosterError::MalformedImport {
                line: line_no,
                reason,
            }
        };

        let draft = parse_line(line).map_err(reject)?;
        if let Some(earlier) = first_seen.insert(draft.email.clone(), line_no) {
            return Err(reject(format!(
                "email {} already used on line {}",
                draft.email, earlier
            )));
        }
        drafts.push(draft);
    }

    Ok(drafts)
}

fn parse_line(line: &str) -> std::result::Result<RecordDraft, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != COLUMNS {
        return Err(format!(
            "expected {} fields, found {}",
            COLUMNS,
            fields.len()
        ));
    }

    let mut draft = RecordDraft::default();
    for (field, value) in Field::ALL.iter().zip(&fields) {
        if value.is_empty() && *field != Field::ImageRef {
            return Err(format!("{} is blank", field));
        }
        draft.set(*field, *value);
    }

    let checked = validate_draft(&draft);
    if let Some(message) = checked.first_message() {
        return Err(message.to_string());
    }
    Ok(draft)
}

pub fn run<S: RecordStore>(store: &mut S, text: &str) -> Result<CmdResult> {
    let drafts = parse(text)?;

    let mut result = CmdResult::default();
    if drafts.is_empty() {
        result.add_message(CmdMessage::info("No records to import."));
        return Ok(result);
    }

    let ids = store.create_batch(&drafts)?;
    let records: Vec<_> = drafts
        .into_iter()
        .zip(ids)
        .map(|(draft, id)| draft.with_id(id))
        .collect();
    info!(count = records.len(), "records imported");

    result.add_message(CmdMessage::success(format!(
        "Imported {} records.",
        records.len()
    )));
    Ok(result.with_affected_records(records))
}
