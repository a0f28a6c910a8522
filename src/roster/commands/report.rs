//! Group counts for report consumers.
//!
//! Rendering (PDF or otherwise) happens outside the library; this module only
//! tallies records by major and by department.

use crate::commands::CmdResult;
use crate::error::Result;
use crate::model::Record;
use crate::store::RecordStore;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupCounts {
    pub total: usize,
    pub by_major: BTreeMap<String, usize>,
    pub by_department: BTreeMap<String, usize>,
}

pub fn group_counts(records: &[Record]) -> GroupCounts {
    let mut counts = GroupCounts {
        total: records.len(),
        ..GroupCounts::default()
    };
    for record in records {
        *counts
            .by_major
            .entry(record.fields.major.clone())
            .or_default() += 1;
        *counts
            .by_department
            .entry(record.fields.department.clone())
            .or_default() += 1;
    }
    counts
}

pub fn run<S: RecordStore>(store: &S) -> Result<CmdResult> {
    let records = store.fetch_all()?;
    Ok(CmdResult::default().with_counts(group_counts(&records)))
}
