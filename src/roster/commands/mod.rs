use crate::config::RosterConfig;
use crate::error::Result;
use crate::model::{Record, RecordDraft};
use crate::validation::validate_draft;
use std::path::PathBuf;

pub mod config;
pub mod create;
pub mod delete;
pub mod export;
pub mod import;
pub mod init;
pub mod list;
pub mod report;
pub mod update;

pub use report::GroupCounts;

/// Where roster keeps its files.
#[derive(Debug, Clone)]
pub struct RosterPaths {
    pub home: PathBuf,
}

impl RosterPaths {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub affected_records: Vec<Record>,
    pub listed_records: Vec<Record>,
    pub csv: Option<String>,
    pub counts: Option<GroupCounts>,
    pub config: Option<RosterConfig>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_affected_records(mut self, records: Vec<Record>) -> Self {
        self.affected_records = records;
        self
    }

    pub fn with_listed_records(mut self, records: Vec<Record>) -> Self {
        self.listed_records = records;
        self
    }

    pub fn with_csv(mut self, csv: String) -> Self {
        self.csv = Some(csv);
        self
    }

    pub fn with_counts(mut self, counts: GroupCounts) -> Self {
        self.counts = Some(counts);
        self
    }

    pub fn with_config(mut self, config: RosterConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Partial change to a record; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
    pub major: Option<String>,
    pub email: Option<String>,
    pub image_ref: Option<String>,
}

impl RecordPatch {
    pub fn image(image_ref: impl Into<String>) -> Self {
        Self {
            image_ref: Some(image_ref.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, draft: &RecordDraft) -> RecordDraft {
        let pick = |new: &Option<String>, old: &str| new.clone().unwrap_or_else(|| old.to_string());
        RecordDraft {
            first_name: pick(&self.first_name, &draft.first_name),
            last_name: pick(&self.last_name, &draft.last_name),
            department: pick(&self.department, &draft.department),
            major: pick(&self.major, &draft.major),
            email: pick(&self.email, &draft.email),
            image_ref: pick(&self.image_ref, &draft.image_ref),
        }
    }
}

/// Trims and validates a draft before it reaches the store.
pub(crate) fn prepare(draft: &RecordDraft) -> Result<RecordDraft> {
    let normalized = draft.normalized();
    validate_draft(&normalized).into_result()?;
    Ok(normalized)
}
