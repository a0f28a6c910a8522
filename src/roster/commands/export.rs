use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{Field, Record};
use crate::store::RecordStore;

/// Header row written on export and recognized on import.
pub const CSV_HEADER: &str = "First Name,Last Name,Department,Major,Email,Image URL";

/// Renders records as CSV: header first, one line per record.
///
/// Fields are joined with `,` as-is. A field containing a comma or a newline
/// produces a line that will not import back; quoting is not supported.
pub fn render(records: &[Record]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + records.len() * 64);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for record in records {
        let line: Vec<&str> = Field::ALL.iter().map(|f| record.fields.get(*f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

pub fn run<S: RecordStore>(store: &S) -> Result<CmdResult> {
    let records = store.fetch_all()?;

    let mut result = CmdResult::default();
    if records.is_empty() {
        result.add_message(CmdMessage::info("No records to export."));
    } else {
        result.add_message(CmdMessage::success(format!(
            "Exported {} records.",
            records.len()
        )));
    }
    Ok(result.with_csv(render(&records)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordDraft;
    use crate::store::memory::fixtures::StoreFixture;

    #[test]
    fn header_comes_first() {
        let csv = render(&[]);
        assert_eq!(csv, format!("{}\n", CSV_HEADER));
    }

    #[test]
    fn one_line_per_record_in_column_order() {
        let record = RecordDraft::new("Ada", "Lovelace", "CS", "Math", "ada@x.edu")
            .with_image("ada.png")
            .with_id(3);
        let csv = render(&[record]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "Ada,Lovelace,CS,Math,ada@x.edu,ada.png");
    }

    #[test]
    fn embedded_commas_are_not_escaped() {
        let record =
            RecordDraft::new("Ada", "Lovelace", "CS", "Math, Logic", "ada@x.edu").with_id(1);
        let csv = render(&[record]);
        assert!(csv.contains("Math, Logic"));
    }

    #[test]
    fn run_exports_store_contents() {
        let store = StoreFixture::new().with_records(2).store;
        let result = run(&store).unwrap();
        assert_eq!(result.csv.unwrap().lines().count(), 3);
    }
}
