use colored::Colorize;
use roster::api::{CmdMessage, GroupCounts, MessageLevel};
use roster::config::{RosterConfig, KEYS};
use roster::model::Record;
use roster::session::Session;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ID_WIDTH: usize = 5;
const NAME_WIDTH: usize = 28;
const MAJOR_WIDTH: usize = 18;
const EMAIL_WIDTH: usize = 30;

pub(super) fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

pub(super) fn print_records(records: &[Record]) {
    if records.is_empty() {
        println!("No records found.");
        return;
    }
    for record in records {
        let line = render_record_line(record);
        if record.fields.image_ref.is_empty() {
            println!("{}", line);
        } else {
            println!("{} {}", line, "▣".dimmed());
        }
    }
}

pub(super) fn print_counts(counts: &GroupCounts) {
    println!("{} {}", "Total records:".bold(), counts.total);
    print_group("By major", &counts.by_major);
    print_group("By department", &counts.by_department);
}

fn print_group(title: &str, groups: &std::collections::BTreeMap<String, usize>) {
    println!();
    println!("{}", title.bold());
    if groups.is_empty() {
        println!("{}", "  (none)".dimmed());
        return;
    }
    let width = groups.keys().map(|k| k.width()).max().unwrap_or(0);
    for (name, count) in groups {
        println!("  {}{}  {}", name, " ".repeat(width - name.width()), count);
    }
}

pub(super) fn print_config(config: &RosterConfig) {
    for key in KEYS {
        let value = config.get(key).unwrap_or_else(|| "(default)".to_string());
        println!("{} = {}", key, value);
    }
}

pub(super) fn print_session(session: &Session) {
    println!(
        "{} {} since {}",
        session.user_name.bold(),
        format!("[{}]", session.privileges).yellow(),
        session.signed_in_at.format("%Y-%m-%d %H:%M")
    );
}

/// One table row: id, full name, major, email. Columns are padded by display
/// width and truncated with an ellipsis.
fn render_record_line(record: &Record) -> String {
    let id = format!("{:>width$}. ", record.id, width = ID_WIDTH - 2);
    let name = pad_to_width(&record.full_name(), NAME_WIDTH);
    let major = pad_to_width(&record.fields.major, MAJOR_WIDTH);
    let email = truncate_to_width(&record.fields.email, EMAIL_WIDTH);
    format!("{}{} {} {}", id.yellow(), name, major, email.dimmed())
}

fn pad_to_width(s: &str, width: usize) -> String {
    let cut = truncate_to_width(s, width);
    let padding = width.saturating_sub(cut.width());
    format!("{}{}", cut, " ".repeat(padding))
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}
