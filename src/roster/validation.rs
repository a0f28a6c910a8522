//! Field validation for roster forms.
//!
//! Every field is trimmed before it is checked:
//! - first and last names: 2 to 50 letters, apostrophes or hyphens
//! - email: `local@domain.tld`, case-insensitive, 2 to 6 letter TLD
//! - department: 2 to 50 letters or spaces
//! - major: anything non-empty
//! - image reference: optional, never fails
//!
//! ```
//! use roster::model::Field;
//! use roster::validation::validate_field;
//!
//! assert!(validate_field(Field::FirstName, "O'Brien"));
//! assert!(!validate_field(Field::FirstName, "R2D2"));
//! assert!(validate_field(Field::Email, "Ada@Example.EDU"));
//! assert!(!validate_field(Field::Department, "C"));
//! ```

use crate::error::{Result, RosterError};
use crate::model::{Field, RecordDraft};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z'-]{2,50}$").expect("valid regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,6}$").expect("valid regex")
});

static DEPARTMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z ]{2,50}$").expect("valid regex"));

/// Outcome of checking one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCheck {
    pub field: Field,
    pub valid: bool,
    /// Empty when the field is valid.
    pub message: String,
}

impl FieldCheck {
    pub fn passed(field: Field) -> Self {
        Self {
            field,
            valid: true,
            message: String::new(),
        }
    }

    pub fn failed(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            valid: false,
            message: message.into(),
        }
    }
}

/// Per-field results for a whole form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub checks: Vec<FieldCheck>,
}

impl ValidationResult {
    /// Gates the commit action.
    pub fn is_valid(&self) -> bool {
        self.checks.iter().all(|c| c.valid)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FieldCheck> {
        self.checks.iter().filter(|c| !c.valid)
    }

    pub fn check(&self, field: Field) -> Option<&FieldCheck> {
        self.checks.iter().find(|c| c.field == field)
    }

    /// The first failure message, suitable for a status line.
    pub fn first_message(&self) -> Option<&str> {
        self.failures().next().map(|c| c.message.as_str())
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(RosterError::Validation(
                self.checks.into_iter().filter(|c| !c.valid).collect(),
            ))
        }
    }
}

pub fn failure_message(field: Field) -> &'static str {
    match field {
        Field::FirstName => "Invalid first name",
        Field::LastName => "Invalid last name",
        Field::Email => "Invalid email format",
        Field::Department => "Invalid department",
        Field::Major => "Major is required",
        Field::ImageRef => "Invalid image reference",
    }
}

pub fn validate_field(field: Field, raw: &str) -> bool {
    let value = raw.trim();
    match field {
        Field::FirstName | Field::LastName => NAME_RE.is_match(value),
        Field::Email => EMAIL_RE.is_match(value),
        Field::Department => DEPARTMENT_RE.is_match(value),
        Field::Major => !value.is_empty(),
        Field::ImageRef => true,
    }
}

pub fn check_field(field: Field, raw: &str) -> FieldCheck {
    if validate_field(field, raw) {
        FieldCheck::passed(field)
    } else {
        FieldCheck::failed(field, failure_message(field))
    }
}

/// Checks every field of the draft. All fields are reported, not just the
/// first failure.
pub fn validate_draft(draft: &RecordDraft) -> ValidationResult {
    ValidationResult {
        checks: Field::ALL
            .iter()
            .map(|f| check_field(*f, draft.get(*f)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_draft() -> RecordDraft {
        RecordDraft::new("Ada", "Lovelace", "Computer Science", "Math", "ada@x.edu")
    }

    #[test]
    fn test_valid_names() {
        let longest = "a".repeat(50);
        for name in ["Al", "O'Brien", "Smith-Jones", "ab", longest.as_str()] {
            assert!(validate_field(Field::FirstName, name), "{}", name);
            assert!(validate_field(Field::LastName, name), "{}", name);
        }
    }

    #[test]
    fn test_names_with_digits_fail() {
        for name in ["R2D2", "Ada1", "1234", "x9"] {
            assert!(!validate_field(Field::FirstName, name), "{}", name);
        }
    }

    #[test]
    fn test_name_length_bounds() {
        assert!(!validate_field(Field::FirstName, "A"));
        assert!(!validate_field(Field::FirstName, &"a".repeat(51)));
        assert!(!validate_field(Field::FirstName, ""));
    }

    #[test]
    fn test_name_rejects_spaces_inside() {
        assert!(!validate_field(Field::FirstName, "Mary Ann"));
        // surrounding whitespace is trimmed first
        assert!(validate_field(Field::FirstName, "  Mary  "));
    }

    #[test]
    fn test_email() {
        assert!(validate_field(Field::Email, "a@x.edu"));
        assert!(validate_field(Field::Email, "First.Last+tag@Sub.Example.COM"));
        assert!(!validate_field(Field::Email, "no-at-sign.edu"));
        assert!(!validate_field(Field::Email, "a@x"));
        assert!(!validate_field(Field::Email, "a@x.e"));
        assert!(!validate_field(Field::Email, "a@x.abcdefg"));
        assert!(!validate_field(Field::Email, "a@x.ed1"));
    }

    #[test]
    fn test_department() {
        assert!(validate_field(Field::Department, "CS"));
        assert!(validate_field(Field::Department, "Computer Science"));
        assert!(!validate_field(Field::Department, "C"));
        assert!(!validate_field(Field::Department, "Dept-1"));
    }

    #[test]
    fn test_major_only_needs_content() {
        assert!(validate_field(Field::Major, "B.Sc. 2nd year"));
        assert!(!validate_field(Field::Major, ""));
        assert!(!validate_field(Field::Major, "   "));
    }

    #[test]
    fn test_image_ref_is_optional() {
        assert!(validate_field(Field::ImageRef, ""));
        assert!(validate_field(Field::ImageRef, "/tmp/me.png"));
    }

    #[test]
    fn test_validate_draft_ok() {
        let result = validate_draft(&valid_draft());
        assert!(result.is_valid());
        assert_eq!(result.checks.len(), 6);
        assert!(result.into_result().is_ok());
    }

    #[test]
    fn test_validate_draft_reports_each_failure() {
        let mut draft = valid_draft();
        draft.first_name = "A1".into();
        draft.email = "broken".into();

        let result = validate_draft(&draft);
        assert!(!result.is_valid());
        let failed: Vec<Field> = result.failures().map(|c| c.field).collect();
        assert_eq!(failed, vec![Field::FirstName, Field::Email]);
        assert_eq!(result.first_message(), Some("Invalid first name"));
        assert_eq!(
            result.check(Field::Email).map(|c| c.message.as_str()),
            Some("Invalid email format")
        );

        match result.into_result() {
            Err(RosterError::Validation(checks)) => assert_eq!(checks.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_messages_are_distinct() {
        let mut messages: Vec<&str> = Field::ALL.iter().map(|f| failure_message(*f)).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), Field::ALL.len());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn names_from_the_allowed_alphabet_pass(name in "[A-Za-z'-]{2,50}") {
                prop_assert!(validate_field(Field::FirstName, &name));
                prop_assert!(validate_field(Field::LastName, &name));
            }

            #[test]
            fn names_containing_a_digit_fail(
                prefix in "[A-Za-z]{0,20}",
                digit in "[0-9]",
                suffix in "[A-Za-z]{0,20}",
            ) {
                let name = format!("{}{}{}", prefix, digit, suffix);
                prop_assert!(!validate_field(Field::FirstName, &name));
            }

            #[test]
            fn names_are_judged_on_trimmed_ascii_letters(name in "\\PC{0,60}") {
                let value = name.trim();
                let allowed = (2..=50).contains(&value.chars().count())
                    && value.chars().all(|c| c.is_ascii_alphabetic() || c == '\'' || c == '-');
                prop_assert_eq!(validate_field(Field::FirstName, &name), allowed);
            }
        }
    }
}
