use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the backing store on first insert.
pub type RecordId = i64;

/// The editable fields of a record, in form and CSV column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    FirstName,
    LastName,
    Department,
    Major,
    Email,
    ImageRef,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::FirstName,
        Field::LastName,
        Field::Department,
        Field::Major,
        Field::Email,
        Field::ImageRef,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Field::FirstName => "First Name",
            Field::LastName => "Last Name",
            Field::Department => "Department",
            Field::Major => "Major",
            Field::Email => "Email",
            Field::ImageRef => "Image URL",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A record that has not been persisted yet, so it carries no identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub major: String,
    pub email: String,
    pub image_ref: String,
}

impl RecordDraft {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        department: impl Into<String>,
        major: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            department: department.into(),
            major: major.into(),
            email: email.into(),
            image_ref: String::new(),
        }
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = image_ref.into();
        self
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::Department => &self.department,
            Field::Major => &self.major,
            Field::Email => &self.email,
            Field::ImageRef => &self.image_ref,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::FirstName => self.first_name = value,
            Field::LastName => self.last_name = value,
            Field::Department => self.department = value,
            Field::Major => self.major = value,
            Field::Email => self.email = value,
            Field::ImageRef => self.image_ref = value,
        }
    }

    /// Trims surrounding whitespace from every field, the way the form
    /// validator sees them.
    pub fn normalized(&self) -> Self {
        let mut out = Self::default();
        for field in Field::ALL {
            out.set(field, self.get(field).trim());
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_empty())
    }

    /// Binds the draft to a store-assigned identifier.
    pub fn with_id(self, id: RecordId) -> Record {
        Record { id, fields: self }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: RecordDraft,
}

impl Record {
    pub fn draft(&self) -> &RecordDraft {
        &self.fields
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.fields.first_name, self.fields.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_cover_every_field() {
        let mut draft = RecordDraft::default();
        for (i, field) in Field::ALL.iter().enumerate() {
            draft.set(*field, format!("v{}", i));
        }
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(draft.get(*field), format!("v{}", i));
        }
    }

    #[test]
    fn normalized_trims_fields() {
        let draft = RecordDraft::new(" Ada ", "Lovelace", " CS", "Math ", " ada@x.edu ");
        let n = draft.normalized();
        assert_eq!(n.first_name, "Ada");
        assert_eq!(n.department, "CS");
        assert_eq!(n.major, "Math");
        assert_eq!(n.email, "ada@x.edu");
    }

    #[test]
    fn with_id_keeps_fields() {
        let record = RecordDraft::new("Ada", "Lovelace", "CS", "Math", "ada@x.edu").with_id(7);
        assert_eq!(record.id, 7);
        assert_eq!(record.full_name(), "Ada Lovelace");
    }
}
