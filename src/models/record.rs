//! Search record data structure.
//!
//! Records are assembled through a [`RecordBuilder`], which is free to
//! rename its identifier while the source is still being read, and then
//! frozen into an immutable [`Record`] before any sink sees them.

use std::fmt;

use crate::error::{AppError, Result};

/// Well-known record field names.
pub mod field {
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const TYPE: &str = "type";
    pub const URL: &str = "url";
    pub const METADATA_FORMAT: &str = "metadata_format";
    pub const METADATA_URL: &str = "metadata_url";
    pub const DESCRIPTION: &str = "description";
    pub const VARIABLE: &str = "variable";
    pub const CF_VARIABLE: &str = "cf_variable";
    pub const SERVICE_TYPE: &str = "service_type";
    pub const SERVICE: &str = "service";
    pub const SIZE: &str = "size";
    pub const VERSION: &str = "version";
    pub const PARENT_ID: &str = "parent_id";
    pub const SOUTH: &str = "south_degrees";
    pub const NORTH: &str = "north_degrees";
    pub const WEST: &str = "west_degrees";
    pub const EAST: &str = "east_degrees";
    pub const DATETIME_START: &str = "datetime_start";
    pub const DATETIME_STOP: &str = "datetime_stop";
}

/// Kind of entity a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Dataset,
    File,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Dataset => "Dataset",
            RecordType::File => "File",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered multimap of field name to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FieldMap {
    entries: Vec<(String, Vec<String>)>,
}

impl FieldMap {
    fn push(&mut self, name: &str, value: String) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name.to_string(), vec![value])),
        }
    }

    fn values(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }
}

/// Mutable staging area for a record under construction.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    id: String,
    fields: FieldMap,
}

impl RecordBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: FieldMap::default(),
        }
    }

    /// Current (possibly provisional) identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replace the identifier, e.g. with a canonical id declared by the source.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Append a value to a field, creating the field on first use.
    ///
    /// The identifier is not a field: values named [`field::ID`] are
    /// dropped, use [`RecordBuilder::set_id`] instead.
    pub fn add_field(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        if name == field::ID {
            log::warn!("Dropping source field '{}' on record {}", name, self.id);
            return self;
        }
        self.fields.push(name, value.into());
        self
    }

    /// First value of a field, if any.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.values(name).first().map(String::as_str)
    }

    pub fn has_field(&self, name: &str) -> bool {
        !self.fields.values(name).is_empty()
    }

    /// Freeze the builder. Fails if the identifier is blank.
    pub fn build(self) -> Result<Record> {
        if self.id.trim().is_empty() {
            return Err(AppError::missing("record", "id"));
        }
        Ok(Record {
            id: self.id,
            fields: self.fields,
        })
    }
}

/// Immutable, identifier-keyed metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: String,
    fields: FieldMap,
}

impl Record {
    /// Identifier-only record used to signal deletion.
    pub fn stub(id: impl Into<String>) -> Result<Self> {
        RecordBuilder::new(id).build()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// First value of a field, if any.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.values(name).first().map(String::as_str)
    }

    /// All values of a field in insertion order.
    pub fn values(&self, name: &str) -> &[String] {
        self.fields.values(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        !self.fields.values(name).is_empty()
    }

    /// Fields in first-insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter()
    }

    /// True when the record carries nothing but its identifier.
    pub fn is_stub(&self) -> bool {
        self.fields.entries.is_empty()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record id={}", self.id)?;
        for (name, values) in self.fields() {
            write!(f, " {}={:?}", name, values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_fields_keep_order() {
        let mut builder = RecordBuilder::new("ds1");
        builder
            .add_field(field::VARIABLE, "tas")
            .add_field(field::TITLE, "Dataset")
            .add_field(field::VARIABLE, "pr");
        let record = builder.build().unwrap();

        assert_eq!(record.values(field::VARIABLE), ["tas", "pr"]);
        let names: Vec<_> = record.fields().map(|(n, _)| n).collect();
        assert_eq!(names, [field::VARIABLE, field::TITLE]);
    }

    #[test]
    fn test_set_id_before_build() {
        let mut builder = RecordBuilder::new("ds1.v1");
        builder.set_id("ds1");
        let record = builder.build().unwrap();
        assert_eq!(record.id(), "ds1");
    }

    #[test]
    fn test_id_is_never_a_field() {
        let mut builder = RecordBuilder::new("ds1");
        builder.add_field(field::ID, "other").add_field(field::TITLE, "T");
        let record = builder.build().unwrap();

        assert_eq!(record.id(), "ds1");
        assert!(!record.has_field(field::ID));
        let names: Vec<_> = record.fields().map(|(n, _)| n).collect();
        assert_eq!(names, [field::TITLE]);
    }

    #[test]
    fn test_blank_id_rejected() {
        assert!(RecordBuilder::new("  ").build().is_err());
        assert!(Record::stub("").is_err());
    }

    #[test]
    fn test_stub_has_no_fields() {
        let record = Record::stub("x").unwrap();
        assert!(record.is_stub());
        assert_eq!(record.fields().count(), 0);
        assert_eq!(record.field(field::TITLE), None);
    }
}
