//! Record schemas: rule tables, validation and defaults.

mod builtin;
mod types;
mod validator;

pub use builtin::{auth_schema, events_schema};
pub use types::{FieldRule, FieldType};
pub use validator::{validate_primary, RecordValidator};

use crate::error::AppError;
use crate::record::Record;

/// A validated rule table for one table's records.
#[derive(Clone, Debug)]
pub struct Schema {
    name: String,
    rules: Vec<(String, FieldRule)>,
    primary: String,
}

impl Schema {
    /// Fails unless exactly one root-level field is a required, primary number.
    pub fn new(name: impl Into<String>, rules: Vec<(String, FieldRule)>) -> Result<Self, AppError> {
        let primary = validate_primary(&rules)?.to_string();
        Ok(Self {
            name: name.into(),
            rules,
            primary,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the primary id field.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn validate_record(&self, record: &Record) -> Result<(), AppError> {
        RecordValidator::validate(record, &self.rules)
    }

    /// Fills absent top-level fields that declare a default.
    pub fn apply_defaults(&self, record: &mut Record) {
        for (name, rule) in &self.rules {
            if let Some(ref default) = rule.default_val {
                if record.get(name).map_or(true, |v| v.is_null()) {
                    record.insert(name.clone(), default.clone());
                }
            }
        }
    }
}
