//! Records: plain keyed bags of fields for one resource instance.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts only JSON objects.
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        match value {
            Value::Object(map) => Ok(Record(map)),
            _ => Err(AppError::RecordType("a single record should be an object.".into())),
        }
    }

    /// Reads an integral id from `field`.
    pub fn id(&self, field: &str) -> Option<i64> {
        self.0.get(field).and_then(Value::as_i64)
    }

    pub fn set_id(&mut self, field: &str, id: i64) {
        self.0.insert(field.to_string(), Value::from(id));
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// One position of a full-collection replace: a live record, or a tombstone
/// that keeps its id occupied.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    Live(Record),
    Tombstone(i64),
}

impl Slot {
    pub fn id(&self, field: &str) -> Option<i64> {
        match self {
            Slot::Live(rec) => rec.id(field),
            Slot::Tombstone(id) => Some(*id),
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Slot::Tombstone(_))
    }
}
