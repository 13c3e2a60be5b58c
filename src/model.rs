//! CRUD over one table's store, with optional soft delete.

use crate::error::AppError;
use crate::record::{Record, Slot};
use crate::schema::Schema;
use crate::store::KvStore;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct Model {
    schema: Arc<Schema>,
    store: Arc<dyn KvStore>,
    soft_delete: bool,
}

fn deleted(id: i64) -> AppError {
    AppError::RecordDeleted(format!("Record with id {} has been deleted.", id))
}

fn missing(id: i64) -> AppError {
    AppError::NoRecordsFound(format!("No record found with id {}.", id))
}

impl Model {
    pub fn new(schema: Arc<Schema>, store: Arc<dyn KvStore>, soft_delete: bool) -> Self {
        Self {
            schema,
            store,
            soft_delete,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_soft_delete(&self) -> bool {
        self.soft_delete
    }

    /// Writes `slot` at `id` (or at the slot's own id). Tombstones need soft delete.
    pub async fn create(&self, slot: &Slot, id: Option<i64>) -> Result<i64, AppError> {
        let id = id
            .or_else(|| slot.id(self.schema.primary()))
            .ok_or_else(|| AppError::Internal("create received a record with no ID.".into()))?;
        match self.store.get(id).await? {
            Some(Value::Null) if self.soft_delete => return Err(deleted(id)),
            Some(_) => {
                return Err(AppError::RecordExists(format!(
                    "A record already exists with id {}.",
                    id
                )))
            }
            None => {}
        }
        let value = match slot {
            Slot::Live(record) => {
                self.schema.validate_record(record)?;
                record.clone().into_value()
            }
            Slot::Tombstone(_) if self.soft_delete => Value::Null,
            Slot::Tombstone(_) => {
                return Err(AppError::Internal(
                    "create received a null record but soft delete is off.".into(),
                ))
            }
        };
        if !self.store.put(id, value).await? {
            return Err(AppError::Internal(format!(
                "Database failed to create record with id {}.",
                id
            )));
        }
        tracing::debug!(table = self.schema.name(), id, "created");
        Ok(id)
    }

    /// Live records in `[start, end]`, ascending.
    pub async fn read(&self, start: i64, end: Option<i64>) -> Result<Vec<Record>, AppError> {
        if matches!(end, Some(end) if end < start) {
            return Err(AppError::BadRange("start cannot be greater than end.".into()));
        }
        let mut saw_tombstone = false;
        let mut out = Vec::new();
        for (id, value) in self.store.range(start, end).await? {
            if value.is_null() {
                saw_tombstone = true;
                continue;
            }
            let record = Record::from_value(value).map_err(|_| {
                AppError::Internal(format!("stored value at id {} is not a record.", id))
            })?;
            out.push(record);
        }
        if out.is_empty() {
            if self.soft_delete && saw_tombstone && end == Some(start) {
                return Err(deleted(start));
            }
            let end = end.map_or_else(|| "undefined".to_string(), |e| e.to_string());
            return Err(AppError::NoRecordsFound(format!(
                "No records found for start = {} and end = {}.",
                start, end
            )));
        }
        Ok(out)
    }

    pub async fn update(&self, record: &Record, id: i64) -> Result<i64, AppError> {
        self.ensure_live(id).await?;
        self.schema.validate_record(record)?;
        if !self.store.put(id, record.clone().into_value()).await? {
            return Err(AppError::Internal(format!(
                "Database failed to update record with id {}.",
                id
            )));
        }
        tracing::debug!(table = self.schema.name(), id, "updated");
        Ok(id)
    }

    pub async fn delete(&self, id: i64) -> Result<i64, AppError> {
        self.ensure_live(id).await?;
        let done = if self.soft_delete {
            self.store.put(id, Value::Null).await?
        } else {
            self.store.remove(id).await?
        };
        if !done {
            return Err(AppError::Internal(format!(
                "Database failed to delete record with id {}.",
                id
            )));
        }
        tracing::debug!(table = self.schema.name(), id, soft = self.soft_delete, "deleted");
        Ok(id)
    }

    /// The record with the highest id.
    pub async fn most_recent(&self) -> Result<Record, AppError> {
        let top = self.store.range_rev(1).await?;
        match top.as_slice() {
            [] => Err(AppError::NoRecordsFound("No records found.".into())),
            [(id, Value::Null)] => Err(AppError::RecordDeleted(id.to_string())),
            [(id, value)] => Record::from_value(value.clone())
                .map_err(|_| AppError::Internal(format!("stored value at id {} is not a record.", id))),
            _ => Err(AppError::Internal(
                "most recent scan returned more than one record.".into(),
            )),
        }
    }

    /// Highest occupied id, tombstones included.
    pub async fn last_id(&self) -> Result<Option<i64>, AppError> {
        Ok(self.store.range_rev(1).await?.first().map(|(id, _)| *id))
    }

    /// Replaces the whole table with `slots` in one store write. Live records
    /// are validated first; tombstones need soft delete.
    pub async fn replace_all(&self, slots: &[Slot]) -> Result<Vec<i64>, AppError> {
        let mut entries = Vec::with_capacity(slots.len());
        for slot in slots {
            let id = slot
                .id(self.schema.primary())
                .ok_or_else(|| AppError::Internal("replace received a record with no ID.".into()))?;
            let value = match slot {
                Slot::Live(record) => {
                    self.schema.validate_record(record)?;
                    record.clone().into_value()
                }
                Slot::Tombstone(_) if self.soft_delete => Value::Null,
                Slot::Tombstone(_) => {
                    return Err(AppError::Internal(
                        "replace received a null record but soft delete is off.".into(),
                    ))
                }
            };
            entries.push((id, value));
        }
        let ids: Vec<i64> = entries.iter().map(|(id, _)| *id).collect();
        if !self.store.replace_all(entries).await? {
            return Err(AppError::Internal(format!(
                "Database failed to replace {} records.",
                ids.len()
            )));
        }
        tracing::debug!(table = self.schema.name(), count = ids.len(), "replaced");
        Ok(ids)
    }

    async fn ensure_live(&self, id: i64) -> Result<(), AppError> {
        match self.store.get(id).await? {
            None => Err(missing(id)),
            Some(Value::Null) if self.soft_delete => Err(deleted(id)),
            Some(Value::Null) => Err(missing(id)),
            Some(_) => Ok(()),
        }
    }
}
