//! Single-event operations.

use crate::error::AppError;
use crate::record::{Record, Slot};
use crate::service::base::{ServiceCore, ServiceSpec, Table};
use crate::service::{records_value, Method, Outcome, Params, Route, Service};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub const EVENT_SERVICE: ServiceSpec = ServiceSpec {
    route: Route::Event,
    secure_methods: &[Method::Put, Method::Post, Method::Delete],
    all_methods: &[Method::Options, Method::Get, Method::Put, Method::Post, Method::Delete],
};

fn require_id(id: Option<i64>) -> Result<i64, AppError> {
    id.ok_or_else(|| AppError::ParameterType("expecting id to be a number.".into()))
}

fn first_record(records: Vec<Option<Record>>) -> Result<Record, AppError> {
    records
        .into_iter()
        .next()
        .flatten()
        .ok_or_else(|| AppError::RecordType("a single record should be an object.".into()))
}

fn missing(id: i64) -> AppError {
    AppError::NoRecordsFound(format!("No record found with id {}.", id))
}

#[derive(Clone)]
pub struct EventService {
    core: ServiceCore,
}

impl EventService {
    pub fn new(table: Arc<Table>, is_secure: bool) -> Self {
        Self {
            core: ServiceCore::new(EVENT_SERVICE, table, is_secure),
        }
    }

    pub async fn get(&self, params: Params) -> Outcome {
        let this = self.clone();
        let id = params.id;
        self.core
            .perform_after_security_checks(Method::Get, params, move || async move {
                let id = require_id(id)?;
                let records = this.core.model().read(id, Some(id)).await?;
                Ok(records_value(records))
            })
            .await
    }

    /// Replaces the record at the path id; the body's own id is overridden.
    pub async fn put(&self, params: Params) -> Outcome {
        let this = self.clone();
        let (id, records) = (params.id, params.records.clone());
        self.core
            .perform_after_security_checks(Method::Put, params, move || async move {
                let id = require_id(id)?;
                let model = this.core.model();
                let mut record = first_record(this.core.prepare_records(records.as_ref(), false)?)?;
                record.set_id(model.schema().primary(), id);
                match model.update(&record, id).await {
                    Ok(id) => Ok(json!(id)),
                    Err(AppError::RecordDeleted(_)) => Err(missing(id)),
                    Err(e) => Err(e),
                }
            })
            .await
    }

    /// Creates a record under the next free id.
    pub async fn post(&self, params: Params) -> Outcome {
        let this = self.clone();
        let (id, start, records) = (params.id, params.start, params.records.clone());
        self.core
            .perform_after_security_checks(Method::Post, params, move || async move {
                if id.is_some() || start.is_some() {
                    return Err(AppError::BadParameter(
                        "EventService \"post\" cannot receive a record ID; do not specify one.".into(),
                    ));
                }
                let model = this.core.model();
                let mut record = first_record(this.core.prepare_records(records.as_ref(), false)?)?;
                let next = this.core.get_next_id().await?;
                record.set_id(model.schema().primary(), next);
                let id = match model.create(&Slot::Live(record), Some(next)).await {
                    Ok(id) => id,
                    Err(AppError::RecordDeleted(_)) => {
                        return Err(AppError::Internal(format!(
                            "Soft deleted: trouble saving with newly created ID: {}.",
                            next
                        )))
                    }
                    Err(AppError::RecordExists(_)) => {
                        return Err(AppError::Internal(format!(
                            "trouble saving with newly created ID: {}.",
                            next
                        )))
                    }
                    Err(e) => return Err(e),
                };
                this.core.set_next_id(id + 1).await;
                Ok(json!(id))
            })
            .await
    }

    pub async fn delete(&self, params: Params) -> Outcome {
        let this = self.clone();
        let id = params.id;
        self.core
            .perform_after_security_checks(Method::Delete, params, move || async move {
                let id = require_id(id)?;
                match this.core.model().delete(id).await {
                    Ok(id) => Ok(Value::from(id)),
                    Err(AppError::RecordDeleted(_)) => Err(missing(id)),
                    Err(e) => Err(e),
                }
            })
            .await
    }
}

#[async_trait]
impl Service for EventService {
    fn core(&self) -> &ServiceCore {
        &self.core
    }

    async fn call(&self, method: Method, params: Params) -> Outcome {
        match method {
            Method::Options => self.core.options(&params),
            Method::Get => self.get(params).await,
            Method::Put => self.put(params).await,
            Method::Post => self.post(params).await,
            Method::Delete => self.delete(params).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::Model;
    use crate::schema::events_schema;
    use crate::service::AuthGate;
    use crate::store::MemoryStore;

    fn table() -> Arc<Table> {
        let model = Model::new(
            Arc::new(events_schema().unwrap()),
            Arc::new(MemoryStore::new()),
            true,
        );
        Arc::new(Table::new(model))
    }

    fn body(name: &str) -> Value {
        json!([{ "eventType": "gig", "displayName": name, "startsAt": 1 }])
    }

    /// Runs a secure method as if the caller were authorized.
    async fn authorized(outcome: Outcome) -> Outcome {
        let mut outcome = outcome;
        match outcome.take_gate() {
            AuthGate::NeedsCheck(pending) => pending.resume().await,
            AuthGate::Clear => outcome,
        }
    }

    fn with_records(records: Value) -> Params {
        Params {
            records: Some(records),
            ..Params::default()
        }
    }

    #[tokio::test]
    async fn post_allocates_sequential_ids() {
        let svc = EventService::new(table(), true);
        let first = authorized(svc.post(with_records(body("one"))).await).await;
        assert_eq!(first.data(), Some(&json!(1)));
        let second = authorized(svc.post(with_records(body("two"))).await).await;
        assert_eq!(second.data(), Some(&json!(2)));

        let got = svc.get(Params { id: Some(2), ..Params::default() }).await;
        let data = got.data().unwrap();
        assert_eq!(data[0]["displayName"], json!("two"));
        assert_eq!(data[0]["eventID"], json!(2));
        assert_eq!(data[0]["timezone"], json!("Etc/UTC"));
    }

    #[tokio::test]
    async fn post_rejects_client_ids() {
        let svc = EventService::new(table(), true);
        let params = Params {
            id: Some(4),
            ..with_records(body("x"))
        };
        let out = authorized(svc.post(params).await).await;
        assert_eq!(out.error_kind(), Some(ErrorKind::BadParameter));
    }

    #[tokio::test]
    async fn put_and_delete_hide_soft_deleted_records() {
        let svc = EventService::new(table(), true);
        authorized(svc.post(with_records(body("one"))).await).await;

        let put = Params {
            id: Some(1),
            ..with_records(body("renamed"))
        };
        assert_eq!(authorized(svc.put(put.clone()).await).await.data(), Some(&json!(1)));

        let del = Params { id: Some(1), ..Params::default() };
        assert_eq!(authorized(svc.delete(del.clone()).await).await.data(), Some(&json!(1)));

        let again = authorized(svc.delete(del.clone()).await).await;
        assert_eq!(
            again.error().unwrap().message(),
            "NoRecordsFoundError: No record found with id 1."
        );
        let put_again = authorized(svc.put(put).await).await;
        assert_eq!(put_again.error_kind(), Some(ErrorKind::NoRecordsFound));

        let get = svc.get(del).await;
        assert_eq!(get.error_kind(), Some(ErrorKind::RecordDeleted));
    }

    #[tokio::test]
    async fn get_without_id_is_parameter_error() {
        let svc = EventService::new(table(), false);
        let out = svc.get(Params::default()).await;
        assert_eq!(out.error_kind(), Some(ErrorKind::ParameterType));
    }

    #[tokio::test]
    async fn secure_methods_wait_for_authorization() {
        let svc = EventService::new(table(), true);
        let mut out = svc.post(with_records(body("one"))).await;
        assert_eq!(out.error_kind(), Some(ErrorKind::ConfirmAuthorization));
        assert!(matches!(out.take_gate(), AuthGate::NeedsCheck(_)));
    }
}
