//! Behaviour shared by every service: security sequencing, id allocation,
//! record preparation and outcome construction.

use crate::error::AppError;
use crate::model::Model;
use crate::record::{Record, Slot};
use crate::service::outcome::{AuthGate, Outcome, OutcomeFuture, PendingAuth};
use crate::service::{Method, Params, Route};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Largest number of ids a bulk replace may skip between two records.
pub const DEFAULT_MAX_ID_GAP: i64 = 10_000;

/// One table and its next-id cache, shared by every service over it.
pub struct Table {
    model: Model,
    next_id: Mutex<Option<i64>>,
    max_id_gap: i64,
}

impl Table {
    pub fn new(model: Model) -> Self {
        Self::with_max_id_gap(model, DEFAULT_MAX_ID_GAP)
    }

    pub fn with_max_id_gap(model: Model, max_id_gap: i64) -> Self {
        Self {
            model,
            next_id: Mutex::new(None),
            max_id_gap,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }
}

/// Static description of a service: its route and method sets.
#[derive(Clone, Copy, Debug)]
pub struct ServiceSpec {
    pub route: Route,
    pub secure_methods: &'static [Method],
    /// Full public surface, always including `options`.
    pub all_methods: &'static [Method],
}

#[derive(Clone)]
pub struct ServiceCore {
    spec: ServiceSpec,
    is_secure: bool,
    table: Arc<Table>,
}

impl ServiceCore {
    pub fn new(spec: ServiceSpec, table: Arc<Table>, is_secure: bool) -> Self {
        Self {
            spec,
            is_secure,
            table,
        }
    }

    pub fn route(&self) -> Route {
        self.spec.route
    }

    pub fn all_methods(&self) -> &'static [Method] {
        self.spec.all_methods
    }

    pub fn model(&self) -> &Model {
        self.table.model()
    }

    pub fn is_soft_delete(&self) -> bool {
        self.table.model().is_soft_delete()
    }

    fn is_secure_method(&self, method: Method) -> bool {
        self.spec.secure_methods.contains(&method)
    }

    /// Secure methods need a secure transport.
    pub fn ensure_secure(&self, method: Method) -> Result<(), AppError> {
        if self.is_secure_method(method) && !self.is_secure {
            return Err(AppError::InsecureOperation(format!(
                "\"{}\" is a secure service being invoked in an insecure environment.",
                method
            )));
        }
        Ok(())
    }

    /// Runs the transport check, then pauses secure methods behind an auth gate,
    /// then runs `work`.
    pub async fn perform_after_security_checks<F, Fut>(&self, method: Method, params: Params, work: F) -> Outcome
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
    {
        if let Err(e) = self.ensure_secure(method) {
            return self.generate_error(method, e, &params);
        }
        if !self.is_secure_method(method) {
            let result = work().await;
            return self.finish(method, result, &params);
        }

        let signal = AppError::ConfirmAuthorization(format!(
            "\"{}\" requires authorization: (re)authentication may be necessary.",
            method
        ));
        let resume_core = self.clone();
        let resume_params = params.clone();
        let deny_core = self.clone();
        let deny_params = params.clone();
        let pending = PendingAuth::new(
            move || -> OutcomeFuture {
                Box::pin(async move {
                    let result = work().await;
                    resume_core.finish(method, result, &resume_params)
                })
            },
            move |auth_err| deny_core.generate_error(method, auth_err, &deny_params),
        );
        tracing::debug!(route = %self.route(), %method, "awaiting authorization");
        self.generate_error(method, signal, &params)
            .with_gate(AuthGate::NeedsCheck(pending))
    }

    pub fn finish(&self, method: Method, result: Result<Value, AppError>, params: &Params) -> Outcome {
        match result {
            Ok(data) => self.generate_success(method, data, params),
            Err(e) => self.generate_error(method, e, params),
        }
    }

    /// Max occupied id + 1 (tombstones count), cached after the first call.
    pub async fn get_next_id(&self) -> Result<i64, AppError> {
        let mut cached = self.table.next_id.lock().await;
        if let Some(id) = *cached {
            return Ok(id);
        }
        let next = match self.model().last_id().await {
            Ok(last) => last.map_or(1, |id| id + 1),
            Err(AppError::NoRecordsFound(_)) => 1,
            Err(e) => return Err(e),
        };
        *cached = Some(next);
        Ok(next)
    }

    /// Advances the cache; callers invoke this after a successful create.
    pub async fn set_next_id(&self, id: i64) {
        *self.table.next_id.lock().await = Some(id);
    }

    /// Turns a raw body into records. `null` entries survive only under soft delete.
    pub fn prepare_records(&self, raw: Option<&Value>, allow_empty: bool) -> Result<Vec<Option<Record>>, AppError> {
        let items = match raw {
            Some(Value::Array(items)) if allow_empty || !items.is_empty() => items,
            _ => {
                return Err(AppError::RecordType(
                    "provided records should be an array of records, even if only one record in the array."
                        .into(),
                ))
            }
        };
        items
            .iter()
            .map(|item| match item {
                Value::Null if self.is_soft_delete() => Ok(None),
                other => {
                    let mut record = Record::from_value(other.clone())?;
                    self.model().schema().apply_defaults(&mut record);
                    Ok(Some(record))
                }
            })
            .collect()
    }

    /// Fills explicit nulls and id gaps with tombstones so ids run 1, 2, 3, ...
    pub fn null_stuff_records(&self, records: Vec<Option<Record>>, field: &str) -> Result<Vec<Slot>, AppError> {
        if !self.is_soft_delete() {
            return Err(AppError::Internal(
                "do not null-stuff records when not soft deleting.".into(),
            ));
        }
        null_stuff(records, field, self.table.max_id_gap)
    }

    pub fn options(&self, params: &Params) -> Outcome {
        self.generate_success(Method::Options, Value::Null, params)
    }

    pub fn no_such_method(&self, name: &str) -> Outcome {
        let err = AppError::NoSuchMethod(format!(
            "Service \"{}\" has no method \"{}\".",
            self.route(),
            name
        ));
        Outcome::failure(Some(self.route()), name, err, &Params::default(), self.all_methods())
    }

    pub fn generate_success(&self, method: Method, data: Value, params: &Params) -> Outcome {
        Outcome::success(Some(self.route()), method.name(), data, params, self.all_methods())
    }

    pub fn generate_error(&self, method: Method, err: AppError, params: &Params) -> Outcome {
        Outcome::failure(Some(self.route()), method.name(), err, params, self.all_methods())
    }
}

fn null_stuff(records: Vec<Option<Record>>, field: &str, max_gap: i64) -> Result<Vec<Slot>, AppError> {
    let mut out = Vec::with_capacity(records.len());
    let mut last = 0i64;
    for rec in records {
        let Some(rec) = rec else {
            last += 1;
            out.push(Slot::Tombstone(last));
            continue;
        };
        let id = rec.id(field).ok_or_else(|| {
            AppError::SchemaValidation(format!("Field {} is required, encountered: undefined.", field))
        })?;
        if id <= last {
            return Err(AppError::RecordType(format!(
                "record ids should be increasing; {} follows {}.",
                id, last
            )));
        }
        if id - last - 1 > max_gap {
            return Err(AppError::RecordType(format!(
                "record id {} leaves a gap of more than {} ids after {}.",
                id, max_gap, last
            )));
        }
        while id - last > 1 {
            last += 1;
            out.push(Slot::Tombstone(last));
        }
        out.push(Slot::Live(rec));
        last = id;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::events_schema;
    use crate::store::MemoryStore;
    use serde_json::json;

    const SPEC: ServiceSpec = ServiceSpec {
        route: Route::Event,
        secure_methods: &[Method::Put],
        all_methods: &[Method::Options, Method::Get, Method::Put],
    };

    fn core(soft_delete: bool, is_secure: bool) -> ServiceCore {
        let model = Model::new(
            Arc::new(events_schema().unwrap()),
            Arc::new(MemoryStore::new()),
            soft_delete,
        );
        ServiceCore::new(SPEC, Arc::new(Table::new(model)), is_secure)
    }

    fn rec(id: i64) -> Option<Record> {
        Some(Record::from_value(json!({ "eventID": id })).unwrap())
    }

    fn shape(slots: &[Slot]) -> Vec<(i64, bool)> {
        slots.iter().map(|s| (s.id("eventID").unwrap(), s.is_tombstone())).collect()
    }

    #[test]
    fn null_stuffs_all_nulls() {
        let out = core(true, true).null_stuff_records(vec![None, None, None], "eventID").unwrap();
        assert_eq!(out, vec![Slot::Tombstone(1), Slot::Tombstone(2), Slot::Tombstone(3)]);
    }

    #[test]
    fn null_stuffs_trailing_null() {
        let out = core(true, true)
            .null_stuff_records(vec![rec(1), rec(2), None], "eventID")
            .unwrap();
        assert_eq!(out, vec![Slot::Live(rec(1).unwrap()), Slot::Live(rec(2).unwrap()), Slot::Tombstone(3)]);
    }

    #[test]
    fn null_stuffs_gaps() {
        let out = core(true, true)
            .null_stuff_records(vec![rec(3), None, rec(6)], "eventID")
            .unwrap();
        assert_eq!(
            shape(&out),
            vec![(1, true), (2, true), (3, false), (4, true), (5, true), (6, false)]
        );
    }

    #[test]
    fn null_stuff_rejects_bad_input() {
        let c = core(true, true);
        let err = c.null_stuff_records(vec![rec(2), rec(2)], "eventID").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecordType);
        let no_id = Some(Record::from_value(json!({})).unwrap());
        assert_eq!(
            c.null_stuff_records(vec![no_id], "eventID").unwrap_err().kind(),
            ErrorKind::SchemaValidation
        );
        assert_eq!(
            core(false, true).null_stuff_records(vec![None], "eventID").unwrap_err().kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn null_stuff_caps_id_gaps() {
        let model = Model::new(
            Arc::new(events_schema().unwrap()),
            Arc::new(MemoryStore::new()),
            true,
        );
        let c = ServiceCore::new(SPEC, Arc::new(Table::with_max_id_gap(model, 3)), true);
        assert_eq!(c.null_stuff_records(vec![rec(4)], "eventID").unwrap().len(), 4);
        let err = c.null_stuff_records(vec![rec(1), rec(6)], "eventID").unwrap_err();
        assert_eq!(err.to_string(), "record id 6 leaves a gap of more than 3 ids after 1.");

        let err = core(true, true)
            .null_stuff_records(vec![rec(5_000_000)], "eventID")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecordType);
    }

    #[test]
    fn prepare_records_shapes_input() {
        let c = core(true, true);
        let err = c.prepare_records(Some(&json!({})), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecordType);
        assert!(c.prepare_records(Some(&json!([])), false).is_err());
        assert!(c.prepare_records(Some(&json!([])), true).unwrap().is_empty());
        assert!(c.prepare_records(None, true).is_err());

        let out = c.prepare_records(Some(&json!([null, {"eventID": 2}])), false).unwrap();
        assert_eq!(out[0], None);
        assert_eq!(out[1].as_ref().unwrap().get("timezone"), Some(&json!("Etc/UTC")));

        let hard = core(false, true);
        assert_eq!(
            hard.prepare_records(Some(&json!([null])), false).unwrap_err().kind(),
            ErrorKind::RecordType
        );
    }

    #[tokio::test]
    async fn next_id_starts_at_one_and_is_cached() {
        let c = core(true, true);
        assert_eq!(c.get_next_id().await.unwrap(), 1);
        c.model().create(&Slot::Tombstone(1), None).await.unwrap();
        assert_eq!(c.get_next_id().await.unwrap(), 1);
        c.set_next_id(9).await;
        assert_eq!(c.get_next_id().await.unwrap(), 9);

        let fresh = core(true, true);
        fresh.model().create(&Slot::Tombstone(4), None).await.unwrap();
        assert_eq!(fresh.get_next_id().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn insecure_transport_blocks_secure_methods() {
        let c = core(true, false);
        let out = c
            .perform_after_security_checks(Method::Put, Params::default(), || async { Ok(json!(1)) })
            .await;
        assert_eq!(
            out.error().unwrap().message(),
            "InsecureOperationError: \"put\" is a secure service being invoked in an insecure environment."
        );
    }

    #[tokio::test]
    async fn secure_methods_pause_until_resumed_or_denied() {
        let c = core(true, true);
        let work = || async { Ok(json!(7)) };

        let mut out = c.perform_after_security_checks(Method::Put, Params::default(), work).await;
        assert_eq!(out.error_kind(), Some(ErrorKind::ConfirmAuthorization));
        let AuthGate::NeedsCheck(pending) = out.take_gate() else {
            panic!("expected a pending authorization");
        };
        let resumed = pending.resume().await;
        assert_eq!(resumed.data(), Some(&json!(7)));

        let mut out = c.perform_after_security_checks(Method::Put, Params::default(), work).await;
        let AuthGate::NeedsCheck(pending) = out.take_gate() else {
            panic!("expected a pending authorization");
        };
        let denied = pending.deny(AppError::Unauthorized("nope".into()));
        assert_eq!(denied.error_kind(), Some(ErrorKind::Unauthorized));
        assert_eq!(denied.method, "put");

        let open = c.perform_after_security_checks(Method::Get, Params::default(), work).await;
        assert_eq!(open.data(), Some(&json!(7)));
    }

    #[test]
    fn no_such_method_names_service_and_method() {
        let out = core(true, true).no_such_method("_private");
        assert_eq!(
            out.error().unwrap().message(),
            "NoSuchMethodTypeError: Service \"Event\" has no method \"_private\"."
        );
    }
}
