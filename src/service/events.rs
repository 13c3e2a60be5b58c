//! Collection operations: ranged reads and full replace.

use crate::error::AppError;
use crate::service::base::{ServiceCore, ServiceSpec, Table};
use crate::service::{records_value, Method, Outcome, Params, Route, Service};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub const EVENTS_SERVICE: ServiceSpec = ServiceSpec {
    route: Route::Events,
    secure_methods: &[Method::Put],
    all_methods: &[Method::Options, Method::Get, Method::Put],
};

#[derive(Clone)]
pub struct EventsService {
    core: ServiceCore,
}

impl EventsService {
    pub fn new(table: Arc<Table>, is_secure: bool) -> Self {
        Self {
            core: ServiceCore::new(EVENTS_SERVICE, table, is_secure),
        }
    }

    pub async fn get(&self, params: Params) -> Outcome {
        let this = self.clone();
        let (start, end) = (params.start.unwrap_or(1), params.end);
        self.core
            .perform_after_security_checks(Method::Get, params, move || async move {
                Ok(records_value(this.core.model().read(start, end).await?))
            })
            .await
    }

    /// Rewrites the table from the body in one store write; gaps and nulls become tombstones.
    pub async fn put(&self, params: Params) -> Outcome {
        let this = self.clone();
        let records = params.records.clone();
        self.core
            .perform_after_security_checks(Method::Put, params, move || async move {
                let model = this.core.model();
                let prepared = this.core.prepare_records(records.as_ref(), true)?;
                for record in prepared.iter().flatten() {
                    model.schema().validate_record(record)?;
                }
                let slots = this.core.null_stuff_records(prepared, model.schema().primary())?;

                let ids = model.replace_all(&slots).await?;
                this.core.set_next_id(ids.last().map_or(1, |id| id + 1)).await;
                tracing::debug!(count = ids.len(), "replaced events");
                Ok(json!(ids))
            })
            .await
    }
}

#[async_trait]
impl Service for EventsService {
    fn core(&self) -> &ServiceCore {
        &self.core
    }

    async fn call(&self, method: Method, params: Params) -> Outcome {
        match method {
            Method::Options => self.core.options(&params),
            Method::Get => self.get(params).await,
            Method::Put => self.put(params).await,
            other => self.core.no_such_method(other.name()),
        }
    }
}
