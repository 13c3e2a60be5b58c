//! Services: business rules per resource route, each yielding an [`Outcome`].

mod auth;
mod base;
mod event;
mod events;
mod outcome;
mod params;
mod route;

pub use self::auth::{AuthService, AuthSettings, AUTH_SERVICE};
pub use self::base::{ServiceCore, ServiceSpec, Table, DEFAULT_MAX_ID_GAP};
pub use self::event::{EventService, EVENT_SERVICE};
pub use self::events::{EventsService, EVENTS_SERVICE};
pub use self::outcome::{AuthGate, Outcome, OutcomeFuture, PendingAuth};
pub use self::params::{Params, Secret};
pub use self::route::{Method, Route};

use crate::record::Record;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait Service: Send + Sync {
    fn core(&self) -> &ServiceCore;

    /// Methods this service declares; `options` is always among them.
    fn declared(&self) -> &'static [Method] {
        self.core().all_methods()
    }

    async fn call(&self, method: Method, params: Params) -> Outcome;
}

pub(crate) fn records_value(records: Vec<Record>) -> Value {
    Value::Array(records.into_iter().map(Record::into_value).collect())
}

/// Builds the service for a route. Tables are shared across requests; the
/// transport flag is per request.
#[derive(Clone)]
pub struct ServiceFactory {
    events: Arc<Table>,
    auth: Arc<Table>,
    settings: Arc<AuthSettings>,
}

impl ServiceFactory {
    pub fn new(events: Arc<Table>, auth: Arc<Table>, settings: AuthSettings) -> Self {
        Self {
            events,
            auth,
            settings: Arc::new(settings),
        }
    }

    pub fn spec(route: Route) -> ServiceSpec {
        match route {
            Route::Auth => AUTH_SERVICE,
            Route::Event => EVENT_SERVICE,
            Route::Events => EVENTS_SERVICE,
        }
    }

    pub fn build(&self, route: Route, is_secure: bool) -> Arc<dyn Service> {
        match route {
            Route::Auth => Arc::new(self.auth_service(is_secure)),
            Route::Event => Arc::new(EventService::new(self.events.clone(), is_secure)),
            Route::Events => Arc::new(EventsService::new(self.events.clone(), is_secure)),
        }
    }

    pub fn auth_service(&self, is_secure: bool) -> AuthService {
        AuthService::new(self.auth.clone(), self.settings.clone(), is_secure)
    }

    pub fn events_table(&self) -> &Arc<Table> {
        &self.events
    }
}
