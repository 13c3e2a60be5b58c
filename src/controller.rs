//! Forwards a request to the right service method and turns panics into outcomes.

use crate::error::AppError;
use crate::service::{Method, Outcome, Params, Route, Service};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;

pub struct Controller {
    service: Arc<dyn Service>,
}

impl Controller {
    pub fn new(service: Arc<dyn Service>) -> Self {
        Self { service }
    }

    pub fn route(&self) -> Route {
        self.service.core().route()
    }

    /// A lower-cased method name is callable when it is not `constructor`,
    /// starts with a letter, names a service method, and the service declares
    /// it (`options` always qualifies).
    pub fn admit(&self, name: &str) -> Option<Method> {
        if name == "constructor" || !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        let method = Method::parse(name)?;
        (method == Method::Options || self.service.declared().contains(&method)).then_some(method)
    }

    pub async fn handle(&self, http_method: &str, params: Params) -> Outcome {
        let name = http_method.to_lowercase();
        let Some(method) = self.admit(&name) else {
            tracing::debug!(route = %self.route(), method = %name, "no such method");
            return self.service.core().no_such_method(&name);
        };
        let service = self.service.clone();
        guarded(
            Some(self.route()),
            method.name(),
            self.service.declared(),
            async move { service.call(method, params).await },
        )
        .await
    }
}

/// Runs `work` on its own task; a panic becomes an `Unexpected` outcome.
pub async fn guarded<F>(route: Option<Route>, method: &str, options: &'static [Method], work: F) -> Outcome
where
    F: Future<Output = Outcome> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let text = if e.is_panic() {
                panic_text(e.into_panic())
            } else {
                "task was cancelled".to_string()
            };
            tracing::warn!(route = ?route, method, error = %text, "service panicked");
            Outcome::failure(route, method, AppError::Unexpected(text), &Params::default(), options)
        }
    }
}

fn panic_text(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
