//! Uniform result of every service method, plus the authorization gate.

use crate::error::{AppError, ErrorKind};
use crate::service::{Method, Params, Route};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

pub type OutcomeFuture = Pin<Box<dyn Future<Output = Outcome> + Send + 'static>>;

/// Whether an outcome still waits on an authorization decision.
pub enum AuthGate {
    Clear,
    NeedsCheck(PendingAuth),
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthGate::Clear => f.write_str("Clear"),
            AuthGate::NeedsCheck(_) => f.write_str("NeedsCheck"),
        }
    }
}

/// The two ways to finish a paused invocation. Exactly one is consumed.
pub struct PendingAuth {
    resume: Box<dyn FnOnce() -> OutcomeFuture + Send>,
    deny: Box<dyn FnOnce(AppError) -> Outcome + Send>,
}

impl PendingAuth {
    pub fn new<R, D>(resume: R, deny: D) -> Self
    where
        R: FnOnce() -> OutcomeFuture + Send + 'static,
        D: FnOnce(AppError) -> Outcome + Send + 'static,
    {
        Self {
            resume: Box::new(resume),
            deny: Box::new(deny),
        }
    }

    /// Re-runs the original work to completion.
    pub fn resume(self) -> OutcomeFuture {
        (self.resume)()
    }

    /// Finalizes the invocation with `err`.
    pub fn deny(self, err: AppError) -> Outcome {
        (self.deny)(err)
    }
}

#[derive(Debug)]
pub struct Outcome {
    /// `None` only for requests that matched no route.
    pub route: Option<Route>,
    pub method: String,
    pub result: Result<Value, AppError>,
    /// Always redacted.
    pub params: Params,
    /// Methods the service supports, for `Allow` and links.
    pub options: &'static [Method],
    gate: AuthGate,
}

impl Outcome {
    pub fn success(
        route: Option<Route>,
        method: impl Into<String>,
        data: Value,
        params: &Params,
        options: &'static [Method],
    ) -> Self {
        Self {
            route,
            method: method.into(),
            result: Ok(data),
            params: params.redacted(),
            options,
            gate: AuthGate::Clear,
        }
    }

    pub fn failure(
        route: Option<Route>,
        method: impl Into<String>,
        err: AppError,
        params: &Params,
        options: &'static [Method],
    ) -> Self {
        Self {
            route,
            method: method.into(),
            result: Err(err),
            params: params.redacted(),
            options,
            gate: AuthGate::Clear,
        }
    }

    pub fn with_gate(mut self, gate: AuthGate) -> Self {
        self.gate = gate;
        self
    }

    /// Moves the gate out, leaving `Clear`.
    pub fn take_gate(&mut self) -> AuthGate {
        std::mem::replace(&mut self.gate, AuthGate::Clear)
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.result.as_ref().err().map(AppError::kind)
    }

    pub fn error(&self) -> Option<&AppError> {
        self.result.as_ref().err()
    }

    pub fn data(&self) -> Option<&Value> {
        self.result.as_ref().ok()
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
