//! Maps an [`Outcome`] to a response shape by (route, method, error kind),
//! with wildcard positions resolved through a fixed cascade.

use crate::error::{ErrorKind, RegistryError};
use crate::response::{self, ApiResponse};
use crate::service::{Method, Outcome, Route};
use std::collections::HashMap;
use std::fmt;

pub type Shape = fn(&Outcome) -> ApiResponse;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Part<T> {
    Any,
    Is(T),
}

/// Error position of a key. `Success` is the no-error case; `Any` matches both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrPart {
    Any,
    Success,
    Kind(ErrorKind),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegistryKey {
    pub route: Part<Route>,
    pub method: Part<String>,
    pub err: ErrPart,
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.route {
            Part::Any => f.write_str("*")?,
            Part::Is(r) => write!(f, "{}", r)?,
        }
        match &self.method {
            Part::Any => f.write_str(":*")?,
            Part::Is(m) => write!(f, ":{}", m)?,
        }
        match self.err {
            ErrPart::Any => f.write_str(":*"),
            ErrPart::Success => f.write_str(":success"),
            ErrPart::Kind(k) => write!(f, ":{}", k),
        }
    }
}

fn key(route: Part<Route>, method: Part<String>, err: ErrPart) -> RegistryKey {
    RegistryKey { route, method, err }
}

/// Lookup order, most generic first; the first populated key wins.
pub fn cascade(outcome: &Outcome) -> Vec<RegistryKey> {
    let e = outcome.error_kind().map_or(ErrPart::Success, ErrPart::Kind);
    let m = Part::Is(outcome.method.clone());
    let mut keys = vec![
        key(Part::Any, Part::Any, ErrPart::Any),
        key(Part::Any, Part::Any, e),
        key(Part::Any, m.clone(), ErrPart::Any),
        key(Part::Any, m.clone(), e),
    ];
    if let Some(r) = outcome.route {
        keys.extend([
            key(Part::Is(r), Part::Any, ErrPart::Any),
            key(Part::Is(r), m.clone(), ErrPart::Any),
            key(Part::Is(r), Part::Any, e),
            key(Part::Is(r), m, e),
        ]);
    }
    keys
}

#[derive(Clone, Default)]
pub struct ResponseRegistry {
    entries: HashMap<RegistryKey, Shape>,
}

impl ResponseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, route: Option<Route>, method: Option<Method>, err: ErrPart, shape: Shape) {
        let route = route.map_or(Part::Any, Part::Is);
        let method = method.map_or(Part::Any, |m| Part::Is(m.name().to_string()));
        self.entries.insert(key(route, method, err), shape);
    }

    fn set_kinds(&mut self, route: Option<Route>, method: Option<Method>, kinds: &[ErrorKind], shape: Shape) {
        for k in kinds {
            self.set(route, method, ErrPart::Kind(*k), shape);
        }
    }

    pub fn lookup(&self, outcome: &Outcome) -> Result<Shape, RegistryError> {
        let keys = cascade(outcome);
        for k in &keys {
            if let Some(shape) = self.entries.get(k) {
                return Ok(*shape);
            }
        }
        let missing = keys.last().map(ToString::to_string).unwrap_or_default();
        Err(RegistryError(missing))
    }

    pub fn resolve(&self, outcome: &Outcome) -> Result<ApiResponse, RegistryError> {
        let shape = self.lookup(outcome)?;
        Ok(shape(outcome))
    }

    /// Every reachable (route, method, error kind) is covered here.
    pub fn standard() -> Self {
        use ErrorKind::*;
        use Method::{Delete, Get, Options, Post, Put};
        let mut r = Self::new();
        let (auth, event, events) = (Some(Route::Auth), Some(Route::Event), Some(Route::Events));

        r.set(None, Some(Options), ErrPart::Success, response::s204);
        r.set_kinds(None, None, &[RecordType, SchemaValidation], response::f422);
        r.set_kinds(
            None,
            None,
            &[ConfirmAuthorization, Unauthorized, AuthenticationFailed, ReauthenticationRequired],
            response::f401,
        );
        r.set_kinds(None, None, &[BadRange], response::f416);
        r.set_kinds(None, None, &[NoRouteFound], response::no_route_f404);
        r.set_kinds(None, None, &[Unexpected], response::f500);
        r.set_kinds(None, None, &[InsecureOperation], response::tls_f403);
        for route in Route::ALL {
            r.set_kinds(Some(route), None, &[Internal], response::f500);
            r.set_kinds(Some(route), None, &[NoSuchMethod], response::f405);
        }

        r.set(auth, Some(Get), ErrPart::Any, response::auth_f403);
        r.set(auth, Some(Post), ErrPart::Success, response::auth_s201);
        r.set_kinds(auth, Some(Post), &[RecordExists], response::f204);
        r.set_kinds(auth, Some(Post), &[Cryptography], response::f500);
        r.set_kinds(auth, Some(Post), &[ParameterType], response::f400);

        r.set(events, Some(Get), ErrPart::Success, response::events_200_or_206);
        r.set_kinds(events, Some(Get), &[NoRecordsFound, RecordDeleted], response::events_200_or_206);
        r.set(events, Some(Put), ErrPart::Success, response::s200);

        r.set(event, Some(Get), ErrPart::Success, response::s200);
        r.set(event, Some(Put), ErrPart::Success, response::s200);
        r.set(event, Some(Post), ErrPart::Success, response::s201);
        r.set(event, Some(Delete), ErrPart::Success, response::s204);
        r.set_kinds(event, None, &[ParameterType], response::f400);
        for m in [Get, Put, Delete] {
            r.set_kinds(event, Some(m), &[NoRecordsFound], response::event_f404);
        }
        r.set_kinds(event, Some(Get), &[RecordDeleted], response::event_f410);
        r.set_kinds(event, Some(Post), &[BadParameter], response::f405);
        r
    }
}
