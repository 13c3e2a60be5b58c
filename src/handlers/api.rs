//! Front door for `/api`: match a route, gather params, invoke the service,
//! settle any pending authorization, then map the outcome to a response.

use crate::controller::{guarded, Controller};
use crate::error::AppError;
use crate::extractors::{Credentials, RangeIds, Transport};
use crate::service::{AuthGate, Method, Outcome, Params, PendingAuth, Route, Secret, AUTH_SERVICE};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{Method as HttpMethod, Uri},
    response::{IntoResponse, Response},
};
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::sync::OnceLock;

const NO_ROUTE_MESSAGE: &str = "Please see the links property to learn which routes are available.";
const AUTHENTICATE_FIRST: &str = "Recommend authenticating first.";

/// Result of matching a path against the route table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch {
    /// `None` for the bare `/api` route and for unmatched paths.
    pub route: Option<Route>,
    pub segment: Option<String>,
}

fn route_table() -> &'static [(Regex, Option<Route>)] {
    static TABLE: OnceLock<Vec<(Regex, Option<Route>)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        [
            (r"^/api/events/?$", Some(Route::Events)),
            (r"^/api/event/(?P<id>[^/]+?)/?$", Some(Route::Event)),
            (r"^/api/event/?$", Some(Route::Event)),
            (r"^/api/auth/(?P<id>[^/]+?)/?$", Some(Route::Auth)),
            (r"^/api/auth/?$", Some(Route::Auth)),
            (r"^/api/?", None),
        ]
        .into_iter()
        .filter_map(|(pattern, route)| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .ok()
                .map(|re| (re, route))
        })
        .collect()
    })
}

/// First match wins.
pub fn match_route(path: &str) -> RouteMatch {
    for (re, route) in route_table() {
        if let Some(caps) = re.captures(path) {
            return RouteMatch {
                route: *route,
                segment: caps.name("id").map(|m| m.as_str().to_string()),
            };
        }
    }
    RouteMatch {
        route: None,
        segment: None,
    }
}

/// Merges path, header and body parameters.
pub fn build_params(matched: &RouteMatch, range: RangeIds, credentials: &Credentials, body: &[u8]) -> Params {
    let mut params = Params {
        start: range.start,
        end: range.end,
        records: parse_body(body),
        user_id: credentials.user.clone(),
        auth_token: credentials.auth_token.clone(),
        plainword: credentials.pass.clone(),
        ..Params::default()
    };
    if let Some(segment) = &matched.segment {
        match segment.parse::<i64>() {
            Ok(id) => params.id = Some(id),
            Err(_) if matched.route == Some(Route::Auth) => params.auth_token = Some(Secret::new(segment.as_str())),
            Err(_) => {}
        }
    }
    params
}

/// An empty body is no records; a body that is not JSON is passed through
/// as a string so the service reports it as malformed.
fn parse_body(body: &[u8]) -> Option<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Some(serde_json::from_slice(body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned())))
}

/// Handles every method on every `/api` path.
pub async fn api_front_door(
    State(state): State<AppState>,
    method: HttpMethod,
    uri: Uri,
    transport: Transport,
    credentials: Credentials,
    range: RangeIds,
    body: Bytes,
) -> Response {
    let matched = match_route(uri.path());
    let params = build_params(&matched, range, &credentials, &body);
    let is_secure = transport.is_secure(state.config.trust_proxy) || state.config.fake_secure;
    tracing::debug!(path = %uri.path(), method = %method, route = ?matched.route, is_secure, params = ?params.redacted(), "dispatch");

    let Some(route) = matched.route else {
        let outcome = Outcome::failure(
            None,
            method.as_str().to_lowercase(),
            AppError::NoRouteFound(NO_ROUTE_MESSAGE.into()),
            &params,
            &[],
        );
        return respond(&state, &outcome);
    };

    let controller = Controller::new(state.factory.build(route, is_secure));
    let mut outcome = controller.handle(method.as_str(), params).await;
    if let AuthGate::NeedsCheck(pending) = outcome.take_gate() {
        let paused = Paused {
            route: outcome.route,
            method: outcome.method.clone(),
            options: outcome.options,
        };
        outcome = authorize(&state, is_secure, &credentials, paused, pending).await;
    }
    respond(&state, &outcome)
}

/// Where a paused invocation came from.
struct Paused {
    route: Option<Route>,
    method: String,
    options: &'static [Method],
}

/// Presents the Bearer token to the auth service and settles the gate.
async fn authorize(
    state: &AppState,
    is_secure: bool,
    credentials: &Credentials,
    paused: Paused,
    pending: PendingAuth,
) -> Outcome {
    let Paused { route, method, options } = paused;
    if state.config.fake_authorized {
        return guarded(route, &method, options, pending.resume()).await;
    }

    let check = Params {
        user_id: credentials.auth_token.as_ref().and(credentials.user.clone()),
        auth_token: credentials.auth_token.clone(),
        ..Params::default()
    };
    let auth = state.factory.auth_service(is_secure);
    let verdict = guarded(Some(Route::Auth), "get", AUTH_SERVICE.all_methods, async move {
        auth.get(check).await
    })
    .await;

    match verdict.result {
        Ok(_) => guarded(route, &method, options, pending.resume()).await,
        Err(err) => {
            let reason = if err.kind().is_unauthorized_family() {
                err
            } else {
                AppError::Unauthorized(AUTHENTICATE_FIRST.into())
            };
            tracing::warn!(route = ?route, method = %method, kind = %reason.kind(), "authorization denied");
            pending.deny(reason)
        }
    }
}

fn respond(state: &AppState, outcome: &Outcome) -> Response {
    match state.registry.resolve(outcome) {
        Ok(resp) => {
            tracing::debug!(route = ?outcome.route, method = %outcome.method, status = resp.code.as_u16(), "respond");
            resp.into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "response registry misconfigured");
            e.into_response()
        }
    }
}
