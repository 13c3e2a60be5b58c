//! HTTP-facing projection of an [`Outcome`]: status, headers, links and body.

use crate::service::{Method, Outcome, Route};
use axum::{
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

const WWW_AUTHENTICATE: &str = "Basic realm=\"Access to secure operations\", charset=\"UTF-8\"";

/// Discoverability link for a route.
pub fn common_link(route: Route) -> &'static str {
    match route {
        Route::Auth => "auth/",
        Route::Event => "event/1",
        Route::Events => "events/",
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub code: StatusCode,
    pub status: &'static str,
    pub message: Option<String>,
    pub data: Option<Value>,
    pub links: Vec<String>,
    pub headers: Vec<(&'static str, String)>,
    route: Option<Route>,
}

#[derive(Serialize)]
struct ApiBody<'a> {
    code: u16,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
    links: &'a [String],
}

impl ApiResponse {
    /// Success shape: never carries a message; absent data becomes `[]`.
    pub fn success(code: StatusCode, status: &'static str, outcome: &Outcome) -> Self {
        let data = match outcome.data() {
            None | Some(Value::Null) => Value::Array(Vec::new()),
            Some(v) => v.clone(),
        };
        Self {
            code,
            status,
            message: None,
            data: Some(data),
            links: Vec::new(),
            headers: Vec::new(),
            route: outcome.route,
        }
    }

    /// Error shape: carries the error message, never data.
    pub fn failure(code: StatusCode, status: &'static str, outcome: &Outcome) -> Self {
        Self {
            code,
            status,
            message: outcome.error().map(|e| e.message()),
            data: None,
            links: Vec::new(),
            headers: Vec::new(),
            route: outcome.route,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        let link = link.into();
        if !self.links.contains(&link) {
            self.links.push(link);
        }
        self
    }

    pub fn with_common_links(self, route: Option<Route>) -> Self {
        match route {
            Some(r) => self.with_link(common_link(r)),
            None => self,
        }
    }

    /// Sets a header, replacing any earlier value under the same name.
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name, value.into()));
        self
    }

    /// `Allow` from the service's methods, minus `except`.
    pub fn with_allow(self, options: &[Method], except: Option<Method>) -> Self {
        let value = options
            .iter()
            .filter(|m| Some(**m) != except)
            .map(|m| m.http())
            .collect::<Vec<_>>()
            .join(", ");
        self.with_header("Allow", value)
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn uri(&self) -> String {
        match self.route {
            Some(r) => format!("/api/{}", r.segment()),
            None => "/api/".to_string(),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let mut response = if self.code == StatusCode::NO_CONTENT {
            self.code.into_response()
        } else {
            let body = ApiBody {
                code: self.code.as_u16(),
                status: self.status,
                message: self.message.as_deref(),
                data: self.data.as_ref(),
                links: &self.links,
            };
            (self.code, Json(body)).into_response()
        };
        let headers = response.headers_mut();
        if self.code == StatusCode::NO_CONTENT {
            headers.remove(CONTENT_TYPE);
        }
        let extra = std::iter::once(("URI", self.uri())).chain(self.headers.iter().cloned());
        for (name, value) in extra {
            match (HeaderName::try_from(name), HeaderValue::try_from(value.as_str())) {
                (Ok(n), Ok(v)) => {
                    headers.insert(n, v);
                }
                _ => tracing::warn!(header = name, "dropping unrepresentable header"),
            }
        }
        response
    }
}

// Shapes. Each turns an Outcome into a concrete response.

fn id_of(data: Option<&Value>) -> String {
    match data {
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

fn decorated(resp: ApiResponse, outcome: &Outcome) -> ApiResponse {
    resp.with_common_links(outcome.route).with_allow(outcome.options, None)
}

pub fn s200(outcome: &Outcome) -> ApiResponse {
    ApiResponse::success(StatusCode::OK, "OK", outcome).with_allow(outcome.options, Some(Method::Post))
}

pub fn s201(outcome: &Outcome) -> ApiResponse {
    let location = match outcome.route {
        Some(r) => format!("{}/{}", r.segment(), id_of(outcome.data())),
        None => id_of(outcome.data()),
    };
    ApiResponse::success(StatusCode::CREATED, "Created", outcome)
        .with_allow(outcome.options, Some(Method::Post))
        .with_common_links(outcome.route)
        .with_link(location.clone())
        .with_header("Location", location)
}

/// Token issued: the location is the new auth record's id.
pub fn auth_s201(outcome: &Outcome) -> ApiResponse {
    let location = format!("auth/{}", id_of(outcome.data().and_then(|d| d.get("id"))));
    ApiResponse::success(StatusCode::CREATED, "Created", outcome)
        .with_allow(outcome.options, Some(Method::Post))
        .with_common_links(outcome.route)
        .with_link(location.clone())
        .with_header("Location", location)
}

pub fn s204(outcome: &Outcome) -> ApiResponse {
    ApiResponse::success(StatusCode::NO_CONTENT, "No Content", outcome).with_allow(outcome.options, None)
}

/// 206 with `Content-Range` when a range was asked for, else the full 200.
pub fn events_200_or_206(outcome: &Outcome) -> ApiResponse {
    let (start, end) = (outcome.params.start, outcome.params.end);
    if start.is_none() && end.is_none() {
        return s200(outcome).with_link("event/1");
    }
    let start = start.unwrap_or(1);
    let end_text = end.map(|e| e.to_string()).unwrap_or_default();
    let mut resp = ApiResponse::success(StatusCode::PARTIAL_CONTENT, "Partial Content", outcome)
        .with_allow(outcome.options, Some(Method::Post))
        .with_header("Content-Range", format!("ids {}-{}/*", start, end_text))
        .with_link(format!("event/{}", start));
    if let Some(end) = end.filter(|e| *e != start) {
        resp = resp.with_link(format!("event/{}", end));
    }
    resp
}

pub fn f204(outcome: &Outcome) -> ApiResponse {
    ApiResponse::failure(StatusCode::NO_CONTENT, "No Content", outcome)
}

pub fn f400(outcome: &Outcome) -> ApiResponse {
    ApiResponse::failure(StatusCode::BAD_REQUEST, "FAIL", outcome)
}

pub fn f401(outcome: &Outcome) -> ApiResponse {
    let resp = ApiResponse::failure(StatusCode::UNAUTHORIZED, "Unauthorized", outcome)
        .with_header("WWW-Authenticate", WWW_AUTHENTICATE)
        .with_link("auth/");
    decorated(resp, outcome)
}

/// Wrong transport.
pub fn tls_f403(outcome: &Outcome) -> ApiResponse {
    let resp = ApiResponse::failure(StatusCode::FORBIDDEN, "Forbidden", outcome)
        .with_header("Strict-Transport-Security", "max-age=0");
    decorated(resp, outcome)
}

/// Auth records are never readable over HTTP; only the reason is shown.
pub fn auth_f403(outcome: &Outcome) -> ApiResponse {
    let resp = ApiResponse::failure(StatusCode::FORBIDDEN, "Forbidden", outcome);
    let message = resp.message.clone().filter(|m| !m.contains("NoRecordsFoundError"));
    decorated(resp.with_message(message), outcome)
}

pub fn event_f404(outcome: &Outcome) -> ApiResponse {
    let resp = ApiResponse::failure(StatusCode::NOT_FOUND, "Not Found", outcome);
    let message = match resp.message.clone() {
        Some(m) if m.contains("NoRecordsFoundError") => m,
        _ => {
            let route = outcome.route.map(Route::name).unwrap_or_default();
            let id = outcome.params.id.map(|i| i.to_string()).unwrap_or_default();
            format!(
                "NoRecordsFoundError: Service route \"{}\" has no record at {}/{}.",
                route, route, id
            )
        }
    };
    decorated(resp.with_message(Some(message)), outcome)
}

pub fn event_f410(outcome: &Outcome) -> ApiResponse {
    decorated(ApiResponse::failure(StatusCode::GONE, "Gone", outcome), outcome)
}

pub fn f405(outcome: &Outcome) -> ApiResponse {
    decorated(
        ApiResponse::failure(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed", outcome),
        outcome,
    )
}

pub fn f416(outcome: &Outcome) -> ApiResponse {
    let resp = ApiResponse::failure(StatusCode::RANGE_NOT_SATISFIABLE, "Range Not Satisfiable", outcome);
    decorated(resp, outcome).with_header("Content-Range", "ids */*")
}

pub fn f422(outcome: &Outcome) -> ApiResponse {
    decorated(
        ApiResponse::failure(StatusCode::UNPROCESSABLE_ENTITY, "Unprocessable Entity", outcome),
        outcome,
    )
}

pub fn f500(outcome: &Outcome) -> ApiResponse {
    decorated(
        ApiResponse::failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", outcome),
        outcome,
    )
}

/// No route matched: list every resource.
pub fn no_route_f404(outcome: &Outcome) -> ApiResponse {
    [Route::Event, Route::Events, Route::Auth]
        .iter()
        .fold(ApiResponse::failure(StatusCode::NOT_FOUND, "Not Found", outcome), |resp, r| {
            resp.with_link(common_link(*r))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::service::{Params, EVENTS_SERVICE, EVENT_SERVICE};
    use serde_json::json;

    fn ok(route: Route, method: Method, data: Value, params: Params) -> Outcome {
        let options = match route {
            Route::Events => EVENTS_SERVICE.all_methods,
            _ => EVENT_SERVICE.all_methods,
        };
        Outcome::success(Some(route), method.name(), data, &params, options)
    }

    fn err(route: Route, method: Method, e: AppError) -> Outcome {
        Outcome::failure(Some(route), method.name(), e, &Params::default(), EVENT_SERVICE.all_methods)
    }

    #[test]
    fn ranged_events_are_partial() {
        let params = Params {
            start: Some(2),
            end: Some(3),
            ..Params::default()
        };
        let resp = events_200_or_206(&ok(Route::Events, Method::Get, json!([{}, {}]), params));
        assert_eq!(resp.code, StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.header("Content-Range"), Some("ids 2-3/*"));
        assert_eq!(resp.links, vec!["event/2", "event/3"]);
        assert_eq!(resp.header("Allow"), Some("OPTIONS, GET, PUT"));
    }

    #[test]
    fn open_ended_range_and_full_listing() {
        let params = Params {
            start: Some(4),
            ..Params::default()
        };
        let resp = events_200_or_206(&ok(Route::Events, Method::Get, json!([]), params));
        assert_eq!(resp.header("Content-Range"), Some("ids 4-/*"));
        assert_eq!(resp.links, vec!["event/4"]);

        let resp = events_200_or_206(&ok(Route::Events, Method::Get, json!([]), Params::default()));
        assert_eq!(resp.code, StatusCode::OK);
        assert_eq!(resp.links, vec!["event/1"]);
    }

    #[test]
    fn success_never_has_message_and_defaults_data() {
        let resp = s204(&ok(Route::Event, Method::Options, Value::Null, Params::default()));
        assert_eq!(resp.message, None);
        assert_eq!(resp.data, Some(json!([])));
        assert_eq!(resp.header("Allow"), Some("OPTIONS, GET, PUT, POST, DELETE"));
    }

    #[test]
    fn created_points_at_new_record() {
        let resp = s201(&ok(Route::Event, Method::Post, json!(7), Params::default()));
        assert_eq!(resp.header("Location"), Some("event/7"));
        assert_eq!(resp.links, vec!["event/1", "event/7"]);
        assert_eq!(resp.header("Allow"), Some("OPTIONS, GET, PUT, DELETE"));
    }

    #[test]
    fn auth_forbidden_hides_missing_record_message() {
        let outcome = err(Route::Auth, Method::Get, AppError::NoRecordsFound("none".into()));
        let resp = auth_f403(&outcome);
        assert_eq!(resp.code, StatusCode::FORBIDDEN);
        assert_eq!(resp.message, None);
        assert_eq!(resp.data, None);
        assert_eq!(resp.links, vec!["auth/"]);
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let resp = f401(&err(Route::Event, Method::Put, AppError::Unauthorized("x".into())));
        assert_eq!(resp.header("WWW-Authenticate"), Some(WWW_AUTHENTICATE));
        assert_eq!(resp.links, vec!["auth/", "event/1"]);
        assert_eq!(resp.message.as_deref(), Some("UnauthorizedError: x"));
    }

    #[test]
    fn not_found_rewrites_foreign_messages() {
        let outcome = Outcome::failure(
            Some(Route::Event),
            "get",
            AppError::Internal("boom".into()),
            &Params {
                id: Some(9),
                ..Params::default()
            },
            EVENT_SERVICE.all_methods,
        );
        let resp = event_f404(&outcome);
        assert_eq!(
            resp.message.as_deref(),
            Some("NoRecordsFoundError: Service route \"Event\" has no record at Event/9.")
        );
    }

    #[test]
    fn range_failure_and_no_route() {
        let resp = f416(&err(Route::Events, Method::Get, AppError::BadRange("bad".into())));
        assert_eq!(resp.header("Content-Range"), Some("ids */*"));

        let outcome = Outcome::failure(None, "get", AppError::NoRouteFound("x".into()), &Params::default(), &[]);
        let resp = no_route_f404(&outcome);
        assert_eq!(resp.links, vec!["event/1", "events/", "auth/"]);
    }
}
