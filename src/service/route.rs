//! Resource routes and the public service method names.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Auth,
    Event,
    Events,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Auth, Route::Event, Route::Events];

    /// Name used in error messages, e.g. `Service "Event" has no method ...`.
    pub fn name(self) -> &'static str {
        match self {
            Route::Auth => "Auth",
            Route::Event => "Event",
            Route::Events => "Events",
        }
    }

    /// Path segment under `/api/`.
    pub fn segment(self) -> &'static str {
        match self {
            Route::Auth => "auth",
            Route::Event => "event",
            Route::Events => "events",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Options,
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn parse(name: &str) -> Option<Method> {
        match name {
            "options" => Some(Method::Options),
            "get" => Some(Method::Get),
            "put" => Some(Method::Put),
            "post" => Some(Method::Post),
            "delete" => Some(Method::Delete),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::Options => "options",
            Method::Get => "get",
            Method::Put => "put",
            Method::Post => "post",
            Method::Delete => "delete",
        }
    }

    /// Upper-case form used in the `Allow` header.
    pub fn http(self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
