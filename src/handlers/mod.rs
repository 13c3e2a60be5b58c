//! HTTP handlers: the `/api` front door.

pub mod api;
pub use api::*;
