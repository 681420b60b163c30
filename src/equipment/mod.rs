//! Equipment HTTP endpoints.
//!
//! Thin forwarders only: parse the request, call into the core, map errors
//! to responses. No business logic lives here.

pub mod handlers;
