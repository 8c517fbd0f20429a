//! HTTP API for the map front end.
//!
//! The front end posts the drawn polygon and draws the returned render
//! items; it also lists bindings and can force rediscovery.

mod server;

pub use server::*;
