//! HTTP surface for the Tavola media pipeline
//!
//! Exposed as a library so integration tests can build the router without
//! binding a socket.

pub mod api_doc;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
