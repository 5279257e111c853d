//! Portable core of the webhook relay: request/response primitives, routing, the upstream
//! client seam and the relay handler itself. Hosting lives in the adapter crates.

pub mod app;
pub mod body;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod http;
pub mod manifest;
pub mod middleware;
pub mod proxy;
pub mod relay;
pub mod response;
pub mod router;
