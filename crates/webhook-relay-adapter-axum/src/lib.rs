//! Axum adapter: hosts the webhook relay router on Tokio and talks to the webhook with reqwest.

mod proxy;
mod request;
mod response;
mod server;
mod service;

pub use proxy::ReqwestProxyClient;
pub use request::into_core_request;
pub use response::into_axum_response;
pub use server::{init_logging, run_app, RelayServer, RelayServerConfig};
pub use service::RelayAxumService;
