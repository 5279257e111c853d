use serde_json::json;

use crate::context::RequestContext;
use crate::error::RelayError;
use crate::manifest::RelaySettings;
use crate::middleware::RequestLogger;
use crate::relay::relay_handler;
use crate::response::Json;
use crate::router::RouterService;

const DEFAULT_APP_NAME: &str = "Webhook Relay";
pub const HEALTH_PATH: &str = "/healthz";

/// Lightweight container around a `RouterService` that can be extended via hook implementations.
pub struct App {
    router: RouterService,
    name: String,
}

impl App {
    pub fn new(router: RouterService) -> Self {
        Self::with_name(router, DEFAULT_APP_NAME)
    }

    pub fn with_name<S>(router: RouterService, name: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            router,
            name: name.into(),
        }
    }

    pub fn router(&self) -> &RouterService {
        &self.router
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name<S>(&mut self, name: S)
    where
        S: Into<String>,
    {
        self.name = name.into();
    }

    pub fn into_router(self) -> RouterService {
        self.router
    }

    pub fn default_name() -> &'static str {
        DEFAULT_APP_NAME
    }
}

/// Trait implemented by application hook adapters.
pub trait Hooks {
    /// Allow implementations to mutate the freshly constructed application before use.
    fn configure(_app: &mut App) {}

    /// Build the router service for the application.
    fn routes(settings: &RelaySettings) -> RouterService;

    fn name() -> &'static str {
        App::default_name()
    }

    /// Construct an `App` by wiring the routes and invoking the configuration hook.
    fn build_app(settings: &RelaySettings) -> App
    where
        Self: Sized,
    {
        let mut app = App::with_name(Self::routes(settings), Self::name());
        Self::configure(&mut app);
        app
    }
}

/// The relay endpoint plus a health probe, behind the request logger.
pub struct RelayApp;

impl Hooks for RelayApp {
    fn routes(settings: &RelaySettings) -> RouterService {
        build_router(settings)
    }
}

pub fn build_router(settings: &RelaySettings) -> RouterService {
    RouterService::builder()
        .middleware(RequestLogger)
        .any(&settings.path, relay_handler(settings))
        .get(HEALTH_PATH, health)
        .build()
}

pub async fn health(_ctx: RequestContext) -> Result<Json<serde_json::Value>, RelayError> {
    Ok(Json(json!({ "status": "ok" })))
}
