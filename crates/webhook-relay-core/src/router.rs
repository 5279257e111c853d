use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use matchit::Router as PathRouter;
use tower_service::Service;

use crate::context::RequestContext;
use crate::error::RelayError;
use crate::handler::{BoxHandler, IntoHandler};
use crate::http::{HandlerFuture, Method, Request, Response};
use crate::middleware::{BoxMiddleware, Middleware, Next};
use crate::response::IntoResponse;

/// Method a route was registered for; `Any` routes decide their own method policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteMethod {
    Any,
    Only(Method),
}

#[derive(Clone, Debug)]
pub struct RouteInfo {
    method: RouteMethod,
    path: String,
}

impl RouteInfo {
    pub fn new(method: RouteMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    pub fn method(&self) -> &RouteMethod {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Default)]
pub struct RouterBuilder {
    routes: HashMap<Method, PathRouter<RouteEntry>>,
    any_routes: PathRouter<RouteEntry>,
    middlewares: Vec<BoxMiddleware>,
    route_info: Vec<RouteInfo>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<H>(mut self, path: &str, method: Method, handler: H) -> Self
    where
        H: IntoHandler,
    {
        let router = self.routes.entry(method.clone()).or_default();
        insert_route(router, path, handler);
        self.route_info
            .push(RouteInfo::new(RouteMethod::Only(method), path));
        self
    }

    pub fn get<H>(self, path: &str, handler: H) -> Self
    where
        H: IntoHandler,
    {
        self.route(path, Method::GET, handler)
    }

    pub fn post<H>(self, path: &str, handler: H) -> Self
    where
        H: IntoHandler,
    {
        self.route(path, Method::POST, handler)
    }

    /// Register a handler for every method on `path`. Method-specific routes on the same path
    /// take precedence.
    pub fn any<H>(mut self, path: &str, handler: H) -> Self
    where
        H: IntoHandler,
    {
        insert_route(&mut self.any_routes, path, handler);
        self.route_info.push(RouteInfo::new(RouteMethod::Any, path));
        self
    }

    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware,
    {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> RouterService {
        RouterService {
            inner: Arc::new(RouterInner {
                routes: self.routes,
                any_routes: self.any_routes,
                middlewares: self.middlewares,
                route_index: Arc::new(self.route_info),
            }),
        }
    }
}

fn insert_route<H>(router: &mut PathRouter<RouteEntry>, path: &str, handler: H)
where
    H: IntoHandler,
{
    router
        .insert(
            path,
            RouteEntry {
                handler: handler.into_handler(),
            },
        )
        .unwrap_or_else(|err| panic!("invalid route definition for {}: {}", path, err));
}

#[derive(Clone)]
pub struct RouterService {
    inner: Arc<RouterInner>,
}

impl RouterService {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn routes(&self) -> Vec<RouteInfo> {
        (*self.inner.route_index).clone()
    }

    /// Dispatch `request`, rendering errors into their JSON responses.
    pub async fn oneshot(&self, request: Request) -> Response {
        let mut service = self.clone();
        match service.call(request).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }
}

struct RouterInner {
    routes: HashMap<Method, PathRouter<RouteEntry>>,
    any_routes: PathRouter<RouteEntry>,
    middlewares: Vec<BoxMiddleware>,
    route_index: Arc<Vec<RouteInfo>>,
}

enum RouteMatch<'a> {
    Found(&'a RouteEntry),
    MethodNotAllowed,
    NotFound,
}

impl RouterInner {
    async fn dispatch(&self, request: Request) -> Result<Response, RelayError> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        match self.find_route(&method, &path) {
            RouteMatch::Found(entry) => {
                let ctx = RequestContext::new(request);
                let next = Next::new(&self.middlewares, entry.handler.as_ref());
                next.run(ctx).await
            }
            RouteMatch::MethodNotAllowed => Err(RelayError::method_not_allowed(&method)),
            RouteMatch::NotFound => Err(RelayError::not_found(path)),
        }
    }

    fn find_route(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        if let Some(router) = self.routes.get(method) {
            if let Ok(matched) = router.at(path) {
                return RouteMatch::Found(matched.value);
            }
        }

        if let Ok(matched) = self.any_routes.at(path) {
            return RouteMatch::Found(matched.value);
        }

        let allowed: HashSet<&Method> = self
            .routes
            .iter()
            .filter(|(_, router)| router.at(path).is_ok())
            .map(|(candidate, _)| candidate)
            .collect();

        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed
        }
    }
}

impl Service<Request> for RouterService {
    type Response = Response;
    type Error = RelayError;
    type Future = HandlerFuture;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { inner.dispatch(request).await })
    }
}

struct RouteEntry {
    handler: BoxHandler,
}
