use std::{fmt, sync::Arc};

use async_trait::async_trait;
use http::{HeaderMap, Method};
use warp::hyper::body::Bytes;

use crate::{error::EntryPointError, handler::ExplorerHandler, SchemaAccessor};

/// One HTTP request as seen by a route handler.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub method: Method,
    /// Full request path, route prefix included.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub type RouteResponse = http::Response<Vec<u8>>;

#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle(&self, request: RouteRequest) -> RouteResponse;
}

/// Wraps the handler of every route of an entry point.
pub trait Middleware: Send + Sync {
    fn wrap(&self, route: &Route, next: Arc<dyn RouteHandler>) -> Arc<dyn RouteHandler>;
}

#[derive(Clone)]
pub struct Route {
    pub method: Method,
    /// Path below the route prefix of the entry point, e.g. `/api`.
    pub path: String,
    pub handler: Arc<dyn RouteHandler>,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>, handler: Arc<dyn RouteHandler>) -> Self {
        Self {
            method,
            path: path.into(),
            handler,
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// A named group of routes sharing a path prefix and a middleware chain.
#[derive(Clone)]
pub struct EntryPoint {
    pub name: String,
    pub route_prefix: String,
    pub routes: Vec<Route>,
    /// Applied in order, the first middleware is the outermost.
    pub middlewares: Vec<Arc<dyn Middleware>>,
}

impl EntryPoint {
    /// Full path of `route`, prefix included.
    pub fn full_path(&self, route: &Route) -> String {
        join_path(&self.route_prefix, &route.path)
    }

    pub fn find_route(&self, method: &Method, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| route.method == *method && self.full_path(route) == path)
    }

    /// The handler of `route` wrapped in the middleware chain.
    pub fn handler(&self, route: &Route) -> Arc<dyn RouteHandler> {
        self.middlewares
            .iter()
            .rev()
            .fold(route.handler.clone(), |next, middleware| middleware.wrap(route, next))
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("name", &self.name)
            .field("route_prefix", &self.route_prefix)
            .field("routes", &self.routes)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// Assembles the routes of one entry point.
///
/// `query_route` is always included. With `enable_explorer`, a GET and a POST route at
/// `<query path>/explorer` serve the interactive explorer for `schema`.
pub fn compose(
    name: impl Into<String>,
    schema: SchemaAccessor,
    route_prefix: impl Into<String>,
    query_route: Route,
    enable_explorer: bool,
    middlewares: Vec<Arc<dyn Middleware>>,
) -> Result<EntryPoint, EntryPointError> {
    let name = name.into();
    if name.trim().is_empty() {
        return Err(EntryPointError::InvalidEntryPointName(name));
    }
    let route_prefix = route_prefix.into();

    let mut routes = vec![query_route];
    if enable_explorer {
        let path = join_path(&routes[0].path, "/explorer");
        let explorer: Arc<dyn RouteHandler> = Arc::new(ExplorerHandler::new(schema, join_path(&route_prefix, &path)));
        routes.push(Route::new(Method::GET, path.clone(), explorer.clone()));
        routes.push(Route::new(Method::POST, path, explorer));
    }

    tracing::debug!(entry_point = %name, route_prefix = %route_prefix, routes = routes.len(), "Entry point composed.");
    Ok(EntryPoint {
        name,
        route_prefix,
        routes,
        middlewares,
    })
}

pub(crate) fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{path}"),
        (false, true) => ensure_leading_slash(prefix),
        (false, false) => format!("{}/{path}", ensure_leading_slash(prefix)),
    }
}

fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn join_paths() {
        assert_eq!(join_path("", "/api"), "/api");
        assert_eq!(join_path("/v1/", "/api"), "/v1/api");
        assert_eq!(join_path("v1", "api"), "/v1/api");
        assert_eq!(join_path("/api", "/explorer"), "/api/explorer");
        assert_eq!(join_path("/v1", ""), "/v1");
        assert_eq!(join_path("", ""), "/");
    }
}
