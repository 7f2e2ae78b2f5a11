use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use http::{HeaderMap, Method};
use indexmap::IndexMap;
use warp::{filters::path::FullPath, hyper::body::Bytes, Filter, Rejection, Reply};

use crate::entry_point::{EntryPoint, RouteHandler, RouteRequest, RouteResponse};

/// Entry points currently exposed by the service, keyed by name.
///
/// Entry points can be added and dropped while the server is running; the warp filter
/// always dispatches against the current table.
#[derive(Clone, Default)]
pub struct EntryPointTable(Arc<RwLock<IndexMap<String, Arc<EntryPoint>>>>);

impl EntryPointTable {
    /// Adds `entry_point`, replacing and returning an entry point of the same name.
    pub fn add(&self, entry_point: EntryPoint) -> Option<Arc<EntryPoint>> {
        let mut table = self.0.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(entry_point = %entry_point.name, "Entry point added.");
        table.insert(entry_point.name.clone(), Arc::new(entry_point))
    }

    pub fn drop(&self, name: &str) -> Option<Arc<EntryPoint>> {
        let mut table = self.0.write().unwrap_or_else(PoisonError::into_inner);
        let removed = table.shift_remove(name);
        if removed.is_some() {
            tracing::info!(entry_point = %name, "Entry point dropped.");
        }
        removed
    }

    pub fn exists(&self, name: &str) -> bool {
        self.0.read().unwrap_or_else(PoisonError::into_inner).contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<EntryPoint>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
    }

    fn find_handler(&self, method: &Method, path: &str) -> Option<Arc<dyn RouteHandler>> {
        let table = self.0.read().unwrap_or_else(PoisonError::into_inner);
        table.values().find_map(|entry_point| {
            entry_point
                .find_route(method, path)
                .map(|route| entry_point.handler(route))
        })
    }

    /// Hands the request to the first route matching its method and path.
    pub async fn dispatch(&self, request: RouteRequest) -> Option<RouteResponse> {
        let handler = self.find_handler(&request.method, &request.path)?;
        Some(handler.handle(request).await)
    }

    /// Serves every route of the table. Unknown routes are rejected as not found.
    pub fn filter(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let table = self.clone();
        warp::method()
            .and(warp::path::full())
            .and(warp::header::headers_cloned())
            .and(warp::body::bytes())
            .and_then(move |method: Method, path: FullPath, headers: HeaderMap, body: Bytes| {
                let table = table.clone();
                async move {
                    let request = RouteRequest {
                        method,
                        path: path.as_str().to_string(),
                        headers,
                        body,
                    };
                    table.dispatch(request).await.ok_or_else(warp::reject::not_found)
                }
            })
    }
}

impl fmt::Debug for EntryPointTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntryPointTable").field(&self.names()).finish()
    }
}
