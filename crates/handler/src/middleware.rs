use std::{sync::Arc, time::Instant};

use async_trait::async_trait;

use crate::entry_point::{Middleware, Route, RouteHandler, RouteRequest, RouteResponse};

/// Logs method, path, status and latency of every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestLog;

impl Middleware for RequestLog {
    fn wrap(&self, _route: &Route, next: Arc<dyn RouteHandler>) -> Arc<dyn RouteHandler> {
        Arc::new(LoggedHandler { next })
    }
}

struct LoggedHandler {
    next: Arc<dyn RouteHandler>,
}

#[async_trait]
impl RouteHandler for LoggedHandler {
    async fn handle(&self, request: RouteRequest) -> RouteResponse {
        let method = request.method.clone();
        let path = request.path.clone();
        let start_time = Instant::now();
        let response = self.next.handle(request).await;
        tracing::info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed = ?start_time.elapsed(),
            "Request handled."
        );
        response
    }
}
