use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use async_graphql::{http::GraphiQLSource, Request, Response, ServerError};
use async_trait::async_trait;
use confucius_schema::{ExecutableSchema, ResolverMap, SharedDirectiveRegistry};
use http::{
    header::{HeaderValue, CONTENT_TYPE},
    Method,
    StatusCode,
};
use opentelemetry::{
    global,
    trace::{FutureExt, TraceContextExt, Tracer},
    Context,
};
use tracing::instrument;

use crate::{
    constants::*,
    entry_point::{RouteHandler, RouteRequest, RouteResponse},
    metrics::METRICS,
    HandlerError,
};

/// Reads and resolves the schema document on demand.
///
/// Every call sees the schema file and the directive registry as they are at that moment.
#[derive(Clone)]
pub struct SchemaAccessor {
    schema_path: PathBuf,
    registry: SharedDirectiveRegistry,
    resolvers: Arc<ResolverMap>,
}

impl SchemaAccessor {
    pub fn new(schema_path: impl Into<PathBuf>, registry: SharedDirectiveRegistry, resolvers: Arc<ResolverMap>) -> Self {
        Self {
            schema_path: schema_path.into(),
            registry,
            resolvers,
        }
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    pub fn registry(&self) -> &SharedDirectiveRegistry {
        &self.registry
    }

    #[instrument(skip(self), fields(path = %self.schema_path.display()), level = "debug")]
    pub fn resolve(&self) -> Result<ExecutableSchema, HandlerError> {
        let sdl = std::fs::read_to_string(&self.schema_path).map_err(|source| {
            tracing::error!(path = %self.schema_path.display(), error = %source, "Failed to read schema file.");
            HandlerError::SchemaFileUnreadable {
                path: self.schema_path.clone(),
                source,
            }
        })?;
        let registry = self.registry.snapshot();
        Ok(ExecutableSchema::resolve(&sdl, &registry, &self.resolvers)?)
    }

    /// Resolves the schema and executes `request` against it.
    ///
    /// Resolution failures are turned into an error response, field errors are logged.
    pub async fn execute(&self, request: Request) -> Response {
        let schema = match self.resolve() {
            Ok(schema) => schema,
            Err(err) => return error_response(&err),
        };

        let tracer = global::tracer("graphql");
        let query = Context::current_with_span(
            tracer
                .span_builder("query")
                .with_attributes(vec![KEY_QUERY.string(request.query.clone())])
                .start(&tracer),
        );

        let start_time = Instant::now();
        let response = schema.execute(request).with_context(query).await;

        METRICS
            .query_histogram
            .record((Instant::now() - start_time).as_secs_f64(), &[]);
        METRICS.query_counter.add(1, &[]);

        if response.is_err() {
            for error in &response.errors {
                tracing::info!(error = %error.message, path = ?error.path, "Query finished with a field error.");
            }
        }
        response
    }
}

fn error_response(err: &HandlerError) -> Response {
    Response::from_errors(vec![ServerError::new(err.to_string(), None)])
}

/// Serializes a GraphQL response. The status is always `200 OK`.
pub(crate) fn json_response(response: &Response) -> RouteResponse {
    let body = serde_json::to_vec(response).unwrap_or_else(|err| {
        tracing::error!(error = %err, "Failed to serialize response.");
        br#"{"data":null,"errors":[{"message":"Failed to serialize response."}]}"#.to_vec()
    });
    with_content_type(http::Response::new(body), "application/json")
}

fn with_content_type(mut response: RouteResponse, content_type: &'static str) -> RouteResponse {
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Executes the raw query text of the request body.
pub struct QueryHandler {
    schema: SchemaAccessor,
}

impl QueryHandler {
    pub fn new(schema: SchemaAccessor) -> Self {
        Self { schema }
    }
}

#[async_trait]
impl RouteHandler for QueryHandler {
    async fn handle(&self, request: RouteRequest) -> RouteResponse {
        let query = match std::str::from_utf8(&request.body) {
            Ok(query) => query.to_string(),
            Err(err) => return json_response(&error_response(&HandlerError::InvalidEncoding(err))),
        };
        let request = Request::new(query).data(request.headers);
        json_response(&self.schema.execute(request).await)
    }
}

/// Serves GraphiQL on GET and executes JSON GraphQL requests on POST.
pub struct ExplorerHandler {
    schema: SchemaAccessor,
    endpoint: String,
}

impl ExplorerHandler {
    pub fn new(schema: SchemaAccessor, endpoint: impl Into<String>) -> Self {
        Self {
            schema,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl RouteHandler for ExplorerHandler {
    async fn handle(&self, request: RouteRequest) -> RouteResponse {
        if request.method == Method::GET {
            let html = GraphiQLSource::build().endpoint(&self.endpoint).finish();
            return with_content_type(http::Response::new(html.into_bytes()), "text/html");
        }
        if request.method != Method::POST {
            let mut response = http::Response::new(Vec::new());
            *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
            return response;
        }

        let response = match serde_json::from_slice::<Request>(&request.body) {
            Ok(graphql_request) => self.schema.execute(graphql_request.data(request.headers)).await,
            Err(err) => error_response(&HandlerError::InvalidRequest(err)),
        };
        json_response(&response)
    }
}
