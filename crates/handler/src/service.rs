use std::{any::Any, path::PathBuf, sync::Arc};

use confucius_schema::{
    directives::{builtin_directives, AccessPolicy},
    DirectiveEntry,
    DirectiveError,
    DirectiveRegistry,
    DirectiveVisitor,
    ResolverMap,
    SharedDirectiveRegistry,
};
use http::Method;
use warp::{Filter, Rejection, Reply};

use crate::{
    entry_point::{compose, EntryPoint, Middleware, Route},
    handler::{QueryHandler, SchemaAccessor},
    middleware::RequestLog,
    route_table::EntryPointTable,
    ServiceError,
};

pub const MAIN_ENTRY_POINT: &str = "main";

#[derive(Debug, Clone)]
pub struct GraphQLOptions {
    /// Path of the SDL document, read on every request.
    pub schema_path: PathBuf,
    pub route_prefix: String,
    pub query_path: String,
    pub query_method: Method,
    pub enable_explorer: bool,
}

impl Default for GraphQLOptions {
    fn default() -> Self {
        Self {
            schema_path: PathBuf::from("schema.graphql"),
            route_prefix: String::new(),
            query_path: "/api".to_string(),
            query_method: Method::GET,
            enable_explorer: true,
        }
    }
}

/// The GraphQL service: owns the directive registry and the exposed entry points.
#[derive(Clone)]
pub struct GraphQLService {
    registry: SharedDirectiveRegistry,
    entry_points: EntryPointTable,
    schema: SchemaAccessor,
}

impl GraphQLService {
    /// Seeds the registry with the built-in directives and registers the `main` entry point.
    pub fn new(
        options: GraphQLOptions,
        resolvers: ResolverMap,
        policy: Arc<dyn AccessPolicy>,
    ) -> Result<Self, ServiceError> {
        let registry = SharedDirectiveRegistry::new(DirectiveRegistry::with_builtins(builtin_directives(policy))?);
        let schema = SchemaAccessor::new(options.schema_path, registry.clone(), Arc::new(resolvers));

        let query_route = Route::new(
            options.query_method,
            options.query_path,
            Arc::new(QueryHandler::new(schema.clone())),
        );
        let middlewares: Vec<Arc<dyn Middleware>> = vec![Arc::new(RequestLog)];
        let entry_point = compose(
            MAIN_ENTRY_POINT,
            schema.clone(),
            options.route_prefix,
            query_route,
            options.enable_explorer,
            middlewares,
        )?;

        let entry_points = EntryPointTable::default();
        entry_points.add(entry_point);
        Ok(Self {
            registry,
            entry_points,
            schema,
        })
    }

    pub fn add_directive(&self, name: impl Into<String>, visitor: DirectiveVisitor) -> Result<(), DirectiveError> {
        self.registry.register(name, visitor)
    }

    /// Registers a type-erased visitor callback, see [`DirectiveRegistry::register_erased`].
    pub fn add_erased_directive<T>(&self, name: impl Into<String>, value: T) -> Result<(), DirectiveError>
    where
        T: Any + Send + Sync,
    {
        self.registry.register_erased(name, value)
    }

    pub fn drop_directive(&self, name: &str) -> Option<DirectiveEntry> {
        self.registry.unregister(name)
    }

    pub fn directive_exists(&self, name: &str) -> bool {
        self.registry.exists(name)
    }

    pub fn add_entry_point(&self, entry_point: EntryPoint) -> Option<Arc<EntryPoint>> {
        self.entry_points.add(entry_point)
    }

    pub fn drop_entry_point(&self, name: &str) -> Option<Arc<EntryPoint>> {
        self.entry_points.drop(name)
    }

    pub fn entry_point_exists(&self, name: &str) -> bool {
        self.entry_points.exists(name)
    }

    pub fn entry_points(&self) -> &EntryPointTable {
        &self.entry_points
    }

    /// Accessor resolving the configured schema document against the live registry.
    pub fn schema(&self) -> &SchemaAccessor {
        &self.schema
    }

    pub fn registry(&self) -> &SharedDirectiveRegistry {
        &self.registry
    }

    /// The warp filter serving every entry point.
    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        self.entry_points.filter()
    }
}
