#![forbid(unsafe_code)]

pub use entry_point::{compose, EntryPoint, Middleware, Route, RouteHandler, RouteRequest, RouteResponse};
pub use error::{EntryPointError, HandlerError, ServiceError};
pub use handler::{ExplorerHandler, QueryHandler, SchemaAccessor};
pub use middleware::RequestLog;
pub use route_table::EntryPointTable;
pub use service::{GraphQLOptions, GraphQLService, MAIN_ENTRY_POINT};

mod constants;
mod entry_point;
mod error;
mod handler;
mod metrics;
mod middleware;
mod route_table;
mod service;
