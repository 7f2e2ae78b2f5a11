#![forbid(unsafe_code)]

mod config;

use std::{convert::Infallible, sync::Arc};

use anyhow::{Context, Result};
use async_graphql::{Response, ServerError};
use config::Config;
use confucius_handler::GraphQLService;
use confucius_schema::{directives::GrantAll, ResolverMap};
use futures_util::FutureExt;
use opentelemetry::{
    global,
    global::GlobalTracerProvider,
    sdk::metrics::MeterProvider,
    trace::noop::NoopTracerProvider,
};
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::signal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warp::{hyper::StatusCode, Filter, Rejection, Reply};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn init_tracer(config: &Config) -> Result<GlobalTracerProvider> {
    let jaeger = config
        .jaeger
        .as_ref()
        .and_then(|jaeger| Some((jaeger.agent_endpoint.as_ref()?, &jaeger.service_name)));
    let uninstall = match jaeger {
        Some((agent_endpoint, service_name)) => {
            tracing::info!(
                agent_endpoint = %agent_endpoint,
                service_name = %service_name,
                "Initialize Jaeger"
            );
            let provider = opentelemetry_jaeger::new_agent_pipeline()
                .with_endpoint(agent_endpoint)
                .with_service_name(service_name)
                .build_batch(opentelemetry::runtime::Tokio)
                .context("Failed to initialize jaeger.")?;
            global::set_tracer_provider(provider)
        }
        None => global::set_tracer_provider(NoopTracerProvider::new()),
    };
    Ok(uninstall)
}

fn metrics(registry: Registry) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("metrics").and(warp::get()).map(move || {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let metric_families = registry.gather();
        match encoder.encode(&metric_families, &mut buffer) {
            Ok(()) => warp::reply::with_status(buffer, StatusCode::OK),
            Err(err) => warp::reply::with_status(err.to_string().into_bytes(), StatusCode::INTERNAL_SERVER_ERROR),
        }
    })
}

async fn handle_rejection(err: Rejection) -> std::result::Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else {
        tracing::error!("unhandled error: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
    };

    let res = warp::reply::json(&Response::from_errors(vec![ServerError::new(message, None)]));
    Ok(warp::reply::with_status(res, code))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::try_parse()?;
    init_tracing();

    let _uninstall = init_tracer(&config)?;
    let registry = Registry::new();
    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;
    let meter_provider = MeterProvider::builder().with_reader(exporter).build();
    global::set_meter_provider(meter_provider);

    let options = config.graphql_options()?;
    let bind_addr = config.bind_addr()?;
    tracing::info!(
        schema_path = %options.schema_path.display(),
        query_path = %options.query_path,
        query_method = %options.query_method,
        explorer = options.enable_explorer,
        "GraphQL service configured."
    );
    let service = GraphQLService::new(options, ResolverMap::new(), Arc::new(GrantAll))
        .context("Failed to assemble the GraphQL service.")?;

    let cors = config.cors.map(|cors_config| {
        warp::cors()
            .allow_any_origin()
            .allow_methods(
                cors_config
                    .allow_methods
                    .unwrap_or_default()
                    .iter()
                    .map(|s| s as &str)
                    .collect::<Vec<&str>>(),
            )
            .allow_credentials(cors_config.allow_credentials.unwrap_or(false))
            .allow_headers(cors_config.allow_headers.unwrap_or_default())
            .allow_origins(
                cors_config
                    .allow_origins
                    .unwrap_or_default()
                    .iter()
                    .map(|s| s as &str)
                    .collect::<Vec<&str>>(),
            )
    });

    let health = warp::path!("health").map(|| warp::reply::json(&"healthy"));
    let routes = health.or(metrics(registry)).or(service.routes());

    if let Some(warp_cors) = cors {
        let (addr, server) = warp::serve(routes.with(warp_cors).recover(handle_rejection))
            .bind_with_graceful_shutdown(bind_addr, signal::ctrl_c().map(|_| ()));
        tracing::info!(addr = %addr, "Listening");
        server.await;
    } else {
        let (addr, server) = warp::serve(routes.recover(handle_rejection))
            .bind_with_graceful_shutdown(bind_addr, signal::ctrl_c().map(|_| ()));
        tracing::info!(addr = %addr, "Listening");
        server.await;
    }
    tracing::info!("Server shutdown");

    global::shutdown_tracer_provider();
    Ok(())
}
