use once_cell::sync::Lazy;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};

pub struct Metrics {
    pub query_counter: Counter<u64>,
    pub query_histogram: Histogram<f64>,
}

pub static METRICS: Lazy<Metrics> = Lazy::new(|| {
    let meter = global::meter("confucius-graphql");
    Metrics {
        query_counter: meter
            .u64_counter("confucius.queries")
            .with_description("Number of executed GraphQL queries.")
            .init(),
        query_histogram: meter
            .f64_histogram("confucius.query_duration")
            .with_description("Time spent executing a GraphQL query, in seconds.")
            .init(),
    }
});
