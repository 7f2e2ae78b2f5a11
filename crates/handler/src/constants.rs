use opentelemetry::Key;

pub const KEY_QUERY: Key = Key::from_static_str("graphql.query");
