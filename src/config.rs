use std::{
    ffi::OsString,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use clap::{ArgAction, Args, Parser};
use confucius_handler::GraphQLOptions;
use serde::Deserialize;
use warp::http::Method;

#[derive(Debug, Default, Deserialize, Parser)]
#[clap(name = "confucius-graphql")]
pub struct Config {
    /// Path of the config file
    #[clap(long = "config", env = "CONFIG_FILE", default_value = "config/graphql.yaml")]
    #[serde(skip)]
    pub file: PathBuf,

    /// Path of the SDL document
    #[clap(long, env, default_value = "")]
    #[serde(default)]
    pub schema_path: String,

    #[clap(long, env, default_value = "127.0.0.1:8000")]
    #[serde(default = "default_bind")]
    pub bind: String,

    #[clap(long, env, default_value = "")]
    #[serde(default)]
    pub route_prefix: String,

    #[clap(long, env, default_value = "/api")]
    #[serde(default = "default_query_path")]
    pub query_path: String,

    /// `GET` or `POST`
    #[clap(long, env, default_value = "GET")]
    #[serde(default = "default_query_method")]
    pub query_method: String,

    /// Serve the interactive explorer next to the query route
    #[clap(long, env, default_value_t = true, action = ArgAction::Set)]
    #[serde(default = "default_explorer")]
    pub explorer: bool,

    #[clap(flatten)]
    pub jaeger: Option<JaegerConfig>,

    #[clap(flatten)]
    pub cors: Option<CorsConfig>,
}

#[derive(Args, Clone, Debug, Deserialize)]
pub struct CorsConfig {
    #[clap(long, env = "CORS_ALLOW_METHODS", value_delimiter = ',')]
    pub allow_methods: Option<Vec<String>>,

    #[clap(long, env = "CORS_ALLOW_CREDENTIALS")]
    pub allow_credentials: Option<bool>,

    #[clap(long, env = "CORS_ALLOW_HEADERS", value_delimiter = ',')]
    pub allow_headers: Option<Vec<String>>,

    #[clap(long, env = "CORS_ALLOW_ORIGINS", value_delimiter = ',')]
    pub allow_origins: Option<Vec<String>>,
}

#[derive(Args, Clone, Debug, Deserialize)]
pub struct JaegerConfig {
    #[clap(long, env = "JAEGER_AGENT_ENDPOINT")]
    pub agent_endpoint: Option<String>,

    #[clap(long, env = "JAEGER_SERVICE_NAME", default_value = "confucius-graphql")]
    #[serde(default = "default_jaeger_service_name")]
    pub service_name: String,
}

impl Config {
    /// Parse the config file, or the command line and environment variables when there
    /// is no config file.
    pub fn try_parse() -> anyhow::Result<Self> {
        Self::try_parse_args(std::env::args_os())
    }

    pub fn try_parse_args<I, T>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let env_config = <Config as Parser>::try_parse_from(args)?;
        if !Path::exists(&env_config.file) {
            return Ok(env_config);
        }

        let content = std::fs::read_to_string(&env_config.file)
            .with_context(|| format!("Failed to read config file '{}'.", env_config.file.display()))?;
        let mut file_config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'.", env_config.file.display()))?;
        file_config.file = env_config.file;
        Ok(file_config)
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.bind
            .parse()
            .with_context(|| format!("Failed to parse bind addr '{}'.", self.bind))
    }

    /// Validates the GraphQL settings.
    pub fn graphql_options(&self) -> anyhow::Result<GraphQLOptions> {
        if self.schema_path.trim().is_empty() {
            bail!("The schema path is not configured.");
        }
        let query_method = match self.query_method.to_ascii_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            method => bail!("Query method '{method}' is not supported, expected GET or POST."),
        };
        Ok(GraphQLOptions {
            schema_path: PathBuf::from(&self.schema_path),
            route_prefix: self.route_prefix.clone(),
            query_path: self.query_path.clone(),
            query_method,
            enable_explorer: self.explorer,
        })
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_query_path() -> String {
    "/api".to_string()
}

fn default_query_method() -> String {
    "GET".to_string()
}

fn default_explorer() -> bool {
    true
}

fn default_jaeger_service_name() -> String {
    "confucius-graphql".to_string()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    use super::*;

    const ARGS: [&str; 1] = ["confucius-graphql"];

    #[test]
    #[serial]
    fn parse_env_vars() {
        std::env::set_var("CONFIG_FILE", "does_not_exist.yaml");
        std::env::set_var("SCHEMA_PATH", "schema/schema.graphql");
        std::env::set_var("QUERY_METHOD", "post");

        let config = Config::try_parse_args(ARGS).expect("Failed to parse config");
        assert_eq!(config.file.display().to_string(), "does_not_exist.yaml");
        assert_eq!(config.bind, "127.0.0.1:8000");
        assert_eq!(config.query_path, "/api");
        assert!(config.explorer);

        let options = config.graphql_options().expect("Invalid options");
        assert_eq!(options.schema_path, PathBuf::from("schema/schema.graphql"));
        assert_eq!(options.query_method, Method::POST);
        assert_eq!(options.route_prefix, "");

        std::env::remove_var("CONFIG_FILE");
        std::env::remove_var("SCHEMA_PATH");
        std::env::remove_var("QUERY_METHOD");
    }

    #[test]
    #[serial]
    fn parse_config_file() {
        let mut tmpfile = NamedTempFile::with_prefix("confucius").expect("Failed to create temp config");
        write!(
            tmpfile,
            r#"
schema_path: schema/schema.graphql
bind: 0.0.0.0:4000
route_prefix: /v1
query_method: POST
explorer: false
cors:
  allow_methods: [GET, POST]
  allow_origins: ["https://example.com"]
jaeger:
  agent_endpoint: 127.0.0.1:6831
"#
        )
        .expect("Failed to write temp config");
        std::env::set_var("CONFIG_FILE", tmpfile.path().display().to_string());
        std::env::set_var("BIND", "127.0.0.1:8000");

        let config = Config::try_parse_args(ARGS).expect("Failed to parse config");
        assert_eq!(config.file, tmpfile.path());
        assert_eq!(config.bind_addr().unwrap(), "0.0.0.0:4000".parse::<SocketAddr>().unwrap());

        let options = config.graphql_options().expect("Invalid options");
        assert_eq!(options.route_prefix, "/v1");
        assert_eq!(options.query_path, "/api");
        assert_eq!(options.query_method, Method::POST);
        assert!(!options.enable_explorer);

        let cors = config.cors.expect("No cors config");
        assert_eq!(cors.allow_methods, Some(vec!["GET".to_string(), "POST".to_string()]));
        assert_eq!(cors.allow_credentials, None);
        let jaeger = config.jaeger.expect("No jaeger config");
        assert_eq!(jaeger.agent_endpoint.as_deref(), Some("127.0.0.1:6831"));
        assert_eq!(jaeger.service_name, "confucius-graphql");

        std::env::remove_var("CONFIG_FILE");
        std::env::remove_var("BIND");
    }

    #[test]
    #[serial]
    fn invalid_settings_are_rejected() {
        let mut tmpfile = NamedTempFile::with_prefix("confucius").expect("Failed to create temp config");
        writeln!(tmpfile, "bind: nowhere\nquery_method: PUT").expect("Failed to write temp config");
        std::env::set_var("CONFIG_FILE", tmpfile.path().display().to_string());

        let config = Config::try_parse_args(ARGS).expect("Failed to parse config");
        assert!(config.bind_addr().is_err());
        let err = config.graphql_options().unwrap_err();
        assert_eq!(err.to_string(), "The schema path is not configured.");

        let config = Config {
            schema_path: "schema.graphql".to_string(),
            ..config
        };
        let err = config.graphql_options().unwrap_err();
        assert_eq!(err.to_string(), "Query method 'PUT' is not supported, expected GET or POST.");

        std::env::remove_var("CONFIG_FILE");
    }

    #[test]
    #[serial]
    fn malformed_config_file_fails() {
        let mut tmpfile = NamedTempFile::with_prefix("confucius").expect("Failed to create temp config");
        writeln!(tmpfile, "explorer: [not, a, bool]").expect("Failed to write temp config");
        std::env::set_var("CONFIG_FILE", tmpfile.path().display().to_string());

        let err = Config::try_parse_args(ARGS).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config file"));

        std::env::remove_var("CONFIG_FILE");
    }
}
