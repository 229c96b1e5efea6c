use std::net::SocketAddr;

use graphql_sugar_demo::config::{DEFAULT_CONFIG_PATH, loader::load_config};
use graphql_sugar_demo::schema::SchemaBuildError;
use graphql_sugar_demo::{UserStore, build_app, build_schema, observability, register_parsers};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration error in {path}: {message}")]
    Config { path: String, message: String },

    #[error("schema initialization failed: {0}")]
    Schema(#[from] SchemaBuildError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => eprintln!("Warning: ignoring .env file: {e}"),
    }

    observability::init_tracing();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "graphql-sugar-demo stopped");
        eprintln!("{e}");
        std::process::exit(2);
    }
}

async fn run() -> Result<(), StartupError> {
    let (path, origin) = config_location(std::env::args().skip(1));
    let cfg = load_config(Some(&path)).map_err(|message| StartupError::Config {
        path: path.clone(),
        message,
    })?;
    tracing::info!(%path, origin, "Configuration loaded");
    observability::apply_logging_level(&cfg.logging.level);

    register_parsers();
    let schema = build_schema(
        graphql_sugar::registry::freeze(),
        UserStore::seeded(),
        &cfg.graphql,
    )?;

    let addr = cfg.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    tracing::info!(%addr, graphiql = cfg.graphql.graphiql, "Serving /graphql");
    axum::serve(listener, build_app(&cfg, schema))
        .await
        .map_err(StartupError::Serve)
}

/// Config file path and where it came from: `--config <path>` (or
/// `--config=<path>`), then `GRAPHQL_SUGAR_CONFIG`, then the default.
fn config_location(mut args: impl Iterator<Item = String>) -> (String, &'static str) {
    while let Some(arg) = args.next() {
        if let Some(path) = arg.strip_prefix("--config=") {
            return (path.to_owned(), "--config");
        }
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (path, "--config");
        }
    }

    match std::env::var("GRAPHQL_SUGAR_CONFIG") {
        Ok(path) if !path.is_empty() => (path, "GRAPHQL_SUGAR_CONFIG"),
        _ => (DEFAULT_CONFIG_PATH.to_owned(), "default"),
    }
}
