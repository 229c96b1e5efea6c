//! HTTP surface: `POST /graphql` executes requests, `GET /graphql` serves
//! GraphiQL when enabled.

use async_graphql::dynamic::Schema;
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::config::AppConfig;

/// Path of the GraphQL endpoint.
pub const GRAPHQL_PATH: &str = "/graphql";

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub schema: Schema,
    pub graphiql: bool,
}

pub fn build_app(cfg: &AppConfig, schema: Schema) -> Router {
    let state = AppState {
        schema,
        graphiql: cfg.graphql.graphiql,
    };

    Router::new()
        .route(GRAPHQL_PATH, get(graphiql).post(graphql_handler))
        .route("/healthz", get(healthz))
        .route("/graphql/sdl", get(sdl))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Executes a GraphQL request against the dynamic schema.
pub async fn graphql_handler(
    State(state): State<AppState>,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let request = request.into_inner();
    debug!(operation = ?request.operation_name, "Processing GraphQL request");
    state.schema.execute(request).await.into()
}

async fn graphiql(State(state): State<AppState>) -> impl IntoResponse {
    if !state.graphiql {
        return StatusCode::NOT_FOUND.into_response();
    }
    Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish()).into_response()
}

async fn sdl(State(state): State<AppState>) -> String {
    state.schema.sdl()
}

async fn healthz() -> &'static str {
    "ok"
}
