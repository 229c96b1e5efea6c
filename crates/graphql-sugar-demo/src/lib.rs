//! # graphql-sugar-demo
//!
//! A small user service on top of `graphql-sugar`: a `User` record whose
//! GraphQL output type and `saveUser` arguments are derived from a single
//! declaration, served over HTTP.
//!
//! ## Modules
//!
//! - [`config`] - configuration file and environment overrides
//! - [`observability`] - tracing setup
//! - [`schema`] - `User` record, parsers, store and schema assembly
//! - [`server`] - Axum router and handlers

pub mod config;
pub mod observability;
pub mod schema;
pub mod server;

pub use config::AppConfig;
pub use schema::{User, UserStore, build_schema, register_parsers};
pub use server::build_app;
