//! User schema: `Query.user(id)` and `Mutation.saveUser(...)`.
//!
//! The `User` record is declared once; its output type and the `saveUser`
//! arguments are both derived from that declaration.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::ErrorExtensions;
use async_graphql::dynamic::{
    Field, FieldFuture, InputValue, Object, ResolverContext, Schema, SchemaError, TypeRef,
};
use graphql_sugar::schema::into_field_value;
use graphql_sugar::{
    ArgsConfig, OutputTypeSet, ParserRegistry, Record, RecordShape, SugarError, Value,
    build_args_config, output_value, register_arg_parser, timestamp_scalar,
};
use parking_lot::RwLock;
use serde::Serialize;
use time::OffsetDateTime;
use time::macros::datetime;
use tracing::{debug, info};

use crate::config::GraphQLConfig;

// =============================================================================
// Records
// =============================================================================

/// Favorite movie titles, supplied as a list of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MoviesList(pub Vec<String>);

graphql_sugar::custom_field_type!(MoviesList);

#[derive(Debug, thiserror::Error)]
#[error("invalid movie list")]
pub struct InvalidMoviesList;

/// Decodes a list of titles. Any other shape is rejected.
pub fn parse_movies_list(value: &Value) -> Result<MoviesList, InvalidMoviesList> {
    let Value::List(items) = value else {
        return Err(InvalidMoviesList);
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(title) => Ok(title.clone()),
            _ => Err(InvalidMoviesList),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(MoviesList)
}

/// Registers the demo's argument parsers in the process-wide registry.
///
/// Must run once, before the registry is frozen.
pub fn register_parsers() {
    register_arg_parser(parse_movies_list, TypeRef::named_list(TypeRef::STRING));
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub joined_at: OffsetDateTime,
    pub number_of_children: i64,
    pub favorite_movies: MoviesList,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            joined_at: OffsetDateTime::UNIX_EPOCH,
            number_of_children: 0,
            favorite_movies: MoviesList::default(),
        }
    }
}

impl Record for User {
    const TYPE_NAME: &'static str = "User";
    const DESCRIPTION: &'static str = "A user, dummy";

    fn describe(shape: &mut RecordShape<Self>) {
        shape
            .field("id", |u| &u.id, |u| &mut u.id)
            .output("id")
            .arg("id,required")
            .description("A short identifier for this user.");
        shape
            .field("name", |u| &u.name, |u| &mut u.name)
            .output("name")
            .arg("name,required")
            .description("This user's name.");
        shape
            .field("joined_at", |u| &u.joined_at, |u| &mut u.joined_at)
            .output("joinedAt");
        shape
            .field(
                "number_of_children",
                |u| &u.number_of_children,
                |u| &mut u.number_of_children,
            )
            .output("numberOfChildren")
            .arg("numberOfChildren")
            .description("The number of children that this user has.");
        shape
            .field(
                "favorite_movies",
                |u| &u.favorite_movies,
                |u| &mut u.favorite_movies,
            )
            .output("favoriteMovies")
            .arg("favoriteMovies")
            .description("A JSON-formatted list of this user's favorite movies.");
    }
}

// =============================================================================
// Store
// =============================================================================

/// In-memory user store shared by all requests.
#[derive(Debug, Clone, Default)]
pub struct UserStore {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl UserStore {
    /// Store seeded with the sample user `bob`.
    #[must_use]
    pub fn seeded() -> Self {
        let store = Self::default();
        store.save(User {
            id: "bob".into(),
            name: "Bob Loblaw".into(),
            joined_at: datetime!(2012-02-03 09:19:38.000004213 UTC),
            number_of_children: 7,
            favorite_movies: MoviesList(vec![
                "The Shawshank Redemption".into(),
                "Weekend at Bernie's 2".into(),
            ]),
        });
        store
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<User> {
        self.users.read().get(id).cloned()
    }

    /// Inserts or replaces a user.
    pub fn save(&self, user: User) {
        self.users.write().insert(user.id.clone(), user);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

// =============================================================================
// Schema
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchemaBuildError {
    #[error(transparent)]
    Derive(#[from] SugarError),

    #[error("schema build failed: {0}")]
    Schema(String),
}

impl From<SchemaError> for SchemaBuildError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e.0)
    }
}

/// Builds the executable schema.
///
/// # Errors
///
/// Fails if `User` cannot be derived against `registry` (for example when
/// the `MoviesList` parser was never registered) or if the engine rejects
/// the assembled schema.
pub fn build_schema(
    registry: &ParserRegistry,
    store: UserStore,
    config: &GraphQLConfig,
) -> Result<Schema, SchemaBuildError> {
    let save_user_args: Arc<ArgsConfig<User>> = Arc::new(build_args_config(registry)?);
    let resolver_args = Arc::clone(&save_user_args);

    let query = Object::new("Query").field(
        Field::new("user", TypeRef::named(User::TYPE_NAME), resolve_user)
            .argument(InputValue::new("id", TypeRef::named(TypeRef::STRING))),
    );

    let save_user = Field::new(
        "saveUser",
        TypeRef::named(User::TYPE_NAME),
        move |ctx| resolve_save_user(ctx, Arc::clone(&resolver_args)),
    );
    let mutation = Object::new("Mutation").field(save_user_args.apply(save_user));

    let mut types = OutputTypeSet::new(registry);
    types.add::<User>(User::TYPE_NAME, User::DESCRIPTION)?;

    let mut builder = types
        .register(Schema::build("Query", Some("Mutation"), None))?
        .register(timestamp_scalar())
        .register(query)
        .register(mutation)
        .data(store)
        .limit_depth(config.max_depth)
        .limit_complexity(config.max_complexity);
    if !config.introspection {
        builder = builder.disable_introspection();
    }

    let schema = builder.finish()?;
    info!(
        max_depth = config.max_depth,
        max_complexity = config.max_complexity,
        introspection = config.introspection,
        "GraphQL schema built"
    );
    Ok(schema)
}

fn resolve_user(ctx: ResolverContext<'_>) -> FieldFuture<'_> {
    FieldFuture::new(async move {
        let id = ctx
            .args
            .get("id")
            .and_then(|v| v.string().ok().map(str::to_owned))
            .ok_or_else(|| async_graphql::Error::new("id is not a string"))?;
        let store = ctx.data::<UserStore>()?;

        debug!(id = %id, "Resolving user");
        match store.get(&id) {
            Some(user) => Ok(Some(into_field_value(output_value(&user)))),
            None => Err(async_graphql::Error::new(format!("user {id} not found"))),
        }
    })
}

fn resolve_save_user(ctx: ResolverContext<'_>, args: Arc<ArgsConfig<User>>) -> FieldFuture<'_> {
    FieldFuture::new(async move {
        let mut user = args.load(&ctx.args).map_err(|e| e.extend())?;
        user.joined_at = OffsetDateTime::now_utc();

        let store = ctx.data::<UserStore>()?;
        store.save(user.clone());
        debug!(id = %user.id, users = store.len(), "Saved user");

        Ok(Some(into_field_value(output_value(&user))))
    })
}
