use async_graphql::{Context, EmptySubscription, ErrorExtensions, Guard, Schema};

use crate::{
    auth::{CurrentUser, Identity},
    error::{AppError, AuthError},
    state::AppState,
};

mod mutation;
mod query;
pub mod types;

pub use mutation::MutationRoot;
pub use query::QueryRoot;

pub type BlogSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(state: AppState) -> BlogSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(state)
        .limit_depth(12)
        .finish()
}

/// Converts service results into GraphQL errors with a `code` extension.
pub(crate) trait ResultExt<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<AppError>,
{
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(|e| Into::<AppError>::into(e).extend())
    }
}

pub(crate) trait ContextExt {
    fn state(&self) -> async_graphql::Result<&AppState>;
    fn current_user(&self) -> async_graphql::Result<CurrentUser>;
    /// Authenticated caller id on public fields; `None` for anonymous or rejected callers.
    fn viewer_id(&self) -> Option<i32>;
}

impl ContextExt for Context<'_> {
    fn state(&self) -> async_graphql::Result<&AppState> {
        self.data::<AppState>()
    }

    fn current_user(&self) -> async_graphql::Result<CurrentUser> {
        match self.data_opt::<Identity>() {
            Some(identity) => identity.current().map_err(|e| e.extend()),
            None => Err(AppError::from(AuthError::MissingToken).extend()),
        }
    }

    fn viewer_id(&self) -> Option<i32> {
        self.data_opt::<Identity>()
            .and_then(|identity| identity.current().ok())
            .map(|user| user.id)
    }
}

/// Field guard for operations that need an authenticated caller. Runs before the
/// resolver body.
pub struct RequireAuth;

impl Guard for RequireAuth {
    async fn check(&self, ctx: &Context<'_>) -> async_graphql::Result<()> {
        ctx.current_user().map(|_| ())
    }
}
