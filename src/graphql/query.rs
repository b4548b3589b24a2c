use async_graphql::{Context, Object, Result};

use super::{
    types::{PostObject, UserObject},
    ContextExt, RequireAuth, ResultExt,
};
use crate::{
    blog::{
        repo_types::Post,
        services::{find_post, page},
    },
    error::{AppError, AuthError},
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The authenticated caller.
    #[graphql(guard = "RequireAuth")]
    async fn me(&self, ctx: &Context<'_>) -> Result<UserObject> {
        let current = ctx.current_user()?;
        let state = ctx.state()?;
        state
            .users
            .find_by_id(current.id)
            .await
            .gql()?
            .map(UserObject::from)
            .ok_or_else(|| AppError::from(AuthError::UserNotFound))
            .gql()
    }

    async fn user(&self, ctx: &Context<'_>, id: i32) -> Result<Option<UserObject>> {
        let state = ctx.state()?;
        let user = state.users.find_by_id(id).await.gql()?;
        Ok(user.map(UserObject::from))
    }

    /// Published posts, newest first.
    async fn posts(
        &self,
        ctx: &Context<'_>,
        skip: Option<i32>,
        take: Option<i32>,
    ) -> Result<Vec<PostObject>> {
        let state = ctx.state()?;
        let (skip, take) = page(skip, take);
        let posts = Post::list(&state.db, skip, take).await.gql()?;
        Ok(posts.into_iter().map(PostObject::from).collect())
    }

    /// A single post. Drafts resolve only for their author.
    async fn post(&self, ctx: &Context<'_>, id: i32) -> Result<Option<PostObject>> {
        let state = ctx.state()?;
        let post = find_post(&state.db, id, ctx.viewer_id()).await.gql()?;
        Ok(post.map(PostObject::from))
    }

    async fn post_count(&self, ctx: &Context<'_>) -> Result<i64> {
        let state = ctx.state()?;
        Post::count(&state.db).await.gql()
    }
}
