use async_graphql::{Context, Object, Result};

use super::{
    types::{
        AuthPayload, CommentObject, CreateCommentInput, CreatePostInput, CreateUserInput,
        PostObject, SignInInput, UserObject,
    },
    ContextExt, RequireAuth, ResultExt,
};
use crate::{
    auth::dto::{Credentials, Registration},
    blog::services::{self, PostDraft},
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Exchanges email and password for an access token.
    async fn sign_in(&self, ctx: &Context<'_>, sign_in_input: SignInInput) -> Result<AuthPayload> {
        let state = ctx.state()?;
        let creds = Credentials::parse(&sign_in_input.email, sign_in_input.password).gql()?;
        let login = state.auth.sign_in(&creds).await.gql()?;
        Ok(login.into())
    }

    async fn create_user(
        &self,
        ctx: &Context<'_>,
        create_user_input: CreateUserInput,
    ) -> Result<UserObject> {
        let state = ctx.state()?;
        let CreateUserInput {
            name,
            email,
            password,
            bio,
            avatar,
        } = create_user_input;
        let reg = Registration::parse(&name, &email, password, bio, avatar).gql()?;
        let user = state.auth.register(reg).await.gql()?;
        Ok(user.into())
    }

    #[graphql(guard = "RequireAuth")]
    async fn create_post(
        &self,
        ctx: &Context<'_>,
        create_post_input: CreatePostInput,
    ) -> Result<PostObject> {
        let current = ctx.current_user()?;
        let state = ctx.state()?;
        let CreatePostInput {
            title,
            content,
            thumbnail,
            published,
            tags,
        } = create_post_input;
        let draft = PostDraft::parse(&title, &content, thumbnail, published, tags).gql()?;
        let post = services::create_post(&state.db, current.id, draft).await.gql()?;
        Ok(post.into())
    }

    #[graphql(guard = "RequireAuth")]
    async fn create_comment(
        &self,
        ctx: &Context<'_>,
        create_comment_input: CreateCommentInput,
    ) -> Result<CommentObject> {
        let current = ctx.current_user()?;
        let state = ctx.state()?;
        let comment = services::add_comment(
            &state.db,
            current.id,
            create_comment_input.post_id,
            &create_comment_input.content,
        )
        .await
        .gql()?;
        Ok(comment.into())
    }

    #[graphql(guard = "RequireAuth")]
    async fn like_post(&self, ctx: &Context<'_>, post_id: i32) -> Result<bool> {
        let current = ctx.current_user()?;
        let state = ctx.state()?;
        services::like_post(&state.db, current.id, post_id).await.gql()
    }

    #[graphql(guard = "RequireAuth")]
    async fn unlike_post(&self, ctx: &Context<'_>, post_id: i32) -> Result<bool> {
        let current = ctx.current_user()?;
        let state = ctx.state()?;
        services::unlike_post(&state.db, current.id, post_id).await.gql()
    }
}
