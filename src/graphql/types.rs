use async_graphql::{ComplexObject, Context, InputObject, Result, SimpleObject};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::{ContextExt, ResultExt};
use crate::{
    auth::{dto::LoginResponse, repo_types::User},
    blog::{
        repo::likes,
        repo_types::{Comment, Post, Tag},
    },
    error::AppError,
};

fn rfc3339(t: &OffsetDateTime) -> Result<String> {
    t.format(&Rfc3339)
        .map_err(|e| anyhow::anyhow!(e))
        .gql()
}

#[derive(InputObject)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

#[derive(InputObject)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

#[derive(InputObject)]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    pub thumbnail: Option<String>,
    pub published: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(InputObject)]
pub struct CreateCommentInput {
    pub post_id: i32,
    pub content: String,
}

/// Returned by `signIn`.
#[derive(SimpleObject)]
pub struct AuthPayload {
    pub id: i32,
    pub name: String,
    pub avatar: Option<String>,
    pub access_token: String,
}

impl From<LoginResponse> for AuthPayload {
    fn from(r: LoginResponse) -> Self {
        Self {
            id: r.id,
            name: r.name,
            avatar: r.avatar,
            access_token: r.access_token,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "User", complex)]
pub struct UserObject {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

impl From<User> for UserObject {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            bio: u.bio,
            avatar: u.avatar,
        }
    }
}

#[ComplexObject]
impl UserObject {
    async fn posts(&self, ctx: &Context<'_>) -> Result<Vec<PostObject>> {
        let state = ctx.state()?;
        let own = ctx.viewer_id() == Some(self.id);
        let posts = Post::list_by_author(&state.db, self.id, own).await.gql()?;
        Ok(posts.into_iter().map(PostObject::from).collect())
    }

    async fn comments(&self, ctx: &Context<'_>) -> Result<Vec<CommentObject>> {
        let state = ctx.state()?;
        let comments = Comment::list_by_author(&state.db, self.id, ctx.viewer_id())
            .await
            .gql()?;
        Ok(comments.into_iter().map(CommentObject::from).collect())
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Post", complex)]
pub struct PostObject {
    pub id: i32,
    pub title: String,
    pub slug: Option<String>,
    pub thumbnail: Option<String>,
    pub content: String,
    pub published: bool,
    #[graphql(skip)]
    pub author_id: i32,
    #[graphql(skip)]
    pub created: OffsetDateTime,
    #[graphql(skip)]
    pub updated: OffsetDateTime,
}

impl From<Post> for PostObject {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            title: p.title,
            slug: p.slug,
            thumbnail: p.thumbnail,
            content: p.content,
            published: p.published,
            author_id: p.author_id,
            created: p.created_at,
            updated: p.updated_at,
        }
    }
}

#[ComplexObject]
impl PostObject {
    async fn created_at(&self) -> Result<String> {
        rfc3339(&self.created)
    }

    async fn updated_at(&self) -> Result<String> {
        rfc3339(&self.updated)
    }

    async fn author(&self, ctx: &Context<'_>) -> Result<UserObject> {
        let state = ctx.state()?;
        state
            .users
            .find_by_id(self.author_id)
            .await
            .gql()?
            .map(UserObject::from)
            .ok_or_else(|| AppError::NotFound(format!("User {}", self.author_id)))
            .gql()
    }

    async fn tags(&self, ctx: &Context<'_>) -> Result<Vec<TagObject>> {
        let state = ctx.state()?;
        let tags = Tag::list_for_post(&state.db, self.id).await.gql()?;
        Ok(tags.into_iter().map(TagObject::from).collect())
    }

    async fn comments(&self, ctx: &Context<'_>) -> Result<Vec<CommentObject>> {
        let state = ctx.state()?;
        let comments = Comment::list_for_post(&state.db, self.id).await.gql()?;
        Ok(comments.into_iter().map(CommentObject::from).collect())
    }

    async fn like_count(&self, ctx: &Context<'_>) -> Result<i64> {
        let state = ctx.state()?;
        likes::count_for_post(&state.db, self.id).await.gql()
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Comment", complex)]
pub struct CommentObject {
    pub id: i32,
    pub content: String,
    pub post_id: i32,
    #[graphql(skip)]
    pub author_id: i32,
    #[graphql(skip)]
    pub created: OffsetDateTime,
}

impl From<Comment> for CommentObject {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            content: c.content,
            post_id: c.post_id,
            author_id: c.author_id,
            created: c.created_at,
        }
    }
}

#[ComplexObject]
impl CommentObject {
    async fn created_at(&self) -> Result<String> {
        rfc3339(&self.created)
    }

    async fn author(&self, ctx: &Context<'_>) -> Result<UserObject> {
        let state = ctx.state()?;
        state
            .users
            .find_by_id(self.author_id)
            .await
            .gql()?
            .map(UserObject::from)
            .ok_or_else(|| AppError::NotFound(format!("User {}", self.author_id)))
            .gql()
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Tag")]
pub struct TagObject {
    pub id: i32,
    pub name: String,
}

impl From<Tag> for TagObject {
    fn from(t: Tag) -> Self {
        Self { id: t.id, name: t.name }
    }
}
