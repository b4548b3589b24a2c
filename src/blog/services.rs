use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::{
    blog::{
        repo::{likes, NewPost},
        repo_types::{Comment, Post},
    },
    error::AppError,
};

pub const DEFAULT_TAKE: i64 = 20;
pub const MAX_TAKE: i64 = 100;

/// Lowercases, turns spaces into hyphens and drops everything that is not a word
/// character or hyphen. Hyphen runs collapse to one.
pub fn slugify(title: &str) -> String {
    lazy_static! {
        static ref NON_WORD: Regex = Regex::new(r"[^\w-]+").unwrap();
        static ref HYPHENS: Regex = Regex::new(r"-{2,}").unwrap();
    }
    let lowered = title.trim().to_lowercase().replace(' ', "-");
    let stripped = NON_WORD.replace_all(&lowered, "");
    HYPHENS
        .replace_all(&stripped, "-")
        .trim_matches('-')
        .to_string()
}

/// Clamps client paging arguments to sane bounds.
pub fn page(skip: Option<i32>, take: Option<i32>) -> (i64, i64) {
    let skip = skip.map(i64::from).unwrap_or(0).max(0);
    let take = take
        .map(i64::from)
        .unwrap_or(DEFAULT_TAKE)
        .clamp(1, MAX_TAKE);
    (skip, take)
}

#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub thumbnail: Option<String>,
    pub published: bool,
    pub tags: Vec<String>,
}

impl PostDraft {
    pub fn parse(
        title: &str,
        content: &str,
        thumbnail: Option<String>,
        published: Option<bool>,
        tags: Option<Vec<String>>,
    ) -> Result<Self, AppError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::BadRequest("title is required".into()));
        }
        if content.trim().is_empty() {
            return Err(AppError::BadRequest("content is required".into()));
        }

        let mut tags: Vec<String> = tags
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();

        Ok(Self {
            title: title.to_string(),
            content: content.to_string(),
            thumbnail: thumbnail.filter(|t| !t.trim().is_empty()),
            published: published.unwrap_or(true),
            tags,
        })
    }
}

#[instrument(skip(db, draft), fields(title = %draft.title))]
pub async fn create_post(db: &PgPool, author_id: i32, draft: PostDraft) -> Result<Post, AppError> {
    let post = Post::create(
        db,
        NewPost {
            slug_base: slugify(&draft.title),
            title: draft.title,
            content: draft.content,
            thumbnail: draft.thumbnail,
            published: draft.published,
            author_id,
            tags: draft.tags,
        },
    )
    .await?;
    info!(post_id = post.id, author_id, "post created");
    Ok(post)
}

/// Drafts are visible to their author only.
pub fn visible_to(post: &Post, viewer: Option<i32>) -> bool {
    post.published || viewer == Some(post.author_id)
}

/// Looks a post up and hides it when `viewer` may not see it.
pub async fn find_post(db: &PgPool, post_id: i32, viewer: Option<i32>) -> Result<Option<Post>, AppError> {
    let post = Post::find(db, post_id).await?;
    Ok(post.filter(|p| visible_to(p, viewer)))
}

async fn require_post(db: &PgPool, post_id: i32, viewer: i32) -> Result<Post, AppError> {
    find_post(db, post_id, Some(viewer))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {post_id}")))
}

#[instrument(skip(db, content))]
pub async fn add_comment(
    db: &PgPool,
    author_id: i32,
    post_id: i32,
    content: &str,
) -> Result<Comment, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("content is required".into()));
    }
    require_post(db, post_id, author_id).await?;
    let comment = Comment::create(db, post_id, author_id, content).await?;
    info!(comment_id = comment.id, "comment created");
    Ok(comment)
}

#[instrument(skip(db))]
pub async fn like_post(db: &PgPool, user_id: i32, post_id: i32) -> Result<bool, AppError> {
    require_post(db, post_id, user_id).await?;
    Ok(likes::like(db, user_id, post_id).await?)
}

#[instrument(skip(db))]
pub async fn unlike_post(db: &PgPool, user_id: i32, post_id: i32) -> Result<bool, AppError> {
    Ok(likes::unlike(db, user_id, post_id).await?)
}
