use anyhow::Context;
use sqlx::PgPool;

use crate::blog::repo_types::{Comment, Post, Tag};

const POST_COLUMNS: &str =
    "id, title, slug, thumbnail, content, published, author_id, created_at, updated_at";

/// Insert payload for a post; the slug is derived inside [`Post::create`].
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub thumbnail: Option<String>,
    pub published: bool,
    pub author_id: i32,
    pub slug_base: String,
    pub tags: Vec<String>,
}

impl Post {
    /// Published posts, newest first.
    pub async fn list(db: &PgPool, skip: i64, take: i64) -> anyhow::Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE published
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(take)
        .bind(skip)
        .fetch_all(db)
        .await
        .context("list posts")?;
        Ok(rows)
    }

    pub async fn count(db: &PgPool) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE published")
            .fetch_one(db)
            .await
            .context("count posts")?;
        Ok(n)
    }

    pub async fn find(db: &PgPool, id: i32) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find post")?;
        Ok(row)
    }

    /// Posts by `author_id`, newest first. Drafts are included only when asked for.
    pub async fn list_by_author(
        db: &PgPool,
        author_id: i32,
        include_drafts: bool,
    ) -> anyhow::Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE author_id = $1 AND (published OR $2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(author_id)
        .bind(include_drafts)
        .fetch_all(db)
        .await
        .context("list posts by author")?;
        Ok(rows)
    }

    /// Inserts the post, gives it a unique `<slug_base>-<id>` slug and links its tags,
    /// all in one transaction.
    pub async fn create(db: &PgPool, new: NewPost) -> anyhow::Result<Post> {
        let mut tx = db.begin().await.context("begin tx")?;

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO posts (title, content, thumbnail, published, author_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&new.title)
        .bind(&new.content)
        .bind(&new.thumbnail)
        .bind(new.published)
        .bind(new.author_id)
        .fetch_one(&mut *tx)
        .await
        .context("insert post")?;

        let slug = if new.slug_base.is_empty() {
            format!("post-{id}")
        } else {
            format!("{}-{id}", new.slug_base)
        };
        let post = sqlx::query_as::<_, Post>(&format!(
            "UPDATE posts SET slug = $1 WHERE id = $2 RETURNING {POST_COLUMNS}"
        ))
        .bind(&slug)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("set post slug")?;

        for name in &new.tags {
            let tag = sqlx::query_as::<_, Tag>(
                r#"
                INSERT INTO tags (name) VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id, name
                "#,
            )
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .with_context(|| format!("upsert tag {name}"))?;

            sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(post.id)
                .bind(tag.id)
                .execute(&mut *tx)
                .await
                .context("link tag")?;
        }

        tx.commit().await.context("commit tx")?;
        Ok(post)
    }
}

impl Tag {
    pub async fn list_for_post(db: &PgPool, post_id: i32) -> anyhow::Result<Vec<Tag>> {
        let rows = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name
            FROM tags t
            JOIN post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(post_id)
        .fetch_all(db)
        .await
        .context("list tags for post")?;
        Ok(rows)
    }
}

impl Comment {
    pub async fn list_for_post(db: &PgPool, post_id: i32) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, content, post_id, author_id, created_at, updated_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(db)
        .await
        .context("list comments for post")?;
        Ok(rows)
    }

    /// Comments written by `author_id` on posts `viewer` may see.
    pub async fn list_by_author(
        db: &PgPool,
        author_id: i32,
        viewer: Option<i32>,
    ) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.content, c.post_id, c.author_id, c.created_at, c.updated_at
            FROM comments c
            JOIN posts p ON p.id = c.post_id
            WHERE c.author_id = $1 AND (p.published OR p.author_id = $2)
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )
        .bind(author_id)
        .bind(viewer)
        .fetch_all(db)
        .await
        .context("list comments by author")?;
        Ok(rows)
    }

    pub async fn create(
        db: &PgPool,
        post_id: i32,
        author_id: i32,
        content: &str,
    ) -> anyhow::Result<Comment> {
        let row = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (content, post_id, author_id)
            VALUES ($1, $2, $3)
            RETURNING id, content, post_id, author_id, created_at, updated_at
            "#,
        )
        .bind(content)
        .bind(post_id)
        .bind(author_id)
        .fetch_one(db)
        .await
        .context("insert comment")?;
        Ok(row)
    }
}

pub mod likes {
    use super::*;

    /// Returns `true` when a new like was recorded.
    pub async fn like(db: &PgPool, user_id: i32, post_id: i32) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "INSERT INTO likes (user_id, post_id) VALUES ($1, $2) ON CONFLICT (user_id, post_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(db)
        .await
        .context("insert like")?;
        Ok(res.rows_affected() == 1)
    }

    /// Returns `true` when a like was removed.
    pub async fn unlike(db: &PgPool, user_id: i32, post_id: i32) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(db)
            .await
            .context("delete like")?;
        Ok(res.rows_affected() == 1)
    }

    pub async fn count_for_post(db: &PgPool, post_id: i32) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(db)
            .await
            .context("count likes")?;
        Ok(n)
    }
}
