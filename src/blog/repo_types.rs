use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub slug: Option<String>,
    pub thumbnail: Option<String>,
    pub content: String,
    pub published: bool,
    pub author_id: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: i32,
    pub content: String,
    pub post_id: i32,
    pub author_id: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct Tag {
    pub id: i32,
    pub name: String,
}
