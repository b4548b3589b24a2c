use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,                      // serial id
    pub name: String,
    pub email: String,                // unique
    pub password: Option<String>,     // Argon2 PHC hash; None means no local login
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields needed to insert a user. `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}
