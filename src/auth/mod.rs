pub mod claims;
pub mod dto;
pub(crate) mod extractors;
pub mod guard;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use guard::{CurrentUser, Identity, JwtAuthGuard};
pub use jwt::JwtKeys;
pub use services::AuthService;
