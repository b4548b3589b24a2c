use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AccessToken, Credentials, LoginResponse, Registration},
        jwt::JwtKeys,
        password::{hash_password, verify_dummy, verify_password},
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    error::{AppError, CredentialError},
};

/// Credential checks and token issuance over a [`UserStore`].
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// Returns the full user record only when the email exists, a local password is set,
    /// and the password matches.
    #[instrument(skip(self, creds), fields(email = %creds.email))]
    pub async fn validate_local_user(&self, creds: &Credentials) -> Result<User, AppError> {
        let user = match self.store.find_by_email(&creds.email).await? {
            Some(u) => u,
            None => {
                verify_dummy(&creds.password);
                warn!("login unknown email");
                return Err(CredentialError::UserNotFound.into());
            }
        };

        let Some(stored_hash) = user.password.as_deref() else {
            verify_dummy(&creds.password);
            warn!(user_id = user.id, "login for account without local password");
            return Err(CredentialError::UserNotFound.into());
        };

        let matched = match verify_password(stored_hash, &creds.password) {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, user_id = user.id, "stored password hash is unreadable");
                false
            }
        };
        if !matched {
            warn!(user_id = user.id, "login invalid password");
            return Err(CredentialError::InvalidPassword.into());
        }

        Ok(user)
    }

    /// Signs a token for `user_id`. The caller is trusted; existence is not re-checked.
    pub fn generate_token(&self, user_id: i32) -> Result<AccessToken, AppError> {
        let access_token = self.keys.sign(user_id)?;
        Ok(AccessToken { access_token })
    }

    pub fn login(&self, user: &User) -> Result<LoginResponse, AppError> {
        let AccessToken { access_token } = self.generate_token(user.id)?;
        info!(user_id = user.id, "user logged in");
        Ok(LoginResponse {
            id: user.id,
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            access_token,
        })
    }

    pub async fn sign_in(&self, creds: &Credentials) -> Result<LoginResponse, AppError> {
        let user = self.validate_local_user(creds).await?;
        self.login(&user)
    }

    #[instrument(skip(self))]
    pub async fn validate_user(&self, user_id: i32) -> Result<i32, AppError> {
        match self.store.find_by_id(user_id).await? {
            Some(user) => Ok(user.id),
            None => Err(CredentialError::UserNotFound.into()),
        }
    }

    #[instrument(skip(self, reg), fields(email = %reg.email))]
    pub async fn register(&self, reg: Registration) -> Result<User, AppError> {
        if self.store.find_by_email(&reg.email).await?.is_some() {
            warn!("email already registered");
            return Err(email_taken());
        }

        let password_hash = hash_password(&reg.password)?;
        // A concurrent registration can still win between the lookup and the insert.
        let Some(user) = self
            .store
            .create(NewUser {
                name: reg.name,
                email: reg.email,
                password_hash,
                bio: reg.bio,
                avatar: reg.avatar,
            })
            .await?
        else {
            warn!("email registered concurrently");
            return Err(email_taken());
        };

        info!(user_id = user.id, "user registered");
        Ok(user)
    }
}

fn email_taken() -> AppError {
    AppError::Conflict("Email already registered".into())
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use async_trait::async_trait;

    use super::*;
    use crate::{auth::repo::memory::MemoryUserStore, config::JwtConfig};

    fn keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            expires_in: Duration::from_secs(600),
        })
    }

    fn service_with(store: Arc<MemoryUserStore>) -> AuthService {
        AuthService::new(store, keys())
    }

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials::parse(email, password.into()).unwrap()
    }

    fn seeded() -> (Arc<MemoryUserStore>, User) {
        let store = Arc::new(MemoryUserStore::default());
        let user = store.insert("Alice", "a@a.com", Some(hash_password("correct").unwrap()));
        (store, user)
    }

    #[tokio::test]
    async fn valid_credentials_return_the_user() {
        let (store, alice) = seeded();
        let svc = service_with(store);
        let user = svc
            .validate_local_user(&creds("a@a.com", "correct"))
            .await
            .expect("valid login");
        assert_eq!(user.id, alice.id);
        assert_eq!(user.email, "a@a.com");
    }

    #[tokio::test]
    async fn sign_in_returns_public_fields_and_token() {
        let (store, alice) = seeded();
        let svc = service_with(store);
        let resp = svc.sign_in(&creds("a@a.com", "correct")).await.unwrap();

        assert_eq!(resp.id, alice.id);
        assert_eq!(resp.name, "Alice");
        assert_eq!(resp.avatar, alice.avatar);
        assert!(!resp.access_token.is_empty());
        let claims = svc.keys().verify(&resp.access_token).unwrap();
        assert_eq!(claims.sub, alice.id);
    }

    #[tokio::test]
    async fn wrong_password_is_a_credential_error() {
        let (store, _) = seeded();
        let svc = service_with(store);
        let err = svc.sign_in(&creds("a@a.com", "wrong")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Credential(CredentialError::InvalidPassword)
        ));
    }

    #[tokio::test]
    async fn unknown_email_looks_like_wrong_password_to_clients() {
        let (store, _) = seeded();
        let svc = service_with(store);
        let unknown = svc.sign_in(&creds("nobody@a.com", "correct")).await.unwrap_err();
        let wrong = svc.sign_in(&creds("a@a.com", "wrong")).await.unwrap_err();

        assert!(matches!(
            unknown,
            AppError::Credential(CredentialError::UserNotFound)
        ));
        assert_eq!(unknown.public_message(), wrong.public_message());
        assert_eq!(unknown.code(), wrong.code());
    }

    #[tokio::test]
    async fn account_without_password_cannot_log_in() {
        let store = Arc::new(MemoryUserStore::default());
        store.insert("Seeded", "seed@a.com", None);
        let svc = service_with(store);
        let err = svc.sign_in(&creds("seed@a.com", "anything")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Credential(CredentialError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn malformed_stored_hash_is_rejected_as_mismatch() {
        let store = Arc::new(MemoryUserStore::default());
        store.insert("Broken", "broken@a.com", Some("plaintext?".into()));
        let svc = service_with(store);
        let err = svc.sign_in(&creds("broken@a.com", "plaintext?")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Credential(CredentialError::InvalidPassword)
        ));
    }

    #[tokio::test]
    async fn validate_user_echoes_existing_id() {
        let (store, alice) = seeded();
        let svc = service_with(store.clone());
        assert_eq!(svc.validate_user(alice.id).await.unwrap(), alice.id);

        store.remove(alice.id);
        assert!(matches!(
            svc.validate_user(alice.id).await,
            Err(AppError::Credential(CredentialError::UserNotFound))
        ));
    }

    #[tokio::test]
    async fn register_hashes_password_and_rejects_duplicates() {
        let store = Arc::new(MemoryUserStore::default());
        let svc = service_with(store.clone());
        let reg = Registration::parse("Bob", "bob@example.com", "hunter2hunter2".into(), None, None)
            .unwrap();

        let bob = svc.register(reg.clone()).await.unwrap();
        let stored = bob.password.as_deref().unwrap();
        assert_ne!(stored, "hunter2hunter2");
        assert!(verify_password(stored, "hunter2hunter2").unwrap());

        let dup = svc.register(reg).await.unwrap_err();
        assert!(matches!(dup, AppError::Conflict(_)));

        let logged_in = svc
            .sign_in(&creds("bob@example.com", "hunter2hunter2"))
            .await
            .unwrap();
        assert_eq!(logged_in.id, bob.id);
    }

    /// Hides existing emails from the lookup, like a second request racing the first.
    struct StaleLookup(MemoryUserStore);

    #[async_trait]
    impl UserStore for StaleLookup {
        async fn find_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }

        async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<User>> {
            self.0.find_by_id(id).await
        }

        async fn create(&self, user: NewUser) -> anyhow::Result<Option<User>> {
            self.0.create(user).await
        }
    }

    #[tokio::test]
    async fn duplicate_insert_after_passed_lookup_is_a_conflict() {
        let inner = MemoryUserStore::default();
        inner.insert("Bob", "bob@example.com", Some(hash_password("first-password").unwrap()));
        let svc = AuthService::new(Arc::new(StaleLookup(inner)), keys());

        let reg = Registration::parse("Bob2", "bob@example.com", "second-password".into(), None, None)
            .unwrap();
        let err = svc.register(reg).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.code(), "CONFLICT");
    }

    #[tokio::test]
    async fn unknown_email_costs_as_much_as_a_wrong_password() {
        let (store, _) = seeded();
        store.insert("Seeded", "seed@a.com", None);
        let svc = service_with(store);
        verify_dummy("warm-up");

        let start = Instant::now();
        let _ = svc.sign_in(&creds("a@a.com", "wrong")).await;
        let wrong = start.elapsed();

        let start = Instant::now();
        let _ = svc.sign_in(&creds("nobody@a.com", "wrong")).await;
        let unknown = start.elapsed();

        let start = Instant::now();
        let _ = svc.sign_in(&creds("seed@a.com", "wrong")).await;
        let no_hash = start.elapsed();

        assert!(unknown * 4 >= wrong, "unknown {unknown:?} vs wrong {wrong:?}");
        assert!(no_hash * 4 >= wrong, "no hash {no_hash:?} vs wrong {wrong:?}");
    }
}
