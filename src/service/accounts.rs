//! Registration, credential checks, API tokens and browser sessions.

use crate::auth::{hash_password, verify_password};
use crate::error::AppError;
use crate::model::{NewUser, User};
use crate::store::AccountStore;

pub struct AccountService;

/// Argon2 work runs off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("password task failed: {}", e)))
}

impl AccountService {
    pub async fn register(
        store: &dyn AccountStore,
        username: String,
        email: String,
        password: &str,
    ) -> Result<User, AppError> {
        let password = password.to_string();
        let password_hash = blocking(move || hash_password(&password)).await??;
        let user = store
            .create_user(NewUser {
                username,
                email,
                password_hash,
            })
            .await?;
        tracing::info!(user = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// The user for valid credentials, `None` otherwise.
    pub async fn authenticate(
        store: &dyn AccountStore,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AppError> {
        let Some(user) = store.user_by_username(username).await? else {
            tracing::warn!(username = %username, "login for unknown user");
            return Ok(None);
        };
        let (password, stored) = (password.to_string(), user.password_hash.clone());
        if blocking(move || verify_password(&password, &stored)).await? {
            Ok(Some(user))
        } else {
            tracing::warn!(username = %username, "login with wrong password");
            Ok(None)
        }
    }

    /// Exchange credentials for the user's API token.
    pub async fn obtain_token(
        store: &dyn AccountStore,
        username: &str,
        password: &str,
    ) -> Result<String, AppError> {
        let user = Self::authenticate(store, username, password).await?.ok_or_else(|| {
            AppError::validation("non_field_errors", "Unable to log in with provided credentials.")
        })?;
        store.token_for_user(user.id).await
    }

    /// Start a browser session. Returns the session key for the cookie.
    pub async fn login(store: &dyn AccountStore, user: &User) -> Result<String, AppError> {
        let key = store.create_session(user.id).await?;
        tracing::info!(user = user.id, "session started");
        Ok(key)
    }

    pub async fn logout(store: &dyn AccountStore, session_key: &str) -> Result<(), AppError> {
        store.delete_session(session_key).await
    }
}
