use std::fmt;
use std::sync::Arc;

use common::{LoginRequest, RegisterRequest};
use model::entities::user;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::password::{hash_password, verify_password};
use super::session::{Session, SessionClaims, SessionIssuer};
use super::store::{NewUser, StoreError, UserStore};
use crate::error::AuthError;

/// Registration, login and logout over injected collaborators.
///
/// Holds no locks of its own; password hashing runs on the blocking pool so
/// slow hashes never stall unrelated requests.
pub struct CredentialService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionIssuer>,
    bcrypt_cost: u32,
    /// Verified against when the username is unknown so both failure paths
    /// cost one bcrypt comparison.
    dummy_hash: String,
}

impl fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialService")
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish_non_exhaustive()
    }
}

fn store_unavailable(err: StoreError) -> AuthError {
    error!("User store failure: {}", err);
    AuthError::StoreUnavailable
}

impl CredentialService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionIssuer>,
        bcrypt_cost: u32,
    ) -> Result<Self, AuthError> {
        let dummy_hash = bcrypt::hash(Uuid::new_v4().to_string(), bcrypt_cost).map_err(|e| {
            error!("Invalid bcrypt cost {}: {}", bcrypt_cost, e);
            AuthError::Internal
        })?;

        Ok(Self {
            users,
            sessions,
            bcrypt_cost,
            dummy_hash,
        })
    }

    /// Create an account. The username check runs before hashing and the
    /// store's unique index settles any race that slips past it.
    #[instrument(skip_all, fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> Result<user::Model, AuthError> {
        request.validate()?;

        if self
            .users
            .find_by_username(&request.username)
            .await
            .map_err(store_unavailable)?
            .is_some()
        {
            debug!("Username already taken");
            return Err(AuthError::DuplicateUser);
        }

        let password_hash = hash_password(&request.password, self.bcrypt_cost).await?;

        let created = self
            .users
            .insert(NewUser {
                username: request.username,
                email: request.email,
                password_hash,
                name: request.name,
            })
            .await
            .map_err(|err| match err {
                StoreError::UniqueViolation => {
                    warn!("Concurrent registration won the username");
                    AuthError::DuplicateUser
                }
                other => store_unavailable(other),
            })?;

        info!(user_id = created.id, "User has been created");
        Ok(created)
    }

    /// Check credentials and open a session.
    ///
    /// Unknown usernames and wrong passwords fail identically.
    #[instrument(skip_all, fields(username = %request.username))]
    pub async fn login(&self, request: LoginRequest) -> Result<(user::Model, Session), AuthError> {
        request.validate()?;

        let found = self
            .users
            .find_by_username(&request.username)
            .await
            .map_err(store_unavailable)?;

        let Some(user) = found else {
            verify_password(&request.password, &self.dummy_hash).await?;
            debug!("Login for unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(&request.password, &user.password).await? {
            debug!(user_id = user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.sessions.issue(&user).await.map_err(|e| {
            error!("Failed to issue session: {}", e);
            AuthError::Internal
        })?;

        info!(user_id = user.id, "User logged in");
        Ok((user, session))
    }

    /// End the presented session, if there is one. Always succeeds.
    #[instrument(skip_all, fields(has_session = token.is_some()))]
    pub async fn logout(&self, token: Option<&str>) -> Result<(), AuthError> {
        if let Some(token) = token {
            self.sessions.revoke(token).await;
        }
        Ok(())
    }

    /// Resolve the session behind a token.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, token: Option<&str>) -> Result<SessionClaims, AuthError> {
        let token = token.ok_or(AuthError::Unauthenticated)?;
        self.sessions.verify(token).await.map_err(|e| {
            debug!("Rejected session: {}", e);
            AuthError::Unauthenticated
        })
    }
}
