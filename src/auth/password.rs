use tracing::error;

use crate::error::AuthError;

/// Hash a password with a fresh salt on the blocking pool.
///
/// The salt and cost are embedded in the returned bcrypt string.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| {
            error!("Password hashing task failed: {}", e);
            AuthError::Internal
        })?
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            AuthError::Internal
        })
}

/// Check a password against a stored bcrypt hash on the blocking pool.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| {
            error!("Password verification task failed: {}", e);
            AuthError::Internal
        })?
        .map_err(|e| {
            error!("Stored password hash is unreadable: {}", e);
            AuthError::Internal
        })
}
