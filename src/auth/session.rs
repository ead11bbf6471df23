use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use model::entities::user;
use moka::{future::Cache, Expiry};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Malformed, tampered with, or revoked.
    #[error("session token is invalid")]
    Invalid,

    #[error("session token has expired")]
    Expired,

    #[error("failed to sign session token: {0}")]
    Signing(String),
}

/// What a verified session token says about its holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: i32,
    pub username: String,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued session.
#[derive(Clone)]
pub struct Session {
    pub token: String,
    pub claims: SessionClaims,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("claims", &self.claims)
            .finish()
    }
}

/// Mints, verifies and revokes opaque session tokens.
#[async_trait]
pub trait SessionIssuer: Send + Sync {
    async fn issue(&self, user: &user::Model) -> Result<Session, SessionError>;

    async fn verify(&self, token: &str) -> Result<SessionClaims, SessionError>;

    /// Invalidate a token. Unknown or already invalid tokens are ignored.
    async fn revoke(&self, token: &str);
}

/// JWT wire claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    jti: String,
    iat: i64,
    exp: i64,
}

impl Claims {
    fn into_session_claims(self) -> Result<SessionClaims, SessionError> {
        let user_id = self.sub.parse().map_err(|_| SessionError::Invalid)?;
        let expires_at = DateTime::from_timestamp(self.exp, 0).ok_or(SessionError::Invalid)?;
        Ok(SessionClaims {
            user_id,
            username: self.username,
            session_id: self.jti,
            expires_at,
        })
    }
}

/// Keeps a revoked `jti` until its token's own `exp`, after which the token
/// is rejected as expired anyway.
struct UntilTokenExpiry;

impl Expiry<String, i64> for UntilTokenExpiry {
    fn expire_after_create(&self, _jti: &String, exp: &i64, _created_at: Instant) -> Option<Duration> {
        let remaining = exp.saturating_sub(Utc::now().timestamp()).max(1);
        Some(Duration::from_secs(remaining as u64))
    }
}

/// HS256 session tokens with an in-memory revocation list.
///
/// The list has no size bound: every revoked token stays listed until it
/// expires.
pub struct JwtSessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    revoked: Cache<String, i64>,
}

impl JwtSessionIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let revoked = Cache::builder().expire_after(UntilTokenExpiry).build();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
            revoked,
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, SessionError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| SessionError::Signing(e.to_string()))
    }

    fn decode(&self, token: &str) -> Result<Claims, SessionError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid,
            })
    }
}

#[async_trait]
impl SessionIssuer for JwtSessionIssuer {
    #[instrument(skip_all, fields(user_id = user.id))]
    async fn issue(&self, user: &user::Model) -> Result<Session, SessionError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };
        let token = self.sign(&claims)?;
        debug!(session_id = %claims.jti, "Issued session");

        Ok(Session {
            token,
            claims: claims.into_session_claims()?,
        })
    }

    #[instrument(skip_all)]
    async fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let claims = self.decode(token)?;
        if self.revoked.contains_key(&claims.jti) {
            debug!(session_id = %claims.jti, "Rejected revoked session");
            return Err(SessionError::Invalid);
        }
        claims.into_session_claims()
    }

    #[instrument(skip_all)]
    async fn revoke(&self, token: &str) {
        match self.decode(token) {
            Ok(claims) => {
                debug!(session_id = %claims.jti, "Revoked session");
                self.revoked.insert(claims.jti, claims.exp).await;
            }
            Err(e) => debug!("Ignoring revoke for unusable token: {}", e),
        }
    }
}
