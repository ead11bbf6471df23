use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap, HeaderValue,
};
use chrono::Utc;
use tracing::error;

use super::session::Session;
use crate::config::AuthConfig;

/// How the session token travels to and from the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
}

impl SessionCookie {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            secure: config.cookie_secure,
        }
    }

    /// `Set-Cookie` value carrying a freshly issued session. The cookie is
    /// never readable from scripts.
    pub fn issue(&self, session: &Session) -> HeaderValue {
        let max_age = (session.claims.expires_at - Utc::now()).num_seconds().max(0);
        self.header(&session.token, max_age)
    }

    /// `Set-Cookie` value that makes the browser drop the session.
    pub fn clear(&self) -> HeaderValue {
        self.header("", 0)
    }

    fn header(&self, value: &str, max_age: i64) -> HeaderValue {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.name, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        // Names are checked when config loads and tokens are base64url.
        HeaderValue::from_str(&cookie).unwrap_or_else(|e| {
            error!("Unusable session cookie header: {}", e);
            HeaderValue::from_static("")
        })
    }

    /// Pull the session token out of the request: the session cookie first,
    /// then an `Authorization: Bearer` header.
    pub fn token_from(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.to_string())
            .filter(|value| !value.is_empty())
            .or_else(|| {
                headers
                    .get(AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.strip_prefix("Bearer "))
                    .map(|token| token.trim().to_string())
                    .filter(|token| !token.is_empty())
            })
    }
}
