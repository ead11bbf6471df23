use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use sea_orm::Database;
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use crate::auth::{CredentialService, JwtSessionIssuer, SeaOrmUserStore, SessionCookie};
use crate::schemas::AppState;

/// Cost used when nothing else is configured.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Top level application settings.
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub auth: AuthConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &redact_database_url(&self.database_url))
            .field("bind_address", &self.bind_address)
            .field("auth", &self.auth)
            .finish()
    }
}

/// Database URL with any password masked, for logging.
pub fn redact_database_url(database_url: &str) -> String {
    match Url::parse(database_url) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => database_url.to_string(),
    }
}

/// Credential and session settings.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret. A random one is generated per process when unset.
    pub jwt_secret: Option<String>,
    /// Session lifetime in seconds
    pub session_ttl_secs: u64,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
    pub cookie_name: String,
    /// Adds the `Secure` attribute to the session cookie
    pub cookie_secure: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("cookie_name", &self.cookie_name)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// The cookie name goes verbatim into `Set-Cookie`, so it must be a plain
    /// token.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.cookie_name.is_empty(), "auth.cookie_name must not be empty");
        ensure!(
            self.cookie_name
                .chars()
                .all(|c| c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?={}".contains(c)),
            "auth.cookie_name {:?} contains characters not allowed in a cookie name",
            self.cookie_name
        );
        Ok(())
    }

    /// Return the configured secret or mint a throwaway one.
    fn signing_secret(&self) -> String {
        match &self.jwt_secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => {
                tracing::warn!(
                    "SOCIAL_AUTH__JWT_SECRET not set; sessions will not survive a restart"
                );
                format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
            }
        }
    }
}

impl AppConfig {
    /// Load settings from defaults, an optional `social.toml` and `SOCIAL_*`
    /// environment variables, in increasing order of precedence.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Config::builder()
            .set_default("database_url", "sqlite://social.db?mode=rwc")?
            .set_default("bind_address", "0.0.0.0:8800")?
            .set_default("auth.session_ttl_secs", 86_400_i64)?
            .set_default("auth.bcrypt_cost", i64::from(DEFAULT_BCRYPT_COST))?
            .set_default("auth.cookie_name", "access_token")?
            .set_default("auth.cookie_secure", false)?
            .add_source(File::with_name("social").required(false))
            .add_source(
                Environment::with_prefix("SOCIAL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?;

        let config: Self = settings
            .try_deserialize()
            .context("invalid configuration")?;
        config.auth.validate()?;
        Ok(config)
    }

    pub fn with_overrides(mut self, database_url: Option<String>, bind_address: Option<String>) -> Self {
        if let Some(url) = database_url {
            self.database_url = url;
        }
        if let Some(address) = bind_address {
            self.bind_address = address;
        }
        self
    }
}

/// Initialize application state against the configured database.
pub async fn initialize_app_state(config: &AppConfig) -> Result<AppState> {
    tracing::info!(
        "Connecting to database: {}",
        redact_database_url(&config.database_url)
    );
    let db = Database::connect(&config.database_url).await?;

    let issuer = JwtSessionIssuer::new(
        config.auth.signing_secret().as_bytes(),
        config.auth.session_ttl(),
    );
    let users = SeaOrmUserStore::new(db.clone());
    let auth = CredentialService::new(Arc::new(users), Arc::new(issuer), config.auth.bcrypt_cost)
        .context("failed to initialize credential service")?;

    Ok(AppState {
        db,
        auth: Arc::new(auth),
        cookie: Arc::new(SessionCookie::from_config(&config.auth)),
    })
}
