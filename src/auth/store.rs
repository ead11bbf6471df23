use async_trait::async_trait;
use chrono::Utc;
use model::entities::user;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors surfaced by a [`UserStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The username is already taken at the storage level.
    #[error("username already exists")]
    UniqueViolation,

    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::UniqueViolation,
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// A user about to be inserted. `password_hash` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

/// Persistence operations the credential service depends on.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>, StoreError>;

    /// Insert a user. A username clash reported by the backing store must come
    /// back as [`StoreError::UniqueViolation`].
    async fn insert(&self, user: NewUser) -> Result<user::Model, StoreError>;
}

/// [`UserStore`] backed by the `users` table.
#[derive(Clone, Debug)]
pub struct SeaOrmUserStore {
    db: DatabaseConnection,
}

impl SeaOrmUserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for SeaOrmUserStore {
    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>, StoreError> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?;
        debug!(found = found.is_some(), "Looked up user by username");
        Ok(found)
    }

    #[instrument(skip_all, fields(username = %new_user.username))]
    async fn insert(&self, new_user: NewUser) -> Result<user::Model, StoreError> {
        let model = user::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            password: Set(new_user.password_hash),
            name: Set(new_user.name),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        debug!(user_id = model.id, "Inserted user");
        Ok(model)
    }
}
