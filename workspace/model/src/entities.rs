//! SeaORM entity modules for the social backend.
//! Only the users table lives here. Sessions are signed tokens and are not
//! persisted.

pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::user::Entity as User;
}
