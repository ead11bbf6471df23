//! Account registration, login and session handling.
//!
//! [`CredentialService`] owns the flow and talks to two collaborators through
//! traits: a [`store::UserStore`] for persistence and a
//! [`session::SessionIssuer`] that mints and revokes session tokens. Both are
//! injected, so tests can swap in doubles.

mod cookie;
mod password;
mod service;
pub mod session;
pub mod store;

pub use cookie::SessionCookie;
pub use service::CredentialService;
pub use session::JwtSessionIssuer;
pub use store::SeaOrmUserStore;
