//! Single-admin authentication.
//!
//! There are no accounts: one configured password yields a stateless signed
//! token kept in an `HttpOnly` cookie. Failed logins are throttled per client
//! address by [`LoginGuard`].

pub mod guard;
pub mod session;
pub mod state;
pub mod token;
pub(crate) mod utils;

pub use guard::LoginGuard;
pub use session::{login, logout, me};
pub(crate) use session::authorize;
pub use state::{AuthConfig, AuthState};
