//! `portalgate-session`: the client's authenticated session.
//!
//! Owns the only long-lived mutable state of the pipeline. There is exactly
//! one writer path (login, refresh, logout) and many readers (token
//! injection, guards).

pub mod error;
pub mod provider;
pub mod session;
pub mod store;

pub use error::{ProviderError, SessionError};
pub use provider::{IdentityProvider, StaticProvider, TokenSet};
pub use session::Session;
pub use store::SessionStore;
