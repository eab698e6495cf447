//! Session management.
//!
//! [`SessionGuard`] holds the logged-in user and their tokens and is the
//! only place either changes. Tokens survive restarts through a
//! [`SessionStore`].

mod guard;
mod store;

pub use guard::{Session, SessionGuard, SessionState};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, SessionStoreError};
