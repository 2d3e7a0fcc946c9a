//! Selective capture, filtering and replay of authenticated sessions.
//!
//! A [`SessionSnapshot`] is taken raw from a logged-in browser context and
//! persisted as-is; filtering down to the trust-relevant cookies happens at
//! restore time against a [`CookieAllowList`]. Filtering is a pure subset
//! operation and idempotent, so replaying a snapshot never widens what the
//! automated browser is trusted with.

pub mod errors;
pub mod model;
pub mod persist;
pub mod store;

pub use errors::SessionError;
pub use model::{CookieAllowList, SessionSnapshot, StoredCookie};
pub use persist::{load_snapshot, save_snapshot};
pub use store::{capture, restore, RestoreReport};
