//! Session lifecycle engine for the Redis session manager.
//!
//! This crate replaces an in-memory session table with state held in a
//! shared store, so any front-end node can serve any request:
//!
//! 1. **Claiming**: [`SessionManager::create_session`] atomically
//!    claims an id in the store; at most one caller wins each id.
//! 2. **Attributes**: [`Session`] reads each attribute lazily
//!    (read-through) and writes every change immediately
//!    (write-through), one hash field per attribute.
//! 3. **Expiry**: the store's per-key TTL, renewed on every access and
//!    write. Nothing here sweeps. Once the store has dropped a session,
//!    accesses and writes through an old handle fail with
//!    [`SessionError::Expired`] instead of recreating it.
//!
//! # How it fits in the stack
//!
//! ```text
//! Host (above)  ← request handling, cookies, listener plumbing
//!     ↕
//! Session layer (this crate)  ← ids, attributes, TTL renewal
//!     ↕                ↕
//! rsm-store        rsm-codec  ← store commands / value encoding
//! ```

mod config;
mod error;
mod listener;
mod local;
mod manager;
mod session;

pub use config::SessionConfig;
pub use error::SessionError;
pub use listener::SessionListener;
pub use manager::{INFO, NAME, SessionManager};
pub use session::{CLAIM_FIELD, Session};
