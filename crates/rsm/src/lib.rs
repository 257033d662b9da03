//! # rsm
//!
//! A Redis-backed HTTP session manager.
//!
//! Session state lives in Redis instead of process memory, so any
//! front-end node can serve any request for any session. Each session
//! is one Redis hash with a TTL; each attribute is one field, read on
//! first use and written through on every change. Expiry is Redis's
//! job, so there is no sweeper.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rsm::prelude::*;
//!
//! # async fn run() -> Result<(), RsmError> {
//! rsm::logging::init();
//! let manager = RsmConfig::default().build()?;
//!
//! let mut session = manager.create_session(None).await?;
//! session.set_attribute("user", "alice").await?;
//!
//! // Later, possibly on another node:
//! if let Some(mut session) = manager.find_session(session.id()).await? {
//!     manager.access(&mut session).await?;
//!     let user = session.get_attribute("user").await?;
//!     # let _ = user;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | crate         | role                                       |
//! |---------------|--------------------------------------------|
//! | `rsm-store`   | Redis and in-memory store adapters         |
//! | `rsm-codec`   | attribute serializers (JSON, MessagePack)  |
//! | `rsm-session` | `Session` and `SessionManager`             |
//! | `rsm`         | configuration, unified error, logging      |

mod config;
mod error;
pub mod logging;

pub use config::{RedisSessionManager, RsmConfig};
pub use error::RsmError;

pub use rsm_codec as codec;
pub use rsm_session as session;
pub use rsm_store as store;

/// Everything a host typically needs, in one import.
pub mod prelude {
    pub use crate::{RedisSessionManager, RsmConfig, RsmError};
    pub use rsm_codec::{SerializerConfig, SerializerKind, Value, json};
    pub use rsm_session::{Session, SessionConfig, SessionListener, SessionManager};
    pub use rsm_store::{MemoryStore, RedisStore, SessionStore, StoreConfig};
}
