//! # SBWeb Session
//!
//! Issues, validates and revokes session tokens stored in a key-value
//! backend, with two expiration policies and explicit reconnect supervision.
//!
//! ```rust,ignore
//! use sbweb_session::{connect_from_settings, Session, TtlPolicy};
//!
//! let sessions = connect_from_settings(&config.session).await?;
//! let id = sessions.create_session(&session, sessions.expiring_policy()).await?;
//! let same = sessions.check_session(&id).await?;
//! ```

pub mod backend;
pub mod error;
pub mod manager;
pub mod model;
pub mod store;
pub mod supervisor;
pub mod token;

pub use backend::{BackendConnector, KeyValueBackend, MemoryConnector, MemoryServer, RedisConnector};
pub use error::{BackendError, SessionError};
pub use manager::{connect_from_settings, SessionManager, SessionProvider};
pub use model::{Session, SessionId, TtlPolicy};
pub use store::SessionStore;
pub use supervisor::{ConnectionState, ConnectionSupervisor};
pub use token::generate_token;
