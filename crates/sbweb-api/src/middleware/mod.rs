//! Request middleware

pub mod session;

pub use session::{require_backend, require_session, CurrentSession};
