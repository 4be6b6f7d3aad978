//! # SBWeb Shared
//!
//! Configuration, telemetry, constants and application errors shared by the
//! SBWeb crates.

pub mod constants;
pub mod telemetry;
pub mod config;
pub mod error;

pub use crate::config::{AppConfig, CookieSettings, SessionSettings};
pub use crate::error::AppError;
