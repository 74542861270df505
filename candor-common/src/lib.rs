//! # Candor Common Library
//!
//! Shared code for the Candor interview signal service:
//! - Score, transcript, and contradiction types
//! - Event types (SignalEvent enum) and EventBus
//! - Error types
//! - Configuration file resolution

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use error::{Error, Result};
