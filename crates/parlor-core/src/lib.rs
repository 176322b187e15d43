//! Domain layer for the Parlor persona chat.
//!
//! Holds the persona registry, the per-character session store, the
//! persistent key/value store abstraction and the shared error type.

pub mod config;
pub mod error;
pub mod persona;
pub mod session;
pub mod storage;

// Re-export common error type
pub use error::{ParlorError, Result};
