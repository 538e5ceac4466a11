//! Core data model for watchfiles
//!
//! This crate provides:
//! - Raw filesystem events and their load/remove classification
//! - Base-name matching patterns
//! - Watcher configuration (TOML-loadable)
//! - The shared error type

pub mod config;
pub mod error;
pub mod event;
pub mod pattern;

// Re-exports
pub use config::WatchConfig;
pub use error::{Result, WatchError};
pub use event::{Action, EventKind, RawEvent};
pub use pattern::NamePattern;
