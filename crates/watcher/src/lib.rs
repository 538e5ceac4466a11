//! Filesystem watching for configuration reloads
//!
//! This crate provides:
//! - Initial bulk load of a file or of every file in a directory
//! - Name-filtered watching of later changes
//! - Per-path coalescing of raw events over a fixed flush cadence
//! - Update/remove callbacks driven from a background tokio task
//!
//! ```no_run
//! use std::io::Read;
//! use watchfiles::{FileWatcher, NamePattern};
//!
//! # async fn run() -> watchfiles::Result<()> {
//! let watcher = FileWatcher::builder("/etc/myapp/conf.d", NamePattern::new(r"\.toml$")?)
//!     .on_update(|path, reader| {
//!         let mut contents = String::new();
//!         reader.read_to_string(&mut contents)?;
//!         println!("{} changed ({} bytes)", path.display(), contents.len());
//!         Ok(())
//!     })
//!     .on_remove(|path| {
//!         println!("{} removed", path.display());
//!         Ok(())
//!     })
//!     .start()?;
//! # drop(watcher);
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod debounce;
pub mod dispatch;
pub mod loader;
pub mod source;

// Re-exports
pub use controller::{FileWatcher, FileWatcherBuilder, WatchState};
pub use debounce::PendingEvents;
pub use dispatch::{DispatchSummary, Dispatcher};
pub use loader::{remove_callback, update_callback, Loader, RemoveCallback, UpdateCallback};
pub use source::{ChannelSource, EventInjector, EventSource, EventStreams, NotifySource};
pub use watchfiles_core::{
    Action, EventKind, NamePattern, RawEvent, Result, WatchConfig, WatchError,
};
