//! Raw filesystem events and how they are classified

use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of low-level filesystem operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// File contents written
    Write,
    /// File created
    Create,
    /// File removed
    Remove,
    /// File renamed (either side of the rename)
    Rename,
    /// Permissions, timestamps or other metadata changed
    MetadataChange,
}

impl EventKind {
    /// Map the kind to what the dispatcher does with it.
    ///
    /// Renames load rather than remove: config files are commonly updated by
    /// writing a temporary file and renaming it into place.
    pub fn action(self) -> Action {
        match self {
            EventKind::Write | EventKind::MetadataChange | EventKind::Create | EventKind::Rename => {
                Action::Load
            }
            EventKind::Remove => Action::Remove,
        }
    }

    /// Short lowercase name used in log lines
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Write => "write",
            EventKind::Create => "create",
            EventKind::Remove => "remove",
            EventKind::Rename => "rename",
            EventKind::MetadataChange => "metadata",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the dispatcher does for a pending event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open the file and hand its contents to the update callback
    Load,
    /// Hand the path to the remove callback
    Remove,
}

/// A single notification from the raw event source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Final path component, lossily converted to UTF-8
    ///
    /// Returns `None` for paths without a file name (`/`, `..`).
    pub fn base_name(&self) -> Option<String> {
        base_name(&self.path)
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path.display())
    }
}

pub(crate) fn base_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
