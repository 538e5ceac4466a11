//! Turning a flushed batch into callback invocations

use crate::loader::Loader;
use tracing::{error, info};
use watchfiles_core::{Action, EventKind, RawEvent};

/// Counts for one dispatched batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Files opened and handed to the update callback
    pub loaded: usize,
    /// Paths handed to the remove callback (or dropped when none is registered)
    pub removed: usize,
    /// Paths that could not be opened or stat'ed
    pub failed: usize,
}

impl DispatchSummary {
    pub fn total(&self) -> usize {
        self.loaded + self.removed + self.failed
    }
}

/// Classifies pending events and drives the loader
#[derive(Clone)]
pub struct Dispatcher {
    loader: Loader,
}

impl Dispatcher {
    pub fn new(loader: Loader) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Dispatch one batch, one action per entry
    ///
    /// A failure on one entry never stops the rest of the batch. Removed
    /// paths are never opened.
    pub fn dispatch(&self, batch: Vec<RawEvent>) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        if batch.is_empty() {
            return summary;
        }

        info!("Processing {} events", batch.len());

        for event in batch {
            let path = event.path.as_path();
            match event.kind {
                EventKind::Write | EventKind::MetadataChange => {
                    info!("Modified file: {}", path.display())
                }
                EventKind::Create => info!("Created file: {}", path.display()),
                EventKind::Rename => info!("Renamed file: {}", path.display()),
                EventKind::Remove => info!("Deleted file: {}", path.display()),
            }

            match event.kind.action() {
                Action::Load => match self.loader.open_and_load(path) {
                    Ok(true) => summary.loaded += 1,
                    Ok(false) => {}
                    Err(e) => {
                        error!("{}", e);
                        summary.failed += 1;
                    }
                },
                Action::Remove => {
                    self.loader.remove(path);
                    summary.removed += 1;
                }
            }
        }

        summary
    }
}
