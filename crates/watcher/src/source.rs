//! Raw event sources
//!
//! A source registers one watch root and hands back two streams: filesystem
//! events and runtime errors. [`NotifySource`] is backed by the OS
//! notification facility through `notify`; [`ChannelSource`] is fed by hand.

use notify::event::ModifyKind;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use watchfiles_core::{EventKind, RawEvent, Result, WatchError};

/// Streams produced by a registered source
///
/// Both streams end when the source is dropped.
#[derive(Debug)]
pub struct EventStreams {
    pub events: mpsc::UnboundedReceiver<RawEvent>,
    pub errors: mpsc::UnboundedReceiver<WatchError>,
}

/// Producer of raw filesystem events for a single root
///
/// The watch loop owns the source for as long as it runs, so anything that
/// keeps the OS watch alive can live inside it.
pub trait EventSource: Send + 'static {
    /// Start watching `root`; called at most once per watcher
    fn register(&mut self, root: &Path) -> Result<EventStreams>;
}

/// Event source backed by `notify`'s recommended platform watcher
///
/// Watches non-recursively: a directory root reports its immediate entries.
#[derive(Default)]
pub struct NotifySource {
    watcher: Option<RecommendedWatcher>,
}

impl NotifySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSource for NotifySource {
    fn register(&mut self, root: &Path) -> Result<EventStreams> {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (error_tx, errors) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for raw in translate(event) {
                        let _ = event_tx.send(raw);
                    }
                }
                Err(e) => {
                    let _ = error_tx.send(WatchError::Source(e.to_string()));
                }
            },
        )
        .map_err(|e| WatchError::Register {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        watcher
            .watch(root, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Register {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;

        self.watcher = Some(watcher);
        Ok(EventStreams { events, errors })
    }
}

/// Map a notify event kind onto the kinds the dispatcher understands
///
/// Access notifications and kinds notify could not classify carry no change
/// and are dropped.
pub fn map_kind(kind: &notify::EventKind) -> Option<EventKind> {
    match kind {
        notify::EventKind::Create(_) => Some(EventKind::Create),
        notify::EventKind::Remove(_) => Some(EventKind::Remove),
        notify::EventKind::Modify(ModifyKind::Metadata(_)) => Some(EventKind::MetadataChange),
        notify::EventKind::Modify(ModifyKind::Name(_)) => Some(EventKind::Rename),
        notify::EventKind::Modify(_) => Some(EventKind::Write),
        notify::EventKind::Access(_) | notify::EventKind::Any | notify::EventKind::Other => None,
    }
}

/// One raw event per path; a rename pair yields one for each side
pub fn translate(event: notify::Event) -> Vec<RawEvent> {
    match map_kind(&event.kind) {
        Some(kind) => event
            .paths
            .into_iter()
            .map(|path| RawEvent::new(path, kind))
            .collect(),
        None => Vec::new(),
    }
}

/// Source fed through an [`EventInjector`]
pub struct ChannelSource {
    streams: Option<EventStreams>,
    failure: Option<String>,
    registered: Arc<Mutex<Option<PathBuf>>>,
}

/// Sending half of a [`ChannelSource`]
#[derive(Clone)]
pub struct EventInjector {
    events: mpsc::UnboundedSender<RawEvent>,
    errors: mpsc::UnboundedSender<WatchError>,
    registered: Arc<Mutex<Option<PathBuf>>>,
}

impl ChannelSource {
    pub fn new() -> (Self, EventInjector) {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (error_tx, errors) = mpsc::unbounded_channel();
        let registered = Arc::new(Mutex::new(None));

        let source = Self {
            streams: Some(EventStreams { events, errors }),
            failure: None,
            registered: Arc::clone(&registered),
        };
        let injector = EventInjector {
            events: event_tx,
            errors: error_tx,
            registered,
        };
        (source, injector)
    }

    /// A source whose registration always fails with `reason`
    pub fn failing(reason: impl Into<String>) -> (Self, EventInjector) {
        let (mut source, injector) = Self::new();
        source.failure = Some(reason.into());
        (source, injector)
    }
}

impl EventSource for ChannelSource {
    fn register(&mut self, root: &Path) -> Result<EventStreams> {
        if let Some(reason) = &self.failure {
            return Err(WatchError::Register {
                path: root.to_path_buf(),
                reason: reason.clone(),
            });
        }

        let streams = self.streams.take().ok_or_else(|| WatchError::Register {
            path: root.to_path_buf(),
            reason: "source already registered".to_string(),
        })?;
        *self.registered.lock() = Some(root.to_path_buf());
        Ok(streams)
    }
}

impl EventInjector {
    /// Send an event; false once the watch loop has gone away
    pub fn send(&self, event: RawEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Send a runtime error; false once the watch loop has gone away
    pub fn send_error(&self, error: WatchError) -> bool {
        self.errors.send(error).is_ok()
    }

    /// Root the source was registered with, if registration happened
    pub fn registered_root(&self) -> Option<PathBuf> {
        self.registered.lock().clone()
    }
}
