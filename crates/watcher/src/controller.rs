//! Watch lifecycle: initial load, then the background event loop
//!
//! ```text
//! Uninitialized --load root--> Loaded --register source--> Watching --stop/drop--> Stopped
//! ```
//!
//! A watcher whose source fails to register stays `Loaded`: the initial load
//! happened, but no further change will ever be observed. Set
//! [`WatchConfig::require_watch`] to turn that into a construction error.

use crate::debounce::PendingEvents;
use crate::dispatch::Dispatcher;
use crate::loader::{Loader, RemoveCallback, UpdateCallback};
use crate::source::{EventSource, EventStreams, NotifySource};
use parking_lot::Mutex;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, warn, Dispatch};
use watchfiles_core::{NamePattern, RawEvent, Result, WatchConfig, WatchError};

/// Lifecycle state of a [`FileWatcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Nothing loaded yet
    Uninitialized,
    /// Initial load done, no watch running
    Loaded,
    /// Background loop running
    Watching,
    /// Background loop finished
    Stopped,
}

/// Loads a file or directory and keeps callers informed of later changes
///
/// Dropping the watcher signals the background loop to flush whatever is
/// pending and exit; [`FileWatcher::stop`] does the same and waits for it.
pub struct FileWatcher {
    root: PathBuf,
    pattern: NamePattern,
    config: WatchConfig,
    state: Arc<Mutex<WatchState>>,
    pending: Arc<PendingEvents>,
    loaded: usize,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl FileWatcher {
    /// Load `root` and start watching it with the default configuration
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        root: impl AsRef<Path>,
        pattern: NamePattern,
        on_update: Option<UpdateCallback>,
        on_remove: Option<RemoveCallback>,
    ) -> Result<Self> {
        let mut builder = Self::builder(root, pattern);
        builder.on_update = on_update;
        builder.on_remove = on_remove;
        builder.start()
    }

    pub fn builder(root: impl AsRef<Path>, pattern: NamePattern) -> FileWatcherBuilder {
        FileWatcherBuilder {
            root: root.as_ref().to_path_buf(),
            pattern,
            config: WatchConfig::default(),
            on_update: None,
            on_remove: None,
            source: None,
            logger: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pattern(&self) -> &NamePattern {
        &self.pattern
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn state(&self) -> WatchState {
        *self.state.lock()
    }

    pub fn is_watching(&self) -> bool {
        self.state() == WatchState::Watching
    }

    /// Number of files handed to the update callback by the initial load
    pub fn initially_loaded(&self) -> usize {
        self.loaded
    }

    /// Distinct paths waiting for the next flush
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Stop the background loop after a final flush, and wait for it
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Watch loop for {} ended abnormally: {}", self.root.display(), e);
            }
        }
        *self.state.lock() = WatchState::Stopped;
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("root", &self.root)
            .field("pattern", &self.pattern)
            .field("state", &self.state())
            .finish()
    }
}

/// Configures a [`FileWatcher`] before starting it
pub struct FileWatcherBuilder {
    root: PathBuf,
    pattern: NamePattern,
    config: WatchConfig,
    on_update: Option<UpdateCallback>,
    on_remove: Option<RemoveCallback>,
    source: Option<Box<dyn EventSource>>,
    logger: Option<Dispatch>,
}

impl FileWatcherBuilder {
    pub fn config(mut self, config: WatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.config = self.config.with_debounce(debounce);
        self
    }

    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&Path, &mut dyn BufRead) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_update = Some(Arc::new(f));
        self
    }

    pub fn on_remove<F>(mut self, f: F) -> Self
    where
        F: Fn(&Path) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_remove = Some(Arc::new(f));
        self
    }

    /// Use a custom raw event source instead of the OS watcher
    pub fn source(mut self, source: impl EventSource) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Send this watcher's log output to `logger` instead of the default
    /// subscriber current at construction
    pub fn logger(mut self, logger: impl Into<Dispatch>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    /// Load the root and start the background loop
    ///
    /// Fails if the configuration is invalid, no tokio runtime is available,
    /// or the root cannot be opened, stat'ed or listed. A watch registration
    /// failure is only logged unless `require_watch` is set.
    pub fn start(self) -> Result<FileWatcher> {
        self.config.validate()?;
        let runtime = Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let logger = self
            .logger
            .clone()
            .unwrap_or_else(|| tracing::dispatcher::get_default(Dispatch::clone));

        tracing::dispatcher::with_default(&logger, || self.launch(runtime, logger.clone()))
    }

    fn launch(self, runtime: Handle, logger: Dispatch) -> Result<FileWatcher> {
        let FileWatcherBuilder {
            root,
            pattern,
            config,
            on_update,
            on_remove,
            source,
            ..
        } = self;

        let state = Arc::new(Mutex::new(WatchState::Uninitialized));
        let loader = Loader::new(on_update, on_remove, config.catch_panics);
        let loaded = loader.load_root(&root)?;
        transition(&state, WatchState::Loaded);

        let mut watcher = FileWatcher {
            root,
            pattern,
            config,
            state,
            pending: Arc::new(PendingEvents::new()),
            loaded,
            shutdown: None,
            task: None,
        };

        let mut source = source.unwrap_or_else(|| Box::new(NotifySource::new()));
        let streams = match source.register(&watcher.root) {
            Ok(streams) => streams,
            Err(e) if watcher.config.require_watch => return Err(e),
            Err(e) => {
                error!("{}; no further changes will be observed", e);
                return Ok(watcher);
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let watch_loop = WatchLoop {
            root: watcher.root.clone(),
            pattern: watcher.pattern.clone(),
            pending: Arc::clone(&watcher.pending),
            dispatcher: Arc::new(Dispatcher::new(loader)),
            debounce: watcher.config.debounce(),
            state: Arc::clone(&watcher.state),
            logger: logger.clone(),
        };

        let task = runtime.spawn(
            watch_loop
                .run(source, streams, shutdown_rx)
                .with_subscriber(logger),
        );
        watcher.shutdown = Some(shutdown_tx);
        watcher.task = Some(task);
        transition(&watcher.state, WatchState::Watching);

        info!("Watching file: {}", watcher.root.display());
        Ok(watcher)
    }
}

fn transition(state: &Mutex<WatchState>, next: WatchState) {
    let mut state = state.lock();
    debug!("Watch state {:?} -> {:?}", *state, next);
    *state = next;
}

/// Background half of a watcher
///
/// Waits on shutdown, the flush tick, incoming events and source errors,
/// whichever is ready first. The tick runs at a fixed cadence and is never
/// pushed back by new events, so an event waits at most one window even
/// during a storm.
struct WatchLoop {
    root: PathBuf,
    pattern: NamePattern,
    pending: Arc<PendingEvents>,
    dispatcher: Arc<Dispatcher>,
    debounce: Duration,
    state: Arc<Mutex<WatchState>>,
    logger: Dispatch,
}

impl WatchLoop {
    async fn run(
        self,
        _source: Box<dyn EventSource>,
        mut streams: EventStreams,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut ticker = interval(self.debounce);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut events_open = true;
        let mut errors_open = true;

        while events_open || errors_open {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                _ = ticker.tick() => self.flush().await,

                event = streams.events.recv(), if events_open => match event {
                    Some(event) => self.receive(event),
                    None => events_open = false,
                },

                err = streams.errors.recv(), if errors_open => match err {
                    Some(e) => warn!("{} from file watcher: {}", e, self.root.display()),
                    None => errors_open = false,
                },
            }
        }

        self.flush().await;
        transition(&self.state, WatchState::Stopped);
        info!("Stopped watching: {}", self.root.display());
    }

    fn receive(&self, event: RawEvent) {
        if !self.pattern.matches_path(&event.path) {
            info!(
                "Ignoring file {} as it does not match name pattern",
                event.path.display()
            );
            return;
        }

        info!("Received file watch event: {}", event);
        let pending = self.pending.record(event);
        debug!("{} pending events", pending);
    }

    /// Flush pending events through the dispatcher on the blocking pool
    ///
    /// Callbacks run without the pending-event lock held and off the async
    /// workers; the loop waits for the batch before taking the next tick.
    async fn flush(&self) {
        let batch = self.pending.flush_and_clear();
        if batch.is_empty() {
            return;
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        let logger = self.logger.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            tracing::dispatcher::with_default(&logger, || dispatcher.dispatch(batch))
        })
        .await;

        match outcome {
            Ok(summary) => debug!(
                "Dispatched {} events ({} loaded, {} removed, {} failed)",
                summary.total(),
                summary.loaded,
                summary.removed,
                summary.failed
            ),
            Err(e) => error!("Event dispatch for {} aborted: {}", self.root.display(), e),
        }
    }
}
