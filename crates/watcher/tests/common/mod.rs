//! Common utilities for integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::fmt::MakeWriter;
use watchfiles::{FileWatcherBuilder, NamePattern};

/// Flush cadence used by the integration tests
pub const WINDOW: Duration = Duration::from_millis(100);

/// Callback invocations captured by a [`Recorder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Update { path: PathBuf, contents: String },
    Remove { path: PathBuf },
}

/// Records every update and remove callback invocation in order
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach both callbacks to a builder
    pub fn attach(&self, builder: FileWatcherBuilder) -> FileWatcherBuilder {
        let updates = self.clone();
        let removes = self.clone();
        builder
            .on_update(move |path, reader| {
                let mut contents = String::new();
                reader.read_to_string(&mut contents)?;
                updates.calls.lock().push(Call::Update {
                    path: path.to_path_buf(),
                    contents,
                });
                Ok(())
            })
            .on_remove(move |path| {
                removes.calls.lock().push(Call::Remove {
                    path: path.to_path_buf(),
                });
                Ok(())
            })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn updates_for(&self, path: &Path) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, Call::Update { path: p, .. } if p == path))
            .count()
    }

    pub fn removes_for(&self, path: &Path) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, Call::Remove { path: p } if p == path))
            .count()
    }

    pub fn last_contents(&self, path: &Path) -> Option<String> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            Call::Update { path: p, contents } if p == path => Some(contents.clone()),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }
}

/// Pattern accepting `*.conf` base names
pub fn conf_pattern() -> NamePattern {
    NamePattern::new(r"\.conf$").unwrap()
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// In-memory log sink for a `tracing_subscriber` fmt layer
#[derive(Clone, Default)]
pub struct LogBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    /// Subscriber writing plain-text lines into this buffer
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
