//! Per-path event coalescing
//!
//! Raw events are collected into a map keyed by path between flushes. Only the
//! most recent event for a path survives; older ones are overwritten, never
//! queued. A path that is removed and recreated inside one window is therefore
//! reported by its last observed kind only.

use ahash::AHashMap;
use parking_lot::Mutex;
use std::path::PathBuf;
use watchfiles_core::RawEvent;

/// Pending events accumulated since the last flush
///
/// `record` and `flush_and_clear` take the same lock, so an event lands either
/// in the batch being flushed or in the next one, never in both or neither.
#[derive(Debug, Default)]
pub struct PendingEvents {
    events: Mutex<AHashMap<PathBuf, RawEvent>>,
}

impl PendingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event, replacing any pending event for the same path
    ///
    /// Returns the number of distinct paths now pending.
    pub fn record(&self, event: RawEvent) -> usize {
        let mut events = self.events.lock();
        events.insert(event.path.clone(), event);
        events.len()
    }

    /// Take every pending event and leave the map empty
    ///
    /// Batch order is unspecified.
    pub fn flush_and_clear(&self) -> Vec<RawEvent> {
        let drained = std::mem::take(&mut *self.events.lock());
        drained.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use watchfiles_core::EventKind;

    #[test]
    fn test_burst_on_one_path_coalesces() {
        let pending = PendingEvents::new();

        for _ in 0..10 {
            pending.record(RawEvent::new("/etc/app/a.conf", EventKind::Write));
        }

        assert_eq!(pending.len(), 1);
        let batch = pending.flush_and_clear();
        assert_eq!(batch, vec![RawEvent::new("/etc/app/a.conf", EventKind::Write)]);
    }

    #[test]
    fn test_last_event_wins() {
        let pending = PendingEvents::new();

        pending.record(RawEvent::new("/etc/app/a.conf", EventKind::Create));
        pending.record(RawEvent::new("/etc/app/a.conf", EventKind::Remove));

        let batch = pending.flush_and_clear();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].kind, EventKind::Remove);
    }

    #[test]
    fn test_distinct_paths_kept_apart() {
        let pending = PendingEvents::new();

        assert_eq!(pending.record(RawEvent::new("/d/a.conf", EventKind::Write)), 1);
        assert_eq!(pending.record(RawEvent::new("/d/b.conf", EventKind::Write)), 2);
        assert_eq!(pending.record(RawEvent::new("/d/a.conf", EventKind::Rename)), 2);

        let mut batch = pending.flush_and_clear();
        batch.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            batch,
            vec![
                RawEvent::new("/d/a.conf", EventKind::Rename),
                RawEvent::new("/d/b.conf", EventKind::Write),
            ]
        );
    }

    #[test]
    fn test_flush_clears_map() {
        let pending = PendingEvents::new();
        pending.record(RawEvent::new("/d/a.conf", EventKind::Write));

        assert_eq!(pending.flush_and_clear().len(), 1);
        assert!(pending.is_empty());
        assert!(pending.flush_and_clear().is_empty());
    }

    #[test]
    fn test_concurrent_record_and_flush_loses_nothing() {
        let pending = Arc::new(PendingEvents::new());
        let writers: Vec<_> = (0..4)
            .map(|t| {
                let pending = Arc::clone(&pending);
                thread::spawn(move || {
                    for i in 0..500 {
                        let path = format!("/d/{t}-{i}.conf");
                        pending.record(RawEvent::new(path, EventKind::Write));
                    }
                })
            })
            .collect();

        let mut seen = Vec::new();
        while writers.iter().any(|w| !w.is_finished()) {
            seen.extend(pending.flush_and_clear());
        }
        for writer in writers {
            writer.join().unwrap();
        }
        seen.extend(pending.flush_and_clear());

        // Every path is written once, so each must surface exactly once.
        assert_eq!(seen.len(), 2000);
        let mut paths: Vec<_> = seen.into_iter().map(|e| e.path).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 2000);
    }
}
