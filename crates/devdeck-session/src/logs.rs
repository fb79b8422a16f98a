//! Bounded log storage with live fan-out.
//!
//! One [`LogBuffer`] per (source, channel) pair, created lazily on first
//! append and kept strictly FIFO: when the ring is full the oldest entry is
//! dropped, never reordered. A session holds two independent [`LogStore`]s —
//! one for ephemeral process output, one for semi-persistent service logs —
//! with identical mechanics and different capacities.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use devdeck_core::domain::{LogChannel, LogEntry};
use tokio::sync::broadcast;

/// Broadcast channel capacity for live log fan-out.
const BROADCAST_CAPACITY: usize = 1000;

/// Ring buffer storing the most recent entries for one (source, channel).
#[derive(Debug)]
pub struct LogBuffer {
    capacity: usize,
    entries: VecDeque<LogEntry>,
}

impl LogBuffer {
    /// Create an empty buffer holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    /// Append an entry, dropping the oldest if at capacity.
    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Replace the contents wholesale (pull-mode history refresh). Only the
    /// most recent `capacity` of `entries` are kept.
    pub fn reset(&mut self, entries: Vec<LogEntry>) {
        self.entries.clear();
        for entry in entries {
            self.push(entry);
        }
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Number of entries currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Manages log buffers and the live broadcast channel for one log domain.
pub struct LogStore {
    capacity: usize,
    buffers: RwLock<HashMap<(String, LogChannel), LogBuffer>>,
    broadcast_tx: broadcast::Sender<LogEntry>,
}

impl LogStore {
    /// Create a store whose buffers hold at most `capacity` entries each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            capacity,
            buffers: RwLock::new(HashMap::new()),
            broadcast_tx,
        }
    }

    /// Append an entry to its (source, channel) buffer, creating the buffer
    /// on first use, and fan it out to live subscribers.
    pub fn append(&self, entry: LogEntry) {
        {
            let mut buffers = self.buffers.write().unwrap();
            let buffer = buffers
                .entry((entry.source.clone(), entry.channel))
                .or_insert_with(|| LogBuffer::new(self.capacity));
            buffer.push(entry.clone());
        }

        // Broadcast to subscribers (ignore if no receivers)
        let _ = self.broadcast_tx.send(entry);
    }

    /// Replace a buffer's contents from a history fetch. Not broadcast:
    /// pull-mode consumers re-read the snapshot instead.
    pub fn replace(&self, source: &str, channel: LogChannel, entries: Vec<LogEntry>) {
        let mut buffers = self.buffers.write().unwrap();
        let buffer = buffers
            .entry((source.to_string(), channel))
            .or_insert_with(|| LogBuffer::new(self.capacity));
        buffer.reset(entries);
    }

    /// All entries for (source, channel), oldest first.
    #[must_use]
    pub fn entries(&self, source: &str, channel: LogChannel) -> Vec<LogEntry> {
        let buffers = self.buffers.read().unwrap();
        buffers
            .get(&(source.to_string(), channel))
            .map(LogBuffer::entries)
            .unwrap_or_default()
    }

    /// Number of buffered entries for (source, channel).
    #[must_use]
    pub fn len(&self, source: &str, channel: LogChannel) -> usize {
        let buffers = self.buffers.read().unwrap();
        buffers
            .get(&(source.to_string(), channel))
            .map_or(0, LogBuffer::len)
    }

    /// Empty one (source, channel) buffer. Purely a display action: any
    /// active subscription or poll timer keeps running.
    pub fn clear(&self, source: &str, channel: LogChannel) {
        let mut buffers = self.buffers.write().unwrap();
        buffers.remove(&(source.to_string(), channel));
    }

    /// Drop every buffer belonging to `source` (both channels). Used when a
    /// source stops.
    pub fn clear_source(&self, source: &str) {
        let mut buffers = self.buffers.write().unwrap();
        buffers.retain(|(owner, _), _| owner != source);
    }

    /// Get a receiver for live appended entries (all sources).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.broadcast_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, channel: LogChannel, text: &str) -> LogEntry {
        LogEntry::new(source, channel, text)
    }

    #[test]
    fn buffer_eviction_is_strictly_fifo() {
        let mut buffer = LogBuffer::new(2);
        buffer.push(entry("web", LogChannel::Stdout, "a"));
        buffer.push(entry("web", LogChannel::Stdout, "b"));
        buffer.push(entry("web", LogChannel::Stdout, "c"));

        let texts: Vec<_> = buffer.entries().into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[test]
    fn full_buffer_keeps_exactly_the_newest_cap_entries() {
        let store = LogStore::new(1000);
        for i in 1..=1500 {
            store.append(entry("web", LogChannel::Stdout, &i.to_string()));
        }

        let entries = store.entries("web", LogChannel::Stdout);
        assert_eq!(entries.len(), 1000);
        assert_eq!(entries.first().unwrap().text, "501");
        assert_eq!(entries.last().unwrap().text, "1500");
        // Relative order is preserved throughout.
        for (i, e) in entries.iter().enumerate() {
            assert_eq!(e.text, (501 + i).to_string());
        }
    }

    #[test]
    fn channels_are_buffered_independently() {
        let store = LogStore::new(10);
        store.append(entry("web", LogChannel::Stdout, "out"));
        store.append(entry("web", LogChannel::Stderr, "err"));

        assert_eq!(store.len("web", LogChannel::Stdout), 1);
        assert_eq!(store.len("web", LogChannel::Stderr), 1);

        store.clear("web", LogChannel::Stdout);
        assert_eq!(store.len("web", LogChannel::Stdout), 0);
        assert_eq!(store.len("web", LogChannel::Stderr), 1);
    }

    #[test]
    fn clear_source_drops_all_channels() {
        let store = LogStore::new(10);
        store.append(entry("web", LogChannel::Stdout, "out"));
        store.append(entry("web", LogChannel::Stderr, "err"));
        store.append(entry("db", LogChannel::Stdout, "ready"));

        store.clear_source("web");
        assert_eq!(store.len("web", LogChannel::Stdout), 0);
        assert_eq!(store.len("web", LogChannel::Stderr), 0);
        assert_eq!(store.len("db", LogChannel::Stdout), 1);
    }

    #[test]
    fn replace_trims_to_capacity_keeping_newest() {
        let store = LogStore::new(3);
        let history: Vec<_> = (1..=5)
            .map(|i| entry("db", LogChannel::Stdout, &i.to_string()))
            .collect();
        store.replace("db", LogChannel::Stdout, history);

        let texts: Vec<_> = store
            .entries("db", LogChannel::Stdout)
            .into_iter()
            .map(|e| e.text)
            .collect();
        assert_eq!(texts, vec!["3", "4", "5"]);
    }

    #[tokio::test]
    async fn append_fans_out_to_subscribers() {
        let store = LogStore::new(10);
        let mut rx = store.subscribe();
        store.append(entry("web", LogChannel::Stdout, "hello"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.text, "hello");
        assert_eq!(received.source, "web");
    }
}
