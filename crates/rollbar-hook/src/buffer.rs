// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! FIFO queues sitting between the logging call site and the dispatcher.
//!
//! Any producer may [`Buffer::push`] from any thread without a runtime; only the
//! dispatcher drains with [`Buffer::next`]. Pushing never fails: entries that cannot
//! be queued (buffer full or closed) are dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::entry::Entry;

#[async_trait]
pub trait Buffer: Send + Sync {
    /// Enqueues an entry. Never blocks on the consumer and never fails.
    fn push(&self, entry: Entry);

    /// Waits for the next entry in push order.
    ///
    /// Returns `None` once the buffer is closed and every queued entry has been
    /// handed out; from then on it keeps returning `None`.
    async fn next(&self) -> Option<Entry>;

    /// Stops intake. Entries already queued remain available to `next`.
    fn close(&self);

    /// Number of entries dropped at intake so far.
    fn dropped(&self) -> u64;
}

/// Bounded in-memory queue. Pushes beyond capacity are dropped.
pub struct ChannelBuffer {
    tx: RwLock<Option<mpsc::Sender<Entry>>>,
    rx: Mutex<mpsc::Receiver<Entry>>,
    dropped: AtomicU64,
}

impl ChannelBuffer {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx: RwLock::new(Some(tx)),
            rx: Mutex::new(rx),
            dropped: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Buffer for ChannelBuffer {
    fn push(&self, entry: Entry) {
        let tx = match self.tx.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let queued = match tx.as_ref() {
            Some(tx) => tx.try_send(entry).is_ok(),
            None => false,
        };
        if !queued {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn next(&self) -> Option<Entry> {
        self.rx.lock().await.recv().await
    }

    fn close(&self) {
        let mut tx = match self.tx.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Dropping the only sender lets the receiver drain and then end.
        tx.take();
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Growable in-memory queue. Only drops entries pushed after close.
pub struct UnboundedBuffer {
    tx: RwLock<Option<mpsc::UnboundedSender<Entry>>>,
    rx: Mutex<mpsc::UnboundedReceiver<Entry>>,
    dropped: AtomicU64,
}

impl UnboundedBuffer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: RwLock::new(Some(tx)),
            rx: Mutex::new(rx),
            dropped: AtomicU64::new(0),
        }
    }
}

impl Default for UnboundedBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Buffer for UnboundedBuffer {
    fn push(&self, entry: Entry) {
        let tx = match self.tx.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let queued = match tx.as_ref() {
            Some(tx) => tx.send(entry).is_ok(),
            None => false,
        };
        if !queued {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn next(&self) -> Option<Entry> {
        self.rx.lock().await.recv().await
    }

    fn close(&self) {
        let mut tx = match self.tx.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tx.take();
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Level;
    use std::sync::Arc;
    use std::time::Duration;

    fn entry(message: &str) -> Entry {
        Entry::new(Level::Error, message)
    }

    async fn drain(buffer: &dyn Buffer) -> Vec<String> {
        let mut messages = Vec::new();
        while let Some(entry) = buffer.next().await {
            messages.push(entry.message);
        }
        messages
    }

    #[tokio::test]
    async fn test_channel_buffer_is_fifo_and_drains_after_close() {
        let buffer = ChannelBuffer::new(8);
        buffer.push(entry("one"));
        buffer.push(entry("two"));
        buffer.push(entry("three"));
        buffer.close();

        assert_eq!(drain(&buffer).await, vec!["one", "two", "three"]);
        // Terminal: stays exhausted.
        assert!(buffer.next().await.is_none());
        assert_eq!(buffer.dropped(), 0);
    }

    #[tokio::test]
    async fn test_channel_buffer_drops_when_full() {
        let buffer = ChannelBuffer::new(2);
        buffer.push(entry("one"));
        buffer.push(entry("two"));
        buffer.push(entry("three"));
        buffer.close();

        assert_eq!(drain(&buffer).await, vec!["one", "two"]);
        assert_eq!(buffer.dropped(), 1);
    }

    #[tokio::test]
    async fn test_push_after_close_is_dropped() {
        let buffer = ChannelBuffer::new(4);
        buffer.close();
        buffer.push(entry("late"));

        assert!(buffer.next().await.is_none());
        assert_eq!(buffer.dropped(), 1);

        let buffer = UnboundedBuffer::new();
        buffer.close();
        buffer.push(entry("late"));

        assert!(buffer.next().await.is_none());
        assert_eq!(buffer.dropped(), 1);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let buffer = ChannelBuffer::new(0);
        buffer.push(entry("one"));
        buffer.close();
        assert_eq!(drain(&buffer).await, vec!["one"]);
    }

    #[tokio::test]
    async fn test_unbounded_buffer_grows() {
        let buffer = UnboundedBuffer::new();
        for i in 0..1000 {
            buffer.push(entry(&i.to_string()));
        }
        buffer.close();

        let messages = drain(&buffer).await;
        assert_eq!(messages.len(), 1000);
        assert_eq!(messages.first().map(String::as_str), Some("0"));
        assert_eq!(messages.last().map(String::as_str), Some("999"));
    }

    #[tokio::test]
    async fn test_next_waits_for_push() {
        let buffer = Arc::new(ChannelBuffer::new(4));

        let consumer = {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move { buffer.next().await.map(|e| e.message) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        buffer.push(entry("arrived"));
        let received = consumer.await.expect("consumer task failed");
        assert_eq!(received.as_deref(), Some("arrived"));
    }

    #[test]
    fn test_push_from_plain_threads() {
        let buffer = Arc::new(UnboundedBuffer::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        buffer.push(entry(&format!("{t}-{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        buffer.close();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let messages = runtime.block_on(drain(buffer.as_ref()));
        assert_eq!(messages.len(), 100);
    }
}
