use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use crossbeam_channel::{
    Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded, select,
};

/// Process-wide stop signal shared by every pipeline stage.
///
/// Triggering it sets the flag and disconnects an internal channel, which wakes every thread
/// blocked in [`HandoffQueue::pop`].
#[derive(Clone, Debug)]
pub struct Shutdown {
    inner: Arc<ShutdownInner>,
    wake_rx: Receiver<()>,
}

#[derive(Debug)]
struct ShutdownInner {
    triggered: AtomicBool,
    wake_tx: Mutex<Option<Sender<()>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(0);
        Self {
            inner: Arc::new(ShutdownInner {
                triggered: AtomicBool::new(false),
                wake_tx: Mutex::new(Some(wake_tx)),
            }),
            wake_rx,
        }
    }

    pub fn trigger(&self) {
        if !self.inner.triggered.swap(true, Ordering::SeqCst) {
            log::info!("shutdown requested");
        }
        // Dropping the only sender disconnects `wake_rx` for every clone.
        match self.inner.wake_tx.lock() {
            Ok(mut guard) => drop(guard.take()),
            Err(poisoned) => drop(poisoned.into_inner().take()),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Sleeps up to `timeout`, returning early (and `true`) once shutdown is triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        match self.wake_rx.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => self.is_triggered(),
            _ => true,
        }
    }

    fn listener(&self) -> &Receiver<()> {
        &self.wake_rx
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity single-item-type channel that evicts the oldest item when full.
///
/// `push` never blocks. `pop` blocks until an item arrives or shutdown is triggered; queued items
/// are still handed out after shutdown, then `pop` returns `None`.
#[derive(Debug)]
pub struct HandoffQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    shutdown: Shutdown,
}

impl<T> Clone for HandoffQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<T> HandoffQueue<T> {
    pub fn new(capacity: usize, shutdown: &Shutdown) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            tx,
            rx,
            shutdown: shutdown.clone(),
        }
    }

    /// Enqueues `item`, dropping the oldest queued item if the queue is full.
    ///
    /// Returns the number of items evicted to make room. Items pushed after shutdown are dropped.
    pub fn push(&self, item: T) -> usize {
        if self.shutdown.is_triggered() {
            return 0;
        }

        let mut item = item;
        let mut evicted = 0;
        loop {
            match self.tx.try_send(item) {
                Ok(()) => return evicted,
                Err(TrySendError::Full(rejected)) => {
                    item = rejected;
                    // A concurrent consumer may win this race; either way a slot frees up.
                    if self.rx.try_recv().is_ok() {
                        evicted += 1;
                    }
                }
                // Both ends live in `self`, so the channel cannot disconnect.
                Err(TrySendError::Disconnected(_)) => return evicted,
            }
        }
    }

    pub fn pop(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => return Some(item),
            Err(TryRecvError::Disconnected) => return None,
            Err(TryRecvError::Empty) => {}
        }
        if self.shutdown.is_triggered() {
            return None;
        }

        select! {
            recv(self.rx) -> item => item.ok(),
            recv(self.shutdown.listener()) -> _ => self.rx.try_recv().ok(),
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.rx.capacity().unwrap_or(0)
    }
}
