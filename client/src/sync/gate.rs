//! Counting gate with FIFO wake order
//!
//! A signed permit counter plus an explicit waiter queue, both behind one
//! mutex. `wait` takes a permit or parks on a oneshot; `signal` returns a
//! permit or hands it straight to the oldest parked waiter.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

#[derive(Debug)]
struct GateState {
    /// Negative while callers are parked
    permits: i64,
    waiters: VecDeque<oneshot::Sender<()>>,
}

/// Counting semaphore whose waiters wake strictly in arrival order
///
/// `CountingGate::new(1)` is an async mutex; `CountingGate::new(n)` bounds
/// concurrency to `n`. There is no timeout; wrap [`CountingGate::wait`] in
/// `tokio::time::timeout` when one is needed. Dropping a pending `wait`
/// future is safe: a wake it already received is passed on, and its place in
/// line is skipped by the next `signal`.
#[derive(Debug)]
pub struct CountingGate {
    state: Mutex<GateState>,
}

impl CountingGate {
    pub fn new(initial_permits: i64) -> Self {
        Self {
            state: Mutex::new(GateState {
                permits: initial_permits,
                waiters: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a permit, parking until one is signalled if none is free
    pub async fn wait(&self) {
        let rx = {
            let mut state = self.lock();
            state.permits -= 1;
            if state.permits >= 0 {
                return;
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            rx
        };

        let mut waiter = Waiter {
            gate: self,
            rx,
            woken: false,
        };
        // Senders are only ever consumed by `send`, so this resolves Ok
        let _ = (&mut waiter.rx).await;
        waiter.woken = true;
    }

    /// Return a permit, waking the longest-parked waiter if any
    pub fn signal(&self) {
        let mut state = self.lock();
        state.permits += 1;
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(()).is_ok() {
                return;
            }
            // abandoned wait: undo its decrement and try the next one
            state.permits += 1;
        }
    }

    /// [`wait`](Self::wait), returning a guard that signals on drop
    pub async fn acquire(&self) -> GatePermit<'_> {
        self.wait().await;
        GatePermit { gate: self }
    }

    /// Owned variant of [`acquire`](Self::acquire) for `'static` tasks
    pub async fn acquire_owned(self: Arc<Self>) -> OwnedGatePermit {
        self.wait().await;
        OwnedGatePermit { gate: self }
    }

    /// Current counter; negative values count parked waiters
    pub fn available(&self) -> i64 {
        self.lock().permits
    }

    /// Parked waiters, including abandoned ones not yet skipped
    pub fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }
}

struct Waiter<'a> {
    gate: &'a CountingGate,
    rx: oneshot::Receiver<()>,
    woken: bool,
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if self.woken {
            return;
        }
        self.rx.close();
        // woken but dropped before observing it: pass the permit on
        if self.rx.try_recv().is_ok() {
            self.gate.signal();
        }
    }
}

/// Permit held until dropped
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a CountingGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.signal();
    }
}

#[derive(Debug)]
pub struct OwnedGatePermit {
    gate: Arc<CountingGate>,
}

impl Drop for OwnedGatePermit {
    fn drop(&mut self) {
        self.gate.signal();
    }
}
