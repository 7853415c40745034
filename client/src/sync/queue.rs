//! Single-flight serial queue
//!
//! One worker task per queue pulls boxed futures off an unbounded channel
//! and runs them to completion one at a time. Submission never waits; each
//! caller gets a [`Completion`] that resolves with its own item's output.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// FIFO executor that never runs two items at once
pub struct SerialQueue {
    name: Arc<str>,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    /// Queued plus running items
    pending: Arc<AtomicUsize>,
}

impl SerialQueue {
    /// Create a queue and spawn its worker on the current tokio runtime
    pub fn new(name: impl Into<String>) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let (sender, receiver) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));

        tokio::spawn(run_worker(name.clone(), receiver, pending.clone()));
        debug!(queue = %name, "serial queue started");

        Self {
            name,
            sender: Mutex::new(Some(sender)),
            pending,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue `work` behind everything already submitted
    ///
    /// Returns immediately. The item's output (including an `Err` it
    /// returns) goes only to the returned [`Completion`].
    pub fn submit<F, T>(&self, work: F) -> Result<Completion<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return Err(ClientError::QueueClosed(self.name.to_string()));
        };

        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let output = work.await;
            // submitter may have stopped listening
            let _ = tx.send(output);
        });

        self.pending.fetch_add(1, Ordering::AcqRel);
        if sender.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(ClientError::QueueClosed(self.name.to_string()));
        }

        Ok(Completion { rx })
    }

    /// Submit and wait for the result
    pub async fn run<F, T>(&self, work: F) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(work)?.await
    }

    /// Reject further submissions; already queued items still run
    pub fn close(&self) {
        let previous = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            debug!(queue = %self.name, pending = self.pending(), "serial queue closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Items queued or running
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("name", &self.name)
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn run_worker(
    name: Arc<str>,
    mut receiver: mpsc::UnboundedReceiver<Job>,
    pending: Arc<AtomicUsize>,
) {
    while let Some(job) = receiver.recv().await {
        // Spawned so a panicking item only takes itself down
        if let Err(e) = tokio::spawn(job).await {
            warn!(queue = %name, "queued operation aborted: {}", e);
        }
        pending.fetch_sub(1, Ordering::AcqRel);
    }
    debug!(queue = %name, "serial queue drained");
}

/// Output of one submitted item
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Future for Completion<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| ClientError::ItemAborted))
    }
}
