//! Chunked reads over one channel

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{FileHandle, FileSource};
use crate::error::{ClientError, Result};
use crate::sync::{Completion, CountingGate, SerialQueue};

/// Chunk requests queued ahead of the one being collected
pub const DEFAULT_READ_AHEAD: usize = 4;

/// Lazy `(offset, len)` split of a byte range into requests of at most
/// `max_chunk` bytes
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    position: u64,
    end: u64,
    max_chunk: u64,
}

impl Iterator for ChunkPlan {
    type Item = (u64, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.end {
            return None;
        }
        let len = (self.end - self.position).min(self.max_chunk);
        let chunk = (self.position, len as usize);
        self.position += len;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.end - self.position).div_ceil(self.max_chunk);
        match usize::try_from(left) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

/// Split `length` bytes at `offset` into chunks of at most `max_chunk` bytes
pub fn plan_chunks(offset: u64, length: u64, max_chunk: usize) -> ChunkPlan {
    ChunkPlan {
        position: offset,
        end: offset.saturating_add(length),
        max_chunk: max_chunk.max(1) as u64,
    }
}

/// Per-channel reader
///
/// Every operation goes through the channel's own [`SerialQueue`], so
/// request/response pairs never interleave. An optional shared
/// [`CountingGate`] limits how many channels are reading at the same time.
pub struct ChunkedReader<S: FileSource> {
    source: Arc<S>,
    queue: SerialQueue,
    gate: Option<Arc<CountingGate>>,
    max_read_size: usize,
    read_ahead: usize,
}

impl<S: FileSource> ChunkedReader<S> {
    /// Must be called inside a tokio runtime (spawns the queue worker)
    pub fn new(name: impl Into<String>, source: Arc<S>, max_read_size: usize) -> Self {
        Self {
            source,
            queue: SerialQueue::new(name),
            gate: None,
            max_read_size: max_read_size.max(1),
            read_ahead: DEFAULT_READ_AHEAD,
        }
    }

    /// Share a gate with other channels
    pub fn with_gate(mut self, gate: Arc<CountingGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Cap on chunk requests queued per read (at least one)
    pub fn with_read_ahead(mut self, read_ahead: usize) -> Self {
        self.read_ahead = read_ahead.max(1);
        self
    }

    pub fn max_read_size(&self) -> usize {
        self.max_read_size
    }

    pub fn queue(&self) -> &SerialQueue {
        &self.queue
    }

    fn enqueue<T, F, Fut>(&self, op: F) -> Result<Completion<Result<T>>>
    where
        T: Send + 'static,
        F: FnOnce(Arc<S>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let gate = self.gate.clone();
        let work = op(self.source.clone());
        self.queue.submit(async move {
            let _permit = match gate {
                Some(gate) => Some(gate.acquire_owned().await),
                None => None,
            };
            work.await
        })
    }

    pub async fn open(&self, path: &str) -> Result<FileHandle> {
        let path = path.to_string();
        self.enqueue(|source| async move { source.open(&path).await })?
            .await?
    }

    pub async fn size(&self, handle: FileHandle) -> Result<u64> {
        self.enqueue(move |source| async move { source.size(handle).await })?
            .await?
    }

    pub async fn close_file(&self, handle: FileHandle) -> Result<()> {
        self.enqueue(move |source| async move { source.close(handle).await })?
            .await?
    }

    /// Read `length` bytes at `offset`, stopping early at end of file
    ///
    /// The range is clamped to the current file size before any chunk is
    /// queued.
    pub async fn read_range(&self, handle: FileHandle, offset: u64, length: u64) -> Result<Vec<u8>> {
        let size = self.size(handle).await?;
        let end = offset.saturating_add(length).min(size);
        self.read_span(handle, offset, end).await
    }

    /// Read a whole file; a file that shrinks mid-read is a [`ClientError::ShortRead`]
    pub async fn read_all(&self, handle: FileHandle) -> Result<Vec<u8>> {
        let size = self.size(handle).await?;
        let data = self.read_span(handle, 0, size).await?;

        if (data.len() as u64) < size {
            return Err(ClientError::ShortRead {
                offset: data.len() as u64,
                expected: size,
                actual: data.len() as u64,
            });
        }

        info!(queue = self.queue.name(), %handle, bytes = data.len(), "read complete");
        Ok(data)
    }

    /// Read `offset..end`, keeping at most `read_ahead` chunks queued
    ///
    /// Stops queueing after a short chunk or the first error; chunks already
    /// queued are still collected before returning.
    async fn read_span(&self, handle: FileHandle, offset: u64, end: u64) -> Result<Vec<u8>> {
        let span = end.saturating_sub(offset);
        let mut chunks = plan_chunks(offset, span, self.max_read_size);
        debug!(
            queue = self.queue.name(),
            %handle,
            offset,
            length = span,
            chunks = chunks.size_hint().0,
            "queueing chunked read"
        );

        // the reported size is not trusted for the up-front allocation
        let window = self.max_read_size.saturating_mul(self.read_ahead);
        let mut data = Vec::with_capacity(usize::try_from(span).map_or(window, |n| n.min(window)));
        let mut in_flight = VecDeque::with_capacity(self.read_ahead);
        let mut first_error: Option<ClientError> = None;
        let mut done = false;
        let mut eof = false;

        loop {
            while !done && in_flight.len() < self.read_ahead {
                let Some((chunk_offset, chunk_len)) = chunks.next() else {
                    done = true;
                    break;
                };
                match self.enqueue(move |source| async move {
                    source.read(handle, chunk_offset, chunk_len).await
                }) {
                    Ok(completion) => in_flight.push_back((chunk_len, completion)),
                    Err(e) => {
                        first_error = Some(e);
                        done = true;
                    }
                }
            }

            let Some((expected, completion)) = in_flight.pop_front() else {
                break;
            };
            match completion.await.and_then(|result| result) {
                Ok(chunk) => {
                    if first_error.is_none() && !eof {
                        data.extend_from_slice(&chunk);
                        if chunk.len() < expected {
                            eof = true;
                            done = true;
                        }
                    }
                }
                Err(e) => {
                    done = true;
                    if first_error.is_some() {
                        warn!(queue = self.queue.name(), %handle, "chunk read failed: {}", e);
                    } else {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(data),
        }
    }

    /// Close the channel; queued reads still finish, new ones fail
    pub fn close(&self) {
        self.queue.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory source that records overlapping reads
    #[derive(Default)]
    struct MemorySource {
        files: HashMap<String, Vec<u8>>,
        handles: Mutex<HashMap<u64, String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        reads: Mutex<Vec<(u64, usize)>>,
        fail_at: Option<u64>,
        /// Size to report instead of the real length
        claimed_size: Option<u64>,
    }

    impl MemorySource {
        fn with_file(path: &str, data: Vec<u8>) -> Self {
            let mut source = Self::default();
            source.files.insert(path.to_string(), data);
            source
        }

        fn contents(&self, handle: FileHandle) -> Result<Vec<u8>> {
            let handles = self.handles.lock().unwrap();
            let path = handles.get(&handle.0).ok_or(ClientError::InvalidHandle(handle.0))?;
            Ok(self.files[path].clone())
        }
    }

    impl FileSource for MemorySource {
        async fn open(&self, path: &str) -> Result<FileHandle> {
            if !self.files.contains_key(path) {
                return Err(ClientError::PathOutsideShare(path.to_string()));
            }
            let mut handles = self.handles.lock().unwrap();
            let handle = handles.len() as u64 + 1;
            handles.insert(handle, path.to_string());
            Ok(FileHandle(handle))
        }

        async fn size(&self, handle: FileHandle) -> Result<u64> {
            let actual = self.contents(handle)?.len() as u64;
            Ok(self.claimed_size.unwrap_or(actual))
        }

        async fn read(&self, handle: FileHandle, offset: u64, length: usize) -> Result<Vec<u8>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.reads.lock().unwrap().push((offset, length));
            if self.fail_at == Some(offset) {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                return Err(ClientError::Io(std::io::Error::other("media error")));
            }

            let delay = (offset % 3) + 1;
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let contents = self.contents(handle);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let contents = contents?;
            let start = (offset as usize).min(contents.len());
            let end = (start + length).min(contents.len());
            Ok(contents[start..end].to_vec())
        }

        async fn close(&self, handle: FileHandle) -> Result<()> {
            self.handles
                .lock()
                .unwrap()
                .remove(&handle.0)
                .map(|_| ())
                .ok_or(ClientError::InvalidHandle(handle.0))
        }
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_plan_chunks() {
        let plan = |offset, length, max| plan_chunks(offset, length, max).collect::<Vec<_>>();
        assert_eq!(plan(0, 10, 4), vec![(0, 4), (4, 4), (8, 2)]);
        assert_eq!(plan(5, 4, 4), vec![(5, 4)]);
        assert!(plan(7, 0, 4).is_empty());
        // zero chunk size is clamped
        assert_eq!(plan(0, 2, 0), vec![(0, 1), (1, 1)]);
        assert_eq!(plan_chunks(0, 10, 4).size_hint(), (3, Some(3)));
    }

    #[test]
    fn test_plan_chunks_is_lazy_for_huge_ranges() {
        let mut chunks = plan_chunks(0, u64::MAX, 65536);
        assert_eq!(chunks.next(), Some((0, 65536)));
        assert_eq!(chunks.next(), Some((65536, 65536)));

        let tail: Vec<_> = plan_chunks(u64::MAX - 3, u64::MAX, 2).collect();
        assert_eq!(tail, vec![(u64::MAX - 3, 2), (u64::MAX - 1, 1)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_read_all_in_chunks() {
        let data = sample(1000);
        let source = Arc::new(MemorySource::with_file("a.bin", data.clone()));
        let reader = ChunkedReader::new("chan-1", source.clone(), 64);

        let handle = reader.open("a.bin").await.unwrap();
        assert_eq!(reader.read_all(handle).await.unwrap(), data);
        reader.close_file(handle).await.unwrap();

        // 1000 / 64 rounded up, issued in offset order, never overlapping
        let reads = source.reads.lock().unwrap().clone();
        assert_eq!(reads.len(), 16);
        assert!(reads.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(source.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_read_range_past_eof() {
        let data = sample(100);
        let source = Arc::new(MemorySource::with_file("a.bin", data.clone()));
        let reader = ChunkedReader::new("chan-eof", source, 30);

        let handle = reader.open("a.bin").await.unwrap();
        let tail = reader.read_range(handle, 80, 500).await.unwrap();
        assert_eq!(tail, data[80..]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_channel() {
        let data = sample(4096);
        let source = Arc::new(MemorySource::with_file("a.bin", data.clone()));
        let reader = Arc::new(ChunkedReader::new("shared", source.clone(), 100));
        let handle = reader.open("a.bin").await.unwrap();

        let tasks: Vec<_> = (0..4u64)
            .map(|i| {
                let reader = reader.clone();
                tokio::spawn(async move { reader.read_range(handle, i * 1024, 1024).await })
            })
            .collect();

        for (i, task) in tasks.into_iter().enumerate() {
            let part = task.await.unwrap().unwrap();
            assert_eq!(part, data[i * 1024..(i + 1) * 1024]);
        }
        assert_eq!(source.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_gate_bounds_parallel_channels() {
        let data = sample(2048);
        let source = Arc::new(MemorySource::with_file("a.bin", data.clone()));
        let gate = Arc::new(CountingGate::new(2));

        let readers: Vec<_> = (0..4)
            .map(|i| {
                Arc::new(
                    ChunkedReader::new(format!("chan-{}", i), source.clone(), 128)
                        .with_gate(gate.clone()),
                )
            })
            .collect();

        let tasks: Vec<_> = readers
            .iter()
            .cloned()
            .map(|reader| {
                tokio::spawn(async move {
                    let handle = reader.open("a.bin").await.unwrap();
                    reader.read_all(handle).await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), data);
        }
        assert!(source.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(gate.available(), 2);
    }

    #[tokio::test]
    async fn test_oversized_range_is_clamped_to_file() {
        let data = sample(300);
        let source = Arc::new(MemorySource::with_file("a.bin", data.clone()));
        let reader = ChunkedReader::new("huge", source.clone(), 128);
        let handle = reader.open("a.bin").await.unwrap();

        assert_eq!(reader.read_range(handle, 0, u64::MAX).await.unwrap(), data);
        assert_eq!(reader.read_range(handle, 250, u64::MAX).await.unwrap(), data[250..]);
        assert!(reader.read_range(handle, 1000, u64::MAX).await.unwrap().is_empty());

        // only the chunks that cover the file were ever requested
        assert_eq!(source.reads.lock().unwrap().len(), 3 + 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_read_ahead_bounds_queued_chunks() {
        let data = sample(4000);
        let source = Arc::new(MemorySource::with_file("a.bin", data.clone()));
        let reader = Arc::new(ChunkedReader::new("window", source, 50).with_read_ahead(2));
        let handle = reader.open("a.bin").await.unwrap();

        let task = {
            let reader = reader.clone();
            tokio::spawn(async move { reader.read_all(handle).await })
        };

        let mut peak_pending = 0;
        while !task.is_finished() {
            peak_pending = peak_pending.max(reader.queue().pending());
            tokio::task::yield_now().await;
        }
        assert_eq!(task.await.unwrap().unwrap(), data);
        // window of two, plus a finished item the worker has not retired yet
        assert!(peak_pending <= 3, "peak pending {}", peak_pending);
    }

    #[tokio::test]
    async fn test_chunk_error_collects_queued_chunks_first() {
        let mut source = MemorySource::with_file("a.bin", sample(1000));
        source.fail_at = Some(100);
        let source = Arc::new(source);
        let reader = ChunkedReader::new("failing", source.clone(), 50).with_read_ahead(3);
        let handle = reader.open("a.bin").await.unwrap();

        assert!(matches!(
            reader.read_all(handle).await,
            Err(ClientError::Io(_))
        ));

        // chunks 0, 50 and 100 ran; 150 and 200 were already queued and were awaited
        let reads_after_error = source.reads.lock().unwrap().len();
        assert_eq!(reads_after_error, 5);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(source.reads.lock().unwrap().len(), reads_after_error);
        assert!(reader.queue().is_idle());
    }

    #[tokio::test]
    async fn test_file_shorter_than_its_size_is_short_read() {
        let mut source = MemorySource::with_file("a.bin", sample(100));
        source.claimed_size = Some(5_000_000_000);
        let reader = ChunkedReader::new("shrunk", Arc::new(source), 64);
        let handle = reader.open("a.bin").await.unwrap();

        match reader.read_all(handle).await {
            Err(ClientError::ShortRead {
                offset,
                expected,
                actual,
            }) => {
                assert_eq!(offset, 100);
                assert_eq!(expected, 5_000_000_000);
                assert_eq!(actual, 100);
            }
            other => panic!("expected short read, got {:?}", other.map(|d| d.len())),
        }
    }

    #[tokio::test]
    async fn test_closed_channel_rejects_reads() {
        let source = Arc::new(MemorySource::with_file("a.bin", sample(10)));
        let reader = ChunkedReader::new("closing", source, 4);
        let handle = reader.open("a.bin").await.unwrap();

        reader.close();
        assert!(matches!(
            reader.read_range(handle, 0, 10).await,
            Err(ClientError::QueueClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_source_errors_reach_caller() {
        let source = Arc::new(MemorySource::with_file("a.bin", sample(10)));
        let reader = ChunkedReader::new("errors", source, 4);

        assert!(matches!(
            reader.open("missing.bin").await,
            Err(ClientError::PathOutsideShare(_))
        ));
        assert!(matches!(
            reader.read_range(FileHandle(99), 0, 8).await,
            Err(ClientError::InvalidHandle(99))
        ));
        // channel still usable afterwards
        let handle = reader.open("a.bin").await.unwrap();
        assert_eq!(reader.size(handle).await.unwrap(), 10);
    }
}
