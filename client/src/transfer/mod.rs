//! File transfer over a logical channel
//!
//! [`FileSource`] is the remote-file capability the session layer provides
//! (open, size, read, close). [`ChunkedReader`] turns large reads into a
//! sequence of bounded chunk requests that run one at a time on the
//! channel's [`SerialQueue`](crate::sync::SerialQueue).

mod local;
mod reader;

use std::fmt;
use std::future::Future;

use crate::error::Result;

pub use local::LocalFileSource;
pub use reader::{ChunkPlan, ChunkedReader, DEFAULT_READ_AHEAD, plan_chunks};

/// Opaque handle to an open file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(pub u64);

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Random-access read capability over a share
pub trait FileSource: Send + Sync + 'static {
    fn open(&self, path: &str) -> impl Future<Output = Result<FileHandle>> + Send;

    fn size(&self, handle: FileHandle) -> impl Future<Output = Result<u64>> + Send;

    /// Up to `length` bytes at `offset`; fewer only at end of file
    fn read(
        &self,
        handle: FileHandle,
        offset: u64,
        length: usize,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;

    fn close(&self, handle: FileHandle) -> impl Future<Output = Result<()>> + Send;
}
