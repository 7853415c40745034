//! smbcore client: serialized and gated file I/O over a share

pub mod config;
pub mod error;
pub mod sync;
pub mod transfer;

pub use error::{ClientError, Result};
pub use sync::{Completion, CountingGate, SerialQueue};
pub use transfer::{ChunkedReader, FileHandle, FileSource, LocalFileSource};
