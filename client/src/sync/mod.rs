//! Concurrency primitives for one logical channel
//!
//! [`SerialQueue`] keeps request/response exchanges on a channel from
//! interleaving; [`CountingGate`] caps how many channels hit the network
//! at once.

mod gate;
mod queue;

pub use gate::{CountingGate, GatePermit, OwnedGatePermit};
pub use queue::{Completion, SerialQueue};
