//! The transport adapter contract (§4.6)
//!
//! The core depends on an abstract, synchronous, two-way byte channel keyed
//! by a 32-bit tag. Outbound delivery is this trait; inbound delivery is the
//! transport calling [`crate::tree::Context::on_receive`] whenever it has a
//! payload for us — the core never polls for inbound data (§5: the
//! transport's event pump is the only suspension point, and it lives outside
//! this crate).

use std::error::Error as StdError;

/// A pluggable outbound byte channel. Grounded on the same "swap the backing
/// store without touching the algorithm" shape as a block-storage trait, but
/// synchronous: core operations never block or await (§5).
pub trait Transport {
    /// Transport-specific failure (connection refused, bus error, etc).
    type Error: StdError + Send + Sync + 'static;

    /// Deliver `bytes`, tagged with `tag`, to all interested peers.
    fn transmit(&mut self, tag: u32, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// An in-memory loopback transport: bytes handed to [`Transport::transmit`]
/// are queued for the test to drain and feed into a peer's
/// [`crate::tree::Context::on_receive`]. Stands in for a real transport in
/// round-trip tests, the way an in-memory store stands in for a real one.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    outbox: std::collections::VecDeque<(u32, Vec<u8>)>,
}

impl MemoryTransport {
    /// A fresh transport with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest queued `(tag, bytes)` pair, if any.
    pub fn pop(&mut self) -> Option<(u32, Vec<u8>)> {
        self.outbox.pop_front()
    }

    /// Number of payloads currently queued.
    pub fn len(&self) -> usize {
        self.outbox.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.outbox.is_empty()
    }
}

/// [`MemoryTransport`] never fails to enqueue.
#[derive(Debug, thiserror::Error)]
#[error("unreachable: MemoryTransport::transmit never fails")]
pub struct Infallible(());

impl Transport for MemoryTransport {
    type Error = Infallible;

    fn transmit(&mut self, tag: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.outbox.push_back((tag, bytes.to_vec()));
        Ok(())
    }
}
