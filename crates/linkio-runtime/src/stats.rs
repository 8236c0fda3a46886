//! Per-endpoint packet counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of an endpoint's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointStats {
    /// Frames delivered to the dispatcher
    pub rx_packets: u64,
    /// Bytes in delivered frames
    pub rx_bytes: u64,
    /// Frames read but discarded (unrecognized version nibble)
    pub rx_discarded: u64,
    /// Frames written to the descriptor
    pub tx_packets: u64,
    /// Frames dropped because the descriptor was not writable
    pub tx_dropped: u64,
}

/// Live counters, updated with relaxed atomics
#[derive(Debug, Default)]
pub(crate) struct Counters {
    rx_packets: AtomicU64,
    rx_bytes: AtomicU64,
    rx_discarded: AtomicU64,
    tx_packets: AtomicU64,
    tx_dropped: AtomicU64,
}

impl Counters {
    #[inline]
    pub fn record_rx(&self, bytes: usize) {
        self.rx_packets.fetch_add(1, Ordering::Relaxed);
        self.rx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_discard(&self) {
        self.rx_discarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_tx(&self) {
        self.tx_packets.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_tx_drop(&self) {
        self.tx_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EndpointStats {
        EndpointStats {
            rx_packets: self.rx_packets.load(Ordering::Relaxed),
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            rx_discarded: self.rx_discarded.load(Ordering::Relaxed),
            tx_packets: self.tx_packets.load(Ordering::Relaxed),
            tx_dropped: self.tx_dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let c = Counters::default();
        c.record_rx(100);
        c.record_rx(20);
        c.record_discard();
        c.record_tx();
        c.record_tx_drop();

        assert_eq!(
            c.snapshot(),
            EndpointStats {
                rx_packets: 2,
                rx_bytes: 120,
                rx_discarded: 1,
                tx_packets: 1,
                tx_dropped: 1,
            }
        );
    }
}
