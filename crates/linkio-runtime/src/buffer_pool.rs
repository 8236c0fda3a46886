//! Tiered receive buffer pool
//!
//! One slot per tier. Slots are allocated lazily in tier order and read
//! into with a single readv. After a read of `n` bytes the leading slots
//! covering `n` are capped and moved out as the in-flight packet; the rest
//! stay allocated for the next read.
//!
//! Slot states:
//! - `None`: unallocated (storage handed out with the last packet)
//! - `Some(view)`: allocated and owned by the pool, ready for a read
//! - moved into `packet`: in flight until `release()` or `restore()`
//!
//! Because packets always consume a prefix, unallocated slots always form
//! a prefix of the slot array and `allocate()` can stop at the first
//! allocated one.

use crate::rawfile;
use linkio_core::error::LinkResult;
use linkio_core::tier::TierConfig;
use linkio_core::view::{VectorisedView, View};
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Per-endpoint receive buffers plus the matching iovec table
pub struct BufferPool {
    tiers: TierConfig,
    slots: Vec<Option<View>>,
    iovecs: Vec<libc::iovec>,
    packet: VectorisedView,
}

impl BufferPool {
    /// Empty pool; nothing is allocated until the first `fill`
    pub fn new(tiers: TierConfig) -> Self {
        let n = tiers.len();
        BufferPool {
            tiers,
            slots: (0..n).map(|_| None).collect(),
            iovecs: Vec::with_capacity(n),
            packet: VectorisedView::with_capacity(n),
        }
    }

    #[inline]
    pub fn tiers(&self) -> &TierConfig {
        &self.tiers
    }

    /// Allocate unallocated slots in tier order, stopping at the first
    /// slot that is already allocated. Returns the number allocated.
    pub fn allocate(&mut self) -> usize {
        let mut allocated = 0;
        for (slot, &size) in self.slots.iter_mut().zip(self.tiers.sizes()) {
            if slot.is_some() {
                break;
            }
            *slot = Some(View::new(size));
            allocated += 1;
        }
        allocated
    }

    /// Rebuild the iovec table from the slots
    ///
    /// Each iovec covers the full storage of its slot, independent of any
    /// window left over from an earlier packet.
    pub fn refresh_iovecs(&mut self) {
        self.iovecs.clear();
        for view in self.slots.iter_mut().map_while(Option::as_mut) {
            let storage = view.storage_mut();
            self.iovecs.push(libc::iovec {
                iov_base: storage.as_mut_ptr() as *mut libc::c_void,
                iov_len: storage.len(),
            });
        }
    }

    /// Read one frame from `fd` into the slots
    ///
    /// Returns the frame length (0: peer closed). Slots are not capped
    /// here; on error they are left exactly as they were.
    pub fn fill(&mut self, fd: RawFd, poll_timeout: Option<Duration>) -> LinkResult<usize> {
        debug_assert!(self.packet.views().is_empty(), "fill with a packet in flight");

        self.allocate();
        self.refresh_iovecs();

        // Safety: every iovec points into a boxed slot buffer owned by
        // `self`, which is mutably borrowed for the whole call.
        unsafe { rawfile::blocking_readv(fd, &self.iovecs, poll_timeout) }
    }

    /// Cap the slots to cover exactly `n` bytes; returns how many leading
    /// slots are used
    ///
    /// Every used slot but the last is fully live; the last is capped so
    /// the live lengths sum to `n`. Later slots are not touched.
    pub fn cap_views(&mut self, n: usize) -> usize {
        let mut covered = 0;
        for (i, (slot, &size)) in self.slots.iter_mut().zip(self.tiers.sizes()).enumerate() {
            covered += size;
            if let Some(view) = slot.as_mut() {
                view.reset();
                if covered >= n {
                    view.cap_length(size - (covered - n));
                }
            }
            if covered >= n {
                return i + 1;
            }
        }
        self.slots.len()
    }

    /// Move the slots covering an `n`-byte frame out as the in-flight packet
    pub fn take(&mut self, n: usize) -> &VectorisedView {
        let used = self.cap_views(n);
        self.packet
            .set_views(self.slots[..used].iter_mut().filter_map(Option::take));
        &self.packet
    }

    /// The in-flight packet, empty if none
    #[inline]
    pub fn packet(&self) -> &VectorisedView {
        &self.packet
    }

    /// Drop the in-flight packet's storage; its slots become unallocated
    pub fn release(&mut self) -> usize {
        let used = self.packet.views().len();
        self.packet.clear();
        used
    }

    /// Return the in-flight packet's storage to its slots, uncapped
    ///
    /// Used when a frame is discarded without delivery: nothing else saw
    /// the buffers, so they can be read into again as they are.
    pub fn restore(&mut self) {
        let mut i = 0;
        while let Some(mut view) = self.packet.remove_first() {
            view.reset();
            self.slots[i] = Some(view);
            i += 1;
        }
    }

    #[inline]
    pub fn is_allocated(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(Some(_)))
    }

    /// Live length of an allocated slot
    pub fn slot_len(&self, slot: usize) -> Option<usize> {
        self.slots.get(slot)?.as_ref().map(View::len)
    }

    pub fn allocated_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    #[cfg(test)]
    fn slot_ptr(&mut self, slot: usize) -> Option<*const u8> {
        self.slots
            .get_mut(slot)?
            .as_mut()
            .map(|v| v.storage_mut().as_ptr() as *const u8)
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("tiers", &self.tiers.len())
            .field("allocated", &self.allocated_count())
            .field("in_flight", &self.packet.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rawfile::{non_blocking_write, set_nonblocking};
    use crate::testutil::{ipv4_frame, seqpacket_pair};
    use std::os::unix::io::AsRawFd;

    fn full_pool() -> BufferPool {
        let mut pool = BufferPool::new(TierConfig::default());
        assert_eq!(pool.allocate(), 10);
        pool
    }

    #[test]
    fn test_allocate_is_lazy_and_prefix_only() {
        let mut pool = BufferPool::new(TierConfig::new(vec![4, 8, 16]).unwrap());
        assert_eq!(pool.allocated_count(), 0);
        assert_eq!(pool.allocate(), 3);
        assert_eq!(pool.allocate(), 0);

        pool.take(6);
        pool.release();
        assert!(!pool.is_allocated(0));
        assert!(!pool.is_allocated(1));
        assert!(pool.is_allocated(2));

        assert_eq!(pool.allocate(), 2);
        assert_eq!(pool.allocated_count(), 3);
    }

    #[test]
    fn test_cap_views_sums_to_n() {
        let tiers = TierConfig::default();
        let sizes = tiers.sizes().to_vec();
        let boundaries: Vec<usize> = sizes
            .iter()
            .scan(0, |acc, s| {
                *acc += s;
                Some(*acc)
            })
            .collect();

        let mut lengths = vec![1, 127, 128, 129, 500, 1500, 9000, 65535, 65664];
        for b in &boundaries {
            lengths.extend([b - 1, *b, b + 1]);
        }
        lengths.retain(|&n| n >= 1 && n <= tiers.total_capacity());

        for n in lengths {
            let mut pool = full_pool();
            let used = pool.cap_views(n);

            let expected = boundaries.iter().position(|&b| b >= n).unwrap() + 1;
            assert_eq!(used, expected, "n = {}", n);

            let sum: usize = (0..used).map(|i| pool.slot_len(i).unwrap()).sum();
            assert_eq!(sum, n, "n = {}", n);
            for i in 0..used - 1 {
                assert_eq!(pool.slot_len(i), Some(sizes[i]));
            }
            for i in used..sizes.len() {
                assert_eq!(pool.slot_len(i), Some(sizes[i]), "untouched tier {}", i);
            }
        }
    }

    #[test]
    fn test_take_moves_exactly_used_prefix() {
        let mut pool = full_pool();
        let vv = pool.take(300);
        assert_eq!(vv.size(), 300);
        assert_eq!(vv.views().len(), 2);
        assert_eq!(vv.views()[1].len(), 300 - 128);

        assert!(!pool.is_allocated(0));
        assert!(!pool.is_allocated(1));
        assert!(pool.is_allocated(2));
        assert_eq!(pool.release(), 2);
        assert!(pool.packet().is_empty());

        // 128 + 256 + 256 covers 500
        pool.allocate();
        let vv = pool.take(500);
        assert_eq!(vv.views().len(), 3);
        assert_eq!(vv.views()[2].len(), 500 - 128 - 256);
        assert!(!pool.is_allocated(2));
        assert!(pool.is_allocated(3));
        assert_eq!(pool.release(), 3);
    }

    #[test]
    fn test_release_reallocates_only_used() {
        let mut pool = full_pool();
        let untouched = pool.slot_ptr(5).unwrap();

        pool.take(1000);
        assert_eq!(pool.release(), 4);
        assert_eq!(pool.allocate(), 4);

        assert_eq!(pool.slot_ptr(5), Some(untouched));
    }

    #[test]
    fn test_restore_reuses_storage_uncapped() {
        let mut pool = full_pool();
        let first = pool.slot_ptr(0).unwrap();

        pool.take(200);
        pool.restore();
        assert!(pool.packet().is_empty());
        assert_eq!(pool.allocate(), 0);
        assert_eq!(pool.slot_ptr(0), Some(first));
        assert_eq!(pool.slot_len(1), Some(256));
    }

    #[test]
    fn test_fill_spans_tiers() {
        let (a, b) = seqpacket_pair();
        set_nonblocking(b.as_raw_fd()).unwrap();

        let frame = ipv4_frame(1000, 0xab);
        non_blocking_write(a.as_raw_fd(), &frame).unwrap();

        let mut pool = BufferPool::new(TierConfig::default());
        let n = pool.fill(b.as_raw_fd(), Some(Duration::from_millis(50))).unwrap();
        assert_eq!(n, 1000);

        let vv = pool.take(n);
        assert_eq!(vv.views().len(), 4);
        assert_eq!(vv.to_vec(), frame);
    }

    #[test]
    fn test_fill_error_leaves_slots_uncapped() {
        let mut pool = BufferPool::new(TierConfig::new(vec![8, 16]).unwrap());
        assert!(pool.fill(-1, Some(Duration::from_millis(1))).is_err());
        assert_eq!(pool.slot_len(0), Some(8));
        assert_eq!(pool.slot_len(1), Some(16));
        assert!(pool.packet().is_empty());
    }
}
