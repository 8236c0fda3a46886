//! Byte views and vectorised views
//!
//! A `View` is a heap buffer with a fixed capacity and a live window
//! `[start, end)` inside it. Reads land in the full capacity; capping and
//! trimming only move the window, never the bytes.
//!
//! A `VectorisedView` strings several views together into one logical
//! packet. Its size is the sum of the live windows, so a packet read into
//! a prefix of the receive tiers is described without copying.

use core::fmt;

/// Owned buffer with a live window
pub struct View {
    buf: Box<[u8]>,
    start: usize,
    end: usize,
}

impl View {
    /// Zeroed view of `size` bytes, fully live
    pub fn new(size: usize) -> Self {
        View {
            buf: vec![0u8; size].into_boxed_slice(),
            start: 0,
            end: size,
        }
    }

    /// Take ownership of `data`, fully live
    pub fn from_vec(data: Vec<u8>) -> Self {
        let end = data.len();
        View {
            buf: data.into_boxed_slice(),
            start: 0,
            end,
        }
    }

    /// Total bytes of backing storage
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Live bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Shrink the live window to at most `n` bytes
    #[inline]
    pub fn cap_length(&mut self, n: usize) {
        if n < self.len() {
            self.end = self.start + n;
        }
    }

    /// Drop up to `n` bytes from the front of the live window
    #[inline]
    pub fn trim_front(&mut self, n: usize) {
        self.start += n.min(self.len());
    }

    /// Make the whole backing storage live again
    #[inline]
    pub fn reset(&mut self) {
        self.start = 0;
        self.end = self.buf.len();
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf[self.start..self.end]
    }

    /// Whole backing storage, ignoring the window. Used as a read target.
    #[inline]
    pub fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

/// Copies only the live window
impl Clone for View {
    fn clone(&self) -> Self {
        View::from_vec(self.as_slice().to_vec())
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl AsRef<[u8]> for View {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for View {
    fn from(data: Vec<u8>) -> Self {
        View::from_vec(data)
    }
}

impl From<&[u8]> for View {
    fn from(data: &[u8]) -> Self {
        View::from_vec(data.to_vec())
    }
}

/// Logical packet spanning several views
///
/// Invariant: `size` equals the sum of the live lengths of `views`.
#[derive(Default)]
pub struct VectorisedView {
    views: Vec<View>,
    size: usize,
}

impl VectorisedView {
    /// Empty view with room for `n` segments
    pub fn with_capacity(n: usize) -> Self {
        VectorisedView {
            views: Vec::with_capacity(n),
            size: 0,
        }
    }

    /// Build from segments; the size is their summed live length
    pub fn new(views: Vec<View>) -> Self {
        let size = views.iter().map(View::len).sum();
        VectorisedView { views, size }
    }

    /// Single-segment view over `data`
    pub fn from_vec(data: Vec<u8>) -> Self {
        VectorisedView::new(vec![View::from_vec(data)])
    }

    /// Logical length in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Bytes of segment `i`, writable in place
    pub fn segment_mut(&mut self, i: usize) -> Option<&mut [u8]> {
        self.views.get_mut(i).map(View::as_mut_slice)
    }

    /// First segment, if any
    #[inline]
    pub fn first(&self) -> Option<&View> {
        self.views.first()
    }

    /// Remove and return the first segment
    pub fn remove_first(&mut self) -> Option<View> {
        if self.views.is_empty() {
            return None;
        }
        let v = self.views.remove(0);
        self.size -= v.len();
        Some(v)
    }

    /// Append a segment
    pub fn push(&mut self, view: View) {
        self.size += view.len();
        self.views.push(view);
    }

    /// Replace the segments wholesale; reuses the segment vector's storage
    pub fn set_views<I>(&mut self, views: I)
    where
        I: IntoIterator<Item = View>,
    {
        self.views.clear();
        self.views.extend(views);
        self.size = self.views.iter().map(View::len).sum();
    }

    /// Drop all segments, keeping the segment vector's allocation
    pub fn clear(&mut self) {
        self.views.clear();
        self.size = 0;
    }

    /// Drop `n` bytes from the front, removing emptied segments
    pub fn trim_front(&mut self, mut n: usize) {
        while n > 0 {
            let Some(first) = self.views.first_mut() else {
                break;
            };
            let take = n.min(first.len());
            first.trim_front(take);
            self.size -= take;
            n -= take;
            if first.is_empty() {
                self.views.remove(0);
            }
        }
    }

    /// Cap the logical length at `n` bytes, dropping trailing segments
    pub fn cap_length(&mut self, n: usize) {
        if n >= self.size {
            return;
        }
        let mut remaining = n;
        let mut keep = 0;
        for v in self.views.iter_mut() {
            if remaining == 0 {
                break;
            }
            v.cap_length(remaining);
            remaining -= v.len();
            keep += 1;
        }
        self.views.truncate(keep);
        self.size = n;
    }

    /// Non-empty live segments, in order
    pub fn segments(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.views.iter().map(View::as_slice).filter(|s| !s.is_empty())
    }

    /// Flatten into one contiguous buffer
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size);
        for s in self.segments() {
            out.extend_from_slice(s);
        }
        out
    }

    /// Flatten into a single owned `View`
    pub fn to_view(&self) -> View {
        View::from_vec(self.to_vec())
    }
}

/// Deep copy: the clone owns storage independent of the original
impl Clone for VectorisedView {
    fn clone(&self) -> Self {
        VectorisedView {
            views: self.views.clone(),
            size: self.size,
        }
    }
}

impl fmt::Debug for VectorisedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorisedView")
            .field("size", &self.size)
            .field("segments", &self.views.len())
            .finish()
    }
}
