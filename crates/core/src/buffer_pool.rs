// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! A fixed-size pool of reusable byte buffers.
//!
//! `BufferPool::allocate` hands out a `ProxyBuffer`: a move-only handle that
//! derefs to the underlying bytes and returns its slot to the pool's free
//! list when dropped. No buffer is ever double-freed or used after release,
//! because the only way to release one is to drop the handle that owns it.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, Weak};

struct PoolInner {
    buffers: Vec<Vec<u8>>,
    used: Vec<bool>,
}

/// A fixed pool of `pool_size` buffers, each `buffer_size` bytes.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<Mutex<PoolInner>>,
    buffer_size: usize,
    pool_size: usize,
}

impl BufferPool {
    #[must_use]
    pub fn new(pool_size: usize, buffer_size: usize) -> Self {
        let buffers = (0..pool_size).map(|_| vec![0u8; buffer_size]).collect();
        let used = vec![false; pool_size];
        Self { inner: Arc::new(Mutex::new(PoolInner { buffers, used })), buffer_size, pool_size }
    }

    /// Finds the first free slot and hands out a handle to it.
    ///
    /// First-fit over `pool_size` slots; returns `None` when every slot is in
    /// use. Callers must drop the chunk holding the data rather than block
    /// (§5 backpressure: pool exhaustion is a sanctioned lossy path).
    #[allow(clippy::missing_panics_doc)] // the lock is never held across a panic point
    pub fn allocate(&self) -> Option<ProxyBuffer> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let index = inner.used.iter().position(|used| !used)?;
        inner.used[index] = true;
        let data = std::mem::replace(&mut inner.buffers[index], Vec::new());
        Some(ProxyBuffer {
            pool: Some(Arc::downgrade(&self.inner)),
            index: Some(index),
            data,
        })
    }

    /// Number of currently free slots.
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn available(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.used.iter().filter(|used| !**used).count()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.pool_size
    }

    #[must_use]
    pub const fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

/// A move-only handle to one buffer leased from a `BufferPool`.
///
/// Returns its slot to the pool on drop. A `ProxyBuffer` built via
/// [`ProxyBuffer::empty`] is not backed by any pool and drops as a no-op;
/// it exists only to represent the zero-length payload of an
/// end-of-stream chunk.
pub struct ProxyBuffer {
    pool: Option<Weak<Mutex<PoolInner>>>,
    index: Option<usize>,
    data: Vec<u8>,
}

impl ProxyBuffer {
    #[must_use]
    pub const fn empty() -> Self {
        Self { pool: None, index: None, data: Vec::new() }
    }
}

impl Deref for ProxyBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl DerefMut for ProxyBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl Drop for ProxyBuffer {
    fn drop(&mut self) {
        let Some(index) = self.index.take() else { return };
        let Some(pool) = self.pool.take().and_then(|weak| weak.upgrade()) else { return };
        let mut inner = pool.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.buffers[index] = std::mem::take(&mut self.data);
        inner.used[index] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_returns_none_when_exhausted() {
        let pool = BufferPool::new(2, 8);
        let _a = pool.allocate().expect("slot 0");
        let _b = pool.allocate().expect("slot 1");
        assert!(pool.allocate().is_none());
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn drop_returns_slot_to_free_list() {
        let pool = BufferPool::new(1, 8);
        {
            let _buf = pool.allocate().expect("pool should have a free slot");
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn pool_conservation_holds_across_interleaved_allocations() {
        let pool = BufferPool::new(4, 8);
        let a = pool.allocate().expect("a");
        let b = pool.allocate().expect("b");
        assert_eq!(pool.available() + 2, pool.capacity());
        drop(a);
        assert_eq!(pool.available() + 1, pool.capacity());
        let c = pool.allocate().expect("c");
        assert_eq!(pool.available() + 2, pool.capacity());
        drop(b);
        drop(c);
        assert_eq!(pool.available(), pool.capacity());
    }

    #[test]
    fn empty_buffer_drop_is_a_no_op() {
        let buf = ProxyBuffer::empty();
        assert!(buf.is_empty());
        drop(buf);
    }
}
