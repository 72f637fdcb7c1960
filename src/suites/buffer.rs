//! Buffer suite: non-relocatable scratch blocks.

use super::arena::{Arena, Token};
use super::{SuiteResult, SuiteStatus};
use crate::observability;

#[derive(Debug)]
struct BufferBlock {
    data: Vec<u8>,
    locks: u32,
}

/// Owner of every buffer allocated through the suite.
#[derive(Debug)]
pub struct BufferSuite {
    buffers: Arena<BufferBlock>,
    max_space: u64,
}

impl BufferSuite {
    /// Create a suite whose reported space never exceeds `max_space`.
    pub fn new(max_space: u64) -> Self {
        Self {
            buffers: Arena::new(),
            max_space,
        }
    }

    /// Allocate a zero-filled buffer.
    pub fn allocate(&mut self, size: usize) -> SuiteResult<Token> {
        tracing::trace!(size, "allocate buffer");
        let mut data = Vec::new();
        if data.try_reserve_exact(size).is_err() {
            observability::record_suite_allocation_failure("buffer");
            return Err(SuiteStatus::OutOfMemory);
        }
        data.resize(size, 0);
        self.buffers.insert(BufferBlock { data, locks: 0 })
    }

    /// Lock a buffer and return its address.
    pub fn lock(&mut self, token: Token) -> SuiteResult<*mut u8> {
        let block = self.buffers.get_mut(token).ok_or(SuiteStatus::BadParameter)?;
        block.locks += 1;
        Ok(block.data.as_mut_ptr())
    }

    /// Undo one lock.
    pub fn unlock(&mut self, token: Token) {
        if let Some(block) = self.buffers.get_mut(token) {
            block.locks = block.locks.saturating_sub(1);
        }
    }

    /// Free a buffer.
    pub fn free(&mut self, token: Token) -> SuiteResult<()> {
        tracing::trace!(index = token.index(), "free buffer");
        self.buffers
            .remove(token)
            .map(|_| ())
            .ok_or(SuiteStatus::BadParameter)
    }

    /// Size of a live buffer.
    pub fn size(&self, token: Token) -> Option<usize> {
        self.buffers.get(token).map(|b| b.data.len())
    }

    /// Space available to plugins: free system memory, capped at the
    /// configured ceiling.
    pub fn space(&self) -> u64 {
        available_memory().map_or(self.max_space, |free| free.min(self.max_space))
    }

    /// Number of live buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether no buffer is live.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn available_memory() -> Option<u64> {
    let info = rustix::system::sysinfo();
    Some(info.freeram as u64 * u64::from(info.mem_unit))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn available_memory() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_lock_free() {
        let mut suite = BufferSuite::new(1 << 20);
        let t = suite.allocate(16).unwrap();
        let ptr = suite.lock(t).unwrap();
        assert!(!ptr.is_null());
        assert_eq!(suite.size(t), Some(16));
        suite.unlock(t);
        suite.free(t).unwrap();
        assert_eq!(suite.free(t), Err(SuiteStatus::BadParameter));
        assert!(suite.is_empty());
    }

    #[test]
    fn test_space_is_capped() {
        let suite = BufferSuite::new(4096);
        assert!(suite.space() <= 4096);
    }
}
