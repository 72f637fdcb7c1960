//! Handle suite: relocatable-in-name-only memory blocks.
//!
//! A handle is the address of a master pointer that points at the block.
//! Blocks never move while live except when explicitly resized, so the
//! master pointer only changes inside [`HandleSuite::set_size`]. Lock and
//! unlock only maintain a balanced counter.
//!
//! Some legacy plugins build their own two-word "OTOF" handles (a data
//! pointer followed by the `OTOF` tag) in memory they allocated. Those are
//! recognised for read-only size and lock queries when a [`MemoryProbe`]
//! can size the blocks involved.

use std::collections::HashMap;

use super::arena::{Arena, Token};
use super::{SuiteResult, SuiteStatus};
use crate::engine::MemoryProbe;
use crate::observability;

/// Tag stored after the data pointer of a foreign two-word handle.
pub const OTOF_SIGNATURE: u32 = u32::from_le_bytes(*b"OTOF");

/// Size of a foreign two-word handle block.
pub const OTOF_HANDLE_SIZE: usize = std::mem::size_of::<usize>() + 4;

/// Native handle value: the address of a master pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

impl Handle {
    /// Wrap a native handle. Null is not a handle.
    pub fn from_raw(raw: *mut *mut u8) -> Option<Self> {
        (!raw.is_null()).then_some(Self(raw as usize))
    }

    /// Wrap an address. Zero is not a handle.
    pub fn from_addr(addr: usize) -> Option<Self> {
        (addr != 0).then_some(Self(addr))
    }

    /// Native handle value.
    pub fn as_raw(self) -> *mut *mut u8 {
        self.0 as *mut *mut u8
    }

    /// Address of the master pointer.
    pub fn addr(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct HandleBlock {
    master: Box<*mut u8>,
    data: Vec<u8>,
    locks: u32,
}

impl HandleBlock {
    fn sync_master(&mut self) {
        *self.master = self.data.as_mut_ptr();
    }
}

/// Data pointer and size of a foreign two-word handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignHandle {
    /// Start of the data block.
    pub data: *mut u8,
    /// Size of the data block.
    pub size: usize,
}

/// Recognise a foreign two-word handle.
///
/// Only memory the probe can size is ever read.
pub fn foreign_otof(addr: usize, probe: &dyn MemoryProbe) -> Option<ForeignHandle> {
    let block = addr as *const u8;
    if addr == 0 || probe.block_size(block)? != OTOF_HANDLE_SIZE {
        return None;
    }
    // SAFETY: The probe reported a live block of OTOF_HANDLE_SIZE bytes at
    // `addr`, so both words are readable.
    let (data, tag) = unsafe {
        (
            block.cast::<*mut u8>().read_unaligned(),
            block
                .add(std::mem::size_of::<usize>())
                .cast::<u32>()
                .read_unaligned(),
        )
    };
    if tag != OTOF_SIGNATURE || data.is_null() {
        return None;
    }
    let size = probe.block_size(data)?;
    Some(ForeignHandle { data, size })
}

/// Owner of every handle allocated through the suite.
#[derive(Debug, Default)]
pub struct HandleSuite {
    blocks: Arena<HandleBlock>,
    by_address: HashMap<usize, Token>,
}

impl HandleSuite {
    /// Create an empty suite.
    pub fn new() -> Self {
        Self::default()
    }

    fn token(&self, handle: Handle) -> Option<Token> {
        self.by_address.get(&handle.addr()).copied()
    }

    fn block(&self, handle: Handle) -> Option<&HandleBlock> {
        self.blocks.get(self.token(handle)?)
    }

    fn block_mut(&mut self, handle: Handle) -> Option<&mut HandleBlock> {
        let token = self.token(handle)?;
        self.blocks.get_mut(token)
    }

    /// Allocate a zero-filled handle.
    pub fn new_handle(&mut self, size: usize) -> SuiteResult<Handle> {
        tracing::trace!(size, "new handle");
        let mut data = Vec::new();
        if data.try_reserve_exact(size).is_err() {
            observability::record_suite_allocation_failure("handle");
            return Err(SuiteStatus::OutOfMemory);
        }
        data.resize(size, 0);
        self.insert(data)
    }

    /// Allocate a handle holding a copy of `bytes`.
    pub fn new_with(&mut self, bytes: &[u8]) -> SuiteResult<Handle> {
        let mut data = Vec::new();
        if data.try_reserve_exact(bytes.len()).is_err() {
            observability::record_suite_allocation_failure("handle");
            return Err(SuiteStatus::OutOfMemory);
        }
        data.extend_from_slice(bytes);
        self.insert(data)
    }

    fn insert(&mut self, data: Vec<u8>) -> SuiteResult<Handle> {
        self.by_address
            .try_reserve(1)
            .map_err(|_| SuiteStatus::OutOfMemory)?;
        let mut block = HandleBlock {
            master: Box::new(std::ptr::null_mut()),
            data,
            locks: 0,
        };
        block.sync_master();
        let handle = Handle((&*block.master as *const *mut u8) as usize);
        let token = self.blocks.insert(block)?;
        self.by_address.insert(handle.addr(), token);
        Ok(handle)
    }

    /// Whether the suite allocated `handle` and it is still live.
    pub fn contains(&self, handle: Handle) -> bool {
        self.block(handle).is_some()
    }

    /// Free a handle. Foreign handles are left alone.
    pub fn dispose(&mut self, handle: Handle) -> SuiteResult<()> {
        tracing::trace!(handle = handle.addr(), "dispose handle");
        let Some(token) = self.by_address.remove(&handle.addr()) else {
            tracing::debug!(handle = handle.addr(), "dispose of a handle the suite does not own");
            return Err(SuiteStatus::NilHandle);
        };
        let locks = self.blocks.remove(token).map_or(0, |b| b.locks);
        if locks != 0 {
            tracing::debug!(locks, "disposed a locked handle");
        }
        Ok(())
    }

    /// Size of a handle's block. Foreign two-word handles are sized
    /// through the probe; anything else unknown reports zero.
    pub fn size(&self, handle: Handle, probe: &dyn MemoryProbe) -> usize {
        if let Some(block) = self.block(handle) {
            return block.data.len();
        }
        foreign_otof(handle.addr(), probe).map_or(0, |f| f.size)
    }

    /// Resize a handle, preserving its contents. The block may move.
    pub fn set_size(&mut self, handle: Handle, size: usize) -> SuiteResult<()> {
        tracing::trace!(handle = handle.addr(), size, "set handle size");
        let block = self.block_mut(handle).ok_or(SuiteStatus::NilHandle)?;
        if size > block.data.len()
            && block.data.try_reserve_exact(size - block.data.len()).is_err()
        {
            observability::record_suite_allocation_failure("handle");
            return Err(SuiteStatus::OutOfMemory);
        }
        block.data.resize(size, 0);
        block.sync_master();
        Ok(())
    }

    /// Lock a handle and return its data pointer.
    pub fn lock(&mut self, handle: Handle, probe: &dyn MemoryProbe) -> SuiteResult<*mut u8> {
        if let Some(block) = self.block_mut(handle) {
            block.locks += 1;
            return Ok(*block.master);
        }
        foreign_otof(handle.addr(), probe)
            .map(|f| f.data)
            .ok_or(SuiteStatus::NilHandle)
    }

    /// Undo one [`HandleSuite::lock`].
    pub fn unlock(&mut self, handle: Handle) {
        if let Some(block) = self.block_mut(handle) {
            if block.locks == 0 {
                tracing::debug!(handle = handle.addr(), "unbalanced handle unlock");
            }
            block.locks = block.locks.saturating_sub(1);
        }
    }

    /// Current lock count.
    pub fn lock_count(&self, handle: Handle) -> Option<u32> {
        self.block(handle).map(|b| b.locks)
    }

    /// Contents of a suite-owned handle.
    pub fn bytes(&self, handle: Handle) -> Option<&[u8]> {
        self.block(handle).map(|b| b.data.as_slice())
    }

    /// Mutable contents of a suite-owned handle.
    pub fn bytes_mut(&mut self, handle: Handle) -> Option<&mut [u8]> {
        self.block_mut(handle).map(|b| b.data.as_mut_slice())
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no handle is live.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NullProbe;

    #[test]
    fn test_master_pointer_points_at_data() {
        let mut suite = HandleSuite::new();
        let h = suite.new_with(b"abcd").unwrap();
        // SAFETY: `h` is a live handle owned by the suite.
        let data = unsafe { *h.as_raw() };
        let bytes = unsafe { std::slice::from_raw_parts(data, 4) };
        assert_eq!(bytes, b"abcd");
        assert_eq!(suite.size(h, &NullProbe), 4);
    }

    #[test]
    fn test_resize_updates_master_pointer() {
        let mut suite = HandleSuite::new();
        let h = suite.new_with(b"xy").unwrap();
        suite.set_size(h, 4096).unwrap();
        let data = unsafe { *h.as_raw() };
        assert_eq!(data, suite.lock(h, &NullProbe).unwrap());
        assert_eq!(&suite.bytes(h).unwrap()[..2], b"xy");
        assert_eq!(suite.bytes(h).unwrap().len(), 4096);
    }

    #[test]
    fn test_lock_is_balanced_counter() {
        let mut suite = HandleSuite::new();
        let h = suite.new_handle(8).unwrap();
        suite.lock(h, &NullProbe).unwrap();
        suite.lock(h, &NullProbe).unwrap();
        suite.unlock(h);
        assert_eq!(suite.lock_count(h), Some(1));
        suite.unlock(h);
        suite.unlock(h);
        assert_eq!(suite.lock_count(h), Some(0));
    }

    #[test]
    fn test_disposed_handle_is_invalid() {
        let mut suite = HandleSuite::new();
        let h = suite.new_handle(1).unwrap();
        suite.dispose(h).unwrap();
        assert!(!suite.contains(h));
        assert_eq!(suite.dispose(h), Err(SuiteStatus::NilHandle));
        assert_eq!(suite.set_size(h, 2), Err(SuiteStatus::NilHandle));
    }

    struct FixedProbe(Vec<(usize, usize)>);

    impl MemoryProbe for FixedProbe {
        fn block_size(&self, ptr: *const u8) -> Option<usize> {
            self.0
                .iter()
                .find(|(addr, _)| *addr == ptr as usize)
                .map(|(_, size)| *size)
        }
    }

    #[test]
    fn test_foreign_otof_handle() {
        let mut data = vec![7u8; 10];
        let mut block = vec![0u8; OTOF_HANDLE_SIZE];
        block[..std::mem::size_of::<usize>()]
            .copy_from_slice(&(data.as_mut_ptr() as usize).to_ne_bytes());
        block[std::mem::size_of::<usize>()..].copy_from_slice(&OTOF_SIGNATURE.to_le_bytes());
        let probe = FixedProbe(vec![
            (block.as_ptr() as usize, OTOF_HANDLE_SIZE),
            (data.as_ptr() as usize, 10),
        ]);

        let mut suite = HandleSuite::new();
        let h = Handle::from_addr(block.as_ptr() as usize).unwrap();
        assert_eq!(suite.size(h, &probe), 10);
        assert_eq!(suite.lock(h, &probe).unwrap(), data.as_mut_ptr());
        assert_eq!(suite.size(h, &NullProbe), 0);
    }
}
