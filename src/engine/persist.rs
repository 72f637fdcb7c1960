//! Parameter persistence between runs.
//!
//! After a run the host copies the filter's parameter block and global data
//! out of whatever memory holds them, remembering how they were stored. A
//! repeat run rebuilds each block the same way before `Prepare`, so the
//! filter finds its settings where it left them.

use crate::error::Result;
use crate::observability;
use crate::suites::handle::{self, OTOF_SIGNATURE};
use crate::suites::{Dictionary, Handle, ResourceEntry, SuiteRegistry};

/// Largest block copied out of memory known only by its readable extent.
pub const RAW_POINTER_LIMIT: usize = 1024 * 1024;

/// Where a persisted block lived.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize,
)]
#[rkyv(derive(Debug))]
pub enum StorageMethod {
    /// A handle allocated through the handle suite.
    HandleSuite,
    /// A foreign two-word handle.
    OtofHandle,
    /// A heap block the filter allocated itself.
    ForeignHeap,
    /// Bare process memory.
    RawPointer,
}

/// One persisted block.
#[derive(Debug, Clone, PartialEq, Eq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(derive(Debug))]
pub struct PersistedBlock {
    /// How the block was stored.
    pub method: StorageMethod,
    /// Whether the block was in executable memory.
    pub executable: bool,
    /// Contents.
    pub bytes: Vec<u8>,
}

/// Everything kept for a repeat run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    /// The parameter block.
    pub parameters: Option<PersistedBlock>,
    /// The global data pointer's block.
    pub data: Option<PersistedBlock>,
    /// Scripting descriptor returned by the filter.
    pub descriptor: Option<Dictionary>,
    /// Resources the filter added.
    pub resources: Vec<ResourceEntry>,
}

fn copy_foreign(ptr: *const u8, len: usize) -> Vec<u8> {
    // SAFETY: Callers only pass extents reported by the memory probe for a
    // live allocation.
    unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec()
}

/// Copy the block at `addr` out, whatever holds it.
pub fn capture(registry: &SuiteRegistry, addr: usize) -> Option<PersistedBlock> {
    let probe = registry.probe();
    let handle = Handle::from_addr(addr)?;
    if let Some(bytes) = registry.handles.bytes(handle) {
        return Some(PersistedBlock {
            method: StorageMethod::HandleSuite,
            executable: false,
            bytes: bytes.to_vec(),
        });
    }
    if let Some(foreign) = handle::foreign_otof(addr, probe) {
        return Some(PersistedBlock {
            method: StorageMethod::OtofHandle,
            executable: probe.is_executable(foreign.data),
            bytes: copy_foreign(foreign.data, foreign.size),
        });
    }
    let ptr = addr as *const u8;
    if let Some(size) = probe.block_size(ptr) {
        return Some(PersistedBlock {
            method: StorageMethod::ForeignHeap,
            executable: probe.is_executable(ptr),
            bytes: copy_foreign(ptr, size),
        });
    }
    if let Some(len) = probe.readable_len(ptr) {
        return Some(PersistedBlock {
            method: StorageMethod::RawPointer,
            executable: probe.is_executable(ptr),
            bytes: copy_foreign(ptr, len.min(RAW_POINTER_LIMIT)),
        });
    }
    tracing::warn!(addr, "cannot size filter block; it will not be persisted");
    None
}

// ============================================================================
// Restoring
// ============================================================================

#[cfg(unix)]
#[derive(Debug)]
struct ExecutableBlock {
    ptr: std::ptr::NonNull<std::ffi::c_void>,
    len: usize,
}

#[cfg(unix)]
impl ExecutableBlock {
    fn new(bytes: &[u8]) -> Result<Self> {
        use rustix::mm::{MapFlags, ProtFlags, mmap_anonymous};
        let len = bytes.len().max(1);
        // SAFETY: A fresh private anonymous mapping aliases nothing.
        let raw = unsafe {
            mmap_anonymous(
                std::ptr::null_mut(),
                len,
                ProtFlags::READ | ProtFlags::WRITE | ProtFlags::EXEC,
                MapFlags::PRIVATE,
            )?
        };
        let ptr = std::ptr::NonNull::new(raw)
            .ok_or_else(|| crate::Error::Config("anonymous mapping returned null".into()))?;
        // SAFETY: The mapping is writable and at least `bytes.len()` long.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr().cast::<u8>(), bytes.len());
        }
        Ok(Self { ptr, len })
    }

    fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

#[cfg(unix)]
impl Drop for ExecutableBlock {
    fn drop(&mut self) {
        // SAFETY: The mapping was created by `new` and is unmapped once.
        if let Err(errno) = unsafe { rustix::mm::munmap(self.ptr.as_ptr(), self.len) } {
            tracing::warn!(%errno, "failed to unmap executable block");
        }
    }
}

/// Memory the host rebuilt for a repeat run. Lives as long as the run.
#[derive(Debug, Default)]
pub struct RestoredMemory {
    heap: Vec<Box<[u8]>>,
    #[cfg(unix)]
    executable: Vec<ExecutableBlock>,
}

impl RestoredMemory {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    fn heap_block(&mut self, bytes: &[u8]) -> usize {
        let mut block = bytes.to_vec();
        if block.is_empty() {
            block.push(0);
        }
        let block = block.into_boxed_slice();
        let addr = block.as_ptr() as usize;
        self.heap.push(block);
        addr
    }

    fn data_block(&mut self, block: &PersistedBlock) -> Result<usize> {
        if block.executable {
            #[cfg(unix)]
            {
                let exec = ExecutableBlock::new(&block.bytes)?;
                let addr = exec.addr();
                self.executable.push(exec);
                return Ok(addr);
            }
            #[cfg(not(unix))]
            tracing::warn!("executable memory unavailable; restoring block as data");
        }
        Ok(self.heap_block(&block.bytes))
    }

    fn otof_handle(&mut self, data: usize) -> usize {
        let mut words = Vec::with_capacity(handle::OTOF_HANDLE_SIZE);
        words.extend_from_slice(&data.to_ne_bytes());
        words.extend_from_slice(&OTOF_SIGNATURE.to_le_bytes());
        self.heap_block(&words)
    }

    /// Number of blocks held.
    pub fn len(&self) -> usize {
        #[cfg(unix)]
        let exec = self.executable.len();
        #[cfg(not(unix))]
        let exec = 0;
        self.heap.len() + exec
    }

    /// Whether no block is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rebuild a persisted block, returning the address to hand the filter.
pub fn restore(
    registry: &mut SuiteRegistry,
    memory: &mut RestoredMemory,
    block: &PersistedBlock,
) -> Result<usize> {
    tracing::debug!(method = ?block.method, len = block.bytes.len(), executable = block.executable, "restoring persisted block");
    let addr = match block.method {
        StorageMethod::HandleSuite => match registry.handles.new_with(&block.bytes) {
            Ok(handle) => handle.addr(),
            Err(status) => {
                observability::record_suite_allocation_failure("persist");
                return Err(crate::Error::FilterFailed {
                    status: status.os_err(),
                    message: "could not restore the parameter handle".into(),
                });
            }
        },
        StorageMethod::OtofHandle => {
            let data = memory.data_block(block)?;
            memory.otof_handle(data)
        }
        StorageMethod::ForeignHeap | StorageMethod::RawPointer => memory.data_block(block)?,
    };
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::HostConfig;
    use crate::engine::{MemoryProbe, NullProbe};
    use crate::suites::{ColorServices, PropertyContext};

    fn registry(probe: Arc<dyn MemoryProbe>) -> SuiteRegistry {
        SuiteRegistry::new(
            &HostConfig::default(),
            PropertyContext::default(),
            ColorServices::new([0; 3], [255; 3]),
            probe,
        )
    }

    struct HeapProbe {
        addr: usize,
        size: usize,
        executable: bool,
    }

    impl MemoryProbe for HeapProbe {
        fn block_size(&self, ptr: *const u8) -> Option<usize> {
            (ptr as usize == self.addr).then_some(self.size)
        }

        fn is_executable(&self, _ptr: *const u8) -> bool {
            self.executable
        }
    }

    #[test]
    fn test_handle_suite_round_trip() {
        let mut reg = registry(Arc::new(NullProbe));
        let h = reg.handles.new_with(b"params").unwrap();
        let block = capture(&reg, h.addr()).unwrap();
        assert_eq!(block.method, StorageMethod::HandleSuite);

        let mut memory = RestoredMemory::new();
        let addr = restore(&mut reg, &mut memory, &block).unwrap();
        assert_ne!(addr, h.addr());
        let restored = Handle::from_addr(addr).unwrap();
        assert_eq!(reg.handles.bytes(restored), Some(&b"params"[..]));
        assert!(memory.is_empty());
    }

    #[test]
    fn test_foreign_heap_block() {
        let data = vec![1u8, 2, 3, 4];
        let probe = HeapProbe {
            addr: data.as_ptr() as usize,
            size: 4,
            executable: false,
        };
        let reg = registry(Arc::new(probe));
        let block = capture(&reg, data.as_ptr() as usize).unwrap();
        assert_eq!(block.method, StorageMethod::ForeignHeap);
        assert_eq!(block.bytes, data);
    }

    #[test]
    fn test_unknown_pointer_is_skipped() {
        let reg = registry(Arc::new(NullProbe));
        let data = [0u8; 4];
        assert!(capture(&reg, data.as_ptr() as usize).is_none());
        assert!(capture(&reg, 0).is_none());
    }

    #[test]
    fn test_otof_restore_builds_two_words() {
        let mut reg = registry(Arc::new(NullProbe));
        let mut memory = RestoredMemory::new();
        let block = PersistedBlock {
            method: StorageMethod::OtofHandle,
            executable: false,
            bytes: vec![9, 8, 7],
        };
        let addr = restore(&mut reg, &mut memory, &block).unwrap();
        assert_eq!(memory.len(), 2);
        // SAFETY: `addr` is the OTOF block held by `memory`.
        let (data, tag) = unsafe {
            let p = addr as *const u8;
            (
                p.cast::<*const u8>().read_unaligned(),
                p.add(std::mem::size_of::<usize>()).cast::<u32>().read_unaligned(),
            )
        };
        assert_eq!(tag, OTOF_SIGNATURE);
        assert_eq!(unsafe { std::slice::from_raw_parts(data, 3) }, &[9, 8, 7]);
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_block_is_mapped() {
        let mut reg = registry(Arc::new(NullProbe));
        let mut memory = RestoredMemory::new();
        let block = PersistedBlock {
            method: StorageMethod::ForeignHeap,
            executable: true,
            bytes: vec![0xC3; 16],
        };
        let addr = restore(&mut reg, &mut memory, &block).unwrap();
        assert_eq!(unsafe { *(addr as *const u8) }, 0xC3);
        assert_eq!(memory.len(), 1);
    }
}
