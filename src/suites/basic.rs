//! Basic (PICA) suite: suite acquisition and a small block allocator.

use std::collections::HashMap;

use super::{SuiteResult, SuiteStatus};
use crate::observability;

/// Name of the action descriptor suite.
pub const ACTION_DESCRIPTOR_SUITE: &str = "df135115-c769-11d0-8079-00c04fd7ec47";
/// Name of the action list suite.
pub const ACTION_LIST_SUITE: &str = "df135116-c769-11d0-8079-00c04fd7ec47";
/// Name of the action reference suite.
pub const ACTION_REFERENCE_SUITE: &str = "df135117-c769-11d0-8079-00c04fd7ec47";

/// Suites the host hands out through [`BasicSuite::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuiteKind {
    /// Action descriptors.
    ActionDescriptor,
    /// Action lists.
    ActionList,
    /// Action references.
    ActionReference,
}

impl SuiteKind {
    /// Look a suite up by name and version.
    pub fn lookup(name: &[u8], version: i32) -> Option<Self> {
        let kind = match name {
            n if n == ACTION_DESCRIPTOR_SUITE.as_bytes() => Self::ActionDescriptor,
            n if n == ACTION_LIST_SUITE.as_bytes() => Self::ActionList,
            n if n == ACTION_REFERENCE_SUITE.as_bytes() => Self::ActionReference,
            _ => return None,
        };
        (1..=kind.max_version()).contains(&version).then_some(kind)
    }

    /// Highest version the host implements.
    pub fn max_version(self) -> i32 {
        match self {
            Self::ActionDescriptor | Self::ActionReference => 2,
            Self::ActionList => 1,
        }
    }
}

/// Acquisition counts and blocks allocated through the suite.
#[derive(Debug, Default)]
pub struct BasicSuite {
    acquired: HashMap<SuiteKind, u32>,
    blocks: HashMap<usize, Vec<u8>>,
}

impl BasicSuite {
    /// Create an empty suite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a suite by name and version.
    pub fn acquire(&mut self, name: &[u8], version: i32) -> SuiteResult<SuiteKind> {
        let Some(kind) = SuiteKind::lookup(name, version) else {
            tracing::debug!(
                name = %String::from_utf8_lossy(name),
                version,
                "plugin requested an unknown suite"
            );
            return Err(SuiteStatus::SuiteNotFound);
        };
        tracing::trace!(?kind, version, "acquire suite");
        *self.acquired.entry(kind).or_insert(0) += 1;
        Ok(kind)
    }

    /// Release a suite acquired earlier.
    pub fn release(&mut self, name: &[u8], version: i32) -> SuiteResult<()> {
        let kind = SuiteKind::lookup(name, version).ok_or(SuiteStatus::SuiteNotFound)?;
        match self.acquired.get_mut(&kind) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(())
            }
            _ => Err(SuiteStatus::BadParameter),
        }
    }

    /// Outstanding acquisitions of a suite.
    pub fn acquire_count(&self, kind: SuiteKind) -> u32 {
        self.acquired.get(&kind).copied().unwrap_or(0)
    }

    /// Allocate a block. Zero-sized requests still get a unique address.
    pub fn allocate_block(&mut self, size: usize) -> SuiteResult<*mut u8> {
        let mut block = Vec::new();
        if block.try_reserve_exact(size.max(1)).is_err() {
            observability::record_suite_allocation_failure("basic");
            return Err(SuiteStatus::OutOfMemory);
        }
        block.resize(size.max(1), 0);
        let ptr = block.as_mut_ptr();
        self.blocks.insert(ptr as usize, block);
        Ok(ptr)
    }

    /// Free a block allocated by [`BasicSuite::allocate_block`].
    pub fn free_block(&mut self, block: *mut u8) -> SuiteResult<()> {
        self.blocks
            .remove(&(block as usize))
            .map(|_| ())
            .ok_or(SuiteStatus::BadParameter)
    }

    /// Resize a block, preserving its prefix. A null block allocates.
    pub fn reallocate_block(&mut self, block: *mut u8, size: usize) -> SuiteResult<*mut u8> {
        if block.is_null() {
            return self.allocate_block(size);
        }
        let old = self
            .blocks
            .get(&(block as usize))
            .ok_or(SuiteStatus::BadParameter)?;
        let keep = old.len().min(size);
        let prefix = old[..keep].to_vec();
        let fresh = self.allocate_block(size)?;
        if let Some(data) = self.blocks.get_mut(&(fresh as usize)) {
            data[..keep].copy_from_slice(&prefix);
        }
        self.blocks.remove(&(block as usize));
        Ok(fresh)
    }

    /// Size of a live block.
    pub fn block_size(&self, block: *const u8) -> Option<usize> {
        self.blocks.get(&(block as usize)).map(Vec::len)
    }

    /// Number of live blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

/// Whether two suite names are equal.
pub fn is_equal(a: &[u8], b: &[u8]) -> bool {
    a == b
}
