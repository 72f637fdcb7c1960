//! Resource suite: typed, indexed blobs a plugin stores with the document.
//!
//! Indices are 1-based and counted per resource type. Deleting an entry
//! shifts every later entry of the same type down by one.

use super::{SuiteResult, SuiteStatus};
use crate::fourcc::FourCC;

/// One stored resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Resource type.
    pub kind: FourCC,
    /// 1-based index among resources of the same type.
    pub index: i16,
    /// Contents.
    pub data: Vec<u8>,
}

/// Ordered resource store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSuite {
    entries: Vec<ResourceEntry>,
}

impl ResourceSuite {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a store from saved entries.
    pub fn from_entries(entries: Vec<ResourceEntry>) -> Self {
        Self { entries }
    }

    /// Number of resources of `kind`.
    pub fn count(&self, kind: FourCC) -> i16 {
        let count = self.entries.iter().filter(|e| e.kind == kind).count();
        i16::try_from(count).unwrap_or(i16::MAX)
    }

    /// Contents of resource `index` of `kind`.
    pub fn get(&self, kind: FourCC, index: i16) -> Option<&[u8]> {
        tracing::trace!(kind = %kind, index, "get resource");
        self.entries
            .iter()
            .find(|e| e.kind == kind && e.index == index)
            .map(|e| e.data.as_slice())
    }

    /// Delete resource `index` of `kind`, renumbering later ones.
    pub fn delete(&mut self, kind: FourCC, index: i16) -> SuiteResult<()> {
        tracing::trace!(kind = %kind, index, "delete resource");
        let pos = self
            .entries
            .iter()
            .position(|e| e.kind == kind && e.index == index)
            .ok_or(SuiteStatus::BadParameter)?;
        self.entries.remove(pos);
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.kind == kind && e.index > index)
        {
            entry.index -= 1;
        }
        Ok(())
    }

    /// Append a resource of `kind`, returning its index.
    pub fn add(&mut self, kind: FourCC, data: &[u8]) -> SuiteResult<i16> {
        let index = self.count(kind).checked_add(1).ok_or(SuiteStatus::OutOfMemory)?;
        tracing::trace!(kind = %kind, index, size = data.len(), "add resource");
        let mut copy = Vec::new();
        copy.try_reserve_exact(data.len())
            .map_err(|_| SuiteStatus::OutOfMemory)?;
        copy.extend_from_slice(data);
        self.entries
            .try_reserve(1)
            .map_err(|_| SuiteStatus::OutOfMemory)?;
        self.entries.push(ResourceEntry {
            kind,
            index,
            data: copy,
        });
        Ok(index)
    }

    /// Every entry in insertion order.
    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: FourCC = FourCC::new(b"resA");
    const B: FourCC = FourCC::new(b"resB");

    #[test]
    fn test_indices_are_per_type() {
        let mut store = ResourceSuite::new();
        assert_eq!(store.add(A, b"a1").unwrap(), 1);
        assert_eq!(store.add(B, b"b1").unwrap(), 1);
        assert_eq!(store.add(A, b"a2").unwrap(), 2);
        assert_eq!(store.count(A), 2);
        assert_eq!(store.get(A, 2), Some(&b"a2"[..]));
    }

    #[test]
    fn test_delete_renumbers() {
        let mut store = ResourceSuite::new();
        store.add(A, b"a1").unwrap();
        store.add(B, b"b1").unwrap();
        store.add(A, b"a2").unwrap();
        store.add(A, b"a3").unwrap();

        store.delete(A, 1).unwrap();
        assert_eq!(store.get(A, 1), Some(&b"a2"[..]));
        assert_eq!(store.get(A, 2), Some(&b"a3"[..]));
        assert_eq!(store.get(A, 3), None);
        assert_eq!(store.get(B, 1), Some(&b"b1"[..]));
        assert_eq!(store.delete(A, 3), Err(SuiteStatus::BadParameter));
    }
}
