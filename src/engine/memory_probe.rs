//! Queries about memory the host did not allocate.
//!
//! Plugins sometimes keep their parameter and global blocks in memory they
//! allocated themselves. Persisting such a block needs its size, and a block
//! that holds code needs to come back executable. Both questions go through
//! an injected [`MemoryProbe`]; the default probe knows nothing and reports
//! every block as non-executable.

/// Capability to inspect foreign memory.
pub trait MemoryProbe: Send + Sync {
    /// Size of the heap block starting exactly at `ptr`, if known.
    fn block_size(&self, ptr: *const u8) -> Option<usize> {
        let _ = ptr;
        None
    }

    /// Readable bytes from `ptr` to the end of its mapping, if known.
    fn readable_len(&self, ptr: *const u8) -> Option<usize> {
        let _ = ptr;
        None
    }

    /// Whether the page holding `ptr` is executable.
    fn is_executable(&self, ptr: *const u8) -> bool {
        let _ = ptr;
        false
    }
}

impl std::fmt::Debug for dyn MemoryProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MemoryProbe")
    }
}

/// Probe that knows nothing about foreign memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProbe;

impl MemoryProbe for NullProbe {}

/// Probe backed by `/proc/self/maps`.
///
/// Answers mapping extents and page protection. It cannot size individual
/// heap blocks.
#[cfg(target_os = "linux")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcMapsProbe;

#[cfg(target_os = "linux")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mapping {
    start: usize,
    end: usize,
    readable: bool,
    executable: bool,
}

#[cfg(target_os = "linux")]
impl ProcMapsProbe {
    fn mapping(ptr: *const u8) -> Option<Mapping> {
        let addr = ptr as usize;
        let maps = match std::fs::read_to_string("/proc/self/maps") {
            Ok(maps) => maps,
            Err(e) => {
                tracing::debug!(error = %e, "cannot read /proc/self/maps");
                return None;
            }
        };
        maps.lines()
            .filter_map(parse_mapping)
            .find(|m| addr >= m.start && addr < m.end)
    }
}

#[cfg(target_os = "linux")]
fn parse_mapping(line: &str) -> Option<Mapping> {
    let mut fields = line.split_ascii_whitespace();
    let (start, end) = fields.next()?.split_once('-')?;
    let perms = fields.next()?.as_bytes();
    Some(Mapping {
        start: usize::from_str_radix(start, 16).ok()?,
        end: usize::from_str_radix(end, 16).ok()?,
        readable: perms.first() == Some(&b'r'),
        executable: perms.get(2) == Some(&b'x'),
    })
}

#[cfg(target_os = "linux")]
impl MemoryProbe for ProcMapsProbe {
    fn readable_len(&self, ptr: *const u8) -> Option<usize> {
        Self::mapping(ptr)
            .filter(|m| m.readable)
            .map(|m| m.end - ptr as usize)
    }

    fn is_executable(&self, ptr: *const u8) -> bool {
        Self::mapping(ptr).is_some_and(|m| m.executable)
    }
}
