//! Target architecture detection from module headers.
//!
//! Only the two fixed headers are read; nothing is mapped or executed, and
//! any failure degrades to [`Architecture::Unknown`] so one bad file cannot
//! abort a directory scan.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Legacy header magic ("MZ").
const LEGACY_MAGIC: u16 = 0x5A4D;
/// Offset of the 32-bit pointer to the second header.
const NEW_HEADER_POINTER: u64 = 0x3C;
/// Second header magic ("PE\0\0").
const NEW_HEADER_MAGIC: u32 = 0x0000_4550;

/// Machine type values from the second header.
const MACHINE_X86: u16 = 0x014C;
const MACHINE_X64: u16 = 0x8664;
const MACHINE_ARM: u16 = 0x01C4;
const MACHINE_ARM64: u16 = 0xAA64;

/// Processor architecture of a module or process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Architecture {
    /// 32-bit x86.
    X86,
    /// 64-bit x86.
    X64,
    /// 32-bit ARM (Thumb-2).
    Arm,
    /// 64-bit ARM.
    Arm64,
    /// Not recognized, or the header could not be read.
    #[default]
    Unknown,
}

impl Architecture {
    /// Map a machine-type field to an architecture.
    pub fn from_machine(machine: u16) -> Self {
        match machine {
            MACHINE_X86 => Self::X86,
            MACHINE_X64 => Self::X64,
            MACHINE_ARM => Self::Arm,
            MACHINE_ARM64 => Self::Arm64,
            _ => Self::Unknown,
        }
    }

    /// Architecture of the running process.
    pub fn current() -> Self {
        if cfg!(target_arch = "x86") {
            Self::X86
        } else if cfg!(target_arch = "x86_64") {
            Self::X64
        } else if cfg!(target_arch = "arm") {
            Self::Arm
        } else if cfg!(target_arch = "aarch64") {
            Self::Arm64
        } else {
            Self::Unknown
        }
    }

    /// Whether pointers are 64 bits wide on this architecture.
    pub fn is_64_bit(self) -> bool {
        matches!(self, Self::X64 | Self::Arm64)
    }
}

/// How a module can be run by a host of a given architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStrategy {
    /// Load into this process.
    InProcess,
    /// Run through the out-of-process shim.
    OutOfProcess,
    /// Cannot be run at all.
    Incompatible,
}

impl LoadStrategy {
    /// Apply the compatibility matrix.
    ///
    /// | host  | module        | strategy      |
    /// |-------|---------------|---------------|
    /// | any   | same          | in process    |
    /// | x64   | x86           | out of process|
    /// | arm64 | x86 or arm64  | in process    |
    pub fn for_module(host: Architecture, module: Architecture) -> Self {
        use Architecture::*;
        match (host, module) {
            (_, Unknown) | (Unknown, _) => Self::Incompatible,
            (h, m) if h == m => Self::InProcess,
            (X64, X86) => Self::OutOfProcess,
            (Arm64, X86) => Self::InProcess,
            _ => Self::Incompatible,
        }
    }

    /// Whether the module can be used at all.
    pub fn is_compatible(self) -> bool {
        self != Self::Incompatible
    }
}

/// Read a module's headers and report its target architecture.
pub fn inspect_architecture(path: impl AsRef<Path>) -> Architecture {
    let path = path.as_ref();
    match read_machine(path) {
        Ok(Some(machine)) => {
            let arch = Architecture::from_machine(machine);
            tracing::trace!(path = %path.display(), machine = format_args!("{machine:#06x}"), ?arch, "inspected module");
            arch
        }
        Ok(None) => {
            tracing::debug!(path = %path.display(), "not a PE module");
            Architecture::Unknown
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "failed to read module header");
            Architecture::Unknown
        }
    }
}

/// Inspect an in-memory module image.
pub fn inspect_bytes(image: &[u8]) -> Architecture {
    let machine = (|| {
        let magic = u16::from_le_bytes(image.get(0..2)?.try_into().ok()?);
        if magic != LEGACY_MAGIC {
            return None;
        }
        let offset = u32::from_le_bytes(image.get(0x3C..0x40)?.try_into().ok()?) as usize;
        let signature = u32::from_le_bytes(image.get(offset..offset + 4)?.try_into().ok()?);
        if signature != NEW_HEADER_MAGIC {
            return None;
        }
        Some(u16::from_le_bytes(
            image.get(offset + 4..offset + 6)?.try_into().ok()?,
        ))
    })();
    machine.map_or(Architecture::Unknown, Architecture::from_machine)
}

fn read_machine(path: &Path) -> std::io::Result<Option<u16>> {
    let mut file = File::open(path)?;

    let mut word = [0u8; 2];
    file.read_exact(&mut word)?;
    if u16::from_le_bytes(word) != LEGACY_MAGIC {
        return Ok(None);
    }

    let mut dword = [0u8; 4];
    file.seek(SeekFrom::Start(NEW_HEADER_POINTER))?;
    file.read_exact(&mut dword)?;
    let offset = u32::from_le_bytes(dword);

    file.seek(SeekFrom::Start(u64::from(offset)))?;
    file.read_exact(&mut dword)?;
    if u32::from_le_bytes(dword) != NEW_HEADER_MAGIC {
        return Ok(None);
    }

    file.read_exact(&mut word)?;
    Ok(Some(u16::from_le_bytes(word)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(machine: u16) -> Vec<u8> {
        let mut image = vec![0u8; 0x80];
        image[0..2].copy_from_slice(b"MZ");
        image[0x3C..0x40].copy_from_slice(&0x40u32.to_le_bytes());
        image[0x40..0x44].copy_from_slice(b"PE\0\0");
        image[0x44..0x46].copy_from_slice(&machine.to_le_bytes());
        image
    }

    #[test]
    fn test_machine_mapping() {
        assert_eq!(inspect_bytes(&header(0xAA64)), Architecture::Arm64);
        assert_eq!(inspect_bytes(&header(0x014C)), Architecture::X86);
        assert_eq!(inspect_bytes(&header(0x8664)), Architecture::X64);
        assert_eq!(inspect_bytes(&header(0x1234)), Architecture::Unknown);
    }

    #[test]
    fn test_bad_magic_is_unknown() {
        let mut image = header(0x8664);
        image[0] = b'Z';
        assert_eq!(inspect_bytes(&image), Architecture::Unknown);
        assert_eq!(inspect_bytes(&image[..10]), Architecture::Unknown);
    }

    #[test]
    fn test_missing_file_is_unknown() {
        assert_eq!(
            inspect_architecture("/nonexistent/filter.8bf"),
            Architecture::Unknown
        );
    }

    #[test]
    fn test_compatibility_matrix() {
        use Architecture::*;
        assert_eq!(LoadStrategy::for_module(X64, X86), LoadStrategy::OutOfProcess);
        assert_eq!(LoadStrategy::for_module(X86, Arm64), LoadStrategy::Incompatible);
        assert_eq!(LoadStrategy::for_module(Arm64, X86), LoadStrategy::InProcess);
        assert_eq!(LoadStrategy::for_module(Arm64, Arm64), LoadStrategy::InProcess);
        assert_eq!(LoadStrategy::for_module(Arm64, X64), LoadStrategy::Incompatible);
        assert_eq!(LoadStrategy::for_module(X86, X86), LoadStrategy::InProcess);
        assert_eq!(LoadStrategy::for_module(X64, Unknown), LoadStrategy::Incompatible);
    }
}
