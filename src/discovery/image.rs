//! Read-only view of a module file.
//!
//! Modules are mapped as plain data so their resources can be parsed without
//! running any of their code (no loader, no initializers). On unix the file
//! is mapped with `mmap(PROT_READ, MAP_PRIVATE)`; elsewhere it is read into
//! memory.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Bytes of a module file, mapped or read.
pub struct ModuleImage {
    path: PathBuf,
    backing: Backing,
}

enum Backing {
    #[cfg(unix)]
    Mapped {
        ptr: std::ptr::NonNull<u8>,
        len: usize,
    },
    Owned(Vec<u8>),
}

impl ModuleImage {
    /// Map a module file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let backing = Self::map(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            backing,
        })
    }

    /// Wrap bytes already in memory.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            backing: Backing::Owned(bytes),
        }
    }

    #[cfg(unix)]
    fn map(path: &Path) -> Result<Backing> {
        use rustix::fs::{Mode, OFlags};
        use rustix::mm::{MapFlags, ProtFlags};

        let fd = rustix::fs::open(path, OFlags::RDONLY | OFlags::CLOEXEC, Mode::empty())?;
        let stat = rustix::fs::fstat(&fd)?;
        let len = usize::try_from(stat.st_size)
            .map_err(|_| Error::invalid_module(path, "file too large to map"))?;
        if len == 0 {
            return Err(Error::invalid_module(path, "file is empty"));
        }

        // SAFETY: Fresh private read-only mapping of a file we just opened.
        // The mapping stays valid after `fd` is closed.
        let ptr = unsafe {
            rustix::mm::mmap(
                std::ptr::null_mut(),
                len,
                ProtFlags::READ,
                MapFlags::PRIVATE,
                &fd,
                0,
            )?
        };
        let ptr = std::ptr::NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| Error::invalid_module(path, "mmap returned null"))?;
        Ok(Backing::Mapped { ptr, len })
    }

    #[cfg(not(unix))]
    fn map(path: &Path) -> Result<Backing> {
        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Err(Error::invalid_module(path, "file is empty"));
        }
        Ok(Backing::Owned(bytes))
    }

    /// Path the image was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The module bytes.
    pub fn bytes(&self) -> &[u8] {
        match &self.backing {
            #[cfg(unix)]
            // SAFETY: ptr/len describe a live read-only mapping owned by self.
            Backing::Mapped { ptr, len } => unsafe {
                std::slice::from_raw_parts(ptr.as_ptr(), *len)
            },
            Backing::Owned(bytes) => bytes,
        }
    }
}

impl Drop for ModuleImage {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Backing::Mapped { ptr, len } = self.backing {
            // SAFETY: The mapping was created in `map` and is unmapped once.
            unsafe {
                let _ = rustix::mm::munmap(ptr.as_ptr().cast(), len);
            }
        }
    }
}

impl std::fmt::Debug for ModuleImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleImage")
            .field("path", &self.path)
            .field("len", &self.bytes().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_map_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"MZ plugin bytes").unwrap();
        let image = ModuleImage::open(file.path()).unwrap();
        assert_eq!(image.bytes(), b"MZ plugin bytes");
    }

    #[test]
    fn test_empty_file_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(ModuleImage::open(file.path()).is_err());
    }
}
