//! Native plugin interface.
//!
//! `#[repr(C)]` mirrors of the parameter block and callback tables a filter
//! module reads, plus the `extern "C"` trampolines that fill them. The
//! trampolines only translate arguments; every decision is made by the suite
//! and engine types they forward to.
//!
//! Callbacks carry no context pointer, so the trampolines reach the running
//! session through a thread-local slot (see [`context`]).

pub(crate) mod action_procs;
pub(crate) mod callbacks;
pub(crate) mod context;
pub(crate) mod descriptor_procs;
pub(crate) mod memory_procs;
mod record;
mod tables;

use std::ffi::c_void;
use std::ptr::NonNull;

pub use record::*;
pub use tables::*;

/// Classic Mac-style boolean.
pub type Boolean = u8;
/// 16-bit status code.
pub type OsErr = i16;
/// 32-bit status code used by PICA suites.
pub type SpErr = i32;
/// 16.16 fixed point.
pub type Fixed = i32;
/// Native handle: pointer to a master pointer.
pub type RawHandle = *mut *mut u8;

/// 16-bit rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct Rect16 {
    /// First row.
    pub top: i16,
    /// First column.
    pub left: i16,
    /// One past the last row.
    pub bottom: i16,
    /// One past the last column.
    pub right: i16,
}

/// 32-bit rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct VRect {
    /// First row.
    pub top: i32,
    /// First column.
    pub left: i32,
    /// One past the last row.
    pub bottom: i32,
    /// One past the last column.
    pub right: i32,
}

/// 16-bit point, vertical first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct Point16 {
    /// Row.
    pub v: i16,
    /// Column.
    pub h: i16,
}

/// 16-bit-per-channel color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct RgbColor16 {
    /// Red.
    pub red: u16,
    /// Green.
    pub green: u16,
    /// Blue.
    pub blue: u16,
}

impl RgbColor16 {
    /// Widen an 8-bit color.
    pub fn from_rgb8(rgb: [u8; 3]) -> Self {
        let widen = |c: u8| u16::from(c) * 257;
        Self {
            red: widen(rgb[0]),
            green: widen(rgb[1]),
            blue: widen(rgb[2]),
        }
    }
}

/// Selectors passed to the entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum Selector {
    /// Show the about box.
    About = 0,
    /// Ask for parameters.
    Parameters = 1,
    /// Negotiate memory.
    Prepare = 2,
    /// Begin filtering.
    Start = 3,
    /// Filter one tile.
    Continue = 4,
    /// End filtering.
    Finish = 5,
}

/// Entry point exported by a filter module.
pub type EntryPoint =
    unsafe extern "system" fn(selector: i16, record: *mut c_void, data: *mut isize, result: *mut i16);

/// A heap value handed to native code by address.
///
/// The value never moves, and native code may hold its address for as long
/// as the box lives. Rust code reaches it only through short-lived
/// references.
pub struct NativeBox<T> {
    ptr: NonNull<T>,
}

impl<T> NativeBox<T> {
    /// Move `value` to the heap.
    pub fn new(value: T) -> Self {
        Self {
            ptr: NonNull::from(Box::leak(Box::new(value))),
        }
    }

    /// Stable address.
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Shared access.
    ///
    /// # Safety
    ///
    /// No native code may be running with this address, and no mutable
    /// reference obtained through [`NativeBox::get_mut`] may be live.
    pub unsafe fn get(&self) -> &T {
        // SAFETY: Upheld by the caller.
        unsafe { self.ptr.as_ref() }
    }

    /// Exclusive access.
    ///
    /// # Safety
    ///
    /// No native code may be running with this address, and no other
    /// reference to the value may be live.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self) -> &mut T {
        // SAFETY: Upheld by the caller.
        unsafe { &mut *self.ptr.as_ptr() }
    }
}

impl<T> Drop for NativeBox<T> {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from `Box::leak` and is released exactly once.
        drop(unsafe { Box::from_raw(self.ptr.as_ptr()) });
    }
}

impl<T> std::fmt::Debug for NativeBox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NativeBox({:p})", self.ptr)
    }
}

/// Copy a Pascal string into a 256-byte buffer, truncating at 255 bytes.
pub fn write_pascal(dest: &mut [u8; 256], text: &[u8]) {
    let len = text.len().min(255);
    dest[0] = len as u8;
    dest[1..=len].copy_from_slice(&text[..len]);
}

/// Read a Pascal string from native memory.
///
/// # Safety
///
/// `ptr` must be null or point at a length byte followed by that many
/// readable bytes.
pub unsafe fn read_pascal(ptr: *const u8) -> Vec<u8> {
    if ptr.is_null() {
        return Vec::new();
    }
    // SAFETY: Upheld by the caller.
    unsafe {
        let len = *ptr as usize;
        std::slice::from_raw_parts(ptr.add(1), len).to_vec()
    }
}

/// Read a NUL-terminated string from native memory.
///
/// # Safety
///
/// `ptr` must be null or point at a NUL-terminated string.
pub unsafe fn read_c_string(ptr: *const std::ffi::c_char) -> Vec<u8> {
    if ptr.is_null() {
        return Vec::new();
    }
    // SAFETY: Upheld by the caller.
    unsafe { std::ffi::CStr::from_ptr(ptr) }.to_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_round_trip() {
        let mut buf = [0u8; 256];
        write_pascal(&mut buf, b"Blur");
        assert_eq!(buf[0], 4);
        assert_eq!(unsafe { read_pascal(buf.as_ptr()) }, b"Blur");
    }

    #[test]
    fn test_native_box_is_stable() {
        let b = NativeBox::new(5u32);
        let p = b.as_ptr();
        unsafe { *b.get_mut() = 6 };
        assert_eq!(p, b.as_ptr());
        assert_eq!(unsafe { *b.get() }, 6);
    }

    #[test]
    fn test_color_widening() {
        assert_eq!(RgbColor16::from_rgb8([255, 0, 1]).red, 0xFFFF);
        assert_eq!(RgbColor16::from_rgb8([255, 0, 1]).blue, 257);
    }
}
