//! Callback tables and the structures they exchange.
//!
//! Every table starts with a version and a proc count followed by the procs
//! in their fixed native order.

use std::ffi::{c_char, c_void};

use super::{Boolean, OsErr, Point16, RawHandle, Rect16, SimpleReference, SpErr, VRect};

// ============================================================================
// Memory
// ============================================================================

/// Buffer suite.
#[derive(Debug)]
#[repr(C)]
pub struct BufferProcs {
    /// Table version.
    pub version: i16,
    /// Proc count.
    pub count: i16,
    /// Allocate.
    pub allocate: Option<unsafe extern "C" fn(size: i32, buffer: *mut *mut c_void) -> OsErr>,
    /// Lock.
    pub lock: Option<unsafe extern "C" fn(buffer: *mut c_void, move_high: Boolean) -> *mut u8>,
    /// Unlock.
    pub unlock: Option<unsafe extern "C" fn(buffer: *mut c_void)>,
    /// Free.
    pub free: Option<unsafe extern "C" fn(buffer: *mut c_void)>,
    /// Available space.
    pub space: Option<unsafe extern "C" fn() -> i32>,
}

/// Handle suite.
#[derive(Debug)]
#[repr(C)]
pub struct HandleProcs {
    /// Table version.
    pub version: i16,
    /// Proc count.
    pub count: i16,
    /// Allocate.
    pub new: Option<unsafe extern "C" fn(size: i32) -> RawHandle>,
    /// Free.
    pub dispose: Option<unsafe extern "C" fn(handle: RawHandle)>,
    /// Size query.
    pub get_size: Option<unsafe extern "C" fn(handle: RawHandle) -> i32>,
    /// Resize.
    pub set_size: Option<unsafe extern "C" fn(handle: RawHandle, size: i32) -> OsErr>,
    /// Lock.
    pub lock: Option<unsafe extern "C" fn(handle: RawHandle, move_high: Boolean) -> *mut u8>,
    /// Unlock.
    pub unlock: Option<unsafe extern "C" fn(handle: RawHandle)>,
    /// Ask the host to free memory.
    pub recover_space: Option<unsafe extern "C" fn(size: i32)>,
    /// Free a handle the host did not allocate.
    pub dispose_regular: Option<unsafe extern "C" fn(handle: RawHandle)>,
}

/// Resource suite.
#[derive(Debug)]
#[repr(C)]
pub struct ResourceProcs {
    /// Table version.
    pub version: i16,
    /// Proc count.
    pub count: i16,
    /// Count of one type.
    pub count_resources: Option<unsafe extern "C" fn(kind: u32) -> i16>,
    /// Fetch.
    pub get: Option<unsafe extern "C" fn(kind: u32, index: i16) -> RawHandle>,
    /// Delete.
    pub delete: Option<unsafe extern "C" fn(kind: u32, index: i16)>,
    /// Add.
    pub add: Option<unsafe extern "C" fn(kind: u32, data: RawHandle) -> OsErr>,
}

/// Property suite.
#[derive(Debug)]
#[repr(C)]
pub struct PropertyProcs {
    /// Table version.
    pub version: i16,
    /// Proc count.
    pub count: i16,
    /// Get.
    pub get: Option<super::GetPropertyProc>,
    /// Set.
    pub set: Option<
        unsafe extern "C" fn(
            signature: u32,
            key: u32,
            index: i32,
            simple: isize,
            complex: RawHandle,
        ) -> OsErr,
    >,
}

// ============================================================================
// Image services
// ============================================================================

/// One plane for resampling.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ImagePlane {
    /// First byte.
    pub data: *mut c_void,
    /// Covered area.
    pub bounds: Rect16,
    /// Row stride.
    pub row_bytes: i32,
    /// Column stride.
    pub col_bytes: i32,
}

/// Interleaved planes for resampling.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ImageMultiPlane {
    /// First byte.
    pub data: *mut c_void,
    /// Covered area.
    pub bounds: Rect16,
    /// Row stride.
    pub row_bytes: i32,
    /// Column stride.
    pub col_bytes: i32,
    /// Channels to process.
    pub active_channels: i16,
}

/// Single-plane resampler.
pub type ResampleProc = unsafe extern "C" fn(
    source: *mut ImagePlane,
    destination: *mut ImagePlane,
    area: *mut Rect16,
    coords: *mut i32,
    method: i16,
) -> OsErr;

/// Multi-plane resampler.
pub type ResampleMultiProc = unsafe extern "C" fn(
    source: *mut ImageMultiPlane,
    destination: *mut ImageMultiPlane,
    area: *mut Rect16,
    coords: *mut i32,
    method: i16,
) -> OsErr;

/// Image-services suite.
#[derive(Debug)]
#[repr(C)]
pub struct ImageServicesProcs {
    /// Table version.
    pub version: i16,
    /// Proc count.
    pub count: i16,
    /// Row resampler.
    pub interpolate_1d: Option<ResampleProc>,
    /// Free resampler.
    pub interpolate_2d: Option<ResampleProc>,
    /// Row resampler over interleaved planes.
    pub interpolate_1d_multi: Option<ResampleMultiProc>,
    /// Free resampler over interleaved planes.
    pub interpolate_2d_multi: Option<ResampleMultiProc>,
}

// ============================================================================
// Channel ports (stubbed)
// ============================================================================

/// Channel-port suite.
#[derive(Debug)]
#[repr(C)]
pub struct ChannelPortProcs {
    /// Table version.
    pub version: i16,
    /// Proc count.
    pub count: i16,
    /// Read pixels.
    pub read_pixels: Option<
        unsafe extern "C" fn(
            port: *mut c_void,
            scaling: *const c_void,
            write_rect: *const VRect,
            destination: *const c_void,
            wrote_rect: *mut VRect,
        ) -> OsErr,
    >,
    /// Write base pixels.
    pub write_base_pixels: Option<
        unsafe extern "C" fn(port: *mut c_void, write_rect: *const VRect, source: *const c_void) -> OsErr,
    >,
    /// Read port for a write port.
    pub read_port_for_write_port:
        Option<unsafe extern "C" fn(read_port: *mut *mut c_void, write_port: *mut c_void) -> OsErr>,
}

// ============================================================================
// Color services and preview
// ============================================================================

/// Color-services request.
#[derive(Debug)]
#[repr(C)]
pub struct ColorServicesInfo {
    /// Size of this structure.
    pub info_size: i32,
    /// Request selector.
    pub selector: i16,
    /// Space of `color_components` on input.
    pub source_space: i16,
    /// Requested space on output.
    pub result_space: i16,
    /// Whether `result_in_gamut` is meaningful.
    pub result_gamut_info_valid: Boolean,
    /// Whether the result is in gamut.
    pub result_in_gamut: Boolean,
    /// Reserved.
    pub reserved_source_space_info: *mut c_void,
    /// Reserved.
    pub reserved_result_space_info: *mut c_void,
    /// Components in and out.
    pub color_components: [i16; 4],
    /// Reserved.
    pub reserved: *mut c_void,
    /// Prompt string, sample point or special color id, by selector.
    pub selector_parameter: SelectorParameter,
}

/// Per-selector argument of [`ColorServicesInfo`].
#[derive(Clone, Copy)]
#[repr(C)]
pub union SelectorParameter {
    /// Picker prompt (Pascal string).
    pub picker_prompt: *mut [u8; 256],
    /// Sample location.
    pub global_sample_point: *mut Point16,
    /// Special color id.
    pub special_color_id: i32,
}

impl std::fmt::Debug for SelectorParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SelectorParameter")
    }
}

/// Pixels handed to the preview callback.
#[derive(Debug)]
#[repr(C)]
pub struct PsPixelMap {
    /// Structure version.
    pub version: i32,
    /// Covered area.
    pub bounds: VRect,
    /// Image mode.
    pub image_mode: i32,
    /// Row stride.
    pub row_bytes: i32,
    /// Column stride.
    pub col_bytes: i32,
    /// Plane stride.
    pub plane_bytes: i32,
    /// First byte.
    pub base_addr: *mut c_void,
    /// Matte mask (version 1+).
    pub mat: *mut c_void,
    /// Masks (version 1+).
    pub masks: *mut c_void,
    /// Mask phase row.
    pub mask_phase_row: i32,
    /// Mask phase column.
    pub mask_phase_col: i32,
}

// ============================================================================
// Legacy descriptors
// ============================================================================

/// Opaque reader token.
pub type ReadToken = *mut c_void;
/// Opaque writer token.
pub type WriteToken = *mut c_void;

/// Legacy descriptor reader procs.
#[allow(missing_docs)]
#[derive(Debug)]
#[repr(C)]
pub struct ReadDescriptorProcs {
    pub version: i16,
    pub count: i16,
    pub open: Option<unsafe extern "C" fn(descriptor: RawHandle, keys: *mut u32) -> ReadToken>,
    pub close: Option<unsafe extern "C" fn(reader: ReadToken) -> OsErr>,
    pub get_key: Option<
        unsafe extern "C" fn(reader: ReadToken, key: *mut u32, kind: *mut u32, flags: *mut i32) -> Boolean,
    >,
    pub get_integer: Option<unsafe extern "C" fn(reader: ReadToken, value: *mut i32) -> OsErr>,
    pub get_float: Option<unsafe extern "C" fn(reader: ReadToken, value: *mut f64) -> OsErr>,
    pub get_unit_float:
        Option<unsafe extern "C" fn(reader: ReadToken, unit: *mut u32, value: *mut f64) -> OsErr>,
    pub get_boolean: Option<unsafe extern "C" fn(reader: ReadToken, value: *mut Boolean) -> OsErr>,
    pub get_text: Option<unsafe extern "C" fn(reader: ReadToken, value: *mut RawHandle) -> OsErr>,
    pub get_alias: Option<unsafe extern "C" fn(reader: ReadToken, value: *mut RawHandle) -> OsErr>,
    pub get_enumerated: Option<unsafe extern "C" fn(reader: ReadToken, value: *mut u32) -> OsErr>,
    pub get_class: Option<unsafe extern "C" fn(reader: ReadToken, value: *mut u32) -> OsErr>,
    pub get_simple_reference:
        Option<unsafe extern "C" fn(reader: ReadToken, value: *mut SimpleReference) -> OsErr>,
    pub get_object: Option<
        unsafe extern "C" fn(reader: ReadToken, class: *mut u32, value: *mut RawHandle) -> OsErr,
    >,
    pub get_count: Option<unsafe extern "C" fn(reader: ReadToken, value: *mut u32) -> OsErr>,
    pub get_string: Option<unsafe extern "C" fn(reader: ReadToken, value: *mut [u8; 256]) -> OsErr>,
    pub get_pinned_integer:
        Option<unsafe extern "C" fn(reader: ReadToken, min: i32, max: i32, value: *mut i32) -> OsErr>,
    pub get_pinned_float: Option<
        unsafe extern "C" fn(reader: ReadToken, min: *const f64, max: *const f64, value: *mut f64) -> OsErr,
    >,
    pub get_pinned_unit_float: Option<
        unsafe extern "C" fn(
            reader: ReadToken,
            min: *const f64,
            max: *const f64,
            unit: *mut u32,
            value: *mut f64,
        ) -> OsErr,
    >,
}

/// Legacy descriptor writer procs.
#[allow(missing_docs)]
#[derive(Debug)]
#[repr(C)]
pub struct WriteDescriptorProcs {
    pub version: i16,
    pub count: i16,
    pub open: Option<unsafe extern "C" fn() -> WriteToken>,
    pub close: Option<unsafe extern "C" fn(writer: WriteToken, descriptor: *mut RawHandle) -> OsErr>,
    pub put_integer: Option<unsafe extern "C" fn(writer: WriteToken, key: u32, value: i32) -> OsErr>,
    pub put_float: Option<unsafe extern "C" fn(writer: WriteToken, key: u32, value: *const f64) -> OsErr>,
    pub put_unit_float: Option<
        unsafe extern "C" fn(writer: WriteToken, key: u32, unit: u32, value: *const f64) -> OsErr,
    >,
    pub put_boolean: Option<unsafe extern "C" fn(writer: WriteToken, key: u32, value: Boolean) -> OsErr>,
    pub put_text: Option<unsafe extern "C" fn(writer: WriteToken, key: u32, value: RawHandle) -> OsErr>,
    pub put_alias: Option<unsafe extern "C" fn(writer: WriteToken, key: u32, value: RawHandle) -> OsErr>,
    pub put_enumerated:
        Option<unsafe extern "C" fn(writer: WriteToken, key: u32, kind: u32, value: u32) -> OsErr>,
    pub put_class: Option<unsafe extern "C" fn(writer: WriteToken, key: u32, value: u32) -> OsErr>,
    pub put_simple_reference: Option<
        unsafe extern "C" fn(writer: WriteToken, key: u32, value: *const SimpleReference) -> OsErr,
    >,
    pub put_object:
        Option<unsafe extern "C" fn(writer: WriteToken, key: u32, class: u32, value: RawHandle) -> OsErr>,
    pub put_count: Option<unsafe extern "C" fn(writer: WriteToken, key: u32, count: u32) -> OsErr>,
    pub put_string:
        Option<unsafe extern "C" fn(writer: WriteToken, key: u32, value: *const u8) -> OsErr>,
    pub put_scoped_class: Option<unsafe extern "C" fn(writer: WriteToken, key: u32, value: u32) -> OsErr>,
    pub put_scoped_object:
        Option<unsafe extern "C" fn(writer: WriteToken, key: u32, class: u32, value: RawHandle) -> OsErr>,
}

// ============================================================================
// PICA
// ============================================================================

/// The basic suite.
#[allow(missing_docs)]
#[derive(Debug)]
#[repr(C)]
pub struct SpBasicSuite {
    pub acquire_suite:
        Option<unsafe extern "C" fn(name: *const c_char, version: i32, suite: *mut *const c_void) -> SpErr>,
    pub release_suite: Option<unsafe extern "C" fn(name: *const c_char, version: i32) -> SpErr>,
    pub is_equal: Option<unsafe extern "C" fn(a: *const c_char, b: *const c_char) -> i32>,
    pub allocate_block: Option<unsafe extern "C" fn(size: usize, block: *mut *mut c_void) -> SpErr>,
    pub free_block: Option<unsafe extern "C" fn(block: *mut c_void) -> SpErr>,
    pub reallocate_block:
        Option<unsafe extern "C" fn(block: *mut c_void, size: usize, new_block: *mut *mut c_void) -> SpErr>,
    pub undefined: Option<unsafe extern "C" fn() -> SpErr>,
}

/// Opaque action token.
pub type ActionToken = *mut c_void;

/// Action descriptor suite.
#[allow(missing_docs)]
#[derive(Debug)]
#[repr(C)]
pub struct ActionDescriptorProcs {
    pub make: Option<unsafe extern "C" fn(desc: *mut ActionToken) -> SpErr>,
    pub free: Option<unsafe extern "C" fn(desc: ActionToken) -> SpErr>,
    pub get_type: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, kind: *mut u32) -> SpErr>,
    pub get_key: Option<unsafe extern "C" fn(desc: ActionToken, index: u32, key: *mut u32) -> SpErr>,
    pub has_key: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, has: *mut Boolean) -> SpErr>,
    pub get_count: Option<unsafe extern "C" fn(desc: ActionToken, count: *mut u32) -> SpErr>,
    pub is_equal:
        Option<unsafe extern "C" fn(desc: ActionToken, other: ActionToken, equal: *mut Boolean) -> SpErr>,
    pub erase: Option<unsafe extern "C" fn(desc: ActionToken, key: u32) -> SpErr>,
    pub clear: Option<unsafe extern "C" fn(desc: ActionToken) -> SpErr>,
    pub put_integer: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: i32) -> SpErr>,
    pub put_float: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: f64) -> SpErr>,
    pub put_unit_float:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, unit: u32, value: f64) -> SpErr>,
    pub put_string:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: *const c_char) -> SpErr>,
    pub put_boolean: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: Boolean) -> SpErr>,
    pub put_list: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: ActionToken) -> SpErr>,
    pub put_object:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, class: u32, value: ActionToken) -> SpErr>,
    pub put_global_object:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, class: u32, value: ActionToken) -> SpErr>,
    pub put_enumerated:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, kind: u32, value: u32) -> SpErr>,
    pub put_reference:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: ActionToken) -> SpErr>,
    pub put_class: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: u32) -> SpErr>,
    pub put_global_class: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: u32) -> SpErr>,
    pub put_alias: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: RawHandle) -> SpErr>,
    pub get_integer: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: *mut i32) -> SpErr>,
    pub get_float: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: *mut f64) -> SpErr>,
    pub get_unit_float: Option<
        unsafe extern "C" fn(desc: ActionToken, key: u32, unit: *mut u32, value: *mut f64) -> SpErr,
    >,
    pub get_string_length:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, length: *mut u32) -> SpErr>,
    pub get_string: Option<
        unsafe extern "C" fn(desc: ActionToken, key: u32, value: *mut c_char, max: u32) -> SpErr,
    >,
    pub get_boolean:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: *mut Boolean) -> SpErr>,
    pub get_list:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: *mut ActionToken) -> SpErr>,
    pub get_object: Option<
        unsafe extern "C" fn(desc: ActionToken, key: u32, class: *mut u32, value: *mut ActionToken) -> SpErr,
    >,
    pub get_global_object: Option<
        unsafe extern "C" fn(desc: ActionToken, key: u32, class: *mut u32, value: *mut ActionToken) -> SpErr,
    >,
    pub get_enumerated: Option<
        unsafe extern "C" fn(desc: ActionToken, key: u32, kind: *mut u32, value: *mut u32) -> SpErr,
    >,
    pub get_reference:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: *mut ActionToken) -> SpErr>,
    pub get_class: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: *mut u32) -> SpErr>,
    pub get_global_class:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: *mut u32) -> SpErr>,
    pub get_alias:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: *mut RawHandle) -> SpErr>,
    pub has_keys:
        Option<unsafe extern "C" fn(desc: ActionToken, keys: *const u32, has: *mut Boolean) -> SpErr>,
    pub put_integers: Option<
        unsafe extern "C" fn(desc: ActionToken, key: u32, count: u32, values: *const i32) -> SpErr,
    >,
    pub get_integers:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, count: u32, values: *mut i32) -> SpErr>,
    pub as_handle: Option<unsafe extern "C" fn(desc: ActionToken, handle: *mut RawHandle) -> SpErr>,
    pub handle_to_descriptor:
        Option<unsafe extern "C" fn(handle: RawHandle, desc: *mut ActionToken) -> SpErr>,
    pub put_zstring: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: *mut c_void) -> SpErr>,
    pub get_zstring:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: *mut *mut c_void) -> SpErr>,
    pub put_data: Option<
        unsafe extern "C" fn(desc: ActionToken, key: u32, length: i32, value: *const c_void) -> SpErr,
    >,
    pub get_data_length:
        Option<unsafe extern "C" fn(desc: ActionToken, key: u32, length: *mut i32) -> SpErr>,
    pub get_data: Option<unsafe extern "C" fn(desc: ActionToken, key: u32, value: *mut c_void) -> SpErr>,
}

/// Action list suite.
#[allow(missing_docs)]
#[derive(Debug)]
#[repr(C)]
pub struct ActionListProcs {
    pub make: Option<unsafe extern "C" fn(list: *mut ActionToken) -> SpErr>,
    pub free: Option<unsafe extern "C" fn(list: ActionToken) -> SpErr>,
    pub get_type: Option<unsafe extern "C" fn(list: ActionToken, index: u32, kind: *mut u32) -> SpErr>,
    pub get_count: Option<unsafe extern "C" fn(list: ActionToken, count: *mut u32) -> SpErr>,
    pub put_integer: Option<unsafe extern "C" fn(list: ActionToken, value: i32) -> SpErr>,
    pub put_float: Option<unsafe extern "C" fn(list: ActionToken, value: f64) -> SpErr>,
    pub put_unit_float: Option<unsafe extern "C" fn(list: ActionToken, unit: u32, value: f64) -> SpErr>,
    pub put_string: Option<unsafe extern "C" fn(list: ActionToken, value: *const c_char) -> SpErr>,
    pub put_boolean: Option<unsafe extern "C" fn(list: ActionToken, value: Boolean) -> SpErr>,
    pub put_list: Option<unsafe extern "C" fn(list: ActionToken, value: ActionToken) -> SpErr>,
    pub put_object: Option<unsafe extern "C" fn(list: ActionToken, class: u32, value: ActionToken) -> SpErr>,
    pub put_global_object:
        Option<unsafe extern "C" fn(list: ActionToken, class: u32, value: ActionToken) -> SpErr>,
    pub put_enumerated: Option<unsafe extern "C" fn(list: ActionToken, kind: u32, value: u32) -> SpErr>,
    pub put_reference: Option<unsafe extern "C" fn(list: ActionToken, value: ActionToken) -> SpErr>,
    pub put_class: Option<unsafe extern "C" fn(list: ActionToken, value: u32) -> SpErr>,
    pub put_global_class: Option<unsafe extern "C" fn(list: ActionToken, value: u32) -> SpErr>,
    pub put_alias: Option<unsafe extern "C" fn(list: ActionToken, value: RawHandle) -> SpErr>,
    pub get_integer: Option<unsafe extern "C" fn(list: ActionToken, index: u32, value: *mut i32) -> SpErr>,
    pub get_float: Option<unsafe extern "C" fn(list: ActionToken, index: u32, value: *mut f64) -> SpErr>,
    pub get_unit_float: Option<
        unsafe extern "C" fn(list: ActionToken, index: u32, unit: *mut u32, value: *mut f64) -> SpErr,
    >,
    pub get_string_length:
        Option<unsafe extern "C" fn(list: ActionToken, index: u32, length: *mut u32) -> SpErr>,
    pub get_string: Option<
        unsafe extern "C" fn(list: ActionToken, index: u32, value: *mut c_char, max: u32) -> SpErr,
    >,
    pub get_boolean:
        Option<unsafe extern "C" fn(list: ActionToken, index: u32, value: *mut Boolean) -> SpErr>,
    pub get_list:
        Option<unsafe extern "C" fn(list: ActionToken, index: u32, value: *mut ActionToken) -> SpErr>,
    pub get_object: Option<
        unsafe extern "C" fn(list: ActionToken, index: u32, class: *mut u32, value: *mut ActionToken) -> SpErr,
    >,
    pub get_global_object: Option<
        unsafe extern "C" fn(list: ActionToken, index: u32, class: *mut u32, value: *mut ActionToken) -> SpErr,
    >,
    pub get_enumerated: Option<
        unsafe extern "C" fn(list: ActionToken, index: u32, kind: *mut u32, value: *mut u32) -> SpErr,
    >,
    pub get_reference:
        Option<unsafe extern "C" fn(list: ActionToken, index: u32, value: *mut ActionToken) -> SpErr>,
    pub get_class: Option<unsafe extern "C" fn(list: ActionToken, index: u32, value: *mut u32) -> SpErr>,
    pub get_global_class:
        Option<unsafe extern "C" fn(list: ActionToken, index: u32, value: *mut u32) -> SpErr>,
    pub get_alias:
        Option<unsafe extern "C" fn(list: ActionToken, index: u32, value: *mut RawHandle) -> SpErr>,
    pub put_integers:
        Option<unsafe extern "C" fn(list: ActionToken, count: u32, values: *const i32) -> SpErr>,
    pub get_integers: Option<unsafe extern "C" fn(list: ActionToken, count: u32, values: *mut i32) -> SpErr>,
    pub put_data:
        Option<unsafe extern "C" fn(list: ActionToken, length: i32, value: *const c_void) -> SpErr>,
    pub get_data_length:
        Option<unsafe extern "C" fn(list: ActionToken, index: u32, length: *mut i32) -> SpErr>,
    pub get_data: Option<unsafe extern "C" fn(list: ActionToken, index: u32, value: *mut c_void) -> SpErr>,
    pub put_zstring: Option<unsafe extern "C" fn(list: ActionToken, value: *mut c_void) -> SpErr>,
    pub get_zstring:
        Option<unsafe extern "C" fn(list: ActionToken, index: u32, value: *mut *mut c_void) -> SpErr>,
}

/// Action reference suite.
#[allow(missing_docs)]
#[derive(Debug)]
#[repr(C)]
pub struct ActionReferenceProcs {
    pub make: Option<unsafe extern "C" fn(reference: *mut ActionToken) -> SpErr>,
    pub free: Option<unsafe extern "C" fn(reference: ActionToken) -> SpErr>,
    pub get_form: Option<unsafe extern "C" fn(reference: ActionToken, form: *mut u32) -> SpErr>,
    pub get_desired_class: Option<unsafe extern "C" fn(reference: ActionToken, class: *mut u32) -> SpErr>,
    pub put_name:
        Option<unsafe extern "C" fn(reference: ActionToken, class: u32, value: *const c_char) -> SpErr>,
    pub put_index: Option<unsafe extern "C" fn(reference: ActionToken, class: u32, value: u32) -> SpErr>,
    pub put_identifier:
        Option<unsafe extern "C" fn(reference: ActionToken, class: u32, value: u32) -> SpErr>,
    pub put_offset: Option<unsafe extern "C" fn(reference: ActionToken, class: u32, value: i32) -> SpErr>,
    pub put_enumerated:
        Option<unsafe extern "C" fn(reference: ActionToken, class: u32, kind: u32, value: u32) -> SpErr>,
    pub put_property: Option<unsafe extern "C" fn(reference: ActionToken, class: u32, key: u32) -> SpErr>,
    pub put_class: Option<unsafe extern "C" fn(reference: ActionToken, class: u32) -> SpErr>,
    pub get_name_length: Option<unsafe extern "C" fn(reference: ActionToken, length: *mut u32) -> SpErr>,
    pub get_name:
        Option<unsafe extern "C" fn(reference: ActionToken, value: *mut c_char, max: u32) -> SpErr>,
    pub get_index: Option<unsafe extern "C" fn(reference: ActionToken, value: *mut u32) -> SpErr>,
    pub get_identifier: Option<unsafe extern "C" fn(reference: ActionToken, value: *mut u32) -> SpErr>,
    pub get_offset: Option<unsafe extern "C" fn(reference: ActionToken, value: *mut i32) -> SpErr>,
    pub get_enumerated:
        Option<unsafe extern "C" fn(reference: ActionToken, kind: *mut u32, value: *mut u32) -> SpErr>,
    pub get_property: Option<unsafe extern "C" fn(reference: ActionToken, key: *mut u32) -> SpErr>,
    pub get_container:
        Option<unsafe extern "C" fn(reference: ActionToken, container: *mut ActionToken) -> SpErr>,
}

// ============================================================================
// Assembly
// ============================================================================

/// Every table a run exposes, at stable addresses.
#[derive(Debug)]
pub struct ProcTables {
    /// Buffer suite.
    pub buffer: super::NativeBox<BufferProcs>,
    /// Handle suite.
    pub handle: super::NativeBox<HandleProcs>,
    /// Resource suite.
    pub resource: super::NativeBox<ResourceProcs>,
    /// Property suite.
    pub property: super::NativeBox<PropertyProcs>,
    /// Image services.
    pub image_services: super::NativeBox<ImageServicesProcs>,
    /// Channel ports.
    pub channel_ports: super::NativeBox<ChannelPortProcs>,
    /// Descriptor reader.
    pub read_descriptor: super::NativeBox<ReadDescriptorProcs>,
    /// Descriptor writer.
    pub write_descriptor: super::NativeBox<WriteDescriptorProcs>,
    /// Basic suite.
    pub basic: super::NativeBox<SpBasicSuite>,
    /// Action descriptors.
    pub action_descriptor: super::NativeBox<ActionDescriptorProcs>,
    /// Action lists.
    pub action_list: super::NativeBox<ActionListProcs>,
    /// Action references.
    pub action_reference: super::NativeBox<ActionReferenceProcs>,
}

impl ProcTables {
    /// Build every table.
    pub fn new() -> Self {
        use super::NativeBox;
        Self {
            buffer: NativeBox::new(super::memory_procs::buffer_procs()),
            handle: NativeBox::new(super::memory_procs::handle_procs()),
            resource: NativeBox::new(super::memory_procs::resource_procs()),
            property: NativeBox::new(super::memory_procs::property_procs()),
            image_services: NativeBox::new(super::memory_procs::image_services_procs()),
            channel_ports: NativeBox::new(super::memory_procs::channel_port_procs()),
            read_descriptor: NativeBox::new(super::descriptor_procs::read_procs()),
            write_descriptor: NativeBox::new(super::descriptor_procs::write_procs()),
            basic: NativeBox::new(super::action_procs::basic_suite()),
            action_descriptor: NativeBox::new(super::action_procs::descriptor_procs()),
            action_list: NativeBox::new(super::action_procs::list_procs()),
            action_reference: NativeBox::new(super::action_procs::reference_procs()),
        }
    }
}

impl Default for ProcTables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_fully_populated() {
        let tables = ProcTables::new();
        // SAFETY: No native code holds these tables.
        unsafe {
            let handle = tables.handle.get();
            assert_eq!(handle.count, 8);
            assert!(handle.dispose_regular.is_some());
            assert!(tables.read_descriptor.get().get_pinned_unit_float.is_some());
            assert!(tables.action_reference.get().get_container.is_some());
            assert!(tables.basic.get().undefined.is_some());
        }
    }

    #[test]
    fn test_pica_tables_are_pointer_arrays() {
        let ptr = std::mem::size_of::<usize>();
        assert_eq!(std::mem::size_of::<SpBasicSuite>(), 7 * ptr);
        assert_eq!(std::mem::size_of::<ActionReferenceProcs>(), 19 * ptr);
        assert_eq!(std::mem::size_of::<ActionListProcs>(), 38 * ptr);
        assert_eq!(std::mem::size_of::<ActionDescriptorProcs>(), 46 * ptr);
    }
}
