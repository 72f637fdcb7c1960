//! The filter parameter block.

use std::ffi::c_void;

use super::{
    Boolean, BufferProcs, ChannelPortProcs, ColorServicesInfo, Fixed, HandleProcs,
    ImageServicesProcs, OsErr, Point16, PropertyProcs, PsPixelMap, RawHandle,
    ReadDescriptorProcs, Rect16, ResourceProcs, RgbColor16, SpBasicSuite, VRect,
    WriteDescriptorProcs,
};

/// Abort poll.
pub type TestAbortProc = unsafe extern "C" fn() -> Boolean;
/// Progress report.
pub type ProgressProc = unsafe extern "C" fn(done: i32, total: i32);
/// Host-specific callback.
pub type HostProc = unsafe extern "C" fn(selector: i16, data: *mut isize);
/// Platform event hook.
pub type ProcessEventProc = unsafe extern "C" fn(event: *mut c_void);
/// Preview drawing.
pub type DisplayPixelsProc = unsafe extern "C" fn(
    source: *const PsPixelMap,
    src_rect: *const VRect,
    dst_row: i32,
    dst_col: i32,
    platform_context: *mut c_void,
) -> OsErr;
/// Tile request.
pub type AdvanceStateProc = unsafe extern "C" fn() -> OsErr;
/// Color services.
pub type ColorServicesProc = unsafe extern "C" fn(info: *mut ColorServicesInfo) -> OsErr;
/// Obsolete direct property getter.
pub type GetPropertyProc = unsafe extern "C" fn(
    signature: u32,
    key: u32,
    index: i32,
    simple: *mut isize,
    complex: *mut RawHandle,
) -> OsErr;

/// Display calibration.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct PlugInMonitor {
    /// Gamma.
    pub gamma: Fixed,
    /// Red primary x.
    pub red_x: Fixed,
    /// Red primary y.
    pub red_y: Fixed,
    /// Green primary x.
    pub green_x: Fixed,
    /// Green primary y.
    pub green_y: Fixed,
    /// Blue primary x.
    pub blue_x: Fixed,
    /// Blue primary y.
    pub blue_y: Fixed,
    /// White point x.
    pub white_x: Fixed,
    /// White point y.
    pub white_y: Fixed,
    /// Ambient light.
    pub ambient: Fixed,
}

impl PlugInMonitor {
    /// sRGB primaries, D65 white, gamma 2.2.
    pub fn srgb() -> Self {
        let fixed = |v: f64| (v * 65536.0).round() as Fixed;
        Self {
            gamma: fixed(2.2),
            red_x: fixed(0.64),
            red_y: fixed(0.33),
            green_x: fixed(0.30),
            green_y: fixed(0.60),
            blue_x: fixed(0.15),
            blue_y: fixed(0.06),
            white_x: fixed(0.3127),
            white_y: fixed(0.3290),
            ambient: fixed(1.0),
        }
    }
}

/// Scripting parameters.
#[derive(Debug)]
#[repr(C)]
pub struct DescriptorParameters {
    /// Structure version.
    pub version: i16,
    /// Whether to show the dialog (see [`play_info`]).
    pub play_info: i16,
    /// Whether the filter should record (see [`record_info`]).
    pub record_info: i16,
    /// Descriptor handle passed in and returned.
    pub descriptor: RawHandle,
    /// Writer procs.
    pub write_descriptor_procs: *mut WriteDescriptorProcs,
    /// Reader procs.
    pub read_descriptor_procs: *mut ReadDescriptorProcs,
}

/// `play_info` values.
pub mod play_info {
    /// Run silently with the supplied descriptor.
    pub const DONT_DISPLAY: i16 = 0;
    /// Show the dialog.
    pub const DISPLAY: i16 = 1;
    /// Run without any UI.
    pub const SILENT: i16 = 2;
}

/// `record_info` values.
pub mod record_info {
    /// Recording optional.
    pub const OPTIONAL: i16 = 0;
    /// Recording required.
    pub const REQUIRED: i16 = 1;
    /// Do not record.
    pub const NONE: i16 = 2;
}

/// Padding policy values of `input_padding`, `output_padding` and
/// `mask_padding`.
pub mod padding {
    /// Replicate the nearest edge pixel.
    pub const EDGE_REPLICATION: i16 = -1;
    /// Leave out-of-bounds bytes alone.
    pub const NONE: i16 = -2;
    /// Fail the request.
    pub const ERROR_ON_BOUNDS: i16 = -3;
}

/// The parameter block passed to every selector.
///
/// Field names follow the native layout; see the plugin interface headers
/// for their meaning.
#[allow(missing_docs)]
#[derive(Debug)]
#[repr(C)]
pub struct FilterRecord {
    pub serial_number: i32,
    pub abort_proc: Option<TestAbortProc>,
    pub progress_proc: Option<ProgressProc>,
    pub parameters: RawHandle,
    pub image_size: Point16,
    pub planes: i16,
    pub filter_rect: Rect16,
    pub background: RgbColor16,
    pub foreground: RgbColor16,
    pub max_space: i32,
    pub buffer_space: i32,
    pub in_rect: Rect16,
    pub in_lo_plane: i16,
    pub in_hi_plane: i16,
    pub out_rect: Rect16,
    pub out_lo_plane: i16,
    pub out_hi_plane: i16,
    pub in_data: *mut c_void,
    pub in_row_bytes: i32,
    pub out_data: *mut c_void,
    pub out_row_bytes: i32,
    pub is_floating: Boolean,
    pub have_mask: Boolean,
    pub auto_mask: Boolean,
    pub mask_rect: Rect16,
    pub mask_data: *mut c_void,
    pub mask_row_bytes: i32,
    pub back_color: [u8; 4],
    pub fore_color: [u8; 4],
    pub host_sig: u32,
    pub host_proc: Option<HostProc>,
    pub image_mode: i16,
    pub image_h_res: Fixed,
    pub image_v_res: Fixed,
    pub float_coord: Point16,
    pub whole_size: Point16,
    pub monitor: PlugInMonitor,
    pub platform_data: *mut c_void,
    pub buffer_procs: *mut BufferProcs,
    pub resource_procs: *mut ResourceProcs,
    pub process_event: Option<ProcessEventProc>,
    pub display_pixels: Option<DisplayPixelsProc>,
    pub handle_procs: *mut HandleProcs,

    pub supports_dummy_channels: Boolean,
    pub supports_alternate_layouts: Boolean,
    pub want_layout: i16,
    pub filter_case: i16,
    pub dummy_plane_value: i16,
    pub premiere_hook: *mut c_void,
    pub advance_state: Option<AdvanceStateProc>,
    pub supports_absolute: Boolean,
    pub wants_absolute: Boolean,
    pub get_property_obsolete: Option<GetPropertyProc>,
    pub cannot_undo: Boolean,
    pub supports_padding: Boolean,
    pub input_padding: i16,
    pub output_padding: i16,
    pub mask_padding: i16,
    pub sampling_support: i8,
    pub reserved_byte: i8,
    pub input_rate: Fixed,
    pub mask_rate: Fixed,
    pub color_services: Option<ColorServicesProc>,

    pub in_layer_planes: i16,
    pub in_transparency_mask: i16,
    pub in_layer_masks: i16,
    pub in_inverted_layer_masks: i16,
    pub in_non_layer_planes: i16,
    pub out_layer_planes: i16,
    pub out_transparency_mask: i16,
    pub out_layer_masks: i16,
    pub out_inverted_layer_masks: i16,
    pub out_non_layer_planes: i16,
    pub abs_layer_planes: i16,
    pub abs_transparency_mask: i16,
    pub abs_layer_masks: i16,
    pub abs_inverted_layer_masks: i16,
    pub abs_non_layer_planes: i16,
    pub in_pre_dummy_planes: i16,
    pub in_post_dummy_planes: i16,
    pub out_pre_dummy_planes: i16,
    pub out_post_dummy_planes: i16,
    pub in_column_bytes: i32,
    pub in_plane_bytes: i32,
    pub out_column_bytes: i32,
    pub out_plane_bytes: i32,

    pub image_services_procs: *mut ImageServicesProcs,
    pub property_procs: *mut PropertyProcs,
    pub in_tile_height: i16,
    pub in_tile_width: i16,
    pub in_tile_origin: Point16,
    pub abs_tile_height: i16,
    pub abs_tile_width: i16,
    pub abs_tile_origin: Point16,
    pub out_tile_height: i16,
    pub out_tile_width: i16,
    pub out_tile_origin: Point16,
    pub mask_tile_height: i16,
    pub mask_tile_width: i16,
    pub mask_tile_origin: Point16,

    pub descriptor_parameters: *mut DescriptorParameters,
    pub error_string: *mut [u8; 256],
    pub channel_port_procs: *mut ChannelPortProcs,
    pub document_info: *mut c_void,

    pub sp_basic: *mut SpBasicSuite,
    pub plug_in_ref: *mut c_void,
    pub depth: i32,

    pub icc_profile_data: RawHandle,
    pub icc_profile_size: i32,
    pub can_use_icc_profiles: i32,

    pub has_image_scrap: i32,
    pub big_document_data: *mut c_void,

    pub reserved: [u8; 512],
}

impl FilterRecord {
    /// A record with every field zero, null or absent.
    pub fn zeroed() -> Self {
        // SAFETY: Every field is an integer, a raw pointer, an array of
        // bytes or an `Option` of a function pointer; all-zero is a valid
        // value for each (null / `None` / 0).
        unsafe { std::mem::zeroed() }
    }

    /// Requested input planes as `(lo, count)`.
    pub fn input_planes(&self) -> (i16, usize) {
        plane_range(self.in_lo_plane, self.in_hi_plane)
    }

    /// Requested output planes as `(lo, count)`.
    pub fn output_planes(&self) -> (i16, usize) {
        plane_range(self.out_lo_plane, self.out_hi_plane)
    }
}

fn plane_range(lo: i16, hi: i16) -> (i16, usize) {
    if lo < 0 || hi < lo {
        (lo, 0)
    } else {
        (lo, (hi - lo + 1) as usize)
    }
}

/// Parameter block of the about selector.
#[derive(Debug)]
#[repr(C)]
pub struct AboutRecord {
    /// Platform window data.
    pub platform_data: *mut c_void,
    /// Basic suite.
    pub sp_basic: *mut SpBasicSuite,
    /// Plugin reference.
    pub plugin_ref: *mut c_void,
    /// Reserved.
    pub reserved: [u8; 244],
}

impl AboutRecord {
    /// A record carrying only the basic suite.
    pub fn new(sp_basic: *mut SpBasicSuite) -> Self {
        Self {
            platform_data: std::ptr::null_mut(),
            sp_basic,
            plugin_ref: std::ptr::null_mut(),
            reserved: [0; 244],
        }
    }
}

/// Legacy descriptor simple reference.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct SimpleReference {
    /// Desired class.
    pub desired_class: u32,
    /// Key form.
    pub key_form: u32,
    /// Name form payload.
    pub name: [u8; 256],
    /// Index form payload.
    pub index: i32,
    /// Enumerated form type.
    pub kind: u32,
    /// Enumerated form value.
    pub value: u32,
}
