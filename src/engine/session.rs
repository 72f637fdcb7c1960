//! State of one filter run, shared with the callbacks.
//!
//! The session owns the parameter block, the callback tables, every suite
//! and the tile buffers. All of them sit at stable heap addresses, because
//! the filter keeps pointers into them across selector calls.

use std::collections::HashMap;
use std::ffi::c_void;

use crate::abi::{
    DescriptorParameters, FilterRecord, NativeBox, Point16, ProcTables, Rect16, RgbColor16,
    callbacks, padding, play_info, record_info,
};
use crate::error::Result;
use crate::fourcc::FourCC;
use crate::geometry::Rect;
use crate::plugin::FilterCase;
use crate::suites::{SuiteRegistry, Token};
use crate::surface::{SelectionMask, Surface};

use super::filter_case::CaseSelection;
use super::persist::RestoredMemory;
use super::tiles::{self, Padding, TileRequest};
use super::{AbortPoll, PreviewSink, ProgressSink};

const RGB_MODE: i16 = 3;
const SCREEN_RESOLUTION: i32 = 72 << 16;
const UNITY_RATE: i32 = 1 << 16;

/// Deduplicates progress before it reaches the sink.
#[derive(Default)]
pub(crate) struct ProgressTracker {
    sink: Option<Box<dyn ProgressSink>>,
    last: Option<u8>,
}

impl ProgressTracker {
    pub(crate) fn new(sink: Option<Box<dyn ProgressSink>>) -> Self {
        Self { sink, last: None }
    }

    /// Forward `done` of `total` as a percentage, skipping repeats.
    pub(crate) fn report(&mut self, done: i32, total: i32) {
        let percent = if total <= 0 {
            0
        } else {
            (i64::from(done) * 100 / i64::from(total)).clamp(0, 100) as u8
        };
        if self.last == Some(percent) {
            return;
        }
        self.last = Some(percent);
        tracing::trace!(percent, "progress");
        if let Some(sink) = self.sink.as_mut() {
            sink.report(percent);
        }
    }
}

#[derive(Debug, Default)]
struct Tile {
    request: Option<TileRequest>,
    buffer: Vec<u8>,
}

impl Tile {
    /// Refill the buffer if `request` differs from the last one. Returns
    /// whether a new tile was delivered.
    fn provision(
        &mut self,
        request: TileRequest,
        read: impl FnOnce(&TileRequest, &mut Vec<u8>) -> Result<()>,
    ) -> Result<bool> {
        if self.request == Some(request) {
            return Ok(false);
        }
        self.request = None;
        read(&request, &mut self.buffer)?;
        self.request = Some(request);
        Ok(!request.is_empty())
    }

    fn data(&mut self) -> *mut c_void {
        if self.buffer.is_empty() {
            std::ptr::null_mut()
        } else {
            self.buffer.as_mut_ptr().cast()
        }
    }

    fn clear(&mut self) {
        self.request = None;
        self.buffer = Vec::new();
    }
}

fn tile_request(rect: Rect16, (lo, count): (i16, usize), pad: i16, available: usize) -> TileRequest {
    let lo = lo.max(0) as usize;
    TileRequest {
        rect: rect.into(),
        lo_plane: lo,
        planes: count.min(available.saturating_sub(lo)),
        padding: Padding::from_raw(pad),
    }
}

/// What a session is built from.
pub(crate) struct SessionParts {
    pub registry: SuiteRegistry,
    pub selection: CaseSelection,
    pub input: Surface,
    pub destination: Surface,
    pub foreground: [u8; 3],
    pub background: [u8; 3],
    pub host_signature: FourCC,
    pub max_space: u64,
    pub progress: Option<Box<dyn ProgressSink>>,
    pub abort: Option<Box<dyn AbortPoll>>,
    pub preview: Option<Box<dyn PreviewSink>>,
    pub plugin: String,
}

/// Everything one run shares between the engine and the callbacks.
pub(crate) struct HostSession {
    pub registry: SuiteRegistry,
    pub input: Surface,
    pub destination: Surface,
    pub mask: Option<SelectionMask>,
    pub record: NativeBox<FilterRecord>,
    pub tables: ProcTables,
    pub descriptor_parameters: NativeBox<DescriptorParameters>,
    pub error_string: NativeBox<[u8; 256]>,
    pub progress: ProgressTracker,
    pub abort: Option<Box<dyn AbortPoll>>,
    pub preview: Option<Box<dyn PreviewSink>>,
    /// Tile failure reported through `advance_state`, surfaced after the
    /// selector returns.
    pub tile_error: Option<crate::Error>,
    /// Expected-key arrays of open legacy readers.
    pub reader_keys: HashMap<Token, *mut u32>,
    pub restored: RestoredMemory,
    pub plugin: String,
    planes: usize,
    input_tile: Tile,
    output_tile: Tile,
    mask_tile: Tile,
    tiles_delivered: u64,
}

impl HostSession {
    pub(crate) fn new(parts: SessionParts) -> Self {
        let session = Self {
            registry: parts.registry,
            mask: parts.selection.mask.clone(),
            input: parts.input,
            destination: parts.destination,
            record: NativeBox::new(FilterRecord::zeroed()),
            tables: ProcTables::new(),
            descriptor_parameters: NativeBox::new(DescriptorParameters {
                version: 0,
                play_info: play_info::DISPLAY,
                record_info: record_info::OPTIONAL,
                descriptor: std::ptr::null_mut(),
                write_descriptor_procs: std::ptr::null_mut(),
                read_descriptor_procs: std::ptr::null_mut(),
            }),
            error_string: NativeBox::new([0; 256]),
            progress: ProgressTracker::new(parts.progress),
            abort: parts.abort,
            preview: parts.preview,
            tile_error: None,
            reader_keys: HashMap::new(),
            restored: RestoredMemory::new(),
            plugin: parts.plugin,
            planes: parts.selection.planes.max(0) as usize,
            input_tile: Tile::default(),
            output_tile: Tile::default(),
            mask_tile: Tile::default(),
            tiles_delivered: 0,
        };
        session.init_record(
            &parts.selection,
            parts.foreground,
            parts.background,
            parts.host_signature,
            parts.max_space,
        );
        session
    }

    fn init_record(
        &self,
        selection: &CaseSelection,
        foreground: [u8; 3],
        background: [u8; 3],
        host_signature: FourCC,
        max_space: u64,
    ) {
        let (width, height) = (self.input.width(), self.input.height());
        let image_size = Point16 {
            v: height as i16,
            h: width as i16,
        };
        let alpha = selection.has_alpha_plane();
        let (layer_planes, transparency, non_layer) = if alpha { (3, 1, 0) } else { (0, 0, 3) };

        // SAFETY: No filter code is running; the session was just built.
        let params = unsafe { self.descriptor_parameters.get_mut() };
        params.write_descriptor_procs = self.tables.write_descriptor.as_ptr();
        params.read_descriptor_procs = self.tables.read_descriptor.as_ptr();

        // SAFETY: As above.
        let r = unsafe { self.record.get_mut() };
        r.abort_proc = Some(callbacks::test_abort);
        r.progress_proc = Some(callbacks::update_progress);
        r.image_size = image_size;
        r.whole_size = image_size;
        r.planes = selection.planes;
        r.filter_rect = selection.filter_rect(width, height).into();
        r.background = RgbColor16::from_rgb8(background);
        r.foreground = RgbColor16::from_rgb8(foreground);
        r.back_color = [background[0], background[1], background[2], 0];
        r.fore_color = [foreground[0], foreground[1], foreground[2], 0];
        r.max_space = max_space.min(i32::MAX as u64) as i32;
        r.is_floating = u8::from(selection.case == FilterCase::FloatingSelection);
        r.have_mask = u8::from(self.mask.is_some());
        r.auto_mask = 1;
        r.host_sig = host_signature.value();
        r.host_proc = Some(callbacks::host_proc);
        r.image_mode = RGB_MODE;
        r.image_h_res = SCREEN_RESOLUTION;
        r.image_v_res = SCREEN_RESOLUTION;
        r.monitor = crate::abi::PlugInMonitor::srgb();
        r.buffer_procs = self.tables.buffer.as_ptr();
        r.resource_procs = self.tables.resource.as_ptr();
        r.handle_procs = self.tables.handle.as_ptr();
        r.process_event = Some(callbacks::process_event);
        r.display_pixels = Some(callbacks::display_pixels);
        r.filter_case = selection.case as i16;
        r.dummy_plane_value = -1;
        r.advance_state = Some(callbacks::advance_state);
        r.supports_absolute = 1;
        r.get_property_obsolete = Some(callbacks::get_property);
        r.supports_padding = 1;
        r.input_padding = padding::NONE;
        r.output_padding = padding::NONE;
        r.mask_padding = padding::NONE;
        r.input_rate = UNITY_RATE;
        r.mask_rate = UNITY_RATE;
        r.color_services = Some(callbacks::color_services);

        r.in_layer_planes = layer_planes;
        r.in_transparency_mask = transparency;
        r.in_non_layer_planes = non_layer;
        r.out_layer_planes = layer_planes;
        r.out_transparency_mask = transparency;
        r.out_non_layer_planes = non_layer;
        r.abs_layer_planes = layer_planes;
        r.abs_transparency_mask = transparency;
        r.abs_non_layer_planes = non_layer;

        r.image_services_procs = self.tables.image_services.as_ptr();
        r.property_procs = self.tables.property.as_ptr();
        for (tile_h, tile_w) in [
            (&mut r.in_tile_height, &mut r.in_tile_width),
            (&mut r.out_tile_height, &mut r.out_tile_width),
            (&mut r.abs_tile_height, &mut r.abs_tile_width),
            (&mut r.mask_tile_height, &mut r.mask_tile_width),
        ] {
            *tile_h = image_size.v;
            *tile_w = image_size.h;
        }
        r.descriptor_parameters = self.descriptor_parameters.as_ptr();
        r.error_string = self.error_string.as_ptr();
        r.channel_port_procs = self.tables.channel_ports.as_ptr();
        r.sp_basic = self.tables.basic.as_ptr();
        r.depth = 8;
    }

    /// Address of the parameter block handed to the filter.
    pub(crate) fn record_ptr(&self) -> *mut FilterRecord {
        self.record.as_ptr()
    }

    /// Parameter block.
    pub(crate) fn record(&self) -> &FilterRecord {
        // SAFETY: Called only between selector calls or from a callback,
        // while the filter is not touching the block.
        unsafe { self.record.get() }
    }

    /// Mutable parameter block.
    pub(crate) fn record_mut(&mut self) -> &mut FilterRecord {
        // SAFETY: As for `record`; `&mut self` rules out other host borrows.
        unsafe { self.record.get_mut() }
    }

    /// Scripting parameters.
    pub(crate) fn descriptor_parameters(&self) -> &DescriptorParameters {
        // SAFETY: As for `record`.
        unsafe { self.descriptor_parameters.get() }
    }

    /// Mutable scripting parameters.
    pub(crate) fn descriptor_parameters_mut(&mut self) -> &mut DescriptorParameters {
        // SAFETY: As for `record_mut`.
        unsafe { self.descriptor_parameters.get_mut() }
    }

    /// Text the filter left in the error string.
    pub(crate) fn error_string(&self) -> Option<String> {
        // SAFETY: As for `record`.
        let raw = unsafe { self.error_string.get() };
        let len = raw[0] as usize;
        (len > 0).then(|| String::from_utf8_lossy(&raw[1..=len]).into_owned())
    }

    /// Whether the filter requested nothing.
    pub(crate) fn requests_empty(&self) -> bool {
        let r = self.record();
        let empty = |rect: Rect16| Rect::from(rect).is_empty();
        empty(r.in_rect) && empty(r.out_rect) && (r.have_mask == 0 || empty(r.mask_rect))
    }

    /// Write the pending output tile into the destination.
    pub(crate) fn flush_output(&mut self) {
        if let Some(request) = self.output_tile.request {
            tiles::write_surface(&mut self.destination, &request, &self.output_tile.buffer);
        }
    }

    /// Flush output, then deliver the tiles the record now requests.
    ///
    /// Tiles whose rectangle and plane range are unchanged keep their
    /// buffers.
    pub(crate) fn advance(&mut self) -> Result<()> {
        self.flush_output();
        let planes = self.planes;
        let (input, output, mask) = {
            let r = self.record();
            (
                tile_request(r.in_rect, r.input_planes(), r.input_padding, planes),
                tile_request(r.out_rect, r.output_planes(), r.output_padding, planes),
                (r.have_mask != 0).then(|| tile_request(r.mask_rect, (0, 1), r.mask_padding, 1)),
            )
        };

        let source = &self.input;
        if self
            .input_tile
            .provision(input, |req, out| tiles::read_surface(source, req, out))?
        {
            self.tiles_delivered += 1;
        }
        let destination = &self.destination;
        self.output_tile
            .provision(output, |req, out| tiles::read_surface(destination, req, out))?;
        match (mask, &self.mask) {
            (Some(request), Some(mask)) => {
                self.mask_tile
                    .provision(request, |req, out| tiles::read_mask(mask, req, out))?;
            }
            _ => self.mask_tile.clear(),
        }
        tracing::trace!(in_rect = ?input.rect, out_rect = ?output.rect, "tiles provisioned");

        let in_data = self.input_tile.data();
        let out_data = self.output_tile.data();
        let mask_data = self.mask_tile.data();
        let mask_row_bytes = self.mask_tile.request.map_or(0, |req| req.row_bytes());
        let r = self.record_mut();
        r.in_data = in_data;
        r.in_row_bytes = input.row_bytes() as i32;
        r.in_column_bytes = input.planes as i32;
        r.in_plane_bytes = 1;
        r.out_data = out_data;
        r.out_row_bytes = output.row_bytes() as i32;
        r.out_column_bytes = output.planes as i32;
        r.out_plane_bytes = 1;
        r.mask_data = mask_data;
        r.mask_row_bytes = mask_row_bytes as i32;
        Ok(())
    }

    /// Tiles delivered so far.
    pub(crate) fn tiles_delivered(&self) -> u64 {
        self.tiles_delivered
    }
}

/// A session over a 2x2 opaque image with no table, for callback tests.
#[cfg(test)]
pub(crate) fn test_session() -> HostSession {
    use std::sync::Arc;

    use crate::config::HostConfig;
    use crate::suites::{ColorServices, PropertyContext};
    use crate::surface::Bgra8;

    let surface = Surface::filled(2, 2, Bgra8::from_rgba(10, 20, 30, 255)).unwrap();
    let registry = SuiteRegistry::new(
        &HostConfig::default(),
        PropertyContext::default(),
        ColorServices::new([255, 255, 255], [0, 0, 0]),
        Arc::new(super::NullProbe),
    );
    HostSession::new(SessionParts {
        registry,
        selection: CaseSelection {
            case: FilterCase::EditableTransparencyNoSelection,
            info: None,
            mask: None,
            planes: 4,
        },
        input: surface.clone(),
        destination: surface,
        foreground: [255, 255, 255],
        background: [0, 0, 0],
        host_signature: crate::fourcc::VENDOR_ADOBE,
        max_space: 1 << 20,
        progress: None,
        abort: None,
        preview: None,
        plugin: "test".into(),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_record_points_at_tables() {
        let session = test_session();
        let r = session.record();
        assert_eq!(r.handle_procs, session.tables.handle.as_ptr());
        assert_eq!(r.image_size, Point16 { v: 2, h: 2 });
        assert_eq!(r.in_layer_planes, 3);
        assert_eq!(r.in_transparency_mask, 1);
        assert_eq!(r.filter_case, FilterCase::EditableTransparencyNoSelection as i16);
        assert!(r.advance_state.is_some());
        assert!(session.requests_empty());
    }

    #[test]
    fn test_progress_dedup() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut tracker = ProgressTracker::new(Some(Box::new(move |p: u8| sink.borrow_mut().push(p))));
        tracker.report(1, 4);
        tracker.report(1, 4);
        tracker.report(5, 4);
        tracker.report(-3, 4);
        tracker.report(1, 0);
        assert_eq!(*seen.borrow(), vec![25, 100, 0]);
    }

    #[test]
    fn test_advance_provisions_and_flushes() {
        let mut session = test_session();
        {
            let r = session.record_mut();
            r.in_rect = Rect16 { top: 0, left: 0, bottom: 1, right: 2 };
            r.in_lo_plane = 0;
            r.in_hi_plane = 2;
            r.out_rect = r.in_rect;
            r.out_lo_plane = 0;
            r.out_hi_plane = 2;
        }
        session.advance().unwrap();
        assert_eq!(session.record().in_row_bytes, 6);
        assert_eq!(session.tiles_delivered(), 1);

        // SAFETY: `out_data` points at the six-byte output tile.
        unsafe {
            let out = session.record().out_data.cast::<u8>();
            assert_eq!(std::slice::from_raw_parts(out, 3), &[10, 20, 30]);
            *out = 99;
        }
        session.advance().unwrap();
        assert_eq!(session.tiles_delivered(), 1);
        assert_eq!(session.destination.pixel(0, 0).r, 99);
        assert_eq!(session.destination.pixel(0, 1).r, 10);
    }

    #[test]
    fn test_error_on_bounds_surfaces() {
        let mut session = test_session();
        {
            let r = session.record_mut();
            r.in_rect = Rect16 { top: 0, left: 0, bottom: 3, right: 2 };
            r.input_padding = padding::ERROR_ON_BOUNDS;
        }
        assert!(matches!(session.advance(), Err(crate::Error::TileOutOfBounds(_))));
    }
}
