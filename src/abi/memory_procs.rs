//! Buffer, handle, resource, property, image-services and channel-port
//! procs.

use std::ffi::c_void;
use std::ptr;

use super::context::{os_err, with_session};
use super::{
    Boolean, BufferProcs, ChannelPortProcs, HandleProcs, ImageMultiPlane, ImagePlane,
    ImageServicesProcs, OsErr, PropertyProcs, RawHandle, Rect16, ResourceProcs, VRect,
};
use crate::fourcc::FourCC;
use crate::geometry::Rect;
use crate::suites::image_services::{self, Interpolation, PlaneMut, PlaneRef};
use crate::suites::{Handle, SuiteStatus, Token};

const BAD_PARAMETER: OsErr = SuiteStatus::BadParameter.os_err();

// ============================================================================
// Buffers
// ============================================================================

unsafe extern "C" fn allocate_buffer(size: i32, buffer: *mut *mut c_void) -> OsErr {
    if buffer.is_null() || size < 0 {
        return BAD_PARAMETER;
    }
    os_err(|s| {
        let token = s.registry.buffers.allocate(size as usize)?;
        // SAFETY: `buffer` was checked for null; the filter passes a slot.
        unsafe { *buffer = token.into_ptr() };
        Ok(())
    })
}

unsafe extern "C" fn lock_buffer(buffer: *mut c_void, _move_high: Boolean) -> *mut u8 {
    with_session(|s| {
        let token = Token::from_ptr(buffer).ok_or(SuiteStatus::BadParameter)?;
        s.registry.buffers.lock(token)
    })
    .and_then(Result::ok)
    .unwrap_or(ptr::null_mut())
}

unsafe extern "C" fn unlock_buffer(buffer: *mut c_void) {
    with_session(|s| {
        if let Some(token) = Token::from_ptr(buffer) {
            s.registry.buffers.unlock(token);
        }
    });
}

unsafe extern "C" fn free_buffer(buffer: *mut c_void) {
    with_session(|s| {
        let freed = Token::from_ptr(buffer)
            .ok_or(SuiteStatus::BadParameter)
            .and_then(|token| s.registry.buffers.free(token));
        if let Err(status) = freed {
            tracing::debug!(%status, "free of unknown buffer");
        }
    });
}

unsafe extern "C" fn buffer_space() -> i32 {
    with_session(|s| s.registry.buffers.space()).map_or(0, |space| space.min(i32::MAX as u64) as i32)
}

pub(crate) fn buffer_procs() -> BufferProcs {
    BufferProcs {
        version: 2,
        count: 5,
        allocate: Some(allocate_buffer),
        lock: Some(lock_buffer),
        unlock: Some(unlock_buffer),
        free: Some(free_buffer),
        space: Some(buffer_space),
    }
}

// ============================================================================
// Handles
// ============================================================================

unsafe extern "C" fn new_handle(size: i32) -> RawHandle {
    if size < 0 {
        return ptr::null_mut();
    }
    with_session(|s| s.registry.handles.new_handle(size as usize))
        .and_then(Result::ok)
        .map_or(ptr::null_mut(), Handle::as_raw)
}

unsafe extern "C" fn dispose_handle(handle: RawHandle) {
    let Some(handle) = Handle::from_raw(handle) else {
        return;
    };
    with_session(|s| {
        if let Err(status) = s.registry.dispose_handle(handle) {
            tracing::debug!(%status, handle = handle.addr(), "dispose of unknown handle");
        }
    });
}

unsafe extern "C" fn get_handle_size(handle: RawHandle) -> i32 {
    let Some(handle) = Handle::from_raw(handle) else {
        return 0;
    };
    with_session(|s| s.registry.handle_size(handle)).map_or(0, |size| size.min(i32::MAX as usize) as i32)
}

unsafe extern "C" fn set_handle_size(handle: RawHandle, size: i32) -> OsErr {
    let Some(handle) = Handle::from_raw(handle) else {
        return SuiteStatus::NilHandle.os_err();
    };
    if size < 0 {
        return BAD_PARAMETER;
    }
    os_err(|s| s.registry.handles.set_size(handle, size as usize))
}

unsafe extern "C" fn lock_handle(handle: RawHandle, _move_high: Boolean) -> *mut u8 {
    let Some(handle) = Handle::from_raw(handle) else {
        return ptr::null_mut();
    };
    with_session(|s| s.registry.lock_handle(handle))
        .and_then(Result::ok)
        .unwrap_or(ptr::null_mut())
}

unsafe extern "C" fn unlock_handle(handle: RawHandle) {
    if let Some(handle) = Handle::from_raw(handle) {
        with_session(|s| s.registry.handles.unlock(handle));
    }
}

unsafe extern "C" fn recover_space(size: i32) {
    tracing::trace!(size, "recover space requested");
}

unsafe extern "C" fn dispose_regular_handle(handle: RawHandle) {
    let Some(handle) = Handle::from_raw(handle) else {
        return;
    };
    with_session(|s| {
        if s.registry.handles.contains(handle) {
            let _ = s.registry.dispose_handle(handle);
        } else {
            tracing::debug!(handle = handle.addr(), "foreign handle left to its owner");
        }
    });
}

pub(crate) fn handle_procs() -> HandleProcs {
    HandleProcs {
        version: 1,
        count: 8,
        new: Some(new_handle),
        dispose: Some(dispose_handle),
        get_size: Some(get_handle_size),
        set_size: Some(set_handle_size),
        lock: Some(lock_handle),
        unlock: Some(unlock_handle),
        recover_space: Some(recover_space),
        dispose_regular: Some(dispose_regular_handle),
    }
}

// ============================================================================
// Resources
// ============================================================================

unsafe extern "C" fn count_resources(kind: u32) -> i16 {
    with_session(|s| s.registry.resources.count(FourCC(kind))).unwrap_or(0)
}

unsafe extern "C" fn get_resource(kind: u32, index: i16) -> RawHandle {
    with_session(|s| {
        let bytes = s
            .registry
            .resources
            .get(FourCC(kind), index)
            .ok_or(SuiteStatus::BadParameter)?
            .to_vec();
        s.registry.handles.new_with(&bytes)
    })
    .and_then(Result::ok)
    .map_or(ptr::null_mut(), Handle::as_raw)
}

unsafe extern "C" fn delete_resource(kind: u32, index: i16) {
    with_session(|s| {
        if let Err(status) = s.registry.resources.delete(FourCC(kind), index) {
            tracing::debug!(%status, kind = %FourCC(kind), index, "delete of unknown resource");
        }
    });
}

unsafe extern "C" fn add_resource(kind: u32, data: RawHandle) -> OsErr {
    let Some(handle) = Handle::from_raw(data) else {
        return SuiteStatus::NilHandle.os_err();
    };
    os_err(|s| {
        let bytes = s.registry.handle_contents(handle)?;
        s.registry.resources.add(FourCC(kind), &bytes).map(drop)
    })
}

pub(crate) fn resource_procs() -> ResourceProcs {
    ResourceProcs {
        version: 3,
        count: 4,
        count_resources: Some(count_resources),
        get: Some(get_resource),
        delete: Some(delete_resource),
        add: Some(add_resource),
    }
}

// ============================================================================
// Properties
// ============================================================================

/// Property getter, also installed as the obsolete direct getter.
pub(crate) unsafe extern "C" fn get_property(
    signature: u32,
    key: u32,
    index: i32,
    simple: *mut isize,
    complex: *mut RawHandle,
) -> OsErr {
    os_err(|s| {
        let (value, handle) = s.registry.property(FourCC(signature), FourCC(key), index)?;
        if !simple.is_null() {
            // SAFETY: Non-null out-pointer supplied by the filter.
            unsafe { *simple = value };
        }
        if let Some(handle) = handle {
            if complex.is_null() {
                s.registry.dispose_handle(handle)?;
            } else {
                // SAFETY: As above.
                unsafe { *complex = handle.as_raw() };
            }
        }
        Ok(())
    })
}

unsafe extern "C" fn set_property(
    signature: u32,
    key: u32,
    index: i32,
    _simple: isize,
    _complex: RawHandle,
) -> OsErr {
    os_err(|s| s.registry.properties.set(FourCC(signature), FourCC(key), index))
}

pub(crate) fn property_procs() -> PropertyProcs {
    PropertyProcs {
        version: 1,
        count: 2,
        get: Some(get_property),
        set: Some(set_property),
    }
}

// ============================================================================
// Image services
// ============================================================================

struct PlaneDesc {
    data: *mut u8,
    bounds: Rect,
    row_bytes: i32,
    col_bytes: i32,
}

impl PlaneDesc {
    fn single(plane: &ImagePlane) -> Self {
        Self {
            data: plane.data.cast(),
            bounds: plane.bounds.into(),
            row_bytes: plane.row_bytes,
            col_bytes: plane.col_bytes,
        }
    }

    fn multi(plane: &ImageMultiPlane) -> Self {
        Self {
            data: plane.data.cast(),
            bounds: plane.bounds.into(),
            row_bytes: plane.row_bytes,
            col_bytes: plane.col_bytes,
        }
    }

    fn strides(&self) -> Option<(usize, usize)> {
        if self.data.is_null() {
            return None;
        }
        Some((usize::try_from(self.row_bytes).ok()?, usize::try_from(self.col_bytes).ok()?))
    }
}

/// Resample between two filter-owned planes.
///
/// # Safety
///
/// Each plane must address readable (source) or writable (destination)
/// memory covering its bounds, and `coords` must hold the coordinates for
/// `area`.
unsafe fn resample(
    source: PlaneDesc,
    dest: PlaneDesc,
    area: *const Rect16,
    coords: *const i32,
    method: i16,
    planes: usize,
    two_d: bool,
) -> OsErr {
    let (Some((src_row, src_col)), Some((dst_row, dst_col))) = (source.strides(), dest.strides()) else {
        return BAD_PARAMETER;
    };
    if area.is_null() || coords.is_null() || planes == 0 {
        return BAD_PARAMETER;
    }
    // SAFETY: Checked for null; supplied by the filter.
    let area: Rect = unsafe { *area }.into();
    if area.is_empty() {
        return 0;
    }
    let pixels = area.width() as usize * area.height() as usize;
    let coord_count = if two_d { pixels * 2 } else { area.width() as usize };

    let src_len = image_services::plane_len(source.bounds, src_row, src_col, planes);
    let dst_len = image_services::plane_len(dest.bounds, dst_row, dst_col, planes);
    // SAFETY: Extents come from the plane descriptions (see the function
    // contract). The source is copied first so that overlapping planes do
    // not alias the destination slice.
    let (source_bytes, coords, dest_bytes) = unsafe {
        (
            std::slice::from_raw_parts(source.data, src_len).to_vec(),
            std::slice::from_raw_parts(coords, coord_count),
            std::slice::from_raw_parts_mut(dest.data, dst_len),
        )
    };
    let src = PlaneRef {
        data: &source_bytes,
        bounds: source.bounds,
        row_bytes: src_row,
        col_bytes: src_col,
    };
    let mut dst = PlaneMut {
        data: dest_bytes,
        bounds: dest.bounds,
        row_bytes: dst_row,
        col_bytes: dst_col,
    };
    let method = Interpolation::from_code(method);
    let result = if two_d {
        image_services::interpolate_2d(&src, &mut dst, area, coords, method, planes)
    } else {
        image_services::interpolate_1d(&src, &mut dst, area, coords, method, planes)
    };
    SuiteStatus::of(&result)
}

unsafe fn single_planes(source: *mut ImagePlane, dest: *mut ImagePlane) -> Option<(PlaneDesc, PlaneDesc)> {
    if source.is_null() || dest.is_null() {
        return None;
    }
    // SAFETY: Non-null plane descriptions supplied by the filter.
    unsafe { Some((PlaneDesc::single(&*source), PlaneDesc::single(&*dest))) }
}

unsafe fn multi_planes(
    source: *mut ImageMultiPlane,
    dest: *mut ImageMultiPlane,
) -> Option<(PlaneDesc, PlaneDesc, usize)> {
    if source.is_null() || dest.is_null() {
        return None;
    }
    // SAFETY: Non-null plane descriptions supplied by the filter.
    let (source, dest) = unsafe { (&*source, &*dest) };
    let planes = usize::try_from(source.active_channels).ok()?;
    Some((PlaneDesc::multi(source), PlaneDesc::multi(dest), planes))
}

unsafe extern "C" fn interpolate_1d(
    source: *mut ImagePlane,
    dest: *mut ImagePlane,
    area: *mut Rect16,
    coords: *mut i32,
    method: i16,
) -> OsErr {
    // SAFETY: Plane and coordinate memory is the filter's, described by
    // the arguments it passed.
    unsafe {
        match single_planes(source, dest) {
            Some((s, d)) => resample(s, d, area, coords, method, 1, false),
            None => BAD_PARAMETER,
        }
    }
}

unsafe extern "C" fn interpolate_2d(
    source: *mut ImagePlane,
    dest: *mut ImagePlane,
    area: *mut Rect16,
    coords: *mut i32,
    method: i16,
) -> OsErr {
    // SAFETY: As for `interpolate_1d`.
    unsafe {
        match single_planes(source, dest) {
            Some((s, d)) => resample(s, d, area, coords, method, 1, true),
            None => BAD_PARAMETER,
        }
    }
}

unsafe extern "C" fn interpolate_1d_multi(
    source: *mut ImageMultiPlane,
    dest: *mut ImageMultiPlane,
    area: *mut Rect16,
    coords: *mut i32,
    method: i16,
) -> OsErr {
    // SAFETY: As for `interpolate_1d`.
    unsafe {
        match multi_planes(source, dest) {
            Some((s, d, planes)) => resample(s, d, area, coords, method, planes, false),
            None => BAD_PARAMETER,
        }
    }
}

unsafe extern "C" fn interpolate_2d_multi(
    source: *mut ImageMultiPlane,
    dest: *mut ImageMultiPlane,
    area: *mut Rect16,
    coords: *mut i32,
    method: i16,
) -> OsErr {
    // SAFETY: As for `interpolate_1d`.
    unsafe {
        match multi_planes(source, dest) {
            Some((s, d, planes)) => resample(s, d, area, coords, method, planes, true),
            None => BAD_PARAMETER,
        }
    }
}

pub(crate) fn image_services_procs() -> ImageServicesProcs {
    ImageServicesProcs {
        version: 1,
        count: 4,
        interpolate_1d: Some(interpolate_1d),
        interpolate_2d: Some(interpolate_2d),
        interpolate_1d_multi: Some(interpolate_1d_multi),
        interpolate_2d_multi: Some(interpolate_2d_multi),
    }
}

// ============================================================================
// Channel ports
// ============================================================================

const CHANNEL_PORTS_UNAVAILABLE: OsErr = SuiteStatus::Unimplemented.os_err();

unsafe extern "C" fn read_pixels(
    _port: *mut c_void,
    _scaling: *const c_void,
    _write_rect: *const VRect,
    _destination: *const c_void,
    _wrote_rect: *mut VRect,
) -> OsErr {
    tracing::debug!("channel port read requested");
    CHANNEL_PORTS_UNAVAILABLE
}

unsafe extern "C" fn write_base_pixels(
    _port: *mut c_void,
    _write_rect: *const VRect,
    _source: *const c_void,
) -> OsErr {
    tracing::debug!("channel port write requested");
    CHANNEL_PORTS_UNAVAILABLE
}

unsafe extern "C" fn read_port_for_write_port(read_port: *mut *mut c_void, _write_port: *mut c_void) -> OsErr {
    if !read_port.is_null() {
        // SAFETY: Non-null out-pointer supplied by the filter.
        unsafe { *read_port = ptr::null_mut() };
    }
    CHANNEL_PORTS_UNAVAILABLE
}

pub(crate) fn channel_port_procs() -> ChannelPortProcs {
    ChannelPortProcs {
        version: 1,
        count: 3,
        read_pixels: Some(read_pixels),
        write_base_pixels: Some(write_base_pixels),
        read_port_for_write_port: Some(read_port_for_write_port),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::abi::context::install;
    use crate::engine::session::test_session;
    use crate::fourcc::VENDOR_ADOBE;
    use crate::suites::property::keys;

    #[test]
    fn test_handle_procs_round_trip() {
        let _active = install(Rc::new(RefCell::new(test_session())));
        unsafe {
            let h = new_handle(4);
            assert!(!h.is_null());
            assert_eq!(get_handle_size(h), 4);
            let p = lock_handle(h, 0);
            assert_eq!(*h, p);
            *p = 7;
            unlock_handle(h);
            assert_eq!(set_handle_size(h, 8), 0);
            assert_eq!(*(*h), 7);
            assert_eq!(get_handle_size(h), 8);
            dispose_handle(h);
            assert_eq!(set_handle_size(h, 1), SuiteStatus::NilHandle.os_err());
            assert!(new_handle(-1).is_null());
        }
    }

    #[test]
    fn test_buffer_procs() {
        let _active = install(Rc::new(RefCell::new(test_session())));
        unsafe {
            let mut id = ptr::null_mut();
            assert_eq!(allocate_buffer(16, &mut id), 0);
            let p = lock_buffer(id, 0);
            assert!(!p.is_null());
            unlock_buffer(id);
            free_buffer(id);
            assert!(lock_buffer(id, 0).is_null());
            assert!(buffer_space() > 0);
            assert_eq!(allocate_buffer(1, ptr::null_mut()), BAD_PARAMETER);
        }
    }

    #[test]
    fn test_resource_procs() {
        let _active = install(Rc::new(RefCell::new(test_session())));
        let kind = u32::from_be_bytes(*b"resA");
        unsafe {
            let h = new_handle(3);
            *lock_handle(h, 0) = 5;
            assert_eq!(add_resource(kind, h), 0);
            assert_eq!(count_resources(kind), 1);
            let copy = get_resource(kind, 1);
            assert!(!copy.is_null());
            assert_eq!(get_handle_size(copy), 3);
            assert_eq!(*(*copy), 5);
            delete_resource(kind, 1);
            assert_eq!(count_resources(kind), 0);
            assert!(get_resource(kind, 1).is_null());
        }
    }

    #[test]
    fn test_property_get() {
        let _active = install(Rc::new(RefCell::new(test_session())));
        let mut simple = 0isize;
        let mut complex: RawHandle = ptr::null_mut();
        unsafe {
            let status = get_property(VENDOR_ADOBE.value(), keys::IMAGE_MODE.value(), 0, &mut simple, &mut complex);
            assert_eq!(status, 0);
            assert_eq!(simple, 3);
            let status = get_property(VENDOR_ADOBE.value(), keys::CHANNEL_NAME.value(), 0, &mut simple, &mut complex);
            assert_eq!(status, 0);
            assert_eq!(get_handle_size(complex), 3);
            let status = get_property(VENDOR_ADOBE.value(), u32::from_be_bytes(*b"????"), 0, &mut simple, &mut complex);
            assert_eq!(status, SuiteStatus::PropertyUndefined.os_err());
        }
    }

    #[test]
    fn test_interpolate_1d_nearest() {
        let source = [10u8, 20, 30, 40];
        let mut dest = [0u8; 2];
        let mut src_plane = ImagePlane {
            data: source.as_ptr() as *mut c_void,
            bounds: Rect16 { top: 0, left: 0, bottom: 1, right: 4 },
            row_bytes: 4,
            col_bytes: 1,
        };
        let mut dst_plane = ImagePlane {
            data: dest.as_mut_ptr().cast(),
            bounds: Rect16 { top: 0, left: 0, bottom: 1, right: 2 },
            row_bytes: 2,
            col_bytes: 1,
        };
        let mut area = Rect16 { top: 0, left: 0, bottom: 1, right: 2 };
        let mut coords = [3 << 16, 1 << 16];
        let status = unsafe { interpolate_1d(&mut src_plane, &mut dst_plane, &mut area, coords.as_mut_ptr(), 1) };
        assert_eq!(status, 0);
        assert_eq!(dest, [40, 20]);
    }

    #[test]
    fn test_channel_ports_are_stubbed() {
        let mut port = 1usize as *mut c_void;
        let status = unsafe { read_port_for_write_port(&mut port, ptr::null_mut()) };
        assert_eq!(status, SuiteStatus::Unimplemented.os_err());
        assert!(port.is_null());
    }
}
