//! Callbacks stored directly in the parameter block.

use std::ffi::c_void;

use super::context::with_session;
use super::{Boolean, ColorServicesInfo, OsErr, PsPixelMap, VRect, read_pascal};
use crate::geometry::Rect;
use crate::suites::SuiteStatus;
use crate::suites::color_services::{SpacedColor, Selector as ColorSelector};

pub(crate) use super::memory_procs::get_property;

/// Poll the host's abort source.
pub(crate) unsafe extern "C" fn test_abort() -> Boolean {
    let abort = with_session(|s| s.abort.as_mut().is_some_and(|poll| poll.should_abort()));
    Boolean::from(abort.unwrap_or(false))
}

pub(crate) unsafe extern "C" fn update_progress(done: i32, total: i32) {
    with_session(|s| s.progress.report(done, total));
}

pub(crate) unsafe extern "C" fn host_proc(selector: i16, _data: *mut isize) {
    tracing::debug!(selector, "host proc ignored");
}

pub(crate) unsafe extern "C" fn process_event(_event: *mut c_void) {}

fn rect_of(v: VRect) -> Rect {
    Rect::new(v.top, v.left, v.bottom, v.right)
}

/// Gather RGB triplets for `area` out of a pixel map.
///
/// # Safety
///
/// `map` must describe readable memory covering its bounds.
unsafe fn gather_rgb(map: &PsPixelMap, area: Rect) -> Option<Vec<u8>> {
    if map.base_addr.is_null() {
        return None;
    }
    let channels: isize = if map.image_mode == 3 { 3 } else { 1 };
    let bounds = rect_of(map.bounds);
    let base = map.base_addr.cast::<u8>().cast_const();
    let (row, col, plane) = (map.row_bytes as isize, map.col_bytes as isize, map.plane_bytes as isize);
    let mut rgb = Vec::with_capacity(area.width() as usize * area.height() as usize * 3);
    for y in area.top..area.bottom {
        for x in area.left..area.right {
            let offset = (y - bounds.top) as isize * row + (x - bounds.left) as isize * col;
            for c in 0..3 {
                let channel = c.min(channels - 1);
                // SAFETY: `area` lies within the map's bounds (see caller).
                rgb.push(unsafe { *base.offset(offset + channel * plane) });
            }
        }
    }
    Some(rgb)
}

/// Hand preview pixels to the preview sink.
pub(crate) unsafe extern "C" fn display_pixels(
    source: *const PsPixelMap,
    src_rect: *const VRect,
    _dst_row: i32,
    _dst_col: i32,
    _platform_context: *mut c_void,
) -> OsErr {
    if source.is_null() || src_rect.is_null() {
        return SuiteStatus::BadParameter.os_err();
    }
    // SAFETY: Non-null pointers supplied by the filter.
    let (map, requested) = unsafe { (&*source, rect_of(*src_rect)) };
    let area = requested.intersect(&rect_of(map.bounds));
    if area.is_empty() {
        return 0;
    }
    // SAFETY: `area` was clipped to the map's bounds.
    let Some(rgb) = (unsafe { gather_rgb(map, area) }) else {
        return SuiteStatus::BadParameter.os_err();
    };
    with_session(|s| {
        if let Some(preview) = s.preview.as_mut() {
            preview.display(area, &rgb);
        }
    });
    0
}

/// Deliver the tiles the record currently requests.
pub(crate) unsafe extern "C" fn advance_state() -> OsErr {
    let outcome = with_session(|s| match s.advance() {
        Ok(()) => 0,
        Err(error) => {
            tracing::warn!(%error, plugin = %s.plugin, "tile request failed");
            s.tile_error = Some(error);
            SuiteStatus::BadParameter.os_err()
        }
    });
    outcome.unwrap_or(SuiteStatus::LogicError.os_err())
}

/// Multiplexed color-services entry.
pub(crate) unsafe extern "C" fn color_services(info: *mut ColorServicesInfo) -> OsErr {
    if info.is_null() {
        return SuiteStatus::BadParameter.os_err();
    }
    // SAFETY: Non-null request supplied by the filter, exclusive for the
    // duration of the call.
    let info = unsafe { &mut *info };
    let Some(selector) = ColorSelector::from_raw(info.selector) else {
        return SuiteStatus::BadParameter.os_err();
    };
    let (source, result, components) = (info.source_space, info.result_space, info.color_components);

    let answer = match selector {
        ColorSelector::ChooseColor => {
            // SAFETY: The prompt is a Pascal string for this selector.
            let prompt = unsafe { read_pascal(info.selector_parameter.picker_prompt.cast_const().cast()) };
            let prompt = String::from_utf8_lossy(&prompt).into_owned();
            with_session(|s| s.registry.colors.choose(&prompt, source, result, components))
        }
        ColorSelector::ConvertColor => {
            with_session(|s| s.registry.colors.convert(source, result, components))
        }
        ColorSelector::SamplePoint => {
            // SAFETY: The sample point is valid for this selector.
            let point = unsafe { info.selector_parameter.global_sample_point };
            if point.is_null() {
                return SuiteStatus::BadParameter.os_err();
            }
            // SAFETY: Checked for null.
            let point = unsafe { *point }.into();
            with_session(|s| s.registry.colors.sample(&s.input, point, result))
        }
        ColorSelector::GetSpecialColor => {
            // SAFETY: The special id is valid for this selector.
            let which = unsafe { info.selector_parameter.special_color_id };
            let which = i16::try_from(which).unwrap_or(-1);
            with_session(|s| s.registry.colors.special(which, result))
        }
    };

    match answer {
        Some(Ok(SpacedColor { space, components })) => {
            info.result_space = space as i16;
            info.color_components = components;
            info.result_gamut_info_valid = 0;
            0
        }
        Some(Err(status)) => status.os_err(),
        None => SuiteStatus::LogicError.os_err(),
    }
}
