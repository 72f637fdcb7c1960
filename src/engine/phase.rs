//! Selector calls and the status table.

use std::ffi::c_void;

use crate::abi::{EntryPoint, Selector};
use crate::error::Error;
use crate::observability;

/// The user cancelled.
pub const USER_CANCELED: i16 = -128;
/// Out of memory.
pub const MEM_FULL: i16 = -108;
/// Bad handle.
pub const NIL_HANDLE: i16 = -109;
/// Bad parameter.
pub const PARAM_ERR: i16 = -50;
/// The filter's parameters are invalid.
pub const FILTER_BAD_PARAMETERS: i16 = -30100;
/// The filter cannot handle the image mode.
pub const FILTER_BAD_MODE: i16 = -30101;
/// The host lacks a required feature.
pub const HOST_INSUFFICIENT: i16 = -30900;
/// A property is not defined.
pub const PROPERTY_UNDEFINED: i16 = -30901;
/// The host cannot fetch a color step.
pub const HOST_NO_COLOR_STEP: i16 = -30902;
/// A sample point was outside the image.
pub const INVALID_SAMPLE_POINT: i16 = -30903;
/// The filter left its message in the error string.
pub const REPORT_STRING: i16 = -30904;

/// Message for a phase status.
///
/// `error_string` is the text the filter stored in the parameter block and
/// is used only for [`REPORT_STRING`].
pub fn status_message(status: i16, error_string: Option<&str>) -> String {
    let text = match status {
        USER_CANCELED => "the operation was cancelled",
        MEM_FULL => "not enough memory to run the filter",
        NIL_HANDLE => "the filter used an invalid handle",
        PARAM_ERR => "the filter received an invalid parameter",
        FILTER_BAD_PARAMETERS => "the filter's parameters are invalid",
        FILTER_BAD_MODE => "the filter does not support this image mode",
        HOST_INSUFFICIENT => "the filter needs a feature this host does not provide",
        PROPERTY_UNDEFINED => "the filter requested an undefined property",
        HOST_NO_COLOR_STEP => "the host cannot supply the requested color step",
        INVALID_SAMPLE_POINT => "the sample point lies outside the image",
        REPORT_STRING => {
            return match error_string {
                Some(text) if !text.is_empty() => text.to_string(),
                _ => "the filter reported an error".to_string(),
            };
        }
        s if s > 0 => "the filter reported an error",
        _ => "unknown error",
    };
    text.to_string()
}

/// Error for a non-zero phase status.
pub fn status_error(status: i16, error_string: Option<&str>) -> Error {
    if status == USER_CANCELED {
        return Error::Cancelled;
    }
    Error::FilterFailed {
        status,
        message: status_message(status, error_string),
    }
}

/// Invoke one selector.
///
/// # Safety
///
/// `entry` must be a filter entry point and `record` a fully initialized
/// parameter block for `selector` whose tables stay valid for the duration
/// of the call.
pub unsafe fn call(entry: EntryPoint, selector: Selector, record: *mut c_void, data: &mut isize) -> i16 {
    let span = observability::span_phase(selector);
    let _guard = span.enter();
    let mut result: i16 = 0;
    // SAFETY: Upheld by the caller; `data` and `result` outlive the call.
    unsafe {
        entry(selector as i16, record, data as *mut isize, &mut result);
    }
    if result != 0 {
        tracing::debug!(?selector, result, "selector returned an error");
    } else {
        tracing::trace!(?selector, "selector returned");
    }
    result
}
