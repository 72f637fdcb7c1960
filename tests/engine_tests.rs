//! Integration tests for filter execution.
//!
//! The filters here are plain `extern "system"` functions registered with a
//! [`StaticLoader`], so every run goes through the real parameter block,
//! callback tables and tile delivery.

use std::cell::RefCell;
use std::ffi::c_void;
use std::rc::Rc;

use filterhost::abi::{AboutRecord, FilterRecord, RawHandle, Rect16, Selector, play_info};
use filterhost::config::HostConfig;
use filterhost::discovery::Architecture;
use filterhost::engine::{FilterEngine, RunOptions, StaticLoader, StorageMethod};
use filterhost::fourcc::FourCC;
use filterhost::plugin::{FilterCase, FilterCaseInfo, PluginRecord};
use filterhost::suites::DescriptorValue;
use filterhost::surface::{Bgra8, FilterImages, SelectionMask, Surface};
use filterhost::Error;

const PARAMETERS: i16 = Selector::Parameters as i16;
const START: i16 = Selector::Start as i16;
const CONTINUE: i16 = Selector::Continue as i16;
const FINISH: i16 = Selector::Finish as i16;
const PREPARE: i16 = Selector::Prepare as i16;

const FILTER_BAD_PARAMETERS: i16 = -30100;
const REPORT_STRING: i16 = -30904;
const AMOUNT: FourCC = FourCC::new(b"Amnt");
const MARKER: [u8; 6] = [0x5A, 0xC3, 0x00, 0xFF, 0x42, 0x17];

thread_local! {
    static CALLS: RefCell<Vec<i16>> = const { RefCell::new(Vec::new()) };
    static REPLAYED: RefCell<Option<i32>> = const { RefCell::new(None) };
    static STARTED_WITH: RefCell<Option<Vec<u8>>> = const { RefCell::new(None) };
    static MASK_SEEN: RefCell<Option<(i16, Vec<u8>)>> = const { RefCell::new(None) };
}

fn calls() -> Vec<i16> {
    CALLS.with(|c| c.borrow().clone())
}

fn reset() {
    CALLS.with(|c| c.borrow_mut().clear());
    REPLAYED.with(|r| *r.borrow_mut() = None);
    STARTED_WITH.with(|b| *b.borrow_mut() = None);
    MASK_SEEN.with(|m| *m.borrow_mut() = None);
}

// ============================================================================
// Filters
// ============================================================================

/// Store the marker as the parameter block, plus a scripting descriptor.
unsafe fn ask_parameters(r: &mut FilterRecord) {
    // SAFETY: The host fills every table before the first selector.
    unsafe {
        let procs = &*r.handle_procs;
        let handle = (procs.new.unwrap())(MARKER.len() as i32);
        let data = (procs.lock.unwrap())(handle, 0);
        std::ptr::copy_nonoverlapping(MARKER.as_ptr(), data, MARKER.len());
        (procs.unlock.unwrap())(handle);
        r.parameters = handle;

        let params = &mut *r.descriptor_parameters;
        let writer = &*params.write_descriptor_procs;
        let token = (writer.open.unwrap())();
        (writer.put_integer.unwrap())(token, AMOUNT.value(), 7);
        let mut descriptor: RawHandle = std::ptr::null_mut();
        (writer.close.unwrap())(token, &mut descriptor);
        params.descriptor = descriptor;
    }
}

/// The whole parameter block, sized by the handle suite.
unsafe fn parameter_block(r: &FilterRecord) -> Option<Vec<u8>> {
    if r.parameters.is_null() {
        return None;
    }
    // SAFETY: A non-null parameter block is a live handle of the host's.
    unsafe {
        let procs = &*r.handle_procs;
        let size = (procs.get_size.unwrap())(r.parameters);
        let data = (procs.lock.unwrap())(r.parameters, 0);
        let bytes = std::slice::from_raw_parts(data, size.max(0) as usize).to_vec();
        (procs.unlock.unwrap())(r.parameters);
        Some(bytes)
    }
}

/// Read back the scripting descriptor the host replayed.
unsafe fn replay_descriptor(r: &FilterRecord) {
    // SAFETY: As above.
    unsafe {
        let params = &*r.descriptor_parameters;
        if params.play_info != play_info::DONT_DISPLAY || params.descriptor.is_null() {
            return;
        }
        let reader = &*params.read_descriptor_procs;
        let token = (reader.open.unwrap())(params.descriptor, std::ptr::null_mut());
        let mut key = 0u32;
        let mut value = 0i32;
        while (reader.get_key.unwrap())(token, &mut key, std::ptr::null_mut(), std::ptr::null_mut()) != 0 {
            if key == AMOUNT.value() {
                (reader.get_integer.unwrap())(token, &mut value);
            }
        }
        (reader.close.unwrap())(token);
        REPLAYED.with(|r| *r.borrow_mut() = Some(value));
    }
}

fn request_filter_rect(r: &mut FilterRecord) {
    r.in_rect = r.filter_rect;
    r.out_rect = r.filter_rect;
    r.in_lo_plane = 0;
    r.in_hi_plane = 2;
    r.out_lo_plane = 0;
    r.out_hi_plane = 2;
}

/// Invert the color planes of the requested tile and request nothing more.
unsafe fn invert_tile(r: &mut FilterRecord) {
    let rows = (r.out_rect.bottom - r.out_rect.top) as usize;
    let bytes = (r.out_rect.right - r.out_rect.left) as usize * 3;
    // SAFETY: The host delivered input and output tiles of exactly the
    // requested rectangle and planes.
    unsafe {
        for y in 0..rows {
            let src = r.in_data.cast::<u8>().add(y * r.in_row_bytes as usize);
            let dst = r.out_data.cast::<u8>().add(y * r.out_row_bytes as usize);
            for i in 0..bytes {
                *dst.add(i) = 255 - *src.add(i);
            }
        }
        if let Some(progress) = r.progress_proc {
            progress(1, 1);
        }
    }
    r.in_rect = Rect16::default();
    r.out_rect = Rect16::default();
}

unsafe extern "system" fn invert(selector: i16, record: *mut c_void, _data: *mut isize, result: *mut i16) {
    CALLS.with(|c| c.borrow_mut().push(selector));
    // SAFETY: The host passes its parameter block and a valid result slot.
    unsafe {
        let r = &mut *record.cast::<FilterRecord>();
        *result = 0;
        match selector {
            PARAMETERS => ask_parameters(r),
            START => {
                let block = parameter_block(r);
                STARTED_WITH.with(|b| *b.borrow_mut() = block.clone());
                if block.as_deref() != Some(&MARKER[..]) {
                    *result = FILTER_BAD_PARAMETERS;
                    return;
                }
                replay_descriptor(r);
                request_filter_rect(r);
            }
            CONTINUE => invert_tile(r),
            _ => {}
        }
    }
}

unsafe extern "system" fn refuse(selector: i16, record: *mut c_void, _data: *mut isize, result: *mut i16) {
    CALLS.with(|c| c.borrow_mut().push(selector));
    // SAFETY: As above.
    unsafe {
        let r = &mut *record.cast::<FilterRecord>();
        *result = 0;
        if selector == PREPARE {
            let message = b"radius too large";
            let text = &mut *r.error_string;
            text[0] = message.len() as u8;
            text[1..=message.len()].copy_from_slice(message);
            *result = REPORT_STRING;
        }
    }
}

unsafe extern "system" fn reject(selector: i16, _record: *mut c_void, _data: *mut isize, result: *mut i16) {
    CALLS.with(|c| c.borrow_mut().push(selector));
    // SAFETY: As above.
    unsafe {
        *result = if selector == PARAMETERS { FILTER_BAD_PARAMETERS } else { 0 };
    }
}

/// Copy the whole-image mask during Continue.
unsafe extern "system" fn masked(selector: i16, record: *mut c_void, _data: *mut isize, result: *mut i16) {
    // SAFETY: As above; the mask tile covers the requested mask rectangle.
    unsafe {
        let r = &mut *record.cast::<FilterRecord>();
        *result = 0;
        match selector {
            START => {
                request_filter_rect(r);
                r.mask_rect = Rect16 {
                    top: 0,
                    left: 0,
                    bottom: r.image_size.v,
                    right: r.image_size.h,
                };
            }
            CONTINUE => {
                let (rows, cols) = (r.image_size.v as usize, r.image_size.h as usize);
                let mut mask = Vec::with_capacity(rows * cols);
                if !r.mask_data.is_null() {
                    for y in 0..rows {
                        let row = r.mask_data.cast::<u8>().add(y * r.mask_row_bytes as usize);
                        mask.extend_from_slice(std::slice::from_raw_parts(row, cols));
                    }
                }
                MASK_SEEN.with(|m| *m.borrow_mut() = Some((r.filter_case, mask)));
                r.in_rect = Rect16::default();
                r.out_rect = Rect16::default();
                r.mask_rect = Rect16::default();
            }
            _ => {}
        }
    }
}

unsafe extern "system" fn about(selector: i16, record: *mut c_void, _data: *mut isize, result: *mut i16) {
    // SAFETY: As above, with the about block for selector 0.
    unsafe {
        let ok = selector == Selector::About as i16
            && !(*record.cast::<AboutRecord>()).sp_basic.is_null();
        *result = if ok { 0 } else { -1 };
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn record(entry: &str) -> PluginRecord {
    PluginRecord::new("/filters/test.8bf", entry, "Test", entry, Architecture::current())
}

fn engine() -> FilterEngine {
    FilterEngine::new(HostConfig::default()).with_loader(
        StaticLoader::new()
            .with_entry("invert", invert)
            .with_entry("refuse", refuse)
            .with_entry("reject", reject)
            .with_entry("masked", masked)
            .with_entry("about", about),
    )
}

fn image(width: u32, height: u32, color: Bgra8) -> FilterImages {
    FilterImages::new(Surface::filled(width, height, color).unwrap())
}

/// A filter whose table accepts only a flat image without a selection.
fn flat_only(entry: &str) -> PluginRecord {
    let mut table = [FilterCaseInfo::default(); 7];
    table[0] = FilterCaseInfo {
        input_handling: 1,
        output_handling: 1,
        flags1: 0,
        flags2: 0,
    };
    record(entry).with_filter_cases(table)
}

// ============================================================================
// Runs
// ============================================================================

#[test]
fn test_run_calls_every_selector_in_order() {
    reset();
    let mut engine = engine();
    let outcome = engine
        .run(&record("invert"), image(3, 2, Bgra8::from_rgba(10, 20, 30, 255)), RunOptions::default())
        .unwrap();

    assert_eq!(calls(), [PARAMETERS, PREPARE, START, CONTINUE, FINISH]);
    assert_eq!(outcome.case, FilterCase::EditableTransparencyNoSelection);
    assert_eq!(outcome.tiles_delivered, 1);
    for p in outcome.destination.pixels() {
        assert_eq!(*p, Bgra8::from_rgba(245, 235, 225, 255));
    }
}

#[test]
fn test_parameters_are_persisted() {
    reset();
    let mut engine = engine();
    let rec = record("invert");
    let outcome = engine
        .run(&rec, image(1, 1, Bgra8::from_rgba(0, 0, 0, 255)), RunOptions::default())
        .unwrap();

    let state = engine.persisted(&rec).unwrap();
    let parameters = state.parameters.as_ref().unwrap();
    assert_eq!(parameters.method, StorageMethod::HandleSuite);
    assert_eq!(parameters.bytes, MARKER);
    assert!(state.data.is_none());

    let descriptor = outcome.descriptor.unwrap();
    assert_eq!(descriptor.get(AMOUNT), Some(&DescriptorValue::Integer(7)));
    assert_eq!(state.descriptor.as_ref(), Some(&descriptor));
}

#[test]
fn test_repeat_run_skips_parameters() {
    reset();
    let mut engine = engine();
    let rec = record("invert");
    let first = engine
        .run(&rec, image(2, 2, Bgra8::from_rgba(1, 2, 3, 255)), RunOptions::default())
        .unwrap();

    reset();
    let second = engine
        .run(&rec, FilterImages::new(first.destination), RunOptions::default().with_repeat(true))
        .unwrap();

    assert_eq!(calls(), [PREPARE, START, CONTINUE, FINISH]);
    assert_eq!(STARTED_WITH.with(|b| b.borrow().clone()), Some(MARKER.to_vec()));
    assert_eq!(REPLAYED.with(|r| *r.borrow()), Some(7));
    assert_eq!(second.destination.pixel(1, 1), Bgra8::from_rgba(1, 2, 3, 255));
}

#[test]
fn test_repeat_without_history_asks_for_parameters() {
    reset();
    let mut engine = engine();
    engine
        .run(&record("invert"), image(1, 1, Bgra8::default()), RunOptions::default().with_repeat(true))
        .unwrap();
    assert_eq!(calls()[0], PARAMETERS);
}

#[test]
fn test_cancel_still_finishes() {
    reset();
    let mut engine = engine();
    let result = engine.run(
        &record("invert"),
        image(2, 2, Bgra8::default()),
        RunOptions::default().with_abort(|| true),
    );

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(calls(), [PARAMETERS, PREPARE, START, FINISH]);
}

#[test]
fn test_error_string_is_reported() {
    reset();
    let mut engine = engine();
    let result = engine.run(&record("refuse"), image(1, 1, Bgra8::default()), RunOptions::default());

    match result {
        Err(Error::FilterFailed { status, message }) => {
            assert_eq!(status, REPORT_STRING);
            assert_eq!(message, "radius too large");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(calls(), [PARAMETERS, PREPARE, FINISH]);
}

#[test]
fn test_finish_follows_failed_parameters() {
    reset();
    let mut engine = engine();
    let result = engine.run(&record("reject"), image(1, 1, Bgra8::default()), RunOptions::default());

    assert!(matches!(result, Err(Error::FilterFailed { status: FILTER_BAD_PARAMETERS, .. })));
    assert_eq!(calls(), [PARAMETERS, FINISH]);
    assert!(engine.persisted(&record("reject")).is_none());
}

#[test]
fn test_transparent_image_runs_as_floating_selection() {
    reset();
    let mut engine = engine();
    let outcome = engine
        .run(&flat_only("masked"), image(3, 2, Bgra8::from_rgba(9, 9, 9, 0)), RunOptions::default())
        .unwrap();

    assert_eq!(outcome.case, FilterCase::FloatingSelection);
    let seen = MASK_SEEN.with(|m| m.borrow().clone());
    assert_eq!(seen, Some((FilterCase::FloatingSelection as i16, vec![0; 6])));
}

#[test]
fn test_floating_selection_mask_follows_alpha() {
    reset();
    let alphas = [0, 9, 255, 0, 1, 0];
    let pixels = alphas.iter().map(|&a| Bgra8::from_rgba(50, 60, 70, a)).collect();
    let images = FilterImages::new(Surface::from_pixels(3, 2, pixels).unwrap());

    let mut engine = engine();
    let outcome = engine.run(&flat_only("masked"), images, RunOptions::default()).unwrap();

    assert_eq!(outcome.case, FilterCase::FloatingSelection);
    let (_, mask) = MASK_SEEN.with(|m| m.borrow().clone()).unwrap();
    assert_eq!(mask, [0, 255, 255, 0, 255, 0]);
}

#[test]
fn test_progress_reaches_sink() {
    reset();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let mut engine = engine();
    engine
        .run(
            &record("invert"),
            image(2, 2, Bgra8::default()),
            RunOptions::default().with_progress(move |p: u8| sink.borrow_mut().push(p)),
        )
        .unwrap();
    assert_eq!(*seen.borrow(), [100]);
}

#[test]
fn test_selection_limits_changes() {
    reset();
    let source = Surface::filled(2, 1, Bgra8::from_rgba(0, 0, 0, 255)).unwrap();
    let mask = SelectionMask::from_bytes(2, 1, vec![255, 0]).unwrap();
    let images = FilterImages::new(source).with_selection(mask).unwrap();

    let mut engine = engine();
    let outcome = engine.run(&record("invert"), images, RunOptions::default()).unwrap();

    assert_eq!(outcome.case, FilterCase::EditableTransparencyWithSelection);
    assert_eq!(outcome.destination.pixel(0, 0), Bgra8::from_rgba(255, 255, 255, 255));
    assert_eq!(outcome.destination.pixel(1, 0), Bgra8::from_rgba(0, 0, 0, 255));
}

#[test]
fn test_transparent_layer_keeps_alpha() {
    reset();
    let mut engine = engine();
    let outcome = engine
        .run(&record("invert"), image(2, 2, Bgra8::from_rgba(0, 0, 0, 128)), RunOptions::default())
        .unwrap();

    assert_eq!(outcome.destination.pixel(0, 0), Bgra8::from_rgba(255, 255, 255, 128));
}

#[test]
fn test_missing_entry_point() {
    let mut engine = engine();
    let result = engine.run(&record("absent"), image(1, 1, Bgra8::default()), RunOptions::default());
    assert!(matches!(result, Err(Error::MissingEntryPoint(name)) if name == "absent"));
}

#[test]
fn test_about_box() {
    let engine = engine();
    engine.show_about(&record("about")).unwrap();
}
