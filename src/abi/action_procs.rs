//! PICA basic suite and the action descriptor, list and reference suites.
//!
//! Descriptor getters address a value by key, list getters by index; both
//! go through [`Slot`] so the conversions live in one place. Puts go
//! through [`Target`] the same way.

use std::ffi::{c_char, c_void};
use std::ptr;

use super::context::sp_err;
use super::{
    ActionDescriptorProcs, ActionListProcs, ActionReferenceProcs, ActionToken, Boolean, RawHandle,
    SpBasicSuite, SpErr, read_c_string,
};
use crate::engine::session::HostSession;
use crate::fourcc::FourCC;
use crate::suites::basic::{self, SuiteKind};
use crate::suites::{DescriptorValue, Handle, ReferenceForm, SuiteResult, SuiteStatus, Token};

const BAD_PARAMETER: SpErr = SuiteStatus::BadParameter.code();
const UNIMPLEMENTED: SpErr = SuiteStatus::Unimplemented.code();

fn token(raw: ActionToken) -> SuiteResult<Token> {
    Token::from_ptr(raw.cast_const()).ok_or(SuiteStatus::BadParameter)
}

/// Store `value` through a filter out-pointer.
///
/// # Safety
///
/// `out` must be null or valid for a write of `T`.
unsafe fn store<T>(out: *mut T, value: T) -> SuiteResult<()> {
    if out.is_null() {
        return Err(SuiteStatus::BadParameter);
    }
    // SAFETY: Checked for null; valid per the function contract.
    unsafe { out.write(value) };
    Ok(())
}

/// Copy `text` out as a NUL-terminated string of at most `max` bytes.
///
/// # Safety
///
/// `out` must be null or valid for `max` bytes.
unsafe fn store_c_string(text: &[u8], out: *mut c_char, max: u32) -> SuiteResult<()> {
    if out.is_null() || max == 0 {
        return Err(SuiteStatus::BadParameter);
    }
    let len = text.len().min(max as usize - 1);
    // SAFETY: `len + 1 <= max` bytes are written.
    unsafe {
        ptr::copy_nonoverlapping(text.as_ptr(), out.cast::<u8>(), len);
        *out.add(len) = 0;
    }
    Ok(())
}

/// Read `count` items from a filter array.
///
/// # Safety
///
/// `values` must be null or valid for `count` reads.
unsafe fn read_array<T: Copy>(values: *const T, count: u32) -> SuiteResult<Vec<T>> {
    if values.is_null() && count > 0 {
        return Err(SuiteStatus::BadParameter);
    }
    if count == 0 {
        return Ok(Vec::new());
    }
    // SAFETY: Valid per the function contract.
    Ok(unsafe { std::slice::from_raw_parts(values, count as usize) }.to_vec())
}

// ============================================================================
// Value access shared by descriptors and lists
// ============================================================================

/// Where a value is read from.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Key(Token, FourCC),
    Index(Token, u32),
}

/// Where a value is written to.
#[derive(Debug, Clone, Copy)]
enum Target {
    Key(Token, FourCC),
    Append(Token),
}

fn key_slot(desc: ActionToken, key: u32) -> SuiteResult<Slot> {
    Ok(Slot::Key(token(desc)?, FourCC(key)))
}

fn index_slot(list: ActionToken, index: u32) -> SuiteResult<Slot> {
    Ok(Slot::Index(token(list)?, index))
}

fn key_target(desc: ActionToken, key: u32) -> SuiteResult<Target> {
    Ok(Target::Key(token(desc)?, FourCC(key)))
}

fn append_target(list: ActionToken) -> SuiteResult<Target> {
    Ok(Target::Append(token(list)?))
}

fn load(s: &HostSession, slot: Slot) -> SuiteResult<&DescriptorValue> {
    match slot {
        Slot::Key(desc, key) => s.registry.actions.get(desc, key),
        Slot::Index(list, index) => s.registry.actions.list_get(list, index),
    }
}

fn put_value(s: &mut HostSession, target: Target, value: DescriptorValue) -> SuiteResult<()> {
    match target {
        Target::Key(desc, key) => s.registry.actions.put(desc, key, value),
        Target::Append(list) => s.registry.actions.list_push(list, value),
    }
}

fn put(target: SuiteResult<Target>, value: impl FnOnce(&HostSession) -> SuiteResult<DescriptorValue>) -> SpErr {
    sp_err(|s| {
        let target = target?;
        let value = value(&*s)?;
        put_value(s, target, value)
    })
}

/// Convert the value at `slot` and store it through `out`.
///
/// # Safety
///
/// As for [`store`].
unsafe fn get<T>(
    slot: SuiteResult<Slot>,
    out: *mut T,
    convert: impl FnOnce(&DescriptorValue) -> SuiteResult<T>,
) -> SpErr {
    sp_err(|s| {
        let value = convert(load(s, slot?)?)?;
        // SAFETY: Upheld by the caller.
        unsafe { store(out, value) }
    })
}

fn put_nested_object(target: SuiteResult<Target>, class: u32, source: ActionToken, global: bool) -> SpErr {
    sp_err(|s| {
        let source = token(source)?;
        match target? {
            Target::Key(desc, key) => s.registry.actions.put_object(desc, key, FourCC(class), source, global),
            Target::Append(list) => s.registry.actions.list_push_object(list, FourCC(class), source, global),
        }
    })
}

fn put_nested_list(target: SuiteResult<Target>, source: ActionToken) -> SpErr {
    sp_err(|s| {
        let source = token(source)?;
        match target? {
            Target::Key(desc, key) => s.registry.actions.put_list(desc, key, source),
            Target::Append(list) => s.registry.actions.list_push_list(list, source),
        }
    })
}

fn put_nested_reference(target: SuiteResult<Target>, source: ActionToken) -> SpErr {
    sp_err(|s| {
        let source = token(source)?;
        match target? {
            Target::Key(desc, key) => s.registry.actions.put_reference(desc, key, source),
            Target::Append(list) => s.registry.actions.list_push_reference(list, source),
        }
    })
}

/// Copy a nested object out into a fresh descriptor token.
///
/// # Safety
///
/// `class` and `out` must be null or valid for a write.
unsafe fn get_nested_object(slot: SuiteResult<Slot>, class: *mut u32, out: *mut ActionToken) -> SpErr {
    if out.is_null() {
        return BAD_PARAMETER;
    }
    sp_err(|s| {
        let (kind, nested) = match slot? {
            Slot::Key(desc, key) => s.registry.actions.get_object(desc, key)?,
            Slot::Index(list, index) => s.registry.actions.list_get_object(list, index)?,
        };
        // SAFETY: Upheld by the caller.
        unsafe {
            if !class.is_null() {
                *class = kind.value();
            }
            store(out, nested.into_ptr())
        }
    })
}

/// Copy a nested list out into a fresh list token.
///
/// # Safety
///
/// As for [`store`].
unsafe fn get_nested_list(slot: SuiteResult<Slot>, out: *mut ActionToken) -> SpErr {
    if out.is_null() {
        return BAD_PARAMETER;
    }
    sp_err(|s| {
        let nested = match slot? {
            Slot::Key(desc, key) => s.registry.actions.get_list(desc, key)?,
            Slot::Index(list, index) => s.registry.actions.list_get_list(list, index)?,
        };
        // SAFETY: Upheld by the caller.
        unsafe { store(out, nested.into_ptr()) }
    })
}

/// Copy a nested reference out into a fresh reference token.
///
/// # Safety
///
/// As for [`store`].
unsafe fn get_nested_reference(slot: SuiteResult<Slot>, out: *mut ActionToken) -> SpErr {
    if out.is_null() {
        return BAD_PARAMETER;
    }
    sp_err(|s| {
        let nested = match slot? {
            Slot::Key(desc, key) => s.registry.actions.get_reference(desc, key)?,
            Slot::Index(list, index) => s.registry.actions.list_get_reference(list, index)?,
        };
        // SAFETY: Upheld by the caller.
        unsafe { store(out, nested.into_ptr()) }
    })
}

/// Copy alias bytes into a fresh handle.
///
/// # Safety
///
/// As for [`store`].
unsafe fn get_alias_handle(slot: SuiteResult<Slot>, out: *mut RawHandle) -> SpErr {
    if out.is_null() {
        return BAD_PARAMETER;
    }
    sp_err(|s| {
        let bytes = load(s, slot?)?.as_bytes()?.to_vec();
        let handle = s.registry.handles.new_with(&bytes)?;
        // SAFETY: Upheld by the caller.
        unsafe { store(out, handle.as_raw()) }
    })
}

fn alias_value(s: &HostSession, raw: RawHandle) -> SuiteResult<DescriptorValue> {
    let handle = Handle::from_raw(raw).ok_or(SuiteStatus::NilHandle)?;
    Ok(DescriptorValue::Alias(s.registry.handle_contents(handle)?))
}

fn text(value: &DescriptorValue) -> SuiteResult<Vec<u8>> {
    value.as_text().map(|t| t.as_bytes().to_vec())
}

fn integers(value: &DescriptorValue, count: u32) -> SuiteResult<Vec<i32>> {
    let DescriptorValue::List(items) = value else {
        return Err(SuiteStatus::WrongType);
    };
    if items.len() < count as usize {
        return Err(SuiteStatus::BadParameter);
    }
    items.iter().take(count as usize).map(DescriptorValue::as_integer).collect()
}

/// Copy a value's integers into a filter array.
///
/// # Safety
///
/// `values` must be valid for `count` writes.
unsafe fn get_integer_array(slot: SuiteResult<Slot>, count: u32, values: *mut i32) -> SpErr {
    if values.is_null() {
        return BAD_PARAMETER;
    }
    sp_err(|s| {
        let items = integers(load(s, slot?)?, count)?;
        // SAFETY: `items.len() == count`, valid per the function contract.
        unsafe { ptr::copy_nonoverlapping(items.as_ptr(), values, items.len()) };
        Ok(())
    })
}

fn integer_list(values: Vec<i32>) -> DescriptorValue {
    DescriptorValue::List(values.into_iter().map(DescriptorValue::Integer).collect())
}

/// Copy raw data bytes into a filter buffer sized by `get_data_length`.
///
/// # Safety
///
/// `out` must be valid for as many bytes as the stored data holds.
unsafe fn get_raw_data(slot: SuiteResult<Slot>, out: *mut c_void) -> SpErr {
    if out.is_null() {
        return BAD_PARAMETER;
    }
    sp_err(|s| {
        let bytes = load(s, slot?)?.as_bytes()?;
        // SAFETY: Valid per the function contract.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), out.cast::<u8>(), bytes.len()) };
        Ok(())
    })
}

/// # Safety
///
/// `value` must be null or valid for `length` bytes.
unsafe fn raw_data(length: i32, value: *const c_void) -> SuiteResult<DescriptorValue> {
    let length = u32::try_from(length).map_err(|_| SuiteStatus::BadParameter)?;
    // SAFETY: Upheld by the caller.
    let bytes = unsafe { read_array(value.cast::<u8>(), length)? };
    Ok(DescriptorValue::RawData(bytes))
}

// ============================================================================
// Basic suite
// ============================================================================

unsafe extern "C" fn acquire_suite(name: *const c_char, version: i32, suite: *mut *const c_void) -> SpErr {
    if suite.is_null() {
        return BAD_PARAMETER;
    }
    // SAFETY: The filter passes a NUL-terminated suite name.
    let name = unsafe { read_c_string(name) };
    sp_err(|s| {
        let table: *const c_void = match s.registry.basic.acquire(&name, version)? {
            SuiteKind::ActionDescriptor => s.tables.action_descriptor.as_ptr().cast_const().cast(),
            SuiteKind::ActionList => s.tables.action_list.as_ptr().cast_const().cast(),
            SuiteKind::ActionReference => s.tables.action_reference.as_ptr().cast_const().cast(),
        };
        // SAFETY: Checked for null.
        unsafe { *suite = table };
        Ok(())
    })
}

unsafe extern "C" fn release_suite(name: *const c_char, version: i32) -> SpErr {
    // SAFETY: As for `acquire_suite`.
    let name = unsafe { read_c_string(name) };
    sp_err(|s| s.registry.basic.release(&name, version))
}

unsafe extern "C" fn is_equal(a: *const c_char, b: *const c_char) -> i32 {
    // SAFETY: The filter passes two NUL-terminated strings.
    let (a, b) = unsafe { (read_c_string(a), read_c_string(b)) };
    i32::from(basic::is_equal(&a, &b))
}

unsafe extern "C" fn allocate_block(size: usize, block: *mut *mut c_void) -> SpErr {
    sp_err(|s| {
        let allocated = s.registry.basic.allocate_block(size)?;
        // SAFETY: Out-pointer supplied by the filter.
        unsafe { store(block, allocated.cast()) }
    })
}

unsafe extern "C" fn free_block(block: *mut c_void) -> SpErr {
    sp_err(|s| s.registry.basic.free_block(block.cast()))
}

unsafe extern "C" fn reallocate_block(block: *mut c_void, size: usize, new_block: *mut *mut c_void) -> SpErr {
    if new_block.is_null() {
        return BAD_PARAMETER;
    }
    sp_err(|s| {
        let moved = s.registry.basic.reallocate_block(block.cast(), size)?;
        // SAFETY: Checked for null.
        unsafe { store(new_block, moved.cast()) }
    })
}

unsafe extern "C" fn undefined() -> SpErr {
    tracing::debug!("undefined basic-suite entry called");
    UNIMPLEMENTED
}

pub(crate) fn basic_suite() -> SpBasicSuite {
    SpBasicSuite {
        acquire_suite: Some(acquire_suite),
        release_suite: Some(release_suite),
        is_equal: Some(is_equal),
        allocate_block: Some(allocate_block),
        free_block: Some(free_block),
        reallocate_block: Some(reallocate_block),
        undefined: Some(undefined),
    }
}

// ============================================================================
// Action descriptors
// ============================================================================

unsafe extern "C" fn desc_make(desc: *mut ActionToken) -> SpErr {
    sp_err(|s| {
        let made = s.registry.actions.make_descriptor()?;
        // SAFETY: Out-pointer supplied by the filter.
        unsafe { store(desc, made.into_ptr()) }
    })
}

unsafe extern "C" fn desc_free(desc: ActionToken) -> SpErr {
    sp_err(|s| s.registry.actions.free_descriptor(token(desc)?))
}

unsafe extern "C" fn desc_get_type(desc: ActionToken, key: u32, kind: *mut u32) -> SpErr {
    // SAFETY: Out-pointer supplied by the filter.
    unsafe { get(key_slot(desc, key), kind, |v| Ok(v.type_id().value())) }
}

unsafe extern "C" fn desc_get_key(desc: ActionToken, index: u32, key: *mut u32) -> SpErr {
    sp_err(|s| {
        let found = s.registry.actions.key_at(token(desc)?, index)?;
        // SAFETY: Out-pointer supplied by the filter.
        unsafe { store(key, found.value()) }
    })
}

unsafe extern "C" fn desc_has_key(desc: ActionToken, key: u32, has: *mut Boolean) -> SpErr {
    sp_err(|s| {
        let found = s.registry.actions.descriptor(token(desc)?)?.contains(FourCC(key));
        // SAFETY: Out-pointer supplied by the filter.
        unsafe { store(has, Boolean::from(found)) }
    })
}

unsafe extern "C" fn desc_get_count(desc: ActionToken, count: *mut u32) -> SpErr {
    sp_err(|s| {
        let len = s.registry.actions.descriptor(token(desc)?)?.len();
        // SAFETY: Out-pointer supplied by the filter.
        unsafe { store(count, len as u32) }
    })
}

unsafe extern "C" fn desc_is_equal(desc: ActionToken, other: ActionToken, equal: *mut Boolean) -> SpErr {
    sp_err(|s| {
        let same = s.registry.actions.is_equal(token(desc)?, token(other)?)?;
        // SAFETY: Out-pointer supplied by the filter.
        unsafe { store(equal, Boolean::from(same)) }
    })
}

unsafe extern "C" fn desc_erase(desc: ActionToken, key: u32) -> SpErr {
    sp_err(|s| s.registry.actions.erase(token(desc)?, FourCC(key)))
}

unsafe extern "C" fn desc_clear(desc: ActionToken) -> SpErr {
    sp_err(|s| {
        s.registry.actions.descriptor_mut(token(desc)?)?.clear();
        Ok(())
    })
}

unsafe extern "C" fn desc_put_integer(desc: ActionToken, key: u32, value: i32) -> SpErr {
    put(key_target(desc, key), |_| Ok(DescriptorValue::Integer(value)))
}

unsafe extern "C" fn desc_put_float(desc: ActionToken, key: u32, value: f64) -> SpErr {
    put(key_target(desc, key), |_| Ok(DescriptorValue::Float(value)))
}

unsafe extern "C" fn desc_put_unit_float(desc: ActionToken, key: u32, unit: u32, value: f64) -> SpErr {
    put(key_target(desc, key), |_| {
        Ok(DescriptorValue::UnitFloat {
            unit: FourCC(unit),
            value,
        })
    })
}

unsafe extern "C" fn desc_put_string(desc: ActionToken, key: u32, value: *const c_char) -> SpErr {
    // SAFETY: The filter passes a NUL-terminated string.
    let bytes = unsafe { read_c_string(value) };
    put(key_target(desc, key), |_| {
        Ok(DescriptorValue::Text(String::from_utf8_lossy(&bytes).into_owned()))
    })
}

unsafe extern "C" fn desc_put_boolean(desc: ActionToken, key: u32, value: Boolean) -> SpErr {
    put(key_target(desc, key), |_| Ok(DescriptorValue::Boolean(value != 0)))
}

unsafe extern "C" fn desc_put_list(desc: ActionToken, key: u32, value: ActionToken) -> SpErr {
    put_nested_list(key_target(desc, key), value)
}

unsafe extern "C" fn desc_put_object(desc: ActionToken, key: u32, class: u32, value: ActionToken) -> SpErr {
    put_nested_object(key_target(desc, key), class, value, false)
}

unsafe extern "C" fn desc_put_global_object(desc: ActionToken, key: u32, class: u32, value: ActionToken) -> SpErr {
    put_nested_object(key_target(desc, key), class, value, true)
}

unsafe extern "C" fn desc_put_enumerated(desc: ActionToken, key: u32, kind: u32, value: u32) -> SpErr {
    put(key_target(desc, key), |_| {
        Ok(DescriptorValue::Enumerated {
            kind: FourCC(kind),
            value: FourCC(value),
        })
    })
}

unsafe extern "C" fn desc_put_reference(desc: ActionToken, key: u32, value: ActionToken) -> SpErr {
    put_nested_reference(key_target(desc, key), value)
}

unsafe extern "C" fn desc_put_class(desc: ActionToken, key: u32, value: u32) -> SpErr {
    put(key_target(desc, key), |_| Ok(DescriptorValue::Class(FourCC(value))))
}

unsafe extern "C" fn desc_put_global_class(desc: ActionToken, key: u32, value: u32) -> SpErr {
    put(key_target(desc, key), |_| Ok(DescriptorValue::GlobalClass(FourCC(value))))
}

unsafe extern "C" fn desc_put_alias(desc: ActionToken, key: u32, value: RawHandle) -> SpErr {
    put(key_target(desc, key), |s| alias_value(s, value))
}

unsafe extern "C" fn desc_get_integer(desc: ActionToken, key: u32, value: *mut i32) -> SpErr {
    // SAFETY: Out-pointer supplied by the filter.
    unsafe { get(key_slot(desc, key), value, DescriptorValue::as_integer) }
}

unsafe extern "C" fn desc_get_float(desc: ActionToken, key: u32, value: *mut f64) -> SpErr {
    // SAFETY: As above.
    unsafe { get(key_slot(desc, key), value, DescriptorValue::as_float) }
}

unsafe extern "C" fn desc_get_unit_float(desc: ActionToken, key: u32, unit: *mut u32, value: *mut f64) -> SpErr {
    // SAFETY: As above.
    unsafe {
        get(key_slot(desc, key), value, |v| {
            let (stored, value) = v.as_unit_float()?;
            if !unit.is_null() {
                *unit = stored.value();
            }
            Ok(value)
        })
    }
}

unsafe extern "C" fn desc_get_string_length(desc: ActionToken, key: u32, length: *mut u32) -> SpErr {
    // SAFETY: As above.
    unsafe { get(key_slot(desc, key), length, |v| Ok(v.as_text()?.len() as u32)) }
}

unsafe extern "C" fn desc_get_string(desc: ActionToken, key: u32, value: *mut c_char, max: u32) -> SpErr {
    sp_err(|s| {
        let bytes = text(load(s, key_slot(desc, key)?)?)?;
        // SAFETY: Buffer of `max` bytes supplied by the filter.
        unsafe { store_c_string(&bytes, value, max) }
    })
}

unsafe extern "C" fn desc_get_boolean(desc: ActionToken, key: u32, value: *mut Boolean) -> SpErr {
    // SAFETY: Out-pointer supplied by the filter.
    unsafe { get(key_slot(desc, key), value, |v| v.as_boolean().map(Boolean::from)) }
}

unsafe extern "C" fn desc_get_list(desc: ActionToken, key: u32, value: *mut ActionToken) -> SpErr {
    // SAFETY: As above.
    unsafe { get_nested_list(key_slot(desc, key), value) }
}

unsafe extern "C" fn desc_get_object(desc: ActionToken, key: u32, class: *mut u32, value: *mut ActionToken) -> SpErr {
    // SAFETY: As above.
    unsafe { get_nested_object(key_slot(desc, key), class, value) }
}

unsafe extern "C" fn desc_get_enumerated(desc: ActionToken, key: u32, kind: *mut u32, value: *mut u32) -> SpErr {
    // SAFETY: As above.
    unsafe {
        get(key_slot(desc, key), value, |v| {
            let (stored_kind, stored) = v.as_enumerated()?;
            if !kind.is_null() {
                *kind = stored_kind.value();
            }
            Ok(stored.value())
        })
    }
}

unsafe extern "C" fn desc_get_reference(desc: ActionToken, key: u32, value: *mut ActionToken) -> SpErr {
    // SAFETY: As above.
    unsafe { get_nested_reference(key_slot(desc, key), value) }
}

unsafe extern "C" fn desc_get_class(desc: ActionToken, key: u32, value: *mut u32) -> SpErr {
    // SAFETY: As above.
    unsafe { get(key_slot(desc, key), value, |v| v.as_class().map(FourCC::value)) }
}

unsafe extern "C" fn desc_get_alias(desc: ActionToken, key: u32, value: *mut RawHandle) -> SpErr {
    // SAFETY: As above.
    unsafe { get_alias_handle(key_slot(desc, key), value) }
}

unsafe extern "C" fn desc_has_keys(desc: ActionToken, keys: *const u32, has: *mut Boolean) -> SpErr {
    if keys.is_null() {
        return BAD_PARAMETER;
    }
    let mut wanted = Vec::new();
    for i in 0..1024 {
        // SAFETY: The filter passes a zero-terminated key array.
        let key = unsafe { *keys.add(i) };
        if key == 0 {
            break;
        }
        wanted.push(FourCC(key));
    }
    sp_err(|s| {
        let all = s.registry.actions.has_keys(token(desc)?, &wanted)?;
        // SAFETY: Out-pointer supplied by the filter.
        unsafe { store(has, Boolean::from(all)) }
    })
}

unsafe extern "C" fn desc_put_integers(desc: ActionToken, key: u32, count: u32, values: *const i32) -> SpErr {
    // SAFETY: Array of `count` integers supplied by the filter.
    let values = unsafe { read_array(values, count) };
    put(key_target(desc, key), |_| values.map(integer_list))
}

unsafe extern "C" fn desc_get_integers(desc: ActionToken, key: u32, count: u32, values: *mut i32) -> SpErr {
    // SAFETY: Array of `count` integers supplied by the filter.
    unsafe { get_integer_array(key_slot(desc, key), count, values) }
}

unsafe extern "C" fn desc_as_handle(desc: ActionToken, handle: *mut RawHandle) -> SpErr {
    sp_err(|s| {
        let converted = s.registry.action_descriptor_as_handle(token(desc)?)?;
        // SAFETY: Out-pointer supplied by the filter.
        unsafe { store(handle, converted.as_raw()) }
    })
}

unsafe extern "C" fn desc_handle_to_descriptor(handle: RawHandle, desc: *mut ActionToken) -> SpErr {
    sp_err(|s| {
        let handle = Handle::from_raw(handle).ok_or(SuiteStatus::NilHandle)?;
        let converted = s.registry.handle_to_action_descriptor(handle)?;
        // SAFETY: Out-pointer supplied by the filter.
        unsafe { store(desc, converted.into_ptr()) }
    })
}

unsafe extern "C" fn desc_put_zstring(_desc: ActionToken, _key: u32, _value: *mut c_void) -> SpErr {
    UNIMPLEMENTED
}

unsafe extern "C" fn desc_get_zstring(_desc: ActionToken, _key: u32, _value: *mut *mut c_void) -> SpErr {
    UNIMPLEMENTED
}

unsafe extern "C" fn desc_put_data(desc: ActionToken, key: u32, length: i32, value: *const c_void) -> SpErr {
    // SAFETY: Buffer of `length` bytes supplied by the filter.
    let value = unsafe { raw_data(length, value) };
    put(key_target(desc, key), |_| value)
}

unsafe extern "C" fn desc_get_data_length(desc: ActionToken, key: u32, length: *mut i32) -> SpErr {
    // SAFETY: Out-pointer supplied by the filter.
    unsafe { get(key_slot(desc, key), length, |v| Ok(v.as_bytes()?.len() as i32)) }
}

unsafe extern "C" fn desc_get_data(desc: ActionToken, key: u32, value: *mut c_void) -> SpErr {
    // SAFETY: Buffer sized from `get_data_length`.
    unsafe { get_raw_data(key_slot(desc, key), value) }
}

pub(crate) fn descriptor_procs() -> ActionDescriptorProcs {
    ActionDescriptorProcs {
        make: Some(desc_make),
        free: Some(desc_free),
        get_type: Some(desc_get_type),
        get_key: Some(desc_get_key),
        has_key: Some(desc_has_key),
        get_count: Some(desc_get_count),
        is_equal: Some(desc_is_equal),
        erase: Some(desc_erase),
        clear: Some(desc_clear),
        put_integer: Some(desc_put_integer),
        put_float: Some(desc_put_float),
        put_unit_float: Some(desc_put_unit_float),
        put_string: Some(desc_put_string),
        put_boolean: Some(desc_put_boolean),
        put_list: Some(desc_put_list),
        put_object: Some(desc_put_object),
        put_global_object: Some(desc_put_global_object),
        put_enumerated: Some(desc_put_enumerated),
        put_reference: Some(desc_put_reference),
        put_class: Some(desc_put_class),
        put_global_class: Some(desc_put_global_class),
        put_alias: Some(desc_put_alias),
        get_integer: Some(desc_get_integer),
        get_float: Some(desc_get_float),
        get_unit_float: Some(desc_get_unit_float),
        get_string_length: Some(desc_get_string_length),
        get_string: Some(desc_get_string),
        get_boolean: Some(desc_get_boolean),
        get_list: Some(desc_get_list),
        get_object: Some(desc_get_object),
        get_global_object: Some(desc_get_object),
        get_enumerated: Some(desc_get_enumerated),
        get_reference: Some(desc_get_reference),
        get_class: Some(desc_get_class),
        get_global_class: Some(desc_get_class),
        get_alias: Some(desc_get_alias),
        has_keys: Some(desc_has_keys),
        put_integers: Some(desc_put_integers),
        get_integers: Some(desc_get_integers),
        as_handle: Some(desc_as_handle),
        handle_to_descriptor: Some(desc_handle_to_descriptor),
        put_zstring: Some(desc_put_zstring),
        get_zstring: Some(desc_get_zstring),
        put_data: Some(desc_put_data),
        get_data_length: Some(desc_get_data_length),
        get_data: Some(desc_get_data),
    }
}

// ============================================================================
// Action lists
// ============================================================================

unsafe extern "C" fn list_make(list: *mut ActionToken) -> SpErr {
    sp_err(|s| {
        let made = s.registry.actions.make_list()?;
        // SAFETY: Out-pointer supplied by the filter.
        unsafe { store(list, made.into_ptr()) }
    })
}

unsafe extern "C" fn list_free(list: ActionToken) -> SpErr {
    sp_err(|s| s.registry.actions.free_list(token(list)?))
}

unsafe extern "C" fn list_get_type(list: ActionToken, index: u32, kind: *mut u32) -> SpErr {
    // SAFETY: Out-pointer supplied by the filter.
    unsafe { get(index_slot(list, index), kind, |v| Ok(v.type_id().value())) }
}

unsafe extern "C" fn list_get_count(list: ActionToken, count: *mut u32) -> SpErr {
    sp_err(|s| {
        let len = s.registry.actions.list(token(list)?)?.len();
        // SAFETY: Out-pointer supplied by the filter.
        unsafe { store(count, len as u32) }
    })
}

unsafe extern "C" fn list_put_integer(list: ActionToken, value: i32) -> SpErr {
    put(append_target(list), |_| Ok(DescriptorValue::Integer(value)))
}

unsafe extern "C" fn list_put_float(list: ActionToken, value: f64) -> SpErr {
    put(append_target(list), |_| Ok(DescriptorValue::Float(value)))
}

unsafe extern "C" fn list_put_unit_float(list: ActionToken, unit: u32, value: f64) -> SpErr {
    put(append_target(list), |_| {
        Ok(DescriptorValue::UnitFloat {
            unit: FourCC(unit),
            value,
        })
    })
}

unsafe extern "C" fn list_put_string(list: ActionToken, value: *const c_char) -> SpErr {
    // SAFETY: The filter passes a NUL-terminated string.
    let bytes = unsafe { read_c_string(value) };
    put(append_target(list), |_| {
        Ok(DescriptorValue::Text(String::from_utf8_lossy(&bytes).into_owned()))
    })
}

unsafe extern "C" fn list_put_boolean(list: ActionToken, value: Boolean) -> SpErr {
    put(append_target(list), |_| Ok(DescriptorValue::Boolean(value != 0)))
}

unsafe extern "C" fn list_put_list(list: ActionToken, value: ActionToken) -> SpErr {
    put_nested_list(append_target(list), value)
}

unsafe extern "C" fn list_put_object(list: ActionToken, class: u32, value: ActionToken) -> SpErr {
    put_nested_object(append_target(list), class, value, false)
}

unsafe extern "C" fn list_put_global_object(list: ActionToken, class: u32, value: ActionToken) -> SpErr {
    put_nested_object(append_target(list), class, value, true)
}

unsafe extern "C" fn list_put_enumerated(list: ActionToken, kind: u32, value: u32) -> SpErr {
    put(append_target(list), |_| {
        Ok(DescriptorValue::Enumerated {
            kind: FourCC(kind),
            value: FourCC(value),
        })
    })
}

unsafe extern "C" fn list_put_reference(list: ActionToken, value: ActionToken) -> SpErr {
    put_nested_reference(append_target(list), value)
}

unsafe extern "C" fn list_put_class(list: ActionToken, value: u32) -> SpErr {
    put(append_target(list), |_| Ok(DescriptorValue::Class(FourCC(value))))
}

unsafe extern "C" fn list_put_global_class(list: ActionToken, value: u32) -> SpErr {
    put(append_target(list), |_| Ok(DescriptorValue::GlobalClass(FourCC(value))))
}

unsafe extern "C" fn list_put_alias(list: ActionToken, value: RawHandle) -> SpErr {
    put(append_target(list), |s| alias_value(s, value))
}

unsafe extern "C" fn list_get_integer(list: ActionToken, index: u32, value: *mut i32) -> SpErr {
    // SAFETY: Out-pointer supplied by the filter.
    unsafe { get(index_slot(list, index), value, DescriptorValue::as_integer) }
}

unsafe extern "C" fn list_get_float(list: ActionToken, index: u32, value: *mut f64) -> SpErr {
    // SAFETY: As above.
    unsafe { get(index_slot(list, index), value, DescriptorValue::as_float) }
}

unsafe extern "C" fn list_get_unit_float(list: ActionToken, index: u32, unit: *mut u32, value: *mut f64) -> SpErr {
    // SAFETY: As above.
    unsafe {
        get(index_slot(list, index), value, |v| {
            let (stored, value) = v.as_unit_float()?;
            if !unit.is_null() {
                *unit = stored.value();
            }
            Ok(value)
        })
    }
}

unsafe extern "C" fn list_get_string_length(list: ActionToken, index: u32, length: *mut u32) -> SpErr {
    // SAFETY: As above.
    unsafe { get(index_slot(list, index), length, |v| Ok(v.as_text()?.len() as u32)) }
}

unsafe extern "C" fn list_get_string(list: ActionToken, index: u32, value: *mut c_char, max: u32) -> SpErr {
    sp_err(|s| {
        let bytes = text(load(s, index_slot(list, index)?)?)?;
        // SAFETY: Buffer of `max` bytes supplied by the filter.
        unsafe { store_c_string(&bytes, value, max) }
    })
}

unsafe extern "C" fn list_get_boolean(list: ActionToken, index: u32, value: *mut Boolean) -> SpErr {
    // SAFETY: Out-pointer supplied by the filter.
    unsafe { get(index_slot(list, index), value, |v| v.as_boolean().map(Boolean::from)) }
}

unsafe extern "C" fn list_get_list(list: ActionToken, index: u32, value: *mut ActionToken) -> SpErr {
    // SAFETY: As above.
    unsafe { get_nested_list(index_slot(list, index), value) }
}

unsafe extern "C" fn list_get_object(
    list: ActionToken,
    index: u32,
    class: *mut u32,
    value: *mut ActionToken,
) -> SpErr {
    // SAFETY: As above.
    unsafe { get_nested_object(index_slot(list, index), class, value) }
}

unsafe extern "C" fn list_get_enumerated(list: ActionToken, index: u32, kind: *mut u32, value: *mut u32) -> SpErr {
    // SAFETY: As above.
    unsafe {
        get(index_slot(list, index), value, |v| {
            let (stored_kind, stored) = v.as_enumerated()?;
            if !kind.is_null() {
                *kind = stored_kind.value();
            }
            Ok(stored.value())
        })
    }
}

unsafe extern "C" fn list_get_reference(list: ActionToken, index: u32, value: *mut ActionToken) -> SpErr {
    // SAFETY: As above.
    unsafe { get_nested_reference(index_slot(list, index), value) }
}

unsafe extern "C" fn list_get_class(list: ActionToken, index: u32, value: *mut u32) -> SpErr {
    // SAFETY: As above.
    unsafe { get(index_slot(list, index), value, |v| v.as_class().map(FourCC::value)) }
}

unsafe extern "C" fn list_get_alias(list: ActionToken, index: u32, value: *mut RawHandle) -> SpErr {
    // SAFETY: As above.
    unsafe { get_alias_handle(index_slot(list, index), value) }
}

unsafe extern "C" fn list_put_integers(list: ActionToken, count: u32, values: *const i32) -> SpErr {
    // SAFETY: Array of `count` integers supplied by the filter.
    let values = unsafe { read_array(values, count) };
    sp_err(|s| {
        let list = token(list)?;
        for value in values? {
            s.registry.actions.list_push(list, DescriptorValue::Integer(value))?;
        }
        Ok(())
    })
}

unsafe extern "C" fn list_get_integers(list: ActionToken, count: u32, values: *mut i32) -> SpErr {
    if values.is_null() {
        return BAD_PARAMETER;
    }
    sp_err(|s| {
        let items = s.registry.actions.list(token(list)?)?;
        if items.len() < count as usize {
            return Err(SuiteStatus::BadParameter);
        }
        for (i, item) in items.iter().take(count as usize).enumerate() {
            // SAFETY: `i < count`; array supplied by the filter.
            unsafe { *values.add(i) = item.as_integer()? };
        }
        Ok(())
    })
}

unsafe extern "C" fn list_put_data(list: ActionToken, length: i32, value: *const c_void) -> SpErr {
    // SAFETY: Buffer of `length` bytes supplied by the filter.
    let value = unsafe { raw_data(length, value) };
    put(append_target(list), |_| value)
}

unsafe extern "C" fn list_get_data_length(list: ActionToken, index: u32, length: *mut i32) -> SpErr {
    // SAFETY: Out-pointer supplied by the filter.
    unsafe { get(index_slot(list, index), length, |v| Ok(v.as_bytes()?.len() as i32)) }
}

unsafe extern "C" fn list_get_data(list: ActionToken, index: u32, value: *mut c_void) -> SpErr {
    // SAFETY: Buffer sized from `get_data_length`.
    unsafe { get_raw_data(index_slot(list, index), value) }
}

unsafe extern "C" fn list_put_zstring(_list: ActionToken, _value: *mut c_void) -> SpErr {
    UNIMPLEMENTED
}

unsafe extern "C" fn list_get_zstring(_list: ActionToken, _index: u32, _value: *mut *mut c_void) -> SpErr {
    UNIMPLEMENTED
}

pub(crate) fn list_procs() -> ActionListProcs {
    ActionListProcs {
        make: Some(list_make),
        free: Some(list_free),
        get_type: Some(list_get_type),
        get_count: Some(list_get_count),
        put_integer: Some(list_put_integer),
        put_float: Some(list_put_float),
        put_unit_float: Some(list_put_unit_float),
        put_string: Some(list_put_string),
        put_boolean: Some(list_put_boolean),
        put_list: Some(list_put_list),
        put_object: Some(list_put_object),
        put_global_object: Some(list_put_global_object),
        put_enumerated: Some(list_put_enumerated),
        put_reference: Some(list_put_reference),
        put_class: Some(list_put_class),
        put_global_class: Some(list_put_global_class),
        put_alias: Some(list_put_alias),
        get_integer: Some(list_get_integer),
        get_float: Some(list_get_float),
        get_unit_float: Some(list_get_unit_float),
        get_string_length: Some(list_get_string_length),
        get_string: Some(list_get_string),
        get_boolean: Some(list_get_boolean),
        get_list: Some(list_get_list),
        get_object: Some(list_get_object),
        get_global_object: Some(list_get_object),
        get_enumerated: Some(list_get_enumerated),
        get_reference: Some(list_get_reference),
        get_class: Some(list_get_class),
        get_global_class: Some(list_get_class),
        get_alias: Some(list_get_alias),
        put_integers: Some(list_put_integers),
        get_integers: Some(list_get_integers),
        put_data: Some(list_put_data),
        get_data_length: Some(list_get_data_length),
        get_data: Some(list_get_data),
        put_zstring: Some(list_put_zstring),
        get_zstring: Some(list_get_zstring),
    }
}

// ============================================================================
// Action references
// ============================================================================

unsafe extern "C" fn ref_make(reference: *mut ActionToken) -> SpErr {
    sp_err(|s| {
        let made = s.registry.actions.make_reference()?;
        // SAFETY: Out-pointer supplied by the filter.
        unsafe { store(reference, made.into_ptr()) }
    })
}

unsafe extern "C" fn ref_free(reference: ActionToken) -> SpErr {
    sp_err(|s| s.registry.actions.free_reference(token(reference)?))
}

fn push(reference: ActionToken, class: u32, form: ReferenceForm) -> SpErr {
    sp_err(|s| s.registry.actions.reference_push(token(reference)?, FourCC(class), form))
}

/// Read part of the innermost element and store it.
///
/// # Safety
///
/// As for [`store`].
unsafe fn first<T>(
    reference: ActionToken,
    out: *mut T,
    part: impl FnOnce(&crate::suites::ReferenceItem) -> SuiteResult<T>,
) -> SpErr {
    sp_err(|s| {
        let value = part(s.registry.actions.reference_first(token(reference)?)?)?;
        // SAFETY: Upheld by the caller.
        unsafe { store(out, value) }
    })
}

unsafe extern "C" fn ref_get_form(reference: ActionToken, form: *mut u32) -> SpErr {
    // SAFETY: Out-pointer supplied by the filter.
    unsafe { first(reference, form, |item| Ok(item.form.code().value())) }
}

unsafe extern "C" fn ref_get_desired_class(reference: ActionToken, class: *mut u32) -> SpErr {
    // SAFETY: As above.
    unsafe { first(reference, class, |item| Ok(item.class.value())) }
}

unsafe extern "C" fn ref_put_name(reference: ActionToken, class: u32, value: *const c_char) -> SpErr {
    // SAFETY: The filter passes a NUL-terminated name.
    let name = unsafe { read_c_string(value) };
    push(reference, class, ReferenceForm::Name(String::from_utf8_lossy(&name).into_owned()))
}

unsafe extern "C" fn ref_put_index(reference: ActionToken, class: u32, value: u32) -> SpErr {
    push(reference, class, ReferenceForm::Index(value))
}

unsafe extern "C" fn ref_put_identifier(reference: ActionToken, class: u32, value: u32) -> SpErr {
    push(reference, class, ReferenceForm::Identifier(value))
}

unsafe extern "C" fn ref_put_offset(reference: ActionToken, class: u32, value: i32) -> SpErr {
    push(reference, class, ReferenceForm::Offset(value))
}

unsafe extern "C" fn ref_put_enumerated(reference: ActionToken, class: u32, kind: u32, value: u32) -> SpErr {
    push(
        reference,
        class,
        ReferenceForm::Enumerated {
            kind: FourCC(kind),
            value: FourCC(value),
        },
    )
}

unsafe extern "C" fn ref_put_property(reference: ActionToken, class: u32, key: u32) -> SpErr {
    push(reference, class, ReferenceForm::Property(FourCC(key)))
}

unsafe extern "C" fn ref_put_class(reference: ActionToken, class: u32) -> SpErr {
    push(reference, class, ReferenceForm::Class)
}

fn name_of(item: &crate::suites::ReferenceItem) -> SuiteResult<&str> {
    match &item.form {
        ReferenceForm::Name(name) => Ok(name),
        _ => Err(SuiteStatus::WrongType),
    }
}

unsafe extern "C" fn ref_get_name_length(reference: ActionToken, length: *mut u32) -> SpErr {
    // SAFETY: Out-pointer supplied by the filter.
    unsafe { first(reference, length, |item| Ok(name_of(item)?.len() as u32)) }
}

unsafe extern "C" fn ref_get_name(reference: ActionToken, value: *mut c_char, max: u32) -> SpErr {
    sp_err(|s| {
        let item = s.registry.actions.reference_first(token(reference)?)?;
        let name = name_of(item)?.as_bytes().to_vec();
        // SAFETY: Buffer of `max` bytes supplied by the filter.
        unsafe { store_c_string(&name, value, max) }
    })
}

unsafe extern "C" fn ref_get_index(reference: ActionToken, value: *mut u32) -> SpErr {
    // SAFETY: Out-pointer supplied by the filter.
    unsafe {
        first(reference, value, |item| match item.form {
            ReferenceForm::Index(i) => Ok(i),
            _ => Err(SuiteStatus::WrongType),
        })
    }
}

unsafe extern "C" fn ref_get_identifier(reference: ActionToken, value: *mut u32) -> SpErr {
    // SAFETY: As above.
    unsafe {
        first(reference, value, |item| match item.form {
            ReferenceForm::Identifier(id) => Ok(id),
            _ => Err(SuiteStatus::WrongType),
        })
    }
}

unsafe extern "C" fn ref_get_offset(reference: ActionToken, value: *mut i32) -> SpErr {
    // SAFETY: As above.
    unsafe {
        first(reference, value, |item| match item.form {
            ReferenceForm::Offset(offset) => Ok(offset),
            _ => Err(SuiteStatus::WrongType),
        })
    }
}

unsafe extern "C" fn ref_get_enumerated(reference: ActionToken, kind: *mut u32, value: *mut u32) -> SpErr {
    // SAFETY: As above.
    unsafe {
        first(reference, value, |item| match item.form {
            ReferenceForm::Enumerated { kind: stored_kind, value } => {
                if !kind.is_null() {
                    *kind = stored_kind.value();
                }
                Ok(value.value())
            }
            _ => Err(SuiteStatus::WrongType),
        })
    }
}

unsafe extern "C" fn ref_get_property(reference: ActionToken, key: *mut u32) -> SpErr {
    // SAFETY: As above.
    unsafe {
        first(reference, key, |item| match item.form {
            ReferenceForm::Property(key) => Ok(key.value()),
            _ => Err(SuiteStatus::WrongType),
        })
    }
}

unsafe extern "C" fn ref_get_container(reference: ActionToken, container: *mut ActionToken) -> SpErr {
    sp_err(|s| {
        let outer = s.registry.actions.reference_container(token(reference)?)?;
        // SAFETY: Out-pointer supplied by the filter.
        unsafe { store(container, outer.map_or(ptr::null_mut(), Token::into_ptr)) }
    })
}

pub(crate) fn reference_procs() -> ActionReferenceProcs {
    ActionReferenceProcs {
        make: Some(ref_make),
        free: Some(ref_free),
        get_form: Some(ref_get_form),
        get_desired_class: Some(ref_get_desired_class),
        put_name: Some(ref_put_name),
        put_index: Some(ref_put_index),
        put_identifier: Some(ref_put_identifier),
        put_offset: Some(ref_put_offset),
        put_enumerated: Some(ref_put_enumerated),
        put_property: Some(ref_put_property),
        put_class: Some(ref_put_class),
        get_name_length: Some(ref_get_name_length),
        get_name: Some(ref_get_name),
        get_index: Some(ref_get_index),
        get_identifier: Some(ref_get_identifier),
        get_offset: Some(ref_get_offset),
        get_enumerated: Some(ref_get_enumerated),
        get_property: Some(ref_get_property),
        get_container: Some(ref_get_container),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::ffi::CString;
    use std::rc::Rc;

    use super::*;
    use crate::abi::context::{install, is_installed};
    use crate::engine::session::test_session;
    use crate::fourcc::types;

    const KEY: u32 = FourCC::new(b"Key ").value();
    const OTHER: u32 = FourCC::new(b"Othr").value();
    const CLASS: u32 = FourCC::new(b"Cls ").value();

    fn make() -> ActionToken {
        let mut desc = ptr::null_mut();
        assert_eq!(unsafe { desc_make(&mut desc) }, 0);
        desc
    }

    #[test]
    fn test_acquire_returns_session_tables() {
        let session = Rc::new(RefCell::new(test_session()));
        let _active = install(session.clone());
        assert!(is_installed());
        let name = CString::new(basic::ACTION_REFERENCE_SUITE).unwrap();
        let mut table = ptr::null();
        assert_eq!(unsafe { acquire_suite(name.as_ptr(), 2, &mut table) }, 0);
        let expected = session.borrow().tables.action_reference.as_ptr().cast_const().cast::<c_void>();
        assert_eq!(table, expected);
        assert_eq!(unsafe { release_suite(name.as_ptr(), 2) }, 0);

        let unknown = CString::new("no such suite").unwrap();
        assert_eq!(
            unsafe { acquire_suite(unknown.as_ptr(), 1, &mut table) },
            SuiteStatus::SuiteNotFound.code()
        );
    }

    #[test]
    fn test_basic_blocks() {
        let _active = install(Rc::new(RefCell::new(test_session())));
        let mut block = ptr::null_mut();
        unsafe {
            assert_eq!(allocate_block(4, &mut block), 0);
            *block.cast::<u8>() = 7;
            let mut moved = ptr::null_mut();
            assert_eq!(reallocate_block(block, 16, &mut moved), 0);
            assert_eq!(*moved.cast::<u8>(), 7);
            assert_eq!(free_block(moved), 0);
            assert_eq!(free_block(moved), BAD_PARAMETER);
        }
    }

    #[test]
    fn test_descriptor_values() {
        let _active = install(Rc::new(RefCell::new(test_session())));
        let desc = make();
        let text = CString::new("hello").unwrap();
        unsafe {
            assert_eq!(desc_put_integer(desc, KEY, 42), 0);
            assert_eq!(desc_put_string(desc, OTHER, text.as_ptr()), 0);

            let mut kind = 0;
            assert_eq!(desc_get_type(desc, KEY, &mut kind), 0);
            assert_eq!(kind, types::INTEGER.value());
            let mut value = 0;
            assert_eq!(desc_get_integer(desc, KEY, &mut value), 0);
            assert_eq!(value, 42);

            let mut len = 0;
            assert_eq!(desc_get_string_length(desc, OTHER, &mut len), 0);
            assert_eq!(len, 5);
            let mut buf = [0x7f as c_char; 4];
            assert_eq!(desc_get_string(desc, OTHER, buf.as_mut_ptr(), 4), 0);
            assert_eq!(buf.map(|c| c as u8), *b"hel\0");

            let mut float = 0.0;
            assert_eq!(desc_get_float(desc, OTHER, &mut float), SuiteStatus::WrongType.code());
            assert_eq!(
                desc_get_integer(desc, FourCC::new(b"None").value(), &mut value),
                SuiteStatus::MissingParameter.code()
            );
            let mut count = 0;
            assert_eq!(desc_get_count(desc, &mut count), 0);
            assert_eq!(count, 2);
            assert_eq!(desc_free(desc), 0);
            assert_eq!(desc_free(desc), BAD_PARAMETER);
        }
    }

    #[test]
    fn test_nested_object_consumes_source() {
        let _active = install(Rc::new(RefCell::new(test_session())));
        let outer = make();
        let inner = make();
        unsafe {
            assert_eq!(desc_put_integer(inner, KEY, 1), 0);
            assert_eq!(desc_put_object(outer, KEY, CLASS, inner), 0);
            assert_eq!(desc_free(inner), BAD_PARAMETER);

            let (mut class, mut copy) = (0, ptr::null_mut());
            assert_eq!(desc_get_object(outer, KEY, &mut class, &mut copy), 0);
            assert_eq!(class, CLASS);
            let mut value = 0;
            assert_eq!(desc_get_integer(copy, KEY, &mut value), 0);
            assert_eq!(value, 1);
        }
    }

    #[test]
    fn test_list_integers() {
        let _active = install(Rc::new(RefCell::new(test_session())));
        let mut list = ptr::null_mut();
        unsafe {
            assert_eq!(list_make(&mut list), 0);
            let values = [3, 1, 4];
            assert_eq!(list_put_integers(list, 3, values.as_ptr()), 0);
            let mut count = 0;
            assert_eq!(list_get_count(list, &mut count), 0);
            assert_eq!(count, 3);
            let mut out = [0; 2];
            assert_eq!(list_get_integers(list, 2, out.as_mut_ptr()), 0);
            assert_eq!(out, [3, 1]);
            let mut big = [0; 4];
            assert_eq!(list_get_integers(list, 4, big.as_mut_ptr()), BAD_PARAMETER);

            let desc = make();
            assert_eq!(desc_put_list(desc, KEY, list), 0);
            let mut item = 0;
            assert_eq!(list_get_integer(list, 0, &mut item), BAD_PARAMETER);
            let mut ints = [0; 3];
            assert_eq!(desc_get_integers(desc, KEY, 3, ints.as_mut_ptr()), 0);
            assert_eq!(ints, values);
        }
    }

    #[test]
    fn test_reference_chain() {
        let _active = install(Rc::new(RefCell::new(test_session())));
        let mut reference = ptr::null_mut();
        let layer = FourCC::new(b"Lyr ").value();
        let document = FourCC::new(b"Dcmn").value();
        let name = CString::new("Background").unwrap();
        unsafe {
            assert_eq!(ref_make(&mut reference), 0);
            assert_eq!(ref_put_name(reference, layer, name.as_ptr()), 0);
            assert_eq!(ref_put_index(reference, document, 1), 0);

            let mut form = 0;
            assert_eq!(ref_get_form(reference, &mut form), 0);
            assert_eq!(form, crate::suites::dictionary::forms::NAME.value());
            let mut index = 0;
            assert_eq!(ref_get_index(reference, &mut index), SuiteStatus::WrongType.code());

            let mut container = ptr::null_mut();
            assert_eq!(ref_get_container(reference, &mut container), 0);
            assert!(!container.is_null());
            assert_eq!(ref_get_index(container, &mut index), 0);
            assert_eq!(index, 1);

            let mut top = 1usize as ActionToken;
            assert_eq!(ref_get_container(container, &mut top), 0);
            assert!(top.is_null());
        }
    }

    #[test]
    fn test_handle_bridge() {
        let _active = install(Rc::new(RefCell::new(test_session())));
        let desc = make();
        unsafe {
            assert_eq!(desc_put_boolean(desc, KEY, 1), 0);
            let mut handle = ptr::null_mut();
            assert_eq!(desc_as_handle(desc, &mut handle), 0);
            let mut copy = ptr::null_mut();
            assert_eq!(desc_handle_to_descriptor(handle, &mut copy), 0);
            let mut equal = 0;
            assert_eq!(desc_is_equal(desc, copy, &mut equal), 0);
            assert_eq!(equal, 1);
        }
    }

    #[test]
    fn test_zstrings_unimplemented() {
        assert_eq!(
            unsafe { desc_put_zstring(ptr::null_mut(), KEY, ptr::null_mut()) },
            SuiteStatus::Unimplemented.code()
        );
    }
}
