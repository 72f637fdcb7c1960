//! Legacy read/write descriptor procs.

use std::ptr;

use super::context::{os_err, with_session};
use super::{
    Boolean, OsErr, RawHandle, ReadDescriptorProcs, ReadToken, SimpleReference,
    WriteDescriptorProcs, WriteToken, read_pascal, write_pascal,
};
use crate::engine::session::HostSession;
use crate::fourcc::{FourCC, types};
use crate::suites::dictionary::forms;
use crate::suites::{DescriptorValue, Handle, Reference, ReferenceForm, ReferenceItem, SuiteResult, SuiteStatus, Token};

const BAD_PARAMETER: OsErr = SuiteStatus::BadParameter.os_err();

/// Longest expected-key array read from native memory.
const MAX_EXPECTED_KEYS: usize = 1024;

fn pascal_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// ============================================================================
// Simple references
// ============================================================================

fn simple_reference(item: &ReferenceItem) -> SimpleReference {
    let mut out = SimpleReference {
        desired_class: item.class.value(),
        key_form: item.form.code().value(),
        name: [0; 256],
        index: 0,
        kind: 0,
        value: 0,
    };
    match &item.form {
        ReferenceForm::Class => {}
        ReferenceForm::Name(name) => write_pascal(&mut out.name, name.as_bytes()),
        ReferenceForm::Index(i) | ReferenceForm::Identifier(i) => out.index = *i as i32,
        ReferenceForm::Offset(o) => out.index = *o,
        ReferenceForm::Enumerated { kind, value } => {
            out.kind = kind.value();
            out.value = value.value();
        }
        ReferenceForm::Property(key) => out.value = key.value(),
    }
    out
}

fn reference_item(simple: &SimpleReference) -> SuiteResult<ReferenceItem> {
    let len = simple.name[0] as usize;
    let form = match FourCC(simple.key_form) {
        forms::CLASS => ReferenceForm::Class,
        forms::NAME => ReferenceForm::Name(pascal_text(&simple.name[1..=len])),
        forms::INDEX => ReferenceForm::Index(simple.index as u32),
        forms::IDENTIFIER => ReferenceForm::Identifier(simple.index as u32),
        forms::OFFSET => ReferenceForm::Offset(simple.index),
        forms::ENUMERATED => ReferenceForm::Enumerated {
            kind: FourCC(simple.kind),
            value: FourCC(simple.value),
        },
        forms::PROPERTY => ReferenceForm::Property(FourCC(simple.value)),
        _ => return Err(SuiteStatus::BadParameter),
    };
    Ok(ReferenceItem {
        class: FourCC(simple.desired_class),
        form,
    })
}

// ============================================================================
// Reading
// ============================================================================

/// Copy a zero-terminated key array out of native memory.
///
/// # Safety
///
/// `keys` must be null or point at a zero-terminated array of keys.
unsafe fn expected_keys(keys: *const u32) -> Option<Vec<FourCC>> {
    if keys.is_null() {
        return None;
    }
    let mut out = Vec::new();
    for i in 0..MAX_EXPECTED_KEYS {
        // SAFETY: The array is terminated before `i` runs past it.
        let key = unsafe { *keys.add(i) };
        if key == 0 {
            break;
        }
        out.push(FourCC(key));
    }
    Some(out)
}

unsafe extern "C" fn open_read(descriptor: RawHandle, keys: *mut u32) -> ReadToken {
    let Some(handle) = Handle::from_raw(descriptor) else {
        return ptr::null_mut();
    };
    // SAFETY: The filter passes null or a terminated key array.
    let expected = unsafe { expected_keys(keys) };
    with_session(|s| {
        let token = s.registry.descriptors.open_read(handle, expected)?;
        if !keys.is_null() {
            s.reader_keys.insert(token, keys);
        }
        Ok::<_, SuiteStatus>(token)
    })
    .and_then(Result::ok)
    .map_or(ptr::null_mut(), Token::into_ptr)
}

unsafe extern "C" fn close_read(reader: ReadToken) -> OsErr {
    let Some(token) = Token::from_ptr(reader) else {
        return BAD_PARAMETER;
    };
    os_err(|s| {
        s.reader_keys.remove(&token);
        s.registry.descriptors.close_read(token)
    })
}

unsafe extern "C" fn get_key(reader: ReadToken, key: *mut u32, kind: *mut u32, flags: *mut i32) -> Boolean {
    let Some(token) = Token::from_ptr(reader) else {
        return 0;
    };
    let info = with_session(|s| {
        let info = s.registry.descriptors.get_key(token).ok().flatten()?;
        if let (Some(index), Some(&keys)) = (info.expected_index, s.reader_keys.get(&token)) {
            // SAFETY: `index` is within the array copied at open time.
            unsafe { *keys.add(index) = types::NULL.value() };
        }
        Some(info)
    })
    .flatten();
    let Some(info) = info else {
        return 0;
    };
    // SAFETY: Out-pointers are checked for null before each write.
    unsafe {
        if !key.is_null() {
            *key = info.key.value();
        }
        if !kind.is_null() {
            *kind = info.kind.value();
        }
        if !flags.is_null() {
            *flags = 0;
        }
    }
    1
}

/// Run a getter and store its value through `out`.
///
/// # Safety
///
/// `out` must be null or valid for a write of `T`.
unsafe fn read_into<T>(
    reader: ReadToken,
    out: *mut T,
    get: impl FnOnce(&mut HostSession, Token) -> SuiteResult<T>,
) -> OsErr {
    if out.is_null() {
        return BAD_PARAMETER;
    }
    let Some(token) = Token::from_ptr(reader) else {
        return BAD_PARAMETER;
    };
    os_err(|s| {
        let value = get(s, token)?;
        // SAFETY: Checked for null; valid per the function contract.
        unsafe { out.write(value) };
        Ok(())
    })
}

unsafe extern "C" fn get_integer(reader: ReadToken, value: *mut i32) -> OsErr {
    // SAFETY: Out-pointer supplied by the filter.
    unsafe { read_into(reader, value, |s, t| s.registry.descriptors.get_integer(t)) }
}

unsafe extern "C" fn get_float(reader: ReadToken, value: *mut f64) -> OsErr {
    // SAFETY: As above.
    unsafe { read_into(reader, value, |s, t| s.registry.descriptors.get_float(t)) }
}

unsafe extern "C" fn get_unit_float(reader: ReadToken, unit: *mut u32, value: *mut f64) -> OsErr {
    // SAFETY: As above.
    unsafe {
        read_into(reader, value, |s, t| {
            let (stored, value) = s.registry.descriptors.get_unit_float(t)?;
            if !unit.is_null() {
                *unit = stored.value();
            }
            Ok(value)
        })
    }
}

unsafe extern "C" fn get_boolean(reader: ReadToken, value: *mut Boolean) -> OsErr {
    // SAFETY: As above.
    unsafe { read_into(reader, value, |s, t| s.registry.descriptors.get_boolean(t).map(Boolean::from)) }
}

unsafe extern "C" fn get_text(reader: ReadToken, value: *mut RawHandle) -> OsErr {
    // SAFETY: As above.
    unsafe {
        read_into(reader, value, |s, t| {
            let text = s.registry.descriptors.get_text(t)?;
            Ok(s.registry.handles.new_with(text.as_bytes())?.as_raw())
        })
    }
}

unsafe extern "C" fn get_alias(reader: ReadToken, value: *mut RawHandle) -> OsErr {
    // SAFETY: As above.
    unsafe {
        read_into(reader, value, |s, t| {
            let bytes = s.registry.descriptors.get_alias(t)?;
            Ok(s.registry.handles.new_with(&bytes)?.as_raw())
        })
    }
}

unsafe extern "C" fn get_enumerated(reader: ReadToken, value: *mut u32) -> OsErr {
    // SAFETY: As above.
    unsafe { read_into(reader, value, |s, t| s.registry.descriptors.get_enumerated(t).map(FourCC::value)) }
}

unsafe extern "C" fn get_class(reader: ReadToken, value: *mut u32) -> OsErr {
    // SAFETY: As above.
    unsafe { read_into(reader, value, |s, t| s.registry.descriptors.get_class(t).map(FourCC::value)) }
}

unsafe extern "C" fn get_simple_reference(reader: ReadToken, value: *mut SimpleReference) -> OsErr {
    // SAFETY: As above.
    unsafe {
        read_into(reader, value, |s, t| {
            s.registry.descriptors.get_simple_reference(t).map(|item| simple_reference(&item))
        })
    }
}

unsafe extern "C" fn get_object(reader: ReadToken, class: *mut u32, value: *mut RawHandle) -> OsErr {
    // SAFETY: As above.
    unsafe {
        read_into(reader, value, |s, t| {
            let (kind, handle) = s.registry.read_object(t)?;
            if !class.is_null() {
                *class = kind.value();
            }
            Ok(handle.as_raw())
        })
    }
}

unsafe extern "C" fn get_count(reader: ReadToken, value: *mut u32) -> OsErr {
    // SAFETY: As above.
    unsafe { read_into(reader, value, |s, t| s.registry.descriptors.get_count(t)) }
}

unsafe extern "C" fn get_string(reader: ReadToken, value: *mut [u8; 256]) -> OsErr {
    // SAFETY: As above.
    unsafe {
        read_into(reader, value, |s, t| {
            let text = s.registry.descriptors.get_text(t)?;
            let mut out = [0u8; 256];
            write_pascal(&mut out, text.as_bytes());
            Ok(out)
        })
    }
}

/// Clamp and report coercion through the status.
///
/// # Safety
///
/// As for [`read_into`].
unsafe fn read_pinned<T: Copy>(
    reader: ReadToken,
    out: *mut T,
    get: impl FnOnce(&mut HostSession, Token) -> SuiteResult<crate::suites::descriptor::Pinned<T>>,
) -> OsErr {
    if out.is_null() {
        return BAD_PARAMETER;
    }
    let Some(token) = Token::from_ptr(reader) else {
        return BAD_PARAMETER;
    };
    os_err(|s| {
        let pinned = get(s, token)?;
        // SAFETY: Checked for null; valid per the function contract.
        unsafe { out.write(pinned.value) };
        match pinned.status() {
            SuiteStatus::Ok => Ok(()),
            status => Err(status),
        }
    })
}

unsafe extern "C" fn get_pinned_integer(reader: ReadToken, min: i32, max: i32, value: *mut i32) -> OsErr {
    // SAFETY: Out-pointer supplied by the filter.
    unsafe { read_pinned(reader, value, |s, t| s.registry.descriptors.get_pinned_integer(t, min, max)) }
}

unsafe fn bound(ptr: *const f64, default: f64) -> f64 {
    if ptr.is_null() {
        default
    } else {
        // SAFETY: Non-null bound supplied by the filter.
        unsafe { *ptr }
    }
}

unsafe extern "C" fn get_pinned_float(
    reader: ReadToken,
    min: *const f64,
    max: *const f64,
    value: *mut f64,
) -> OsErr {
    // SAFETY: Bounds and out-pointer supplied by the filter.
    unsafe {
        let (min, max) = (bound(min, f64::MIN), bound(max, f64::MAX));
        read_pinned(reader, value, |s, t| s.registry.descriptors.get_pinned_float(t, min, max))
    }
}

unsafe extern "C" fn get_pinned_unit_float(
    reader: ReadToken,
    min: *const f64,
    max: *const f64,
    unit: *mut u32,
    value: *mut f64,
) -> OsErr {
    if unit.is_null() {
        return BAD_PARAMETER;
    }
    // SAFETY: As for `get_pinned_float`; `unit` is checked for null.
    unsafe {
        let (min, max) = (bound(min, f64::MIN), bound(max, f64::MAX));
        let unit = FourCC(*unit);
        read_pinned(reader, value, |s, t| {
            s.registry.descriptors.get_pinned_unit_float(t, min, max, unit)
        })
    }
}

pub(crate) fn read_procs() -> ReadDescriptorProcs {
    ReadDescriptorProcs {
        version: 0,
        count: 18,
        open: Some(open_read),
        close: Some(close_read),
        get_key: Some(get_key),
        get_integer: Some(get_integer),
        get_float: Some(get_float),
        get_unit_float: Some(get_unit_float),
        get_boolean: Some(get_boolean),
        get_text: Some(get_text),
        get_alias: Some(get_alias),
        get_enumerated: Some(get_enumerated),
        get_class: Some(get_class),
        get_simple_reference: Some(get_simple_reference),
        get_object: Some(get_object),
        get_count: Some(get_count),
        get_string: Some(get_string),
        get_pinned_integer: Some(get_pinned_integer),
        get_pinned_float: Some(get_pinned_float),
        get_pinned_unit_float: Some(get_pinned_unit_float),
    }
}

// ============================================================================
// Writing
// ============================================================================

unsafe extern "C" fn open_write() -> WriteToken {
    with_session(|s| s.registry.descriptors.open_write())
        .and_then(Result::ok)
        .map_or(ptr::null_mut(), Token::into_ptr)
}

unsafe extern "C" fn close_write(writer: WriteToken, descriptor: *mut RawHandle) -> OsErr {
    let Some(token) = Token::from_ptr(writer) else {
        return BAD_PARAMETER;
    };
    os_err(|s| {
        let handle = s.registry.close_write_descriptor(token)?;
        if descriptor.is_null() {
            return s.registry.dispose_handle(handle);
        }
        // SAFETY: Non-null out-pointer supplied by the filter.
        unsafe { *descriptor = handle.as_raw() };
        Ok(())
    })
}

fn put(writer: WriteToken, key: u32, value: impl FnOnce(&mut HostSession) -> SuiteResult<DescriptorValue>) -> OsErr {
    let Some(token) = Token::from_ptr(writer) else {
        return BAD_PARAMETER;
    };
    os_err(|s| {
        let value = value(s)?;
        s.registry.descriptors.put(token, FourCC(key), value)
    })
}

unsafe extern "C" fn put_integer(writer: WriteToken, key: u32, value: i32) -> OsErr {
    put(writer, key, |_| Ok(DescriptorValue::Integer(value)))
}

unsafe extern "C" fn put_float(writer: WriteToken, key: u32, value: *const f64) -> OsErr {
    if value.is_null() {
        return BAD_PARAMETER;
    }
    // SAFETY: Non-null value supplied by the filter.
    let value = unsafe { *value };
    put(writer, key, |_| Ok(DescriptorValue::Float(value)))
}

unsafe extern "C" fn put_unit_float(writer: WriteToken, key: u32, unit: u32, value: *const f64) -> OsErr {
    if value.is_null() {
        return BAD_PARAMETER;
    }
    // SAFETY: As above.
    let value = unsafe { *value };
    put(writer, key, |_| {
        Ok(DescriptorValue::UnitFloat {
            unit: FourCC(unit),
            value,
        })
    })
}

unsafe extern "C" fn put_boolean(writer: WriteToken, key: u32, value: Boolean) -> OsErr {
    put(writer, key, |_| Ok(DescriptorValue::Boolean(value != 0)))
}

fn handle_bytes(s: &HostSession, raw: RawHandle) -> SuiteResult<Vec<u8>> {
    let handle = Handle::from_raw(raw).ok_or(SuiteStatus::NilHandle)?;
    s.registry.handle_contents(handle)
}

unsafe extern "C" fn put_text(writer: WriteToken, key: u32, value: RawHandle) -> OsErr {
    put(writer, key, |s| Ok(DescriptorValue::Text(pascal_text(&handle_bytes(s, value)?))))
}

unsafe extern "C" fn put_alias(writer: WriteToken, key: u32, value: RawHandle) -> OsErr {
    put(writer, key, |s| Ok(DescriptorValue::Alias(handle_bytes(s, value)?)))
}

unsafe extern "C" fn put_enumerated(writer: WriteToken, key: u32, kind: u32, value: u32) -> OsErr {
    put(writer, key, |_| {
        Ok(DescriptorValue::Enumerated {
            kind: FourCC(kind),
            value: FourCC(value),
        })
    })
}

unsafe extern "C" fn put_class(writer: WriteToken, key: u32, value: u32) -> OsErr {
    put(writer, key, |_| Ok(DescriptorValue::Class(FourCC(value))))
}

unsafe extern "C" fn put_simple_reference(writer: WriteToken, key: u32, value: *const SimpleReference) -> OsErr {
    if value.is_null() {
        return BAD_PARAMETER;
    }
    // SAFETY: Non-null reference supplied by the filter.
    let item = unsafe { reference_item(&*value) };
    put(writer, key, |_| {
        Ok(DescriptorValue::Reference(Reference { items: smallvec::smallvec![item?] }))
    })
}

fn put_object_value(writer: WriteToken, key: u32, class: u32, value: RawHandle, global: bool) -> OsErr {
    let Some(token) = Token::from_ptr(writer) else {
        return BAD_PARAMETER;
    };
    let Some(source) = Handle::from_raw(value) else {
        return SuiteStatus::NilHandle.os_err();
    };
    os_err(|s| s.registry.put_object(token, FourCC(key), FourCC(class), source, global))
}

unsafe extern "C" fn put_object(writer: WriteToken, key: u32, class: u32, value: RawHandle) -> OsErr {
    put_object_value(writer, key, class, value, false)
}

unsafe extern "C" fn put_count(writer: WriteToken, key: u32, count: u32) -> OsErr {
    put(writer, key, |_| Ok(DescriptorValue::Integer(count as i32)))
}

unsafe extern "C" fn put_string(writer: WriteToken, key: u32, value: *const u8) -> OsErr {
    // SAFETY: The filter passes null or a Pascal string.
    let text = pascal_text(&unsafe { read_pascal(value) });
    put(writer, key, |_| Ok(DescriptorValue::Text(text)))
}

unsafe extern "C" fn put_scoped_class(writer: WriteToken, key: u32, value: u32) -> OsErr {
    put(writer, key, |_| Ok(DescriptorValue::Class(FourCC(value))))
}

unsafe extern "C" fn put_scoped_object(writer: WriteToken, key: u32, class: u32, value: RawHandle) -> OsErr {
    put_object_value(writer, key, class, value, true)
}

pub(crate) fn write_procs() -> WriteDescriptorProcs {
    WriteDescriptorProcs {
        version: 0,
        count: 16,
        open: Some(open_write),
        close: Some(close_write),
        put_integer: Some(put_integer),
        put_float: Some(put_float),
        put_unit_float: Some(put_unit_float),
        put_boolean: Some(put_boolean),
        put_text: Some(put_text),
        put_alias: Some(put_alias),
        put_enumerated: Some(put_enumerated),
        put_class: Some(put_class),
        put_simple_reference: Some(put_simple_reference),
        put_object: Some(put_object),
        put_count: Some(put_count),
        put_string: Some(put_string),
        put_scoped_class: Some(put_scoped_class),
        put_scoped_object: Some(put_scoped_object),
    }
}
