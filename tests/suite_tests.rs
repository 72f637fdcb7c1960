//! Integration tests for the callback suites as a plugin session sees them.

use std::sync::Arc;

use filterhost::config::HostConfig;
use filterhost::engine::persist::{self, RestoredMemory};
use filterhost::engine::{NullProbe, StorageMethod};
use filterhost::fourcc::FourCC;
use filterhost::suites::{
    ColorServices, DescriptorValue, Dictionary, Handle, PropertyContext, SuiteRegistry, SuiteStatus,
};

const SIZE: FourCC = FourCC::new(b"Sz  ");
const NAME: FourCC = FourCC::new(b"Nm  ");
const KIND: FourCC = FourCC::new(b"mset");

fn registry() -> SuiteRegistry {
    SuiteRegistry::new(
        &HostConfig::default().with_max_buffer_space(1024 * 1024),
        PropertyContext::default(),
        ColorServices::new([0; 3], [255; 3]),
        Arc::new(NullProbe),
    )
}

// ============================================================================
// Handles
// ============================================================================

#[test]
fn test_handle_lifecycle() {
    let mut reg = registry();
    let handle = reg.handles.new_with(b"abc").unwrap();
    assert_eq!(reg.handle_size(handle), 3);

    let data = reg.lock_handle(handle).unwrap();
    // SAFETY: The handle is live and three bytes long.
    assert_eq!(unsafe { *data.add(1) }, b'b');
    // SAFETY: The master pointer of a live handle points at its data.
    assert_eq!(unsafe { *handle.as_raw() }, data);
    reg.handles.unlock(handle);

    reg.handles.set_size(handle, 5).unwrap();
    assert_eq!(reg.handles.bytes(handle), Some(&b"abc\0\0"[..]));

    reg.dispose_handle(handle).unwrap();
    assert!(!reg.handles.contains(handle));
    assert_eq!(reg.dispose_handle(handle), Err(SuiteStatus::NilHandle));
}

#[test]
fn test_unknown_handle_has_no_contents() {
    let reg = registry();
    let bogus = Handle::from_addr(0x10).unwrap();
    assert_eq!(reg.handle_contents(bogus), Err(SuiteStatus::NilHandle));
}

// ============================================================================
// Descriptors
// ============================================================================

#[test]
fn test_descriptor_handle_bridges_to_action_descriptor() {
    let mut reg = registry();
    let mut dict = Dictionary::new();
    dict.put(SIZE, DescriptorValue::Integer(12));
    dict.put(NAME, DescriptorValue::Text("sharp".into()));

    let handle = reg.descriptor_handle(dict.clone()).unwrap();
    let token = reg.handle_to_action_descriptor(handle).unwrap();
    assert_eq!(reg.actions.get(token, SIZE).unwrap().as_integer(), Ok(12));
    assert_eq!(reg.actions.get(token, NAME).unwrap().as_text(), Ok("sharp"));

    reg.actions.put(token, SIZE, DescriptorValue::Integer(13)).unwrap();
    let back = reg.action_descriptor_as_handle(token).unwrap();
    let stored = reg.descriptors.dictionary(back).unwrap();
    assert_eq!(stored.get(SIZE), Some(&DescriptorValue::Integer(13)));
    assert_eq!(reg.descriptors.dictionary(handle), Some(&dict));
}

#[test]
fn test_wrong_type_and_missing_key() {
    let mut reg = registry();
    let token = reg.actions.make_descriptor().unwrap();
    reg.actions.put(token, SIZE, DescriptorValue::Boolean(true)).unwrap();
    assert_eq!(reg.actions.get(token, SIZE).unwrap().as_integer(), Err(SuiteStatus::WrongType));
    assert_eq!(reg.actions.get(token, NAME).err(), Some(SuiteStatus::MissingParameter));

    reg.actions.free_descriptor(token).unwrap();
    assert_eq!(reg.actions.free_descriptor(token), Err(SuiteStatus::BadParameter));
}

// ============================================================================
// Resources and buffers
// ============================================================================

#[test]
fn test_resources_renumber_after_delete() {
    let mut reg = registry();
    assert_eq!(reg.resources.add(KIND, b"one"), Ok(1));
    assert_eq!(reg.resources.add(KIND, b"two"), Ok(2));
    assert_eq!(reg.resources.add(KIND, b"three"), Ok(3));

    reg.resources.delete(KIND, 1).unwrap();
    assert_eq!(reg.resources.count(KIND), 2);
    assert_eq!(reg.resources.get(KIND, 1), Some(&b"two"[..]));
    assert_eq!(reg.resources.get(KIND, 2), Some(&b"three"[..]));
    assert_eq!(reg.resources.delete(KIND, 3), Err(SuiteStatus::BadParameter));
}

#[test]
fn test_buffer_space_is_capped() {
    let mut reg = registry();
    assert!(reg.buffers.space() <= 1024 * 1024);

    let token = reg.buffers.allocate(64).unwrap();
    assert_eq!(reg.buffers.size(token), Some(64));
    reg.buffers.free(token).unwrap();
    assert_eq!(reg.buffers.size(token), None);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_handle_block_survives_between_registries() {
    let mut first = registry();
    let handle = first.handles.new_with(&[9, 8, 7]).unwrap();
    let block = persist::capture(&first, handle.addr()).unwrap();
    assert_eq!(block.method, StorageMethod::HandleSuite);
    assert!(!block.executable);

    let mut second = registry();
    let mut memory = RestoredMemory::new();
    let addr = persist::restore(&mut second, &mut memory, &block).unwrap();
    let restored = Handle::from_addr(addr).unwrap();
    assert_eq!(second.handles.bytes(restored), Some(&[9u8, 8, 7][..]));
}

#[test]
fn test_null_block_is_not_captured() {
    let reg = registry();
    assert!(persist::capture(&reg, 0).is_none());
}
