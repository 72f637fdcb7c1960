//! Host callback suites.
//!
//! Each suite is plain Rust state with methods that return [`SuiteResult`];
//! nothing in this module touches native layouts. The `abi` module adapts
//! these methods to the tables a plugin calls through.
//!
//! The [`SuiteRegistry`] owns one instance of every suite for the duration
//! of a run and carries the operations that span more than one suite, such
//! as descriptors that live behind handles.
//!
//! # Example
//!
//! ```rust,ignore
//! use filterhost::suites::{SuiteRegistry, SuiteStatus};
//!
//! let mut registry = SuiteRegistry::new(&config, context, colors, probe);
//! let writer = registry.descriptors.open_write()?;
//! registry.descriptors.put(writer, key, DescriptorValue::Integer(3))?;
//! let handle = registry.close_write_descriptor(writer)?;
//! ```

pub mod action;
pub mod arena;
pub mod basic;
pub mod buffer;
pub mod color_services;
pub mod descriptor;
pub mod dictionary;
pub mod handle;
pub mod image_services;
pub mod property;
pub mod resource;

use std::sync::Arc;

use crate::config::HostConfig;
use crate::engine::MemoryProbe;
use crate::fourcc::FourCC;

pub use action::ActionSuites;
pub use arena::{Arena, Token};
pub use basic::{BasicSuite, SuiteKind};
pub use buffer::BufferSuite;
pub use color_services::ColorServices;
pub use descriptor::DescriptorSuite;
pub use dictionary::{DescriptorValue, Dictionary, Reference, ReferenceForm, ReferenceItem};
pub use handle::{Handle, HandleSuite};
pub use property::{PropertyContext, PropertySuite, PropertyValue};
pub use resource::{ResourceEntry, ResourceSuite};

/// Status codes returned to plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuiteStatus {
    /// Success.
    Ok,
    /// A pinned value was clamped into range.
    Coerced,
    /// The user cancelled a host dialog.
    Cancelled,
    /// Invalid argument or stale token.
    BadParameter,
    /// Allocation failed.
    OutOfMemory,
    /// Unknown or disposed handle.
    NilHandle,
    /// Value has a different type than requested.
    WrongType,
    /// Key not present.
    MissingParameter,
    /// Call made in the wrong state.
    LogicError,
    /// The host does not implement this operation.
    Unimplemented,
    /// Unknown property.
    PropertyUndefined,
    /// Unknown suite name or version.
    SuiteNotFound,
}

/// Result of a suite operation.
pub type SuiteResult<T> = std::result::Result<T, SuiteStatus>;

impl SuiteStatus {
    /// Numeric code as seen by plugins.
    pub const fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Coerced => 2,
            Self::Cancelled => -128,
            Self::BadParameter => -50,
            Self::OutOfMemory => -108,
            Self::NilHandle => -109,
            Self::WrongType => -1703,
            Self::MissingParameter => -1715,
            Self::LogicError => -1719,
            Self::Unimplemented => -30900,
            Self::PropertyUndefined => -30901,
            Self::SuiteNotFound => i32::from_be_bytes(*b"S!Fd"),
        }
    }

    /// Code as a 16-bit `OSErr`. Suite-lookup errors have no 16-bit form
    /// and report as unimplemented.
    pub const fn os_err(self) -> i16 {
        match self {
            Self::SuiteNotFound => Self::Unimplemented.code() as i16,
            other => other.code() as i16,
        }
    }

    /// Collapse a result into a 16-bit status.
    pub fn of<T>(result: &SuiteResult<T>) -> i16 {
        match result {
            Ok(_) => 0,
            Err(status) => status.os_err(),
        }
    }
}

impl std::fmt::Display for SuiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Every suite's state for one run.
#[derive(Debug)]
pub struct SuiteRegistry {
    /// Handle suite.
    pub handles: HandleSuite,
    /// Buffer suite.
    pub buffers: BufferSuite,
    /// Legacy descriptor suites.
    pub descriptors: DescriptorSuite,
    /// Action descriptor, list and reference suites.
    pub actions: ActionSuites,
    /// Basic suite.
    pub basic: BasicSuite,
    /// Property suite.
    pub properties: PropertySuite,
    /// Resource suite.
    pub resources: ResourceSuite,
    /// Color-services suite.
    pub colors: ColorServices,
    probe: Arc<dyn MemoryProbe>,
}

impl SuiteRegistry {
    /// Create a registry for one run.
    pub fn new(
        config: &HostConfig,
        properties: PropertyContext,
        colors: ColorServices,
        probe: Arc<dyn MemoryProbe>,
    ) -> Self {
        Self {
            handles: HandleSuite::new(),
            buffers: BufferSuite::new(config.max_buffer_space),
            descriptors: DescriptorSuite::new(),
            actions: ActionSuites::new(),
            basic: BasicSuite::new(),
            properties: PropertySuite::new(properties),
            resources: ResourceSuite::new(),
            colors,
            probe,
        }
    }

    /// Memory probe used for foreign blocks.
    pub fn probe(&self) -> &dyn MemoryProbe {
        self.probe.as_ref()
    }

    /// Size of a handle, including foreign two-word handles.
    pub fn handle_size(&self, handle: Handle) -> usize {
        self.handles.size(handle, self.probe.as_ref())
    }

    /// Lock a handle, including foreign two-word handles.
    pub fn lock_handle(&mut self, handle: Handle) -> SuiteResult<*mut u8> {
        self.handles.lock(handle, self.probe.as_ref())
    }

    /// Dispose a handle and any descriptor stored behind it.
    pub fn dispose_handle(&mut self, handle: Handle) -> SuiteResult<()> {
        self.descriptors.forget(handle);
        self.handles.dispose(handle)
    }

    /// Store a dictionary behind a fresh handle.
    pub fn descriptor_handle(&mut self, dictionary: Dictionary) -> SuiteResult<Handle> {
        let handle = self.handles.new_handle(0)?;
        self.descriptors.store(handle, dictionary);
        Ok(handle)
    }

    /// Finish a legacy writer, returning the descriptor handle.
    pub fn close_write_descriptor(&mut self, writer: Token) -> SuiteResult<Handle> {
        let dictionary = self.descriptors.close_write(writer)?;
        self.descriptor_handle(dictionary)
    }

    /// Read a nested descriptor into a fresh handle.
    pub fn read_object(&mut self, reader: Token) -> SuiteResult<(FourCC, Handle)> {
        let (class, dictionary) = self.descriptors.get_object(reader)?;
        Ok((class, self.descriptor_handle(dictionary)?))
    }

    /// Put the descriptor behind `source` into a writer, disposing `source`.
    /// A `global` object keeps its class in the global namespace.
    pub fn put_object(
        &mut self,
        writer: Token,
        key: FourCC,
        class: FourCC,
        source: Handle,
        global: bool,
    ) -> SuiteResult<()> {
        let dictionary = self
            .descriptors
            .dictionary(source)
            .cloned()
            .ok_or(SuiteStatus::BadParameter)?;
        let value = if global {
            DescriptorValue::GlobalObject { class, dictionary }
        } else {
            DescriptorValue::Object { class, dictionary }
        };
        self.descriptors.put(writer, key, value)?;
        self.dispose_handle(source)
    }

    /// Copy the bytes behind a handle the filter passed in, whether the
    /// suite allocated it or it is a foreign two-word handle.
    pub fn handle_contents(&self, handle: Handle) -> SuiteResult<Vec<u8>> {
        if let Some(bytes) = self.handles.bytes(handle) {
            return Ok(bytes.to_vec());
        }
        let foreign =
            handle::foreign_otof(handle.addr(), self.probe.as_ref()).ok_or(SuiteStatus::NilHandle)?;
        // SAFETY: The probe sized the data block of a live foreign handle.
        let bytes = unsafe { std::slice::from_raw_parts(foreign.data, foreign.size) };
        Ok(bytes.to_vec())
    }

    /// Copy a legacy descriptor handle into an action descriptor.
    pub fn handle_to_action_descriptor(&mut self, handle: Handle) -> SuiteResult<Token> {
        let dictionary = self
            .descriptors
            .dictionary(handle)
            .cloned()
            .ok_or(SuiteStatus::BadParameter)?;
        self.actions.adopt_descriptor(dictionary)
    }

    /// Copy an action descriptor into a fresh legacy descriptor handle.
    pub fn action_descriptor_as_handle(&mut self, descriptor: Token) -> SuiteResult<Handle> {
        let dictionary = self.actions.descriptor(descriptor)?.clone();
        self.descriptor_handle(dictionary)
    }

    /// Look a property up; complex values are returned in a new handle.
    pub fn property(
        &mut self,
        signature: FourCC,
        key: FourCC,
        index: i32,
    ) -> SuiteResult<(isize, Option<Handle>)> {
        match self.properties.get(signature, key, index)? {
            PropertyValue::Simple(value) => Ok((value, None)),
            PropertyValue::Complex(bytes) => Ok((0, Some(self.handles.new_with(&bytes)?))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NullProbe;

    fn registry() -> SuiteRegistry {
        SuiteRegistry::new(
            &HostConfig::default(),
            PropertyContext::default(),
            ColorServices::new([0; 3], [255; 3]),
            Arc::new(NullProbe),
        )
    }

    const KEY: FourCC = FourCC::new(b"Key ");

    #[test]
    fn test_status_codes() {
        assert_eq!(SuiteStatus::OutOfMemory.os_err(), -108);
        assert_eq!(SuiteStatus::SuiteNotFound.code(), 0x5321_4664);
        assert_eq!(SuiteStatus::of(&Err::<(), _>(SuiteStatus::WrongType)), -1703);
        assert_eq!(SuiteStatus::of(&Ok(5)), 0);
    }

    #[test]
    fn test_dispose_drops_descriptor() {
        let mut reg = registry();
        let writer = reg.descriptors.open_write().unwrap();
        reg.descriptors.put(writer, KEY, DescriptorValue::Integer(1)).unwrap();
        let handle = reg.close_write_descriptor(writer).unwrap();
        assert!(reg.descriptors.dictionary(handle).is_some());
        reg.dispose_handle(handle).unwrap();
        assert!(reg.descriptors.dictionary(handle).is_none());
    }

    #[test]
    fn test_put_object_consumes_handle() {
        let mut reg = registry();
        let inner = reg.descriptor_handle(Dictionary::new()).unwrap();
        let writer = reg.descriptors.open_write().unwrap();
        reg.put_object(writer, KEY, FourCC::new(b"Clss"), inner, false).unwrap();
        assert!(!reg.handles.contains(inner));
        assert_eq!(
            reg.put_object(writer, KEY, FourCC::new(b"Clss"), inner, false),
            Err(SuiteStatus::BadParameter)
        );
        let dict = reg.descriptors.close_write(writer).unwrap();
        assert!(matches!(dict.get(KEY), Some(DescriptorValue::Object { .. })));
    }

    #[test]
    fn test_handle_contents() {
        let mut reg = registry();
        let handle = reg.handles.new_with(b"abc").unwrap();
        assert_eq!(reg.handle_contents(handle).unwrap(), b"abc");
        let stray = [0usize; 2];
        let stray = Handle::from_addr(stray.as_ptr() as usize).unwrap();
        assert_eq!(reg.handle_contents(stray), Err(SuiteStatus::NilHandle));
    }

    #[test]
    fn test_action_bridge() {
        let mut reg = registry();
        let dict: Dictionary = [(KEY, DescriptorValue::Boolean(true))].into_iter().collect();
        let handle = reg.descriptor_handle(dict.clone()).unwrap();
        let token = reg.handle_to_action_descriptor(handle).unwrap();
        assert_eq!(reg.actions.descriptor(token).unwrap(), &dict);
        let back = reg.action_descriptor_as_handle(token).unwrap();
        assert_ne!(back, handle);
        assert_eq!(reg.descriptors.dictionary(back), Some(&dict));
    }

    #[test]
    fn test_complex_property_allocates_handle() {
        let mut reg = registry();
        let (_, handle) = reg
            .property(crate::fourcc::VENDOR_ADOBE, property::keys::SERIAL_STRING, 0)
            .unwrap();
        let handle = handle.unwrap();
        assert_eq!(reg.handles.bytes(handle), Some(&b"0"[..]));
    }
}
