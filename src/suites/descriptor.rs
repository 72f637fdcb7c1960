//! Legacy read/write descriptor suites.
//!
//! Descriptors cross the plugin boundary as handles. The suite keeps the
//! dictionary behind each descriptor handle; readers iterate a snapshot of
//! it, so nothing a plugin does while reading can disturb the iteration.
//!
//! When a reader is opened with an expected-key array, every key the reader
//! hands out that appears in the array is overwritten there with the `null`
//! type, leaving the plugin a list of keys that were never seen.

use std::collections::HashMap;

use super::arena::{Arena, Token};
use super::dictionary::{DescriptorValue, Dictionary, ReferenceItem};
use super::handle::Handle;
use super::{SuiteResult, SuiteStatus};
use crate::fourcc::{FourCC, types};

/// A numeric value read through a pinned getter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pinned<T> {
    /// Value clamped into the requested range.
    pub value: T,
    /// Whether clamping changed the value.
    pub coerced: bool,
}

impl<T> Pinned<T> {
    /// Status to report alongside the value.
    pub fn status(&self) -> SuiteStatus {
        if self.coerced {
            SuiteStatus::Coerced
        } else {
            SuiteStatus::Ok
        }
    }
}

/// A key handed out by [`DescriptorSuite::get_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    /// The key.
    pub key: FourCC,
    /// Type of its value.
    pub kind: FourCC,
    /// Position in the expected-key array that was overwritten, if any.
    pub expected_index: Option<usize>,
}

#[derive(Debug)]
struct ReadState {
    dictionary: Dictionary,
    cursor: usize,
    current: Option<FourCC>,
    expected: Option<Vec<FourCC>>,
    last_error: Option<SuiteStatus>,
}

impl ReadState {
    fn current_value(&self) -> SuiteResult<&DescriptorValue> {
        let key = self.current.ok_or(SuiteStatus::LogicError)?;
        self.dictionary.get(key).ok_or(SuiteStatus::MissingParameter)
    }
}

/// Dictionaries behind descriptor handles plus open readers and writers.
#[derive(Debug, Default)]
pub struct DescriptorSuite {
    dictionaries: HashMap<usize, Dictionary>,
    readers: Arena<ReadState>,
    writers: Arena<Dictionary>,
}

impl DescriptorSuite {
    /// Create an empty suite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a dictionary with a descriptor handle.
    pub fn store(&mut self, handle: Handle, dictionary: Dictionary) {
        self.dictionaries.insert(handle.addr(), dictionary);
    }

    /// Dictionary behind a descriptor handle.
    pub fn dictionary(&self, handle: Handle) -> Option<&Dictionary> {
        self.dictionaries.get(&handle.addr())
    }

    /// Detach the dictionary behind a descriptor handle.
    pub fn take(&mut self, handle: Handle) -> Option<Dictionary> {
        self.dictionaries.remove(&handle.addr())
    }

    /// Drop whatever dictionary was keyed by a disposed handle.
    pub fn forget(&mut self, handle: Handle) {
        if self.dictionaries.remove(&handle.addr()).is_some() {
            tracing::trace!(handle = handle.addr(), "dropped descriptor of disposed handle");
        }
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Open a reader over the descriptor behind `handle`.
    ///
    /// An unknown handle reads as an empty descriptor.
    pub fn open_read(
        &mut self,
        handle: Handle,
        expected: Option<Vec<FourCC>>,
    ) -> SuiteResult<Token> {
        tracing::trace!(handle = handle.addr(), expected = ?expected, "open read descriptor");
        let dictionary = self.dictionary(handle).cloned().unwrap_or_default();
        self.readers.insert(ReadState {
            dictionary,
            cursor: 0,
            current: None,
            expected,
            last_error: None,
        })
    }

    /// Close a reader, returning the last error any getter reported.
    pub fn close_read(&mut self, reader: Token) -> SuiteResult<()> {
        let state = self.readers.remove(reader).ok_or(SuiteStatus::BadParameter)?;
        match state.last_error {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    /// Expected-key array of a reader, with seen keys replaced by `null`.
    pub fn expected_keys(&self, reader: Token) -> Option<&[FourCC]> {
        self.readers.get(reader)?.expected.as_deref()
    }

    /// Advance to the next key in insertion order.
    pub fn get_key(&mut self, reader: Token) -> SuiteResult<Option<KeyInfo>> {
        let state = self.readers.get_mut(reader).ok_or(SuiteStatus::BadParameter)?;
        let Some((key, value)) = state.dictionary.entry_at(state.cursor) else {
            state.current = None;
            return Ok(None);
        };
        let kind = value.type_id();
        state.cursor += 1;
        state.current = Some(key);

        let expected_index = state.expected.as_mut().and_then(|expected| {
            let index = expected.iter().position(|k| *k == key)?;
            expected[index] = types::NULL;
            Some(index)
        });
        tracing::trace!(key = %key, kind = %kind, "read descriptor key");
        Ok(Some(KeyInfo {
            key,
            kind,
            expected_index,
        }))
    }

    fn read<T>(
        &mut self,
        reader: Token,
        f: impl FnOnce(&DescriptorValue) -> SuiteResult<T>,
    ) -> SuiteResult<T> {
        let state = self.readers.get_mut(reader).ok_or(SuiteStatus::BadParameter)?;
        let result = state.current_value().and_then(f);
        if let Err(status) = &result {
            state.last_error = Some(*status);
        }
        result
    }

    /// Current value as an integer.
    pub fn get_integer(&mut self, reader: Token) -> SuiteResult<i32> {
        self.read(reader, DescriptorValue::as_integer)
    }

    /// Current value as a float. Integers are widened.
    pub fn get_float(&mut self, reader: Token) -> SuiteResult<f64> {
        self.read(reader, DescriptorValue::as_float)
    }

    /// Current value as a unit float.
    pub fn get_unit_float(&mut self, reader: Token) -> SuiteResult<(FourCC, f64)> {
        self.read(reader, DescriptorValue::as_unit_float)
    }

    /// Current value as a boolean.
    pub fn get_boolean(&mut self, reader: Token) -> SuiteResult<bool> {
        self.read(reader, DescriptorValue::as_boolean)
    }

    /// Current value as text.
    pub fn get_text(&mut self, reader: Token) -> SuiteResult<String> {
        self.read(reader, |v| v.as_text().map(str::to_owned))
    }

    /// Current value as alias or raw bytes.
    pub fn get_alias(&mut self, reader: Token) -> SuiteResult<Vec<u8>> {
        self.read(reader, |v| v.as_bytes().map(<[u8]>::to_vec))
    }

    /// Current value as an enumerated value.
    pub fn get_enumerated(&mut self, reader: Token) -> SuiteResult<FourCC> {
        self.read(reader, |v| v.as_enumerated().map(|(_, value)| value))
    }

    /// Current value as a class id.
    pub fn get_class(&mut self, reader: Token) -> SuiteResult<FourCC> {
        self.read(reader, DescriptorValue::as_class)
    }

    /// Innermost element of the current reference.
    pub fn get_simple_reference(&mut self, reader: Token) -> SuiteResult<ReferenceItem> {
        self.read(reader, |v| match v {
            DescriptorValue::Reference(r) => r.first().cloned().ok_or(SuiteStatus::BadParameter),
            _ => Err(SuiteStatus::WrongType),
        })
    }

    /// Current nested object.
    pub fn get_object(&mut self, reader: Token) -> SuiteResult<(FourCC, Dictionary)> {
        self.read(reader, |v| match v {
            DescriptorValue::Object { class, dictionary }
            | DescriptorValue::GlobalObject { class, dictionary } => {
                Ok((*class, dictionary.clone()))
            }
            _ => Err(SuiteStatus::WrongType),
        })
    }

    /// Length of the current list.
    pub fn get_count(&mut self, reader: Token) -> SuiteResult<u32> {
        self.read(reader, |v| match v {
            DescriptorValue::List(items) => Ok(items.len() as u32),
            _ => Err(SuiteStatus::WrongType),
        })
    }

    /// Current integer clamped into `[min, max]`.
    pub fn get_pinned_integer(&mut self, reader: Token, min: i32, max: i32) -> SuiteResult<Pinned<i32>> {
        let value = self.get_integer(reader)?;
        Ok(pin(value, min, max))
    }

    /// Current float clamped into `[min, max]`.
    pub fn get_pinned_float(&mut self, reader: Token, min: f64, max: f64) -> SuiteResult<Pinned<f64>> {
        let value = self.get_float(reader)?;
        Ok(pin(value, min, max))
    }

    /// Current unit float clamped into `[min, max]`; the stored unit must
    /// be `unit`.
    pub fn get_pinned_unit_float(
        &mut self,
        reader: Token,
        min: f64,
        max: f64,
        unit: FourCC,
    ) -> SuiteResult<Pinned<f64>> {
        let (stored, value) = self.get_unit_float(reader)?;
        if stored != unit {
            if let Some(state) = self.readers.get_mut(reader) {
                state.last_error = Some(SuiteStatus::BadParameter);
            }
            return Err(SuiteStatus::BadParameter);
        }
        Ok(pin(value, min, max))
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Start building a descriptor.
    pub fn open_write(&mut self) -> SuiteResult<Token> {
        tracing::trace!("open write descriptor");
        self.writers.insert(Dictionary::new())
    }

    /// Put a value into an open writer.
    pub fn put(&mut self, writer: Token, key: FourCC, value: DescriptorValue) -> SuiteResult<()> {
        tracing::trace!(key = %key, kind = %value.type_id(), "put descriptor value");
        let dict = self.writers.get_mut(writer).ok_or(SuiteStatus::BadParameter)?;
        dict.put(key, value);
        Ok(())
    }

    /// Finish a writer and return what it built.
    pub fn close_write(&mut self, writer: Token) -> SuiteResult<Dictionary> {
        self.writers.remove(writer).ok_or(SuiteStatus::BadParameter)
    }

    /// Number of open readers and writers.
    pub fn open_count(&self) -> usize {
        self.readers.len() + self.writers.len()
    }
}

fn pin<T: PartialOrd + Copy>(value: T, min: T, max: T) -> Pinned<T> {
    if value < min {
        Pinned { value: min, coerced: true }
    } else if value > max {
        Pinned { value: max, coerced: true }
    } else {
        Pinned { value, coerced: false }
    }
}
