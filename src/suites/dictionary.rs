//! Scripting dictionaries: ordered key to tagged-value maps.
//!
//! Every descriptor-style suite (legacy read/write descriptors and the
//! action descriptor/list/reference suites) shares this value model.
//! Insertion order is preserved; putting an existing key replaces its value
//! where it stands.

use smallvec::{SmallVec, smallvec};

use super::{SuiteResult, SuiteStatus};
use crate::fourcc::{FourCC, types};

/// Reference forms.
pub mod forms {
    use crate::fourcc::FourCC;

    /// By class.
    pub const CLASS: FourCC = FourCC::new(b"Clss");
    /// By enumerated value.
    pub const ENUMERATED: FourCC = FourCC::new(b"Enmr");
    /// By identifier.
    pub const IDENTIFIER: FourCC = FourCC::new(b"Idnt");
    /// By index.
    pub const INDEX: FourCC = FourCC::new(b"indx");
    /// By relative offset.
    pub const OFFSET: FourCC = FourCC::new(b"rele");
    /// By property key.
    pub const PROPERTY: FourCC = FourCC::new(b"prop");
    /// By name.
    pub const NAME: FourCC = FourCC::new(b"name");
}

/// How one element of a reference chain selects its target.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceForm {
    /// The class itself.
    Class,
    /// Element with this name.
    Name(String),
    /// Element at a 1-based index.
    Index(u32),
    /// Element with this identifier.
    Identifier(u32),
    /// Element at an offset from the current one.
    Offset(i32),
    /// Enumerated selector.
    Enumerated {
        /// Enumeration type.
        kind: FourCC,
        /// Enumeration value.
        value: FourCC,
    },
    /// Property of the container.
    Property(FourCC),
}

impl ReferenceForm {
    /// Form code.
    pub fn code(&self) -> FourCC {
        match self {
            Self::Class => forms::CLASS,
            Self::Name(_) => forms::NAME,
            Self::Index(_) => forms::INDEX,
            Self::Identifier(_) => forms::IDENTIFIER,
            Self::Offset(_) => forms::OFFSET,
            Self::Enumerated { .. } => forms::ENUMERATED,
            Self::Property(_) => forms::PROPERTY,
        }
    }
}

/// One element of a reference chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceItem {
    /// Desired class.
    pub class: FourCC,
    /// Selector.
    pub form: ReferenceForm,
}

/// A reference chain, innermost element first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reference {
    /// Chain elements.
    pub items: SmallVec<[ReferenceItem; 2]>,
}

impl Reference {
    /// A one-element reference.
    pub fn single(class: FourCC, form: ReferenceForm) -> Self {
        Self {
            items: smallvec![ReferenceItem { class, form }],
        }
    }

    /// Innermost element.
    pub fn first(&self) -> Option<&ReferenceItem> {
        self.items.first()
    }

    /// The reference minus its innermost element, or `None` if nothing
    /// remains.
    pub fn container(&self) -> Option<Reference> {
        (self.items.len() > 1).then(|| Reference {
            items: self.items[1..].iter().cloned().collect(),
        })
    }
}

/// A tagged descriptor value.
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorValue {
    /// 32-bit integer.
    Integer(i32),
    /// Double.
    Float(f64),
    /// Double with a unit.
    UnitFloat {
        /// Unit code.
        unit: FourCC,
        /// Value.
        value: f64,
    },
    /// Boolean.
    Boolean(bool),
    /// Text.
    Text(String),
    /// Class id.
    Class(FourCC),
    /// Global class id.
    GlobalClass(FourCC),
    /// Enumerated value.
    Enumerated {
        /// Enumeration type.
        kind: FourCC,
        /// Enumeration value.
        value: FourCC,
    },
    /// Alias record bytes.
    Alias(Vec<u8>),
    /// Raw data bytes.
    RawData(Vec<u8>),
    /// Nested dictionary.
    Object {
        /// Class of the nested object.
        class: FourCC,
        /// Its contents.
        dictionary: Dictionary,
    },
    /// Nested dictionary of a global class.
    GlobalObject {
        /// Class of the nested object.
        class: FourCC,
        /// Its contents.
        dictionary: Dictionary,
    },
    /// Reference chain.
    Reference(Reference),
    /// Ordered list of values.
    List(Vec<DescriptorValue>),
}

impl DescriptorValue {
    /// Type code reported to plugins.
    pub fn type_id(&self) -> FourCC {
        match self {
            Self::Integer(_) => types::INTEGER,
            Self::Float(_) => types::FLOAT,
            Self::UnitFloat { .. } => types::UNIT_FLOAT,
            Self::Boolean(_) => types::BOOLEAN,
            Self::Text(_) => types::TEXT,
            Self::Class(_) => types::CLASS,
            Self::GlobalClass(_) => types::GLOBAL_CLASS,
            Self::Enumerated { .. } => types::ENUMERATED,
            Self::Alias(_) => types::ALIAS,
            Self::RawData(_) => types::RAW_DATA,
            Self::Object { .. } => types::OBJECT,
            Self::GlobalObject { .. } => types::GLOBAL_OBJECT,
            Self::Reference(_) => types::OBJECT_REFERENCE,
            Self::List(_) => types::VALUE_LIST,
        }
    }

    /// Integer payload.
    pub fn as_integer(&self) -> SuiteResult<i32> {
        match self {
            Self::Integer(i) => Ok(*i),
            _ => Err(SuiteStatus::WrongType),
        }
    }

    /// Float payload; integers are widened.
    pub fn as_float(&self) -> SuiteResult<f64> {
        match self {
            Self::Float(f) => Ok(*f),
            Self::Integer(i) => Ok(f64::from(*i)),
            _ => Err(SuiteStatus::WrongType),
        }
    }

    /// Unit-float payload.
    pub fn as_unit_float(&self) -> SuiteResult<(FourCC, f64)> {
        match self {
            Self::UnitFloat { unit, value } => Ok((*unit, *value)),
            _ => Err(SuiteStatus::WrongType),
        }
    }

    /// Boolean payload.
    pub fn as_boolean(&self) -> SuiteResult<bool> {
        match self {
            Self::Boolean(b) => Ok(*b),
            _ => Err(SuiteStatus::WrongType),
        }
    }

    /// Text payload.
    pub fn as_text(&self) -> SuiteResult<&str> {
        match self {
            Self::Text(t) => Ok(t),
            _ => Err(SuiteStatus::WrongType),
        }
    }

    /// Enumerated payload as (type, value).
    pub fn as_enumerated(&self) -> SuiteResult<(FourCC, FourCC)> {
        match self {
            Self::Enumerated { kind, value } => Ok((*kind, *value)),
            _ => Err(SuiteStatus::WrongType),
        }
    }

    /// Class payload.
    pub fn as_class(&self) -> SuiteResult<FourCC> {
        match self {
            Self::Class(c) | Self::GlobalClass(c) => Ok(*c),
            _ => Err(SuiteStatus::WrongType),
        }
    }

    /// Alias or raw-data payload.
    pub fn as_bytes(&self) -> SuiteResult<&[u8]> {
        match self {
            Self::Alias(b) | Self::RawData(b) => Ok(b),
            _ => Err(SuiteStatus::WrongType),
        }
    }
}

/// Ordered key to value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: Vec<(FourCC, DescriptorValue)>,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn put(&mut self, key: FourCC, value: DescriptorValue) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value stored under `key`.
    pub fn get(&self, key: FourCC) -> Option<&DescriptorValue> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: FourCC) -> Option<DescriptorValue> {
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: FourCC) -> bool {
        self.get(key).is_some()
    }

    /// Key at insertion position `index`.
    pub fn key_at(&self, index: usize) -> Option<FourCC> {
        self.entries.get(index).map(|(k, _)| *k)
    }

    /// Entry at insertion position `index`.
    pub fn entry_at(&self, index: usize) -> Option<(FourCC, &DescriptorValue)> {
        self.entries.get(index).map(|(k, v)| (*k, v))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = FourCC> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (FourCC, &DescriptorValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<(FourCC, DescriptorValue)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (FourCC, DescriptorValue)>>(iter: I) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in iter {
            dict.put(k, v);
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: FourCC = FourCC::new(b"AAAA");
    const B: FourCC = FourCC::new(b"BBBB");
    const C: FourCC = FourCC::new(b"CCCC");

    #[test]
    fn test_insertion_order_preserved() {
        let mut dict = Dictionary::new();
        dict.put(C, DescriptorValue::Integer(3));
        dict.put(A, DescriptorValue::Integer(1));
        dict.put(B, DescriptorValue::Integer(2));
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec![C, A, B]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut dict = Dictionary::new();
        dict.put(A, DescriptorValue::Integer(1));
        dict.put(B, DescriptorValue::Integer(2));
        dict.put(A, DescriptorValue::Boolean(true));
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.key_at(0), Some(A));
        assert_eq!(dict.get(A), Some(&DescriptorValue::Boolean(true)));
    }

    #[test]
    fn test_type_ids() {
        assert_eq!(DescriptorValue::Float(1.0).type_id(), types::FLOAT);
        assert_eq!(
            DescriptorValue::Reference(Reference::default()).type_id(),
            types::OBJECT_REFERENCE
        );
    }

    #[test]
    fn test_reference_container() {
        let mut r = Reference::single(A, ReferenceForm::Index(2));
        assert!(r.container().is_none());
        r.items.push(ReferenceItem {
            class: B,
            form: ReferenceForm::Class,
        });
        assert_eq!(r.container().unwrap().first().unwrap().class, B);
    }

    #[test]
    fn test_nested_objects() {
        let mut inner = Dictionary::new();
        inner.put(C, DescriptorValue::Integer(3));
        let mut middle = Dictionary::new();
        middle.put(B, DescriptorValue::Object { class: B, dictionary: inner.clone() });
        let mut outer = Dictionary::new();
        outer.put(A, DescriptorValue::GlobalObject { class: A, dictionary: middle });

        let Some(DescriptorValue::GlobalObject { dictionary, .. }) = outer.get(A) else {
            panic!("expected a global object");
        };
        let Some(DescriptorValue::Object { dictionary: found, .. }) = dictionary.get(B) else {
            panic!("expected an object");
        };
        assert_eq!(found, &inner);
        assert_eq!(found.get(C), Some(&DescriptorValue::Integer(3)));
    }
}
