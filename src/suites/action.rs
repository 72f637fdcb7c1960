//! Action descriptor, action list and action reference suites.
//!
//! These are the token-based successors of the legacy descriptor suites and
//! share its value model. Reading a nested descriptor, list or reference
//! hands out a fresh token holding a copy; putting one consumes the source
//! token, so a later free of that token reports a bad parameter.

use super::arena::{Arena, Token};
use super::dictionary::{DescriptorValue, Dictionary, Reference, ReferenceForm, ReferenceItem};
use super::{SuiteResult, SuiteStatus};
use crate::fourcc::FourCC;

/// Token tables of the three action suites.
#[derive(Debug, Default)]
pub struct ActionSuites {
    descriptors: Arena<Dictionary>,
    lists: Arena<Vec<DescriptorValue>>,
    references: Arena<Reference>,
}

impl ActionSuites {
    /// Create empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Descriptors
    // ========================================================================

    /// Create an empty descriptor.
    pub fn make_descriptor(&mut self) -> SuiteResult<Token> {
        self.descriptors.insert(Dictionary::new())
    }

    /// Store an existing dictionary as a new descriptor.
    pub fn adopt_descriptor(&mut self, dictionary: Dictionary) -> SuiteResult<Token> {
        self.descriptors.insert(dictionary)
    }

    /// Free a descriptor.
    pub fn free_descriptor(&mut self, desc: Token) -> SuiteResult<()> {
        tracing::trace!(index = desc.index(), "free action descriptor");
        self.descriptors
            .remove(desc)
            .map(|_| ())
            .ok_or(SuiteStatus::BadParameter)
    }

    /// Borrow a descriptor.
    pub fn descriptor(&self, desc: Token) -> SuiteResult<&Dictionary> {
        self.descriptors.get(desc).ok_or(SuiteStatus::BadParameter)
    }

    /// Mutably borrow a descriptor.
    pub fn descriptor_mut(&mut self, desc: Token) -> SuiteResult<&mut Dictionary> {
        self.descriptors.get_mut(desc).ok_or(SuiteStatus::BadParameter)
    }

    /// Put a plain value.
    pub fn put(&mut self, desc: Token, key: FourCC, value: DescriptorValue) -> SuiteResult<()> {
        tracing::trace!(key = %key, kind = %value.type_id(), "put action value");
        self.descriptor_mut(desc)?.put(key, value);
        Ok(())
    }

    /// Value stored under `key`.
    pub fn get(&self, desc: Token, key: FourCC) -> SuiteResult<&DescriptorValue> {
        self.descriptor(desc)?
            .get(key)
            .ok_or(SuiteStatus::MissingParameter)
    }

    /// Key at `index` in insertion order.
    pub fn key_at(&self, desc: Token, index: u32) -> SuiteResult<FourCC> {
        self.descriptor(desc)?
            .key_at(index as usize)
            .ok_or(SuiteStatus::BadParameter)
    }

    /// Whether every key is present.
    pub fn has_keys(&self, desc: Token, keys: &[FourCC]) -> SuiteResult<bool> {
        let dict = self.descriptor(desc)?;
        Ok(keys.iter().all(|k| dict.contains(*k)))
    }

    /// Remove a key.
    pub fn erase(&mut self, desc: Token, key: FourCC) -> SuiteResult<()> {
        self.descriptor_mut(desc)?
            .remove(key)
            .map(|_| ())
            .ok_or(SuiteStatus::MissingParameter)
    }

    /// Structural equality of two descriptors.
    pub fn is_equal(&self, a: Token, b: Token) -> SuiteResult<bool> {
        Ok(self.descriptor(a)? == self.descriptor(b)?)
    }

    /// Take a descriptor out of its token, invalidating the token.
    pub fn take_descriptor(&mut self, desc: Token) -> SuiteResult<Dictionary> {
        self.descriptors.remove(desc).ok_or(SuiteStatus::BadParameter)
    }

    /// Put a nested descriptor, consuming `source`.
    pub fn put_object(
        &mut self,
        desc: Token,
        key: FourCC,
        class: FourCC,
        source: Token,
        global: bool,
    ) -> SuiteResult<()> {
        self.descriptor(desc)?;
        let dictionary = self.take_descriptor(source)?;
        self.put(desc, key, object_value(class, dictionary, global))
    }

    /// Put a list, consuming `source`.
    pub fn put_list(&mut self, desc: Token, key: FourCC, source: Token) -> SuiteResult<()> {
        self.descriptor(desc)?;
        let list = self.lists.remove(source).ok_or(SuiteStatus::BadParameter)?;
        self.put(desc, key, DescriptorValue::List(list))
    }

    /// Put a reference, consuming `source`.
    pub fn put_reference(&mut self, desc: Token, key: FourCC, source: Token) -> SuiteResult<()> {
        self.descriptor(desc)?;
        let reference = self.references.remove(source).ok_or(SuiteStatus::BadParameter)?;
        self.put(desc, key, DescriptorValue::Reference(reference))
    }

    /// Copy a nested descriptor into a fresh token.
    pub fn get_object(&mut self, desc: Token, key: FourCC) -> SuiteResult<(FourCC, Token)> {
        let (class, dictionary) = object_parts(self.get(desc, key)?)?;
        let token = self.descriptors.insert(dictionary)?;
        Ok((class, token))
    }

    /// Copy a nested list into a fresh token.
    pub fn get_list(&mut self, desc: Token, key: FourCC) -> SuiteResult<Token> {
        let list = match self.get(desc, key)? {
            DescriptorValue::List(items) => items.clone(),
            _ => return Err(SuiteStatus::WrongType),
        };
        self.lists.insert(list)
    }

    /// Copy a nested reference into a fresh token.
    pub fn get_reference(&mut self, desc: Token, key: FourCC) -> SuiteResult<Token> {
        let reference = match self.get(desc, key)? {
            DescriptorValue::Reference(r) => r.clone(),
            _ => return Err(SuiteStatus::WrongType),
        };
        self.references.insert(reference)
    }

    // ========================================================================
    // Lists
    // ========================================================================

    /// Create an empty list.
    pub fn make_list(&mut self) -> SuiteResult<Token> {
        self.lists.insert(Vec::new())
    }

    /// Free a list.
    pub fn free_list(&mut self, list: Token) -> SuiteResult<()> {
        self.lists.remove(list).map(|_| ()).ok_or(SuiteStatus::BadParameter)
    }

    /// Borrow a list.
    pub fn list(&self, list: Token) -> SuiteResult<&[DescriptorValue]> {
        self.lists
            .get(list)
            .map(Vec::as_slice)
            .ok_or(SuiteStatus::BadParameter)
    }

    /// Append a plain value.
    pub fn list_push(&mut self, list: Token, value: DescriptorValue) -> SuiteResult<()> {
        let items = self.lists.get_mut(list).ok_or(SuiteStatus::BadParameter)?;
        items
            .try_reserve(1)
            .map_err(|_| SuiteStatus::OutOfMemory)?;
        items.push(value);
        Ok(())
    }

    /// Value at `index`.
    pub fn list_get(&self, list: Token, index: u32) -> SuiteResult<&DescriptorValue> {
        self.list(list)?
            .get(index as usize)
            .ok_or(SuiteStatus::BadParameter)
    }

    /// Append a nested descriptor, consuming `source`.
    pub fn list_push_object(
        &mut self,
        list: Token,
        class: FourCC,
        source: Token,
        global: bool,
    ) -> SuiteResult<()> {
        self.list(list)?;
        let dictionary = self.take_descriptor(source)?;
        self.list_push(list, object_value(class, dictionary, global))
    }

    /// Append a nested list, consuming `source`.
    pub fn list_push_list(&mut self, list: Token, source: Token) -> SuiteResult<()> {
        self.list(list)?;
        if list == source {
            return Err(SuiteStatus::BadParameter);
        }
        let nested = self.lists.remove(source).ok_or(SuiteStatus::BadParameter)?;
        self.list_push(list, DescriptorValue::List(nested))
    }

    /// Append a reference, consuming `source`.
    pub fn list_push_reference(&mut self, list: Token, source: Token) -> SuiteResult<()> {
        self.list(list)?;
        let reference = self.references.remove(source).ok_or(SuiteStatus::BadParameter)?;
        self.list_push(list, DescriptorValue::Reference(reference))
    }

    /// Copy the descriptor at `index` into a fresh token.
    pub fn list_get_object(&mut self, list: Token, index: u32) -> SuiteResult<(FourCC, Token)> {
        let (class, dictionary) = object_parts(self.list_get(list, index)?)?;
        let token = self.descriptors.insert(dictionary)?;
        Ok((class, token))
    }

    /// Copy the list at `index` into a fresh token.
    pub fn list_get_list(&mut self, list: Token, index: u32) -> SuiteResult<Token> {
        let nested = match self.list_get(list, index)? {
            DescriptorValue::List(items) => items.clone(),
            _ => return Err(SuiteStatus::WrongType),
        };
        self.lists.insert(nested)
    }

    /// Copy the reference at `index` into a fresh token.
    pub fn list_get_reference(&mut self, list: Token, index: u32) -> SuiteResult<Token> {
        let reference = match self.list_get(list, index)? {
            DescriptorValue::Reference(r) => r.clone(),
            _ => return Err(SuiteStatus::WrongType),
        };
        self.references.insert(reference)
    }

    // ========================================================================
    // References
    // ========================================================================

    /// Create an empty reference.
    pub fn make_reference(&mut self) -> SuiteResult<Token> {
        self.references.insert(Reference::default())
    }

    /// Free a reference.
    pub fn free_reference(&mut self, reference: Token) -> SuiteResult<()> {
        self.references
            .remove(reference)
            .map(|_| ())
            .ok_or(SuiteStatus::BadParameter)
    }

    /// Borrow a reference.
    pub fn reference(&self, reference: Token) -> SuiteResult<&Reference> {
        self.references.get(reference).ok_or(SuiteStatus::BadParameter)
    }

    /// Append an element to a reference chain.
    pub fn reference_push(
        &mut self,
        reference: Token,
        class: FourCC,
        form: ReferenceForm,
    ) -> SuiteResult<()> {
        let r = self.references.get_mut(reference).ok_or(SuiteStatus::BadParameter)?;
        r.items.push(ReferenceItem { class, form });
        Ok(())
    }

    /// Innermost element of a reference.
    pub fn reference_first(&self, reference: Token) -> SuiteResult<&ReferenceItem> {
        self.reference(reference)?
            .first()
            .ok_or(SuiteStatus::BadParameter)
    }

    /// Container of a reference as a fresh token, or `None` at the top.
    pub fn reference_container(&mut self, reference: Token) -> SuiteResult<Option<Token>> {
        match self.reference(reference)?.container() {
            Some(container) => self.references.insert(container).map(Some),
            None => Ok(None),
        }
    }

    /// Number of live tokens across all three tables.
    pub fn live_tokens(&self) -> usize {
        self.descriptors.len() + self.lists.len() + self.references.len()
    }
}

fn object_value(class: FourCC, dictionary: Dictionary, global: bool) -> DescriptorValue {
    if global {
        DescriptorValue::GlobalObject { class, dictionary }
    } else {
        DescriptorValue::Object { class, dictionary }
    }
}

fn object_parts(value: &DescriptorValue) -> SuiteResult<(FourCC, Dictionary)> {
    match value {
        DescriptorValue::Object { class, dictionary }
        | DescriptorValue::GlobalObject { class, dictionary } => Ok((*class, dictionary.clone())),
        _ => Err(SuiteStatus::WrongType),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: FourCC = FourCC::new(b"Key ");
    const CLASS: FourCC = FourCC::new(b"Clss");

    #[test]
    fn test_put_object_consumes_source() {
        let mut suites = ActionSuites::new();
        let outer = suites.make_descriptor().unwrap();
        let inner = suites.make_descriptor().unwrap();
        suites.put(inner, KEY, DescriptorValue::Integer(7)).unwrap();
        suites.put_object(outer, KEY, CLASS, inner, false).unwrap();

        assert_eq!(suites.free_descriptor(inner), Err(SuiteStatus::BadParameter));

        let (class, copy) = suites.get_object(outer, KEY).unwrap();
        assert_eq!(class, CLASS);
        assert_ne!(copy, inner);
        assert_eq!(suites.get(copy, KEY).unwrap(), &DescriptorValue::Integer(7));
    }

    #[test]
    fn test_get_returns_fresh_tokens() {
        let mut suites = ActionSuites::new();
        let desc = suites.make_descriptor().unwrap();
        let list = suites.make_list().unwrap();
        suites.list_push(list, DescriptorValue::Boolean(true)).unwrap();
        suites.put_list(desc, KEY, list).unwrap();

        let a = suites.get_list(desc, KEY).unwrap();
        let b = suites.get_list(desc, KEY).unwrap();
        assert_ne!(a, b);
        suites.free_list(a).unwrap();
        assert_eq!(suites.list(b).unwrap().len(), 1);
    }

    #[test]
    fn test_reference_chain() {
        let mut suites = ActionSuites::new();
        let r = suites.make_reference().unwrap();
        suites
            .reference_push(r, FourCC::new(b"Lyr "), ReferenceForm::Index(2))
            .unwrap();
        suites
            .reference_push(r, FourCC::new(b"Dcmn"), ReferenceForm::Identifier(9))
            .unwrap();
        assert_eq!(suites.reference_first(r).unwrap().form, ReferenceForm::Index(2));

        let container = suites.reference_container(r).unwrap().unwrap();
        assert_eq!(
            suites.reference_first(container).unwrap().form,
            ReferenceForm::Identifier(9)
        );
        assert_eq!(suites.reference_container(container).unwrap(), None);
    }

    #[test]
    fn test_keys_and_erase() {
        let mut suites = ActionSuites::new();
        let d = suites.make_descriptor().unwrap();
        suites.put(d, KEY, DescriptorValue::Integer(1)).unwrap();
        suites.put(d, CLASS, DescriptorValue::Integer(2)).unwrap();
        assert_eq!(suites.key_at(d, 1).unwrap(), CLASS);
        assert!(suites.has_keys(d, &[KEY, CLASS]).unwrap());
        suites.erase(d, KEY).unwrap();
        assert!(!suites.has_keys(d, &[KEY]).unwrap());
        assert_eq!(suites.erase(d, KEY), Err(SuiteStatus::MissingParameter));
    }
}
