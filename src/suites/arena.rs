//! Generational slot arena backing every suite's token table.
//!
//! A [`Token`] names a slot by index and generation. Removing a value bumps
//! the slot's generation, so a token kept past disposal no longer resolves
//! even after the slot is reused. Tokens cross the native boundary packed
//! into one pointer-sized value that is never zero.

use super::{SuiteResult, SuiteStatus};

/// Bits of a packed token reserved for the slot index.
const INDEX_BITS: u32 = usize::BITS / 2;
const INDEX_MASK: usize = (1 << INDEX_BITS) - 1;

/// Opaque reference to an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    index: u32,
    generation: u32,
}

impl Token {
    /// Pack into a non-zero pointer-sized value.
    #[inline]
    pub fn into_raw(self) -> usize {
        let generation = self.generation as usize & INDEX_MASK;
        (generation << INDEX_BITS) | (self.index as usize + 1)
    }

    /// Unpack a value produced by [`Token::into_raw`]. Zero is never a token.
    #[inline]
    pub fn from_raw(raw: usize) -> Option<Self> {
        let index = raw & INDEX_MASK;
        if index == 0 {
            return None;
        }
        Some(Self {
            index: (index - 1) as u32,
            generation: (raw >> INDEX_BITS) as u32,
        })
    }

    /// Pack as a native pointer.
    #[inline]
    pub fn into_ptr<T>(self) -> *mut T {
        self.into_raw() as *mut T
    }

    /// Unpack a native pointer.
    #[inline]
    pub fn from_ptr<T>(ptr: *const T) -> Option<Self> {
        Self::from_raw(ptr as usize)
    }

    /// Slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slot generation.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slots with per-slot generations and a free list.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// Create an empty arena.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Store a value. Fails with [`SuiteStatus::OutOfMemory`] when the slot
    /// table cannot grow.
    pub fn insert(&mut self, value: T) -> SuiteResult<Token> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            self.live += 1;
            return Ok(Token {
                index,
                generation: slot.generation,
            });
        }

        if self.slots.len() >= INDEX_MASK - 1 {
            return Err(SuiteStatus::OutOfMemory);
        }
        self.slots
            .try_reserve(1)
            .map_err(|_| SuiteStatus::OutOfMemory)?;
        // Reserve the matching free-list entry now so `remove` never allocates.
        self.free
            .try_reserve(self.slots.len() + 1 - self.free.len())
            .map_err(|_| SuiteStatus::OutOfMemory)?;
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        self.live += 1;
        Ok(Token {
            index,
            generation: 1,
        })
    }

    /// Borrow a live value.
    pub fn get(&self, token: Token) -> Option<&T> {
        let slot = self.slots.get(token.index as usize)?;
        if slot.generation != token.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Mutably borrow a live value.
    pub fn get_mut(&mut self, token: Token) -> Option<&mut T> {
        let slot = self.slots.get_mut(token.index as usize)?;
        if slot.generation != token.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Whether the token names a live value.
    pub fn contains(&self, token: Token) -> bool {
        self.get(token).is_some()
    }

    /// Remove a live value and invalidate every copy of its token.
    pub fn remove(&mut self, token: Token) -> Option<T> {
        let slot = self.slots.get_mut(token.index as usize)?;
        if slot.generation != token.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1) & INDEX_MASK as u32;
        if slot.generation == 0 {
            slot.generation = 1;
        }
        self.free.push(token.index);
        self.live -= 1;
        Some(value)
    }

    /// Resolve a raw token, mapping failure to `status`.
    pub fn resolve(&self, raw: usize, status: SuiteStatus) -> SuiteResult<(Token, &T)> {
        let token = Token::from_raw(raw).ok_or(status)?;
        self.get(token).map(|v| (token, v)).ok_or(status)
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no value is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over live tokens and values.
    pub fn iter(&self) -> impl Iterator<Item = (Token, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    Token {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    /// Remove every value.
    pub fn clear(&mut self) {
        let tokens: Vec<Token> = self.iter().map(|(t, _)| t).collect();
        for token in tokens {
            self.remove(token);
        }
    }
}
