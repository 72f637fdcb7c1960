//! Resource directory walker for PE modules.
//!
//! Only what resource lookup needs is decoded: the section table (to turn
//! relative virtual addresses into file offsets) and the three-level
//! type / name / language resource tree.

use std::fmt;

const PE32_MAGIC: u16 = 0x10B;
const PE32_PLUS_MAGIC: u16 = 0x20B;
const RESOURCE_DIRECTORY_INDEX: usize = 2;
const SUBDIRECTORY_BIT: u32 = 0x8000_0000;
const MAX_ENTRIES: usize = 4096;

#[inline]
fn u16_at(bytes: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes(
        bytes.get(offset..offset.checked_add(2)?)?.try_into().ok()?,
    ))
}

#[inline]
fn u32_at(bytes: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes(
        bytes.get(offset..offset.checked_add(4)?)?.try_into().ok()?,
    ))
}

/// Name of a resource type or resource: numeric id or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceName {
    /// Numeric identifier.
    Id(u16),
    /// String name.
    Name(String),
}

impl ResourceName {
    /// Whether this is a string name equal to `name` (ASCII case-insensitive;
    /// resource compilers upper-case string names).
    pub fn matches(&self, name: &str) -> bool {
        matches!(self, Self::Name(n) if n.eq_ignore_ascii_case(name))
    }

    /// Numeric id, if any.
    pub fn id(&self) -> Option<u16> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(_) => None,
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Name(n) => f.write_str(n),
        }
    }
}

/// One leaf of the resource tree.
#[derive(Debug, Clone)]
pub struct ResourceEntry<'a> {
    /// Resource type.
    pub kind: ResourceName,
    /// Resource name or id.
    pub name: ResourceName,
    /// Raw resource bytes.
    pub data: &'a [u8],
}

#[derive(Debug, Clone, Copy)]
struct Section {
    virtual_address: u32,
    virtual_size: u32,
    raw_size: u32,
    raw_offset: u32,
}

/// Decoded resource tree of one module image.
#[derive(Debug)]
pub struct ResourceDirectory<'a> {
    entries: Vec<ResourceEntry<'a>>,
}

impl<'a> ResourceDirectory<'a> {
    /// Parse the resource tree. Returns `None` for anything that is not a
    /// well-formed PE image with a resource directory.
    pub fn parse(image: &'a [u8]) -> Option<Self> {
        let pe = u32_at(image, 0x3C)? as usize;
        if image.get(pe..pe + 4)? != b"PE\0\0" {
            return None;
        }
        let coff = pe + 4;
        let section_count = u16_at(image, coff + 2)? as usize;
        let optional_size = u16_at(image, coff + 16)? as usize;
        let optional = coff + 20;

        let directories = match u16_at(image, optional)? {
            PE32_MAGIC => optional + 96,
            PE32_PLUS_MAGIC => optional + 112,
            _ => return None,
        };
        let resource_rva = u32_at(image, directories + RESOURCE_DIRECTORY_INDEX * 8)?;
        if resource_rva == 0 {
            return Some(Self {
                entries: Vec::new(),
            });
        }

        let table = optional + optional_size;
        let sections: Vec<Section> = (0..section_count)
            .map(|i| {
                let s = table + i * 40;
                Some(Section {
                    virtual_size: u32_at(image, s + 8)?,
                    virtual_address: u32_at(image, s + 12)?,
                    raw_size: u32_at(image, s + 16)?,
                    raw_offset: u32_at(image, s + 20)?,
                })
            })
            .collect::<Option<_>>()?;

        let rva_to_offset = |rva: u32| -> Option<usize> {
            sections.iter().find_map(|s| {
                let extent = s.virtual_size.max(s.raw_size);
                (rva >= s.virtual_address && rva - s.virtual_address < extent)
                    .then(|| (rva - s.virtual_address + s.raw_offset) as usize)
            })
        };

        let base = rva_to_offset(resource_rva)?;
        let mut walker = Walker {
            image,
            base,
            rva_to_offset: &rva_to_offset,
            entries: Vec::new(),
        };
        walker.walk_types()?;
        Some(Self {
            entries: walker.entries,
        })
    }

    /// A directory with no resources.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// All leaves in directory order.
    pub fn entries(&self) -> &[ResourceEntry<'a>] {
        &self.entries
    }

    /// Leaves whose type has the given string name.
    pub fn of_type<'s>(&'s self, kind: &'s str) -> impl Iterator<Item = &'s ResourceEntry<'a>> + 's {
        self.entries.iter().filter(move |e| e.kind.matches(kind))
    }

    /// Data of the resource with the given type name and numeric id.
    pub fn find(&self, kind: &str, id: u16) -> Option<&'a [u8]> {
        self.of_type(kind)
            .find(|e| e.name.id() == Some(id))
            .map(|e| e.data)
    }
}

struct Walker<'a, 'f> {
    image: &'a [u8],
    base: usize,
    rva_to_offset: &'f dyn Fn(u32) -> Option<usize>,
    entries: Vec<ResourceEntry<'a>>,
}

impl<'a> Walker<'a, '_> {
    fn directory(&self, offset: usize) -> Option<Vec<(ResourceName, u32)>> {
        let dir = self.base + offset;
        let named = u16_at(self.image, dir + 12)? as usize;
        let ids = u16_at(self.image, dir + 14)? as usize;
        let count = (named + ids).min(MAX_ENTRIES);
        (0..count)
            .map(|i| {
                let e = dir + 16 + i * 8;
                let name = u32_at(self.image, e)?;
                let target = u32_at(self.image, e + 4)?;
                Some((self.name(name)?, target))
            })
            .collect()
    }

    fn name(&self, raw: u32) -> Option<ResourceName> {
        if raw & SUBDIRECTORY_BIT == 0 {
            return Some(ResourceName::Id(raw as u16));
        }
        let at = self.base + (raw & !SUBDIRECTORY_BIT) as usize;
        let len = u16_at(self.image, at)? as usize;
        let units: Vec<u16> = (0..len)
            .map(|i| u16_at(self.image, at + 2 + i * 2))
            .collect::<Option<_>>()?;
        Some(ResourceName::Name(String::from_utf16_lossy(&units)))
    }

    fn walk_types(&mut self) -> Option<()> {
        for (kind, target) in self.directory(0)? {
            if target & SUBDIRECTORY_BIT == 0 {
                continue;
            }
            let Some(names) = self.directory((target & !SUBDIRECTORY_BIT) as usize) else {
                continue;
            };
            for (name, target) in names {
                if let Some(data) = self.first_language(target) {
                    self.entries.push(ResourceEntry {
                        kind: kind.clone(),
                        name,
                        data,
                    });
                }
            }
        }
        Some(())
    }

    fn first_language(&self, target: u32) -> Option<&'a [u8]> {
        let leaf = if target & SUBDIRECTORY_BIT != 0 {
            let languages = self.directory((target & !SUBDIRECTORY_BIT) as usize)?;
            let (_, leaf) = languages.into_iter().find(|(_, t)| t & SUBDIRECTORY_BIT == 0)?;
            leaf
        } else {
            target
        };
        let entry = self.base + leaf as usize;
        let rva = u32_at(self.image, entry)?;
        let size = u32_at(self.image, entry + 4)? as usize;
        let start = (self.rva_to_offset)(rva)?;
        self.image.get(start..start.checked_add(size)?)
    }
}
