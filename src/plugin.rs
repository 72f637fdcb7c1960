//! Catalog records describing discovered filters.

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::discovery::Architecture;
use crate::fourcc::FourCC;

/// Number of entries in a transparency-handling table.
pub const FILTER_CASE_COUNT: usize = 7;

/// How a filter wants image data and transparency delivered.
///
/// Values are 1-based, matching the `filterCase` field of the parameter
/// block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum FilterCase {
    /// No case applies.
    Unsupported = 0,
    /// Opaque image, no selection.
    FlatImageNoSelection = 1,
    /// Opaque image with a selection.
    FlatImageWithSelection = 2,
    /// Floating selection (mask delivered separately).
    FloatingSelection = 3,
    /// Layer with editable transparency, no selection.
    EditableTransparencyNoSelection = 4,
    /// Layer with editable transparency and a selection.
    EditableTransparencyWithSelection = 5,
    /// Layer with locked transparency, no selection.
    ProtectedTransparencyNoSelection = 6,
    /// Layer with locked transparency and a selection.
    ProtectedTransparencyWithSelection = 7,
}

impl FilterCase {
    /// Index into a [`FilterCaseTable`], or `None` for `Unsupported`.
    pub fn table_index(self) -> Option<usize> {
        match self {
            Self::Unsupported => None,
            other => Some(other as usize - 1),
        }
    }

    /// Whether this case delivers an alpha plane to the filter.
    pub fn has_alpha_plane(self) -> bool {
        matches!(
            self,
            Self::EditableTransparencyNoSelection | Self::EditableTransparencyWithSelection
        )
    }

    /// Whether this case carries a selection or floating mask.
    pub fn has_selection(self) -> bool {
        matches!(
            self,
            Self::FlatImageWithSelection
                | Self::FloatingSelection
                | Self::EditableTransparencyWithSelection
                | Self::ProtectedTransparencyWithSelection
        )
    }
}

/// Data handling modes for transparent or masked pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataHandling {
    /// The filter cannot process this case.
    CantFilter = 0,
    /// Deliver data unchanged.
    None = 1,
    /// Matte against black.
    BlackMat = 2,
    /// Matte against gray.
    GrayMat = 3,
    /// Matte against white.
    WhiteMat = 4,
    /// Defringe.
    Defringe = 5,
    /// Set fully transparent pixels to black.
    BlackZap = 6,
    /// Set fully transparent pixels to gray.
    GrayZap = 7,
    /// Set fully transparent pixels to white.
    WhiteZap = 8,
    /// Fill the transparency mask (output: force opaque).
    FillMask = 9,
    /// Set fully transparent pixels to the background color.
    BackgroundZap = 10,
    /// Set fully transparent pixels to the foreground color.
    ForegroundZap = 11,
}

impl DataHandling {
    /// Decode a raw byte; unknown values are treated as `None`.
    pub fn from_byte(value: u8) -> Self {
        match value {
            0 => Self::CantFilter,
            2 => Self::BlackMat,
            3 => Self::GrayMat,
            4 => Self::WhiteMat,
            5 => Self::Defringe,
            6 => Self::BlackZap,
            7 => Self::GrayZap,
            8 => Self::WhiteZap,
            9 => Self::FillMask,
            10 => Self::BackgroundZap,
            11 => Self::ForegroundZap,
            _ => Self::None,
        }
    }
}

/// One slot of the transparency-handling table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FilterCaseInfo {
    /// Raw input handling byte.
    pub input_handling: u8,
    /// Raw output handling byte.
    pub output_handling: u8,
    /// Flag bits (see the `FLAG_*` constants).
    pub flags1: u8,
    /// Reserved flag bits.
    pub flags2: u8,
}

impl FilterCaseInfo {
    /// The host should not copy the source to the destination first.
    pub const FLAG_DONT_COPY_TO_DESTINATION: u8 = 1 << 0;
    /// The filter produces output from fully transparent input.
    pub const FLAG_WORKS_WITH_BLANK_DATA: u8 = 1 << 1;
    /// The filter processes layer masks.
    pub const FLAG_FILTERS_LAYER_MASK: u8 = 1 << 2;
    /// The filter writes outside the selection.
    pub const FLAG_WRITES_OUTSIDE_SELECTION: u8 = 1 << 3;

    /// Decoded input handling.
    pub fn input(&self) -> DataHandling {
        DataHandling::from_byte(self.input_handling)
    }

    /// Decoded output handling.
    pub fn output(&self) -> DataHandling {
        DataHandling::from_byte(self.output_handling)
    }

    /// Whether the filter accepts this case at all.
    pub fn is_supported(&self) -> bool {
        self.input() != DataHandling::CantFilter
    }

    /// Whether the filter claims to write outside the selection.
    pub fn writes_outside_selection(&self) -> bool {
        self.flags1 & Self::FLAG_WRITES_OUTSIDE_SELECTION != 0
    }

    /// Whether the destination should start empty instead of as a copy.
    pub fn dont_copy_to_destination(&self) -> bool {
        self.flags1 & Self::FLAG_DONT_COPY_TO_DESTINATION != 0
    }
}

/// The 7-slot transparency-handling table, indexed by `FilterCase - 1`.
pub type FilterCaseTable = [FilterCaseInfo; FILTER_CASE_COUNT];

/// One named, typed parameter of a scripting grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarParameter {
    /// Display name.
    pub name: String,
    /// Descriptor key.
    pub key: FourCC,
    /// Value type.
    pub kind: FourCC,
    /// Description.
    pub description: String,
    /// Flag bits.
    pub flags: u16,
}

/// One enumeration item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarEnumItem {
    /// Display name.
    pub name: String,
    /// Enumerated value.
    pub value: FourCC,
    /// Description.
    pub description: String,
}

/// An enumeration type declared by a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarEnumeration {
    /// Enumeration type code.
    pub kind: FourCC,
    /// Items in declaration order.
    pub items: Vec<GrammarEnumItem>,
}

/// Parsed description of a filter's scriptable parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptingGrammar {
    /// Event name.
    pub name: String,
    /// Event description.
    pub description: String,
    /// Event class id.
    pub class_id: FourCC,
    /// Event id.
    pub event_id: FourCC,
    /// Reply type.
    pub reply_type: FourCC,
    /// Parameter type token with its reserved character stripped.
    pub parameter_type: String,
    /// Parameters in declaration order.
    pub parameters: Vec<GrammarParameter>,
    /// Enumerations (only present when the grammar declares no classes).
    pub enumerations: Vec<GrammarEnumeration>,
}

/// Immutable record describing one discovered filter.
///
/// Equality and hashing consider only path, entry point, category and title.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    path: PathBuf,
    entry_point: String,
    module_entry_points: Vec<String>,
    category: String,
    title: String,
    filter_cases: Option<FilterCaseTable>,
    grammar: Option<ScriptingGrammar>,
    enable_expression: Option<String>,
    architecture: Architecture,
}

impl PluginRecord {
    /// Create a record.
    pub fn new(
        path: impl Into<PathBuf>,
        entry_point: impl Into<String>,
        category: impl Into<String>,
        title: impl Into<String>,
        architecture: Architecture,
    ) -> Self {
        Self {
            path: path.into(),
            entry_point: entry_point.into(),
            module_entry_points: Vec::new(),
            category: category.into(),
            title: title.into(),
            filter_cases: None,
            grammar: None,
            enable_expression: None,
            architecture,
        }
    }

    /// Attach a transparency-handling table.
    pub fn with_filter_cases(mut self, table: FilterCaseTable) -> Self {
        self.filter_cases = Some(table);
        self
    }

    /// Attach a scripting grammar.
    pub fn with_grammar(mut self, grammar: ScriptingGrammar) -> Self {
        self.grammar = Some(grammar);
        self
    }

    /// Attach an enable expression.
    pub fn with_enable_expression(mut self, expression: impl Into<String>) -> Self {
        self.enable_expression = Some(expression.into());
        self
    }

    /// Attach the module's full ordered entry-point list.
    pub fn with_module_entry_points(mut self, entry_points: Vec<String>) -> Self {
        self.module_entry_points = entry_points;
        self
    }

    /// Module path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry point that runs this filter.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Every entry point of the module, in resource order, when the module
    /// holds more than one filter. Empty otherwise.
    pub fn module_entry_points(&self) -> &[String] {
        &self.module_entry_points
    }

    /// Menu category.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Menu title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Transparency-handling table, if declared and well-formed.
    pub fn filter_cases(&self) -> Option<&FilterCaseTable> {
        self.filter_cases.as_ref()
    }

    /// Scripting grammar, if declared and supported.
    pub fn grammar(&self) -> Option<&ScriptingGrammar> {
        self.grammar.as_ref()
    }

    /// Enable expression, if declared.
    pub fn enable_expression(&self) -> Option<&str> {
        self.enable_expression.as_deref()
    }

    /// Module architecture.
    pub fn architecture(&self) -> Architecture {
        self.architecture
    }
}

impl PartialEq for PluginRecord {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.entry_point == other.entry_point
            && self.category == other.category
            && self.title == other.title
    }
}

impl Eq for PluginRecord {}

impl Hash for PluginRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.entry_point.hash(state);
        self.category.hash(state);
        self.title.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_equality_ignores_metadata() {
        let a = PluginRecord::new("a.8bf", "Entry", "Blur", "Soft", Architecture::X64);
        let b = a.clone().with_enable_expression("true");
        assert_eq!(a, b);
        let c = PluginRecord::new("a.8bf", "Entry", "Blur", "Hard", Architecture::X64);
        assert_ne!(a, c);
    }

    #[test]
    fn test_filter_case_indices() {
        assert_eq!(FilterCase::FlatImageNoSelection.table_index(), Some(0));
        assert_eq!(FilterCase::ProtectedTransparencyWithSelection.table_index(), Some(6));
        assert_eq!(FilterCase::Unsupported.table_index(), None);
    }

    #[test]
    fn test_case_info_flags() {
        let info = FilterCaseInfo {
            input_handling: 1,
            output_handling: 9,
            flags1: FilterCaseInfo::FLAG_WRITES_OUTSIDE_SELECTION,
            flags2: 0,
        };
        assert!(info.is_supported());
        assert!(info.writes_outside_selection());
        assert_eq!(info.output(), DataHandling::FillMask);
        assert!(!FilterCaseInfo::default().is_supported());
    }
}
