//! Choosing how image data and transparency are presented to a filter.

use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::plugin::{FilterCase, FilterCaseInfo, PluginRecord};
use crate::surface::{FilterImages, SelectionMask};

/// Outcome of filter-case selection.
#[derive(Debug, Clone)]
pub struct CaseSelection {
    /// The chosen case.
    pub case: FilterCase,
    /// Table entry for the case, if the filter has a table.
    pub info: Option<FilterCaseInfo>,
    /// Mask delivered to the filter, if any.
    pub mask: Option<SelectionMask>,
    /// Planes delivered.
    pub planes: i16,
}

impl CaseSelection {
    /// Area the filter should process: the mask's bounds, or the whole
    /// image when there is no mask or the mask is empty.
    pub fn filter_rect(&self, width: u32, height: u32) -> Rect {
        let whole = Rect::from_size(width as i32, height as i32);
        self.mask
            .as_ref()
            .and_then(SelectionMask::bounds)
            .unwrap_or(whole)
    }

    /// Whether the delivered planes include alpha.
    pub fn has_alpha_plane(&self) -> bool {
        self.planes == 4
    }
}

fn entry(record: &PluginRecord, case: FilterCase) -> Option<FilterCaseInfo> {
    let table = record.filter_cases()?;
    table.get(case.table_index()?).copied()
}

fn supports(record: &PluginRecord, case: FilterCase) -> bool {
    match record.filter_cases() {
        None => true,
        Some(_) => entry(record, case).is_some_and(|info| info.is_supported()),
    }
}

fn intersect(a: &SelectionMask, b: &SelectionMask) -> SelectionMask {
    let bytes = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .map(|(&x, &y)| x.min(y))
        .collect();
    SelectionMask::from_bytes(a.width(), a.height(), bytes).unwrap_or_else(|_| a.clone())
}

/// Pick the filter case for `images`.
///
/// The editable-transparency case wins when the filter supports it. A
/// transparent image otherwise tries the protected case, an opaque image
/// the flat case. A transparent image no other case accepts is filtered as
/// a floating selection whose mask comes from alpha.
pub fn select(record: &PluginRecord, images: &FilterImages) -> Result<CaseSelection> {
    let selected = images.selection.is_some();
    let transparent = images.source.has_transparency();
    let pick = |no_selection, with_selection| {
        if selected { with_selection } else { no_selection }
    };

    let editable = pick(
        FilterCase::EditableTransparencyNoSelection,
        FilterCase::EditableTransparencyWithSelection,
    );
    let protected = pick(
        FilterCase::ProtectedTransparencyNoSelection,
        FilterCase::ProtectedTransparencyWithSelection,
    );
    let flat = pick(
        FilterCase::FlatImageNoSelection,
        FilterCase::FlatImageWithSelection,
    );

    let chosen = if supports(record, editable) {
        Some((editable, 4))
    } else if transparent && supports(record, protected) {
        Some((protected, 4))
    } else if !transparent && supports(record, flat) {
        Some((flat, 3))
    } else {
        None
    };

    if let Some((case, planes)) = chosen {
        tracing::debug!(?case, planes, "selected filter case");
        return Ok(CaseSelection {
            case,
            info: entry(record, case),
            mask: images.selection.clone(),
            planes,
        });
    }

    if transparent {
        let alpha = SelectionMask::from_alpha(&images.source);
        let mask = match &images.selection {
            Some(selection) => intersect(&alpha, selection),
            None => alpha,
        };
        tracing::debug!("filtering transparent image as a floating selection");
        return Ok(CaseSelection {
            case: FilterCase::FloatingSelection,
            info: entry(record, FilterCase::FloatingSelection),
            mask: Some(mask),
            planes: 3,
        });
    }

    Err(Error::UnsupportedImage(format!(
        "`{}` supports none of the cases for this image",
        record.title()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Architecture;
    use crate::plugin::FilterCaseTable;
    use crate::surface::{Bgra8, Surface};

    const SUPPORTED: FilterCaseInfo = FilterCaseInfo {
        input_handling: 1,
        output_handling: 1,
        flags1: 0,
        flags2: 0,
    };
    const UNSUPPORTED: FilterCaseInfo = FilterCaseInfo {
        input_handling: 0,
        output_handling: 0,
        flags1: 0,
        flags2: 0,
    };

    fn record(table: Option<FilterCaseTable>) -> PluginRecord {
        let r = PluginRecord::new("x.8bf", "Main", "Cat", "Title", Architecture::X64);
        match table {
            Some(t) => r.with_filter_cases(t),
            None => r,
        }
    }

    fn opaque() -> FilterImages {
        FilterImages::new(Surface::filled(2, 2, Bgra8::from_rgba(1, 2, 3, 255)).unwrap())
    }

    fn half_transparent() -> FilterImages {
        let pixels = vec![
            Bgra8::from_rgba(1, 1, 1, 255),
            Bgra8::from_rgba(1, 1, 1, 0),
            Bgra8::from_rgba(1, 1, 1, 10),
            Bgra8::from_rgba(1, 1, 1, 0),
        ];
        FilterImages::new(Surface::from_pixels(2, 2, pixels).unwrap())
    }

    #[test]
    fn test_no_table_is_editable() {
        let sel = select(&record(None), &opaque()).unwrap();
        assert_eq!(sel.case, FilterCase::EditableTransparencyNoSelection);
        assert_eq!(sel.planes, 4);
    }

    #[test]
    fn test_flat_for_opaque_image() {
        let mut table = [UNSUPPORTED; 7];
        table[0] = SUPPORTED;
        let sel = select(&record(Some(table)), &opaque()).unwrap();
        assert_eq!(sel.case, FilterCase::FlatImageNoSelection);
        assert_eq!(sel.planes, 3);
        assert_eq!(sel.filter_rect(2, 2), Rect::from_size(2, 2));
    }

    #[test]
    fn test_protected_for_transparent_image() {
        let mut table = [UNSUPPORTED; 7];
        table[0] = SUPPORTED;
        table[5] = SUPPORTED;
        let sel = select(&record(Some(table)), &half_transparent()).unwrap();
        assert_eq!(sel.case, FilterCase::ProtectedTransparencyNoSelection);
    }

    #[test]
    fn test_floating_selection_mask_from_alpha() {
        let mut table = [UNSUPPORTED; 7];
        table[0] = SUPPORTED;
        let sel = select(&record(Some(table)), &half_transparent()).unwrap();
        assert_eq!(sel.case, FilterCase::FloatingSelection);
        assert_eq!(sel.mask.as_ref().unwrap().as_bytes(), &[255, 0, 255, 0]);
        assert_eq!(sel.filter_rect(2, 2), Rect::new(0, 0, 2, 1));
    }

    #[test]
    fn test_unsupported_opaque() {
        let table = [UNSUPPORTED; 7];
        assert!(matches!(
            select(&record(Some(table)), &opaque()),
            Err(Error::UnsupportedImage(_))
        ));
    }

    #[test]
    fn test_selection_variants() {
        let images = opaque()
            .with_selection(SelectionMask::from_bytes(2, 2, vec![0, 0, 0, 255]).unwrap())
            .unwrap();
        let mut table = [UNSUPPORTED; 7];
        table[1] = SUPPORTED;
        let sel = select(&record(Some(table)), &images).unwrap();
        assert_eq!(sel.case, FilterCase::FlatImageWithSelection);
        assert_eq!(sel.filter_rect(2, 2), Rect::new(1, 1, 2, 2));
    }
}
