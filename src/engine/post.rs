//! Pixel work before and after the filter runs.
//!
//! Before the run the delivered copy of the source has its transparent
//! pixels treated according to the case's input handling. After the run the
//! destination is fixed up: forced opaque, alpha restored, or blended with
//! the source through the mask.

use crate::geometry::Rect;
use crate::plugin::{DataHandling, FilterCase};
use crate::surface::{Bgra8, SelectionMask, Surface};

use super::filter_case::CaseSelection;
use super::pixels;

const GRAY: [u8; 3] = [128, 128, 128];

fn zap(surface: &mut Surface, rgb: [u8; 3]) {
    for p in surface.pixels_mut().iter_mut().filter(|p| p.a == 0) {
        p.r = rgb[0];
        p.g = rgb[1];
        p.b = rgb[2];
    }
}

fn matte(surface: &mut Surface, rgb: [u8; 3]) {
    let mix = |c: u8, m: u8, a: u32| ((u32::from(c) * a + u32::from(m) * (255 - a) + 127) / 255) as u8;
    for p in surface.pixels_mut() {
        let a = u32::from(p.a);
        p.r = mix(p.r, rgb[0], a);
        p.g = mix(p.g, rgb[1], a);
        p.b = mix(p.b, rgb[2], a);
    }
}

/// Build the copy of `source` delivered to the filter.
pub fn prepare_input(
    source: &Surface,
    handling: DataHandling,
    foreground: [u8; 3],
    background: [u8; 3],
) -> Surface {
    let mut input = source.clone();
    match handling {
        DataHandling::BlackZap => zap(&mut input, [0; 3]),
        DataHandling::GrayZap => zap(&mut input, GRAY),
        DataHandling::WhiteZap => zap(&mut input, [255; 3]),
        DataHandling::BackgroundZap => zap(&mut input, background),
        DataHandling::ForegroundZap => zap(&mut input, foreground),
        DataHandling::BlackMat => matte(&mut input, [0; 3]),
        DataHandling::GrayMat => matte(&mut input, GRAY),
        DataHandling::WhiteMat => matte(&mut input, [255; 3]),
        DataHandling::Defringe => {
            tracing::debug!("defringe input handling delivers data unchanged");
        }
        DataHandling::CantFilter | DataHandling::None | DataHandling::FillMask => {}
    }
    input
}

/// Prepare the destination before the run.
pub fn prepare_destination(selection: &CaseSelection, destination: &mut Surface) {
    if selection.info.is_some_and(|info| info.dont_copy_to_destination()) {
        destination.pixels_mut().fill(Bgra8::default());
    }
}

fn force_opaque(destination: &mut Surface, area: Rect) {
    let bounds = Rect::from_size(destination.width() as i32, destination.height() as i32);
    let area = area.intersect(&bounds);
    for y in area.top..area.bottom {
        for p in &mut destination.row_mut(y as u32)[area.left as usize..area.right as usize] {
            p.a = 255;
        }
    }
}

fn restore_alpha(source: &Surface, destination: &mut Surface) {
    for (d, s) in destination.pixels_mut().iter_mut().zip(source.pixels()) {
        d.a = s.a;
    }
}

fn blend_through(mask: &SelectionMask, source: &Surface, destination: &mut Surface) {
    let weights = mask.as_bytes();
    for ((d, s), &w) in destination.pixels_mut().iter_mut().zip(source.pixels()).zip(weights) {
        *d = pixels::blend(*s, *d, w);
    }
}

/// Fix the destination up after a successful run.
///
/// `auto_mask` is the value the filter left in the parameter block.
pub fn finish_output(
    selection: &CaseSelection,
    auto_mask: bool,
    source: &Surface,
    destination: &mut Surface,
) {
    let filter_rect = selection.filter_rect(source.width(), source.height());
    if selection.info.is_some_and(|info| info.output() == DataHandling::FillMask) {
        force_opaque(destination, filter_rect);
    }
    if matches!(
        selection.case,
        FilterCase::ProtectedTransparencyNoSelection | FilterCase::ProtectedTransparencyWithSelection
    ) {
        restore_alpha(source, destination);
    }
    let writes_outside = selection.info.is_some_and(|info| info.writes_outside_selection());
    if let Some(mask) = &selection.mask {
        if auto_mask && !writes_outside {
            blend_through(mask, source, destination);
        }
    }
}
