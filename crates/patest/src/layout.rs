//! Grid placement of test patches on the printable area.
//!
//! Patches are placed row-major from the bottom-left corner of the
//! printable area, in ascending pressure-advance order, with a clearance
//! gap between neighbours. Placement either succeeds for every patch or
//! fails before any G-code exists.

use crate::error::{ConfigError, Result};
use crate::geometry::{Point2, Rect, Vec2};

/// Slack for comparisons against area edges.
const EPSILON: f64 = 1e-9;

/// One patch's spot on the bed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Position in the sweep, starting at 0.
    pub index: usize,
    /// The pressure-advance value printed at this spot.
    pub pa: f64,
    /// Bottom-left corner of the patch in bed coordinates.
    pub origin: Point2,
}

impl Placement {
    /// The bed-coordinate box this patch occupies.
    pub fn bounds(&self, footprint: Vec2) -> Rect {
        Rect::from_origin_size(self.origin, footprint)
    }
}

/// Place one patch per sweep value inside `area`.
///
/// Columns per row is the largest number of footprints (plus gaps) that
/// fit the area's width, capped at the patch count. Fails with
/// [`ConfigError::PatternsDoNotFit`] when not even one column fits or the
/// rows outgrow the area's height. On success the returned boxes are
/// pairwise disjoint and all inside `area`.
pub fn layout_grid(
    pa_values: &[f64],
    footprint: Vec2,
    area: &Rect,
    spacing: f64,
) -> Result<Vec<Placement>> {
    let count = pa_values.len();
    if count == 0 {
        return Ok(Vec::new());
    }

    let does_not_fit = || ConfigError::PatternsDoNotFit {
        count,
        patch_x: footprint.x,
        patch_y: footprint.y,
        area_x: area.width(),
        area_y: area.height(),
    };

    // n columns need n widths and n-1 gaps.
    let cols_fit = ((area.width() + spacing) / (footprint.x + spacing) + EPSILON).floor();
    if cols_fit < 1.0 {
        return Err(does_not_fit());
    }
    let cols = (cols_fit as usize).min(count);
    let rows = count.div_ceil(cols);
    let needed_height = rows as f64 * footprint.y + (rows - 1) as f64 * spacing;
    if needed_height > area.height() + EPSILON {
        return Err(does_not_fit());
    }

    let placements = pa_values
        .iter()
        .enumerate()
        .map(|(index, &pa)| {
            let col = (index % cols) as f64;
            let row = (index / cols) as f64;
            Placement {
                index,
                pa,
                origin: Point2::new(
                    area.min[0] + col * (footprint.x + spacing),
                    area.min[1] + row * (footprint.y + spacing),
                ),
            }
        })
        .collect();
    Ok(placements)
}
