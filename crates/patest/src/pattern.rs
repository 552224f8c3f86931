//! Test patch recipes.
//!
//! A patch is planned as a sequence of [`Segment`]s in patch-local
//! coordinates with the origin at the patch's bottom-left corner. The
//! generator later translates each segment to its grid placement and
//! resolves speed tiers against the printer profile. Planning is pure
//! geometry; nothing here touches tool state.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::geometry::{Point2, Vec2};
use crate::printer::Printer;

/// Gap between the printed label band and the patch body (mm).
const LABEL_GAP: f64 = 2.0;

/// Digit cell width as a fraction of the label height.
const GLYPH_WIDTH: f64 = 0.6;

/// Horizontal advance per character as a fraction of the label height.
const GLYPH_ADVANCE: f64 = 0.8;

/// Shape drawn for each pressure-advance value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// A stack of straight lines, each with a slow lead-in, a fast middle
    /// and a slow lead-out. Blobs or gaps at the speed transitions show
    /// where the pressure advance value is off.
    #[default]
    LineTower,
    /// A continuous triangular ribbon with alternating slow and fast legs.
    /// Bulging or rounded-off vertices show the error instead.
    ZigZag,
}

/// Tuning knobs shared by all patch recipes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSettings {
    /// Which recipe to draw.
    pub kind: PatternKind,
    /// Width of the patch body (mm).
    pub line_length: f64,
    /// Vertical distance between lines, or between zig-zag rows (mm).
    pub line_spacing: f64,
    /// Lines (or zig-zag rows) per patch.
    pub lines_per_patch: usize,
    /// Height of each zig-zag triangle (mm). Legs run at 45 degrees.
    pub zigzag_amplitude: f64,
    /// Height of the printed value label below each patch (mm).
    /// Zero disables the printed label; the comment label always appears.
    pub label_height: f64,
    /// Clearance between neighbouring patches on the grid (mm).
    pub spacing: f64,
    /// Draw a prime line along the edge of the printable area first.
    pub prime_line: bool,
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self {
            kind: PatternKind::default(),
            line_length: 40.0,
            line_spacing: 2.0,
            lines_per_patch: 5,
            zigzag_amplitude: 5.0,
            label_height: 4.0,
            spacing: 5.0,
            prime_line: true,
        }
    }
}

impl PatternSettings {
    /// Check that the settings describe a drawable patch.
    pub fn validate(&self) -> Result<()> {
        if self.line_length <= 0.0 {
            return Err(invalid("line_length must be positive"));
        }
        if self.line_spacing <= 0.0 {
            return Err(invalid("line_spacing must be positive"));
        }
        if self.lines_per_patch == 0 {
            return Err(invalid("lines_per_patch must be at least 1"));
        }
        if self.kind == PatternKind::ZigZag && self.zigzag_amplitude <= 0.0 {
            return Err(invalid("zigzag_amplitude must be positive"));
        }
        if self.label_height < 0.0 {
            return Err(invalid("label_height must not be negative"));
        }
        if self.spacing < 0.0 {
            return Err(invalid("spacing must not be negative"));
        }
        Ok(())
    }

    /// Plan one patch for a single pressure-advance value.
    pub fn plan(&self, pa: f64) -> TestPattern {
        let mut segments = Vec::new();
        let body_base = if self.label_height > 0.0 {
            self.label_height + LABEL_GAP
        } else {
            0.0
        };
        let body_top = match self.kind {
            PatternKind::LineTower => self.plan_line_tower(body_base, &mut segments),
            PatternKind::ZigZag => self.plan_zigzag(body_base, &mut segments),
        };

        let text = format!("{pa:.4}");
        let label_width = if self.label_height > 0.0 {
            text_width(&text, self.label_height)
        } else {
            0.0
        };
        let width = self.line_length.max(label_width);
        if self.label_height > 0.0 {
            let x0 = (width - label_width) / 2.0;
            plan_text(&text, x0, self.label_height, &mut segments);
        }

        TestPattern {
            pa,
            label: format!("PA {pa:.4}"),
            segments,
            size: Vec2::new(width, body_top),
        }
    }

    /// Straight lines, bottom to top, all drawn left to right so the
    /// speed-transition artifacts line up vertically.
    fn plan_line_tower(&self, base: f64, segments: &mut Vec<Segment>) -> f64 {
        let len = self.line_length;
        for i in 0..self.lines_per_patch {
            let y = base + i as f64 * self.line_spacing;
            segments.push(Segment::Travel {
                to: Point2::new(0.0, y),
            });
            segments.push(Segment::print(len * 0.2, y, SpeedTier::Slow));
            segments.push(Segment::print(len * 0.8, y, SpeedTier::Fast));
            segments.push(Segment::print(len, y, SpeedTier::Slow));
        }
        base + self.lines_per_patch.saturating_sub(1) as f64 * self.line_spacing
    }

    /// Serpentine rows of 45-degree legs, connected by short vertical
    /// prints, so the whole body is one continuous extrusion.
    fn plan_zigzag(&self, base: f64, segments: &mut Vec<Segment>) -> f64 {
        let amp = self.zigzag_amplitude;
        let len = self.line_length;
        let legs = ((len / amp).round() as usize).max(2);
        let dx = len / legs as f64;

        segments.push(Segment::Travel {
            to: Point2::new(0.0, base),
        });
        for row in 0..self.lines_per_patch {
            let row_base = base + row as f64 * (amp + self.line_spacing);
            let rightward = row % 2 == 0;
            if row > 0 {
                // Row ends line up horizontally, so the connector is a
                // straight vertical print.
                let x = if rightward { 0.0 } else { len };
                segments.push(Segment::print(x, row_base, SpeedTier::Slow));
            }
            for leg in 1..=legs {
                let x = if rightward {
                    leg as f64 * dx
                } else {
                    len - leg as f64 * dx
                };
                let y = if leg % 2 == 1 { row_base + amp } else { row_base };
                let tier = if leg % 2 == 1 {
                    SpeedTier::Slow
                } else {
                    SpeedTier::Fast
                };
                segments.push(Segment::print(x, y, tier));
            }
        }
        base + self.lines_per_patch.saturating_sub(1) as f64 * (amp + self.line_spacing) + amp
    }
}

/// Speed class of a print segment, resolved against the printer profile
/// when the segment is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedTier {
    /// The printer's slow calibration speed.
    Slow,
    /// The printer's fast calibration speed.
    Fast,
    /// The printer's first layer speed; used for labels and prime lines.
    FirstLayer,
}

impl SpeedTier {
    /// The speed this tier maps to, in mm/s.
    pub fn speed_for(&self, printer: &Printer) -> f64 {
        match self {
            SpeedTier::Slow => printer.slow_speed,
            SpeedTier::Fast => printer.fast_speed,
            SpeedTier::FirstLayer => printer.first_layer_speed,
        }
    }
}

/// One planned motion in patch-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    /// Reposition without extruding.
    Travel {
        /// Target point.
        to: Point2,
    },
    /// Extrude a straight line.
    Print {
        /// Target point.
        to: Point2,
        /// Speed class, resolved at emission time.
        speed: SpeedTier,
    },
}

impl Segment {
    fn print(x: f64, y: f64, speed: SpeedTier) -> Self {
        Segment::Print {
            to: Point2::new(x, y),
            speed,
        }
    }

    /// The segment's target point.
    pub fn to(&self) -> Point2 {
        match self {
            Segment::Travel { to } | Segment::Print { to, .. } => *to,
        }
    }
}

/// A fully planned patch for one pressure-advance value.
#[derive(Debug, Clone)]
pub struct TestPattern {
    /// The pressure-advance value this patch tests.
    pub pa: f64,
    /// Human-readable label, emitted as a comment above the patch block.
    pub label: String,
    /// Ordered motions, patch-local, origin at the bottom-left corner.
    pub segments: Vec<Segment>,
    /// Footprint of the patch including the label band.
    pub size: Vec2,
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::InvalidPattern(reason.to_string())
}

/// Width of a rendered label string (mm). The trailing advance gap is
/// not counted.
fn text_width(text: &str, height: f64) -> f64 {
    let chars = text.chars().count();
    if chars == 0 {
        return 0.0;
    }
    (chars as f64 * GLYPH_ADVANCE - (GLYPH_ADVANCE - GLYPH_WIDTH)) * height
}

/// Append seven-segment style strokes for `text`, drawn slowly in the
/// label band `y in [0, height]`, starting at `x0`.
fn plan_text(text: &str, x0: f64, height: f64, segments: &mut Vec<Segment>) {
    for (i, ch) in text.chars().enumerate() {
        let cell_x = x0 + i as f64 * GLYPH_ADVANCE * height;
        for (from, to) in glyph_strokes(ch) {
            segments.push(Segment::Travel {
                to: Point2::new(cell_x + from[0] * height, from[1] * height),
            });
            segments.push(Segment::Print {
                to: Point2::new(cell_x + to[0] * height, to[1] * height),
                speed: SpeedTier::FirstLayer,
            });
        }
    }
}

/// A stroke in glyph-cell coordinates: x in `[0, 0.6]`, y in `[0, 1]`,
/// both scaled by the label height.
type Stroke = ([f64; 2], [f64; 2]);

// The classic seven segments. A is the top bar, then clockwise B, C, D
// (bottom), E, F, with G across the middle.
const SEG_A: Stroke = ([0.0, 1.0], [0.6, 1.0]);
const SEG_B: Stroke = ([0.6, 1.0], [0.6, 0.5]);
const SEG_C: Stroke = ([0.6, 0.5], [0.6, 0.0]);
const SEG_D: Stroke = ([0.6, 0.0], [0.0, 0.0]);
const SEG_E: Stroke = ([0.0, 0.0], [0.0, 0.5]);
const SEG_F: Stroke = ([0.0, 0.5], [0.0, 1.0]);
const SEG_G: Stroke = ([0.0, 0.5], [0.6, 0.5]);
const SEG_DOT: Stroke = ([0.2, 0.0], [0.4, 0.0]);

/// Strokes for one character. Unknown characters render as nothing.
fn glyph_strokes(ch: char) -> &'static [Stroke] {
    match ch {
        '0' => &[SEG_A, SEG_B, SEG_C, SEG_D, SEG_E, SEG_F],
        '1' => &[SEG_B, SEG_C],
        '2' => &[SEG_A, SEG_B, SEG_G, SEG_E, SEG_D],
        '3' => &[SEG_A, SEG_B, SEG_G, SEG_C, SEG_D],
        '4' => &[SEG_F, SEG_G, SEG_B, SEG_C],
        '5' => &[SEG_A, SEG_F, SEG_G, SEG_C, SEG_D],
        '6' => &[SEG_A, SEG_F, SEG_E, SEG_D, SEG_C, SEG_G],
        '7' => &[SEG_A, SEG_B, SEG_C],
        '8' => &[SEG_A, SEG_B, SEG_C, SEG_D, SEG_E, SEG_F, SEG_G],
        '9' => &[SEG_A, SEG_B, SEG_F, SEG_G, SEG_C, SEG_D],
        '.' => &[SEG_DOT],
        '-' => &[SEG_G],
        _ => &[],
    }
}
