#![warn(missing_docs)]

//! Pressure advance calibration G-code generator.
//!
//! Produces one G-code document per (printer, filament) pair. Each
//! document prints a grid of single-layer test patches, one patch per
//! pressure-advance value in the filament's sweep, with the value printed
//! underneath so the best setting can be read straight off the bed.
//!
//! # Example
//!
//! ```ignore
//! use patest::{generate, Filament, Printer};
//!
//! let printer = Printer::ender3();
//! let filament = Filament::pla();
//! let doc = generate(&printer, &filament)?;
//!
//! println!("patches: {}", doc.stats.pattern_count);
//! println!("filament: {:.2} g", doc.stats.filament_grams);
//! std::fs::write("pa-test.gcode", doc.content())?;
//! ```

pub mod error;
pub mod filament;
pub mod flavor;
pub mod gcode;
pub mod generator;
pub mod geometry;
pub mod layout;
pub mod pattern;
pub mod printer;

pub use error::{ConfigError, Result};
pub use filament::Filament;
pub use flavor::GcodeFlavor;
pub use gcode::{GcodeDocument, GcodeStats, GcodeWriter};
pub use generator::{generate, GcodeGenerator};
pub use geometry::{Point2, Rect, Vec2};
pub use layout::{layout_grid, Placement};
pub use pattern::{PatternKind, PatternSettings, Segment, SpeedTier, TestPattern};
pub use printer::{BedShape, Printer};
