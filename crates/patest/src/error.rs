//! Error types for calibration G-code generation.

use thiserror::Error;

use crate::flavor::GcodeFlavor;

/// Errors that can occur while validating input or laying out a test.
///
/// Every failure here is deterministic: the same printer/filament pair
/// fails the same way every time, so callers should fix the configuration
/// rather than retry.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A printer field is missing, non-positive, or self-contradictory.
    #[error("invalid printer '{name}': {reason}")]
    InvalidPrinter {
        /// Printer name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A filament field is invalid, or incompatible with the printer.
    #[error("invalid filament '{name}': {reason}")]
    InvalidFilament {
        /// Filament name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The pressure-advance sweep is empty or inverted.
    #[error("invalid pressure advance sweep: {0}")]
    InvalidSweep(String),

    /// A pattern settings field is out of range.
    #[error("invalid pattern settings: {0}")]
    InvalidPattern(String),

    /// The requested patches cannot be placed inside the printable area.
    #[error(
        "{count} patches of {patch_x:.1}x{patch_y:.1} mm do not fit the \
         {area_x:.1}x{area_y:.1} mm printable area"
    )]
    PatternsDoNotFit {
        /// Number of patches the sweep requires.
        count: usize,
        /// Patch footprint width (mm).
        patch_x: f64,
        /// Patch footprint depth (mm).
        patch_y: f64,
        /// Printable area width (mm).
        area_x: f64,
        /// Printable area depth (mm).
        area_y: f64,
    },

    /// The G-code flavor has no pressure advance command.
    #[error("{0:?} flavor does not support pressure advance")]
    UnsupportedFlavor(GcodeFlavor),
}

/// Result type for generator operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
