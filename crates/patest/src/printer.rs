//! Printer profile definitions.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::flavor::GcodeFlavor;
use crate::geometry::Rect;

/// Bed geometry.
///
/// Rectangular beds put the origin at the front-left corner; round (delta)
/// beds put it at the center, matching how those machines home.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BedShape {
    /// Cartesian bed, origin at the front-left corner.
    Rectangular {
        /// Usable size in X (mm).
        x: f64,
        /// Usable size in Y (mm).
        y: f64,
    },
    /// Circular bed, origin at the center.
    Round {
        /// Bed diameter (mm).
        diameter: f64,
    },
}

impl BedShape {
    /// Bounding rectangle of the whole bed, in bed coordinates.
    pub fn bounds(&self) -> Rect {
        match *self {
            BedShape::Rectangular { x, y } => Rect::new([0.0, 0.0], [x, y]),
            BedShape::Round { diameter } => {
                let r = diameter / 2.0;
                Rect::new([-r, -r], [r, r])
            }
        }
    }

    /// Largest axis-aligned rectangle that is fully printable.
    ///
    /// For round beds this is the inscribed square; a toolpath staying
    /// inside it can never leave the bed.
    pub fn printable_bounds(&self) -> Rect {
        match *self {
            BedShape::Rectangular { .. } => self.bounds(),
            BedShape::Round { diameter } => {
                let half_side = diameter / (2.0 * std::f64::consts::SQRT_2);
                Rect::new([-half_side, -half_side], [half_side, half_side])
            }
        }
    }
}

/// Printer profile with machine-specific settings.
///
/// Immutable once defined; one instance per physical machine being
/// calibrated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Printer {
    /// Profile name. Used for the output directory.
    pub name: String,
    /// G-code flavor.
    pub flavor: GcodeFlavor,
    /// Bed geometry.
    pub bed: BedShape,
    /// Usable height (mm).
    pub bed_z: f64,
    /// Nozzle diameter (mm).
    pub nozzle_diameter: f64,
    /// Filament diameter (mm).
    pub filament_diameter: f64,
    /// Travel (non-extruding) speed (mm/s).
    pub travel_speed: f64,
    /// Speed for the slow legs of a test patch (mm/s).
    pub slow_speed: f64,
    /// Speed for the fast legs of a test patch (mm/s).
    pub fast_speed: f64,
    /// First layer print speed (mm/s).
    pub first_layer_speed: f64,
    /// Maximum feedrate the firmware will accept (mm/s).
    pub max_feedrate: f64,
    /// Maximum acceleration the firmware will accept (mm/s²).
    pub max_acceleration: f64,
    /// Print acceleration used during the test (mm/s²).
    pub print_acceleration: f64,
    /// Maximum safe hotend temperature (°C).
    pub max_hotend_temp: u32,
    /// Maximum safe bed temperature (°C).
    pub max_bed_temp: u32,
    /// Layer height (mm).
    pub layer_height: f64,
    /// First layer height (mm). Test patches print at this height.
    pub first_layer_height: f64,
    /// Clearance kept from the bed edge (mm).
    pub margin: f64,
    /// Where the head parks after the test (bed coordinates, mm).
    pub park_position: [f64; 2],
    /// Extra G-code appended after machine setup, one command per line.
    pub start_gcode: Option<String>,
    /// Extra G-code inserted before cooldown, one command per line.
    pub end_gcode: Option<String>,
}

impl Default for Printer {
    fn default() -> Self {
        Self::generic()
    }
}

impl Printer {
    /// Generic Marlin printer profile.
    pub fn generic() -> Self {
        Self {
            name: "Generic".into(),
            flavor: GcodeFlavor::Marlin,
            bed: BedShape::Rectangular { x: 220.0, y: 220.0 },
            bed_z: 250.0,
            nozzle_diameter: 0.4,
            filament_diameter: 1.75,
            travel_speed: 150.0,
            slow_speed: 20.0,
            fast_speed: 80.0,
            first_layer_speed: 25.0,
            max_feedrate: 500.0,
            max_acceleration: 3000.0,
            print_acceleration: 2000.0,
            max_hotend_temp: 275,
            max_bed_temp: 110,
            layer_height: 0.2,
            first_layer_height: 0.25,
            margin: 10.0,
            park_position: [0.0, 220.0],
            start_gcode: None,
            end_gcode: None,
        }
    }

    /// Creality Ender 3 profile.
    pub fn ender3() -> Self {
        Self {
            name: "Creality Ender 3".into(),
            flavor: GcodeFlavor::Marlin,
            bed: BedShape::Rectangular { x: 220.0, y: 220.0 },
            bed_z: 250.0,
            travel_speed: 120.0,
            slow_speed: 15.0,
            fast_speed: 70.0,
            first_layer_speed: 20.0,
            max_acceleration: 500.0,
            print_acceleration: 500.0,
            park_position: [0.0, 220.0],
            ..Self::generic()
        }
    }

    /// Prusa MK4 profile.
    pub fn prusa_mk4() -> Self {
        Self {
            name: "Prusa MK4".into(),
            flavor: GcodeFlavor::Marlin,
            bed: BedShape::Rectangular { x: 250.0, y: 210.0 },
            bed_z: 220.0,
            travel_speed: 200.0,
            slow_speed: 20.0,
            fast_speed: 100.0,
            max_feedrate: 400.0,
            max_acceleration: 4000.0,
            print_acceleration: 3000.0,
            park_position: [0.0, 210.0],
            ..Self::generic()
        }
    }

    /// Voron 2.4 profile (Klipper).
    pub fn voron_24() -> Self {
        Self {
            name: "Voron 2.4 (350mm)".into(),
            flavor: GcodeFlavor::Klipper,
            bed: BedShape::Rectangular { x: 350.0, y: 350.0 },
            bed_z: 340.0,
            travel_speed: 300.0,
            slow_speed: 25.0,
            fast_speed: 120.0,
            first_layer_speed: 30.0,
            max_feedrate: 500.0,
            max_acceleration: 10000.0,
            print_acceleration: 4000.0,
            park_position: [175.0, 350.0],
            ..Self::generic()
        }
    }

    /// Duet-based HyperCube Evolution profile (RepRapFirmware).
    pub fn duet_hevo() -> Self {
        Self {
            name: "HEvo".into(),
            flavor: GcodeFlavor::RepRap,
            bed: BedShape::Rectangular { x: 290.0, y: 290.0 },
            bed_z: 400.0,
            nozzle_diameter: 0.8,
            travel_speed: 200.0,
            slow_speed: 15.0,
            fast_speed: 70.0,
            first_layer_speed: 25.0,
            max_acceleration: 3000.0,
            print_acceleration: 1500.0,
            layer_height: 0.4,
            first_layer_height: 0.25,
            park_position: [0.0, 290.0],
            ..Self::generic()
        }
    }

    /// FLSUN V400 delta profile (Klipper, round bed).
    pub fn flsun_v400() -> Self {
        Self {
            name: "FLSUN V400".into(),
            flavor: GcodeFlavor::Klipper,
            bed: BedShape::Round { diameter: 300.0 },
            bed_z: 410.0,
            travel_speed: 300.0,
            slow_speed: 25.0,
            fast_speed: 120.0,
            first_layer_speed: 30.0,
            max_feedrate: 600.0,
            max_acceleration: 12000.0,
            print_acceleration: 6000.0,
            park_position: [0.0, 130.0],
            ..Self::generic()
        }
    }

    /// Bambu Lab P1S profile.
    ///
    /// Listed for completeness; generation fails for it because the Bambu
    /// flavor has no pressure advance command.
    pub fn bambu_p1s() -> Self {
        Self {
            name: "Bambu Lab P1S".into(),
            flavor: GcodeFlavor::Bambu,
            bed: BedShape::Rectangular { x: 256.0, y: 256.0 },
            bed_z: 256.0,
            travel_speed: 300.0,
            slow_speed: 30.0,
            fast_speed: 150.0,
            first_layer_speed: 35.0,
            max_acceleration: 10000.0,
            print_acceleration: 5000.0,
            park_position: [128.0, 250.0],
            ..Self::generic()
        }
    }

    /// Get all built-in profiles.
    pub fn all_profiles() -> Vec<Self> {
        vec![
            Self::generic(),
            Self::ender3(),
            Self::prusa_mk4(),
            Self::voron_24(),
            Self::duet_hevo(),
            Self::flsun_v400(),
            Self::bambu_p1s(),
        ]
    }

    /// Look up a built-in profile by name (case-insensitive).
    pub fn builtin(name: &str) -> Option<Self> {
        Self::all_profiles()
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Check if a position is within the build volume.
    pub fn in_bounds(&self, x: f64, y: f64, z: f64) -> bool {
        if z < 0.0 || z > self.bed_z {
            return false;
        }
        match self.bed {
            BedShape::Rectangular { x: bx, y: by } => {
                x >= 0.0 && x <= bx && y >= 0.0 && y <= by
            }
            BedShape::Round { diameter } => {
                let r = diameter / 2.0;
                x * x + y * y <= r * r
            }
        }
    }

    /// The rectangle patches may be placed in: the printable bed bounds
    /// inset by the clearance margin.
    pub fn printable_area(&self) -> Result<Rect> {
        self.bed
            .printable_bounds()
            .inset(self.margin)
            .ok_or_else(|| self.invalid("margin leaves no printable area"))
    }

    /// Validate the profile.
    pub fn validate(&self) -> Result<()> {
        let bounds = self.bed.bounds();
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 || self.bed_z <= 0.0 {
            return Err(self.invalid("bed dimensions must be positive"));
        }
        if self.nozzle_diameter <= 0.0 {
            return Err(self.invalid("nozzle_diameter must be positive"));
        }
        if self.filament_diameter <= 0.0 {
            return Err(self.invalid("filament_diameter must be positive"));
        }
        if self.layer_height <= 0.0 || self.first_layer_height <= 0.0 {
            return Err(self.invalid("layer heights must be positive"));
        }
        if self.first_layer_height > self.nozzle_diameter {
            return Err(self.invalid("first_layer_height exceeds nozzle diameter"));
        }
        for (field, speed) in [
            ("travel_speed", self.travel_speed),
            ("slow_speed", self.slow_speed),
            ("fast_speed", self.fast_speed),
            ("first_layer_speed", self.first_layer_speed),
        ] {
            if speed <= 0.0 {
                return Err(self.invalid(format!("{field} must be positive")));
            }
            if speed > self.max_feedrate {
                return Err(self.invalid(format!(
                    "{field} {speed} mm/s exceeds max_feedrate {} mm/s",
                    self.max_feedrate
                )));
            }
        }
        if self.slow_speed > self.fast_speed {
            return Err(self.invalid("slow_speed exceeds fast_speed"));
        }
        if self.print_acceleration <= 0.0 || self.print_acceleration > self.max_acceleration {
            return Err(self.invalid(format!(
                "print_acceleration must be within (0, {}] mm/s²",
                self.max_acceleration
            )));
        }
        if self.margin < 0.0 {
            return Err(self.invalid("margin must not be negative"));
        }
        self.printable_area()?;
        let [px, py] = self.park_position;
        if !self.in_bounds(px, py, 0.0) {
            return Err(self.invalid(format!("park position ({px}, {py}) is off the bed")));
        }
        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidPrinter {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_profiles_validate() {
        for profile in Printer::all_profiles() {
            profile
                .validate()
                .unwrap_or_else(|e| panic!("{}: {e}", profile.name));
        }
    }

    #[test]
    fn test_in_bounds_rectangular() {
        let printer = Printer::ender3();
        assert!(printer.in_bounds(100.0, 100.0, 100.0));
        assert!(!printer.in_bounds(-1.0, 100.0, 100.0));
        assert!(!printer.in_bounds(100.0, 100.0, 300.0));
    }

    #[test]
    fn test_in_bounds_round() {
        let printer = Printer::flsun_v400();
        assert!(printer.in_bounds(0.0, 0.0, 10.0));
        assert!(printer.in_bounds(100.0, 100.0, 10.0));
        assert!(!printer.in_bounds(140.0, 140.0, 10.0));
    }

    #[test]
    fn test_printable_area_rectangular() {
        let printer = Printer::generic();
        let area = printer.printable_area().unwrap();
        assert_eq!(area.min, [10.0, 10.0]);
        assert_eq!(area.max, [210.0, 210.0]);
    }

    #[test]
    fn test_printable_area_round_is_inscribed() {
        let printer = Printer::flsun_v400();
        let area = printer.printable_area().unwrap();
        // Inscribed square of a 300mm circle has a 212.1mm side.
        let half_side = 150.0 / std::f64::consts::SQRT_2;
        assert_relative_eq!(area.min[0], -half_side + 10.0, epsilon = 1e-9);
        assert_relative_eq!(area.max[0], half_side - 10.0, epsilon = 1e-9);
        // Its corners must still be on the bed.
        assert!(printer.in_bounds(area.max[0], area.max[1], 0.0));
    }

    #[test]
    fn test_validate_rejects_bad_speed() {
        let printer = Printer {
            fast_speed: 600.0,
            ..Printer::generic()
        };
        assert!(printer.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_margin() {
        let printer = Printer {
            margin: 200.0,
            ..Printer::generic()
        };
        assert!(printer.validate().is_err());
    }

    #[test]
    fn test_builtin_lookup() {
        assert!(Printer::builtin("hevo").is_some());
        assert!(Printer::builtin("HEVO").is_some());
        assert!(Printer::builtin("does-not-exist").is_none());
    }
}
