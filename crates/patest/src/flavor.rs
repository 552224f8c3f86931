//! G-code flavor definitions.
//!
//! The dialects differ in how pressure advance is set, how fan speed is
//! scaled, and which bed-leveling command (if any) they understand.

use serde::{Deserialize, Serialize};

/// G-code flavor (dialect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GcodeFlavor {
    /// Marlin firmware (Ender, Prusa). Pressure advance is "linear advance".
    #[default]
    Marlin,
    /// Klipper firmware.
    Klipper,
    /// RepRapFirmware (Duet boards).
    RepRap,
    /// Bambu Lab printers.
    Bambu,
}

impl GcodeFlavor {
    /// The command that sets pressure advance to `value`, if the flavor
    /// has one.
    ///
    /// Values are emitted with four decimals so sweeps stepped finer than
    /// 0.001 survive the round trip through text.
    pub fn pressure_advance_gcode(&self, value: f64) -> Option<String> {
        match self {
            GcodeFlavor::Marlin => Some(format!("M900 K{:.4}", value)),
            GcodeFlavor::Klipper => Some(format!("SET_PRESSURE_ADVANCE ADVANCE={:.4}", value)),
            GcodeFlavor::RepRap => Some(format!("M572 D0 S{:.4}", value)),
            // Bambu firmware applies pressure advance from its own filament
            // profiles and ignores mid-print M900 in normal mode.
            GcodeFlavor::Bambu => None,
        }
    }

    /// Does this flavor support setting pressure advance from G-code?
    pub fn supports_pressure_advance(&self) -> bool {
        self.pressure_advance_gcode(0.0).is_some()
    }

    /// Part-cooling fan command for a 0-100 percent duty cycle.
    ///
    /// RepRapFirmware expects a 0.0-1.0 fraction; everyone else takes the
    /// classic 0-255 PWM byte. Zero turns the fan off with `M107`.
    pub fn fan_gcode(&self, percent: f64) -> String {
        let percent = percent.clamp(0.0, 100.0);
        if percent == 0.0 {
            return "M107".to_string();
        }
        match self {
            GcodeFlavor::RepRap => format!("M106 S{:.2}", percent / 100.0),
            _ => format!("M106 S{}", (percent / 100.0 * 255.0).round() as u32),
        }
    }

    /// Bed-leveling command run after homing, if the flavor has one.
    pub fn bed_leveling_gcode(&self) -> Option<&'static str> {
        match self {
            GcodeFlavor::Marlin | GcodeFlavor::RepRap => Some("G29"),
            GcodeFlavor::Klipper => Some("BED_MESH_CALIBRATE"),
            GcodeFlavor::Bambu => None,
        }
    }

    /// Command that caps print acceleration at `accel` mm/s².
    ///
    /// RepRapFirmware takes separate print/travel values; the rest accept
    /// the legacy `M204 S` form.
    pub fn acceleration_gcode(&self, accel: f64) -> String {
        let accel = accel.round() as u32;
        match self {
            GcodeFlavor::RepRap => format!("M204 P{accel} T{accel}"),
            _ => format!("M204 S{accel}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_advance_commands() {
        assert_eq!(
            GcodeFlavor::Marlin.pressure_advance_gcode(0.04).unwrap(),
            "M900 K0.0400"
        );
        assert_eq!(
            GcodeFlavor::Klipper.pressure_advance_gcode(0.055).unwrap(),
            "SET_PRESSURE_ADVANCE ADVANCE=0.0550"
        );
        assert_eq!(
            GcodeFlavor::RepRap.pressure_advance_gcode(0.1).unwrap(),
            "M572 D0 S0.1000"
        );
        assert!(GcodeFlavor::Bambu.pressure_advance_gcode(0.04).is_none());
    }

    #[test]
    fn test_supports_pressure_advance() {
        assert!(GcodeFlavor::Marlin.supports_pressure_advance());
        assert!(GcodeFlavor::Klipper.supports_pressure_advance());
        assert!(GcodeFlavor::RepRap.supports_pressure_advance());
        assert!(!GcodeFlavor::Bambu.supports_pressure_advance());
    }

    #[test]
    fn test_acceleration_commands() {
        assert_eq!(GcodeFlavor::Marlin.acceleration_gcode(2000.0), "M204 S2000");
        assert_eq!(GcodeFlavor::Klipper.acceleration_gcode(4000.0), "M204 S4000");
        assert_eq!(
            GcodeFlavor::RepRap.acceleration_gcode(1500.0),
            "M204 P1500 T1500"
        );
    }

    #[test]
    fn test_fan_scaling() {
        assert_eq!(GcodeFlavor::Marlin.fan_gcode(100.0), "M106 S255");
        assert_eq!(GcodeFlavor::Marlin.fan_gcode(50.0), "M106 S128");
        assert_eq!(GcodeFlavor::RepRap.fan_gcode(50.0), "M106 S0.50");
        assert_eq!(GcodeFlavor::RepRap.fan_gcode(100.0), "M106 S1.00");
        assert_eq!(GcodeFlavor::Klipper.fan_gcode(0.0), "M107");
        // Out-of-range input is clamped, not rejected.
        assert_eq!(GcodeFlavor::Marlin.fan_gcode(150.0), "M106 S255");
    }
}
