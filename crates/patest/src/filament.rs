//! Filament profile definitions.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::printer::Printer;

/// Relative slack used when counting sweep steps, so ranges like
/// 0.0..0.06 by 0.02 yield four values instead of three.
const SWEEP_EPSILON: f64 = 1e-6;

/// Filament profile with material-specific settings.
///
/// Immutable once defined. Carries the pressure-advance sweep to test,
/// since the useful range depends on the material as much as the machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Filament {
    /// Profile name. Used for the output file name.
    pub name: String,
    /// Print hotend temperature (°C).
    pub hotend_temp: u32,
    /// First layer hotend temperature (°C).
    pub first_layer_hotend_temp: u32,
    /// Print bed temperature (°C).
    pub bed_temp: u32,
    /// First layer bed temperature (°C).
    pub first_layer_bed_temp: u32,
    /// Part cooling fan duty (0-100 %).
    pub fan_percent: f64,
    /// First layer fan duty (0-100 %).
    pub first_layer_fan_percent: f64,
    /// Retraction length (mm).
    pub retract_length: f64,
    /// Retraction speed (mm/s).
    pub retract_speed: f64,
    /// Extra filament pushed on deretract (mm).
    pub restart_extra: f64,
    /// Z lift while retracted (mm).
    pub z_lift: f64,
    /// Extrusion multiplier (percent, 100 = neutral).
    pub flow_percent: f64,
    /// Extrusion line width (mm). Defaults to 1.125× the nozzle diameter
    /// when not set.
    pub line_width: Option<f64>,
    /// Density (g/cm³), for the filament-usage statistic.
    pub density: f64,
    /// First pressure advance value to test.
    pub pa_start: f64,
    /// Last pressure advance value to test (inclusive).
    pub pa_end: f64,
    /// Increment between tested values.
    pub pa_step: f64,
}

impl Default for Filament {
    fn default() -> Self {
        Self::pla()
    }
}

impl Filament {
    /// Generic PLA profile.
    pub fn pla() -> Self {
        Self {
            name: "PLA".into(),
            hotend_temp: 205,
            first_layer_hotend_temp: 215,
            bed_temp: 60,
            first_layer_bed_temp: 65,
            fan_percent: 100.0,
            first_layer_fan_percent: 0.0,
            retract_length: 0.8,
            retract_speed: 35.0,
            restart_extra: 0.0,
            z_lift: 0.2,
            flow_percent: 100.0,
            line_width: None,
            density: 1.24,
            pa_start: 0.0,
            pa_end: 0.1,
            pa_step: 0.005,
        }
    }

    /// Generic PETG profile.
    pub fn petg() -> Self {
        Self {
            name: "PETG".into(),
            hotend_temp: 240,
            first_layer_hotend_temp: 245,
            bed_temp: 80,
            first_layer_bed_temp: 85,
            fan_percent: 50.0,
            flow_percent: 97.0,
            density: 1.27,
            ..Self::pla()
        }
    }

    /// Generic ABS profile.
    pub fn abs() -> Self {
        Self {
            name: "ABS".into(),
            hotend_temp: 250,
            first_layer_hotend_temp: 255,
            bed_temp: 100,
            first_layer_bed_temp: 105,
            fan_percent: 20.0,
            density: 1.04,
            ..Self::pla()
        }
    }

    /// Get all built-in profiles.
    pub fn all_profiles() -> Vec<Self> {
        vec![Self::pla(), Self::petg(), Self::abs()]
    }

    /// Look up a built-in profile by name (case-insensitive).
    pub fn builtin(name: &str) -> Option<Self> {
        Self::all_profiles()
            .into_iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Line width to extrude at on the given printer.
    pub fn line_width_for(&self, printer: &Printer) -> f64 {
        self.line_width
            .unwrap_or(printer.nozzle_diameter * 1.125)
    }

    /// The pressure advance values of the sweep, ascending.
    ///
    /// `pa_start == pa_end` tests exactly one value. Otherwise the count is
    /// `floor((pa_end - pa_start) / pa_step) + 1`, and the last value lands
    /// on `pa_end` or within one step below it.
    pub fn pa_values(&self) -> Result<Vec<f64>> {
        if self.pa_start < 0.0 {
            return Err(ConfigError::InvalidSweep(format!(
                "pa_start {} is negative",
                self.pa_start
            )));
        }
        if self.pa_start == self.pa_end {
            return Ok(vec![self.pa_start]);
        }
        if self.pa_end < self.pa_start {
            return Err(ConfigError::InvalidSweep(format!(
                "pa_end {} is below pa_start {}",
                self.pa_end, self.pa_start
            )));
        }
        if self.pa_step <= 0.0 {
            return Err(ConfigError::InvalidSweep(format!(
                "pa_step {} must be positive for an ascending sweep",
                self.pa_step
            )));
        }
        let span = (self.pa_end - self.pa_start) / self.pa_step;
        let count = (span + SWEEP_EPSILON).floor() as usize + 1;
        Ok((0..count)
            .map(|i| self.pa_start + i as f64 * self.pa_step)
            .collect())
    }

    /// Validate the profile against the printer it will run on.
    pub fn validate_for(&self, printer: &Printer) -> Result<()> {
        for (field, temp) in [
            ("hotend_temp", self.hotend_temp),
            ("first_layer_hotend_temp", self.first_layer_hotend_temp),
        ] {
            if temp == 0 || temp > printer.max_hotend_temp {
                return Err(self.invalid(format!(
                    "{field} {temp} °C is outside (0, {}] °C",
                    printer.max_hotend_temp
                )));
            }
        }
        for (field, temp) in [
            ("bed_temp", self.bed_temp),
            ("first_layer_bed_temp", self.first_layer_bed_temp),
        ] {
            if temp > printer.max_bed_temp {
                return Err(self.invalid(format!(
                    "{field} {temp} °C exceeds bed limit {} °C",
                    printer.max_bed_temp
                )));
            }
        }
        for (field, fan) in [
            ("fan_percent", self.fan_percent),
            ("first_layer_fan_percent", self.first_layer_fan_percent),
        ] {
            if !(0.0..=100.0).contains(&fan) {
                return Err(self.invalid(format!("{field} {fan} is outside 0-100 %")));
            }
        }
        if self.retract_length < 0.0 || self.restart_extra < 0.0 || self.z_lift < 0.0 {
            return Err(self.invalid("retraction distances must not be negative"));
        }
        if self.retract_speed <= 0.0 || self.retract_speed > printer.max_feedrate {
            return Err(self.invalid(format!(
                "retract_speed must be within (0, {}] mm/s",
                printer.max_feedrate
            )));
        }
        if self.flow_percent <= 0.0 {
            return Err(self.invalid("flow_percent must be positive"));
        }
        if self.line_width_for(printer) <= 0.0 {
            return Err(self.invalid("line_width must be positive"));
        }
        if self.density <= 0.0 {
            return Err(self.invalid("density must be positive"));
        }
        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidFilament {
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
        let printer = Printer::generic();
        for filament in Filament::all_profiles() {
            filament
                .validate_for(&printer)
                .unwrap_or_else(|e| panic!("{}: {e}", filament.name));
        }
    }

    #[test]
    fn test_pa_values_count() {
        let filament = Filament {
            pa_start: 0.0,
            pa_end: 0.06,
            pa_step: 0.02,
            ..Filament::pla()
        };
        let values = filament.pa_values().unwrap();
        assert_eq!(values.len(), 4);
        for (value, expected) in values.iter().zip([0.0, 0.02, 0.04, 0.06]) {
            assert_relative_eq!(*value, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_pa_values_single() {
        let filament = Filament {
            pa_start: 0.05,
            pa_end: 0.05,
            pa_step: 0.0,
            ..Filament::pla()
        };
        assert_eq!(filament.pa_values().unwrap(), vec![0.05]);
    }

    #[test]
    fn test_pa_values_partial_last_step() {
        let filament = Filament {
            pa_start: 0.0,
            pa_end: 0.05,
            pa_step: 0.02,
            ..Filament::pla()
        };
        // 0.0, 0.02, 0.04; 0.06 would overshoot.
        assert_eq!(filament.pa_values().unwrap().len(), 3);
    }

    #[test]
    fn test_pa_values_rejects_inverted() {
        let filament = Filament {
            pa_start: 0.1,
            pa_end: 0.0,
            pa_step: 0.02,
            ..Filament::pla()
        };
        assert!(matches!(
            filament.pa_values(),
            Err(ConfigError::InvalidSweep(_))
        ));
    }

    #[test]
    fn test_pa_values_rejects_zero_step() {
        let filament = Filament {
            pa_start: 0.0,
            pa_end: 0.1,
            pa_step: 0.0,
            ..Filament::pla()
        };
        assert!(filament.pa_values().is_err());
    }

    #[test]
    fn test_temp_limit_enforced() {
        let printer = Printer::generic();
        let filament = Filament {
            hotend_temp: 400,
            ..Filament::pla()
        };
        assert!(matches!(
            filament.validate_for(&printer),
            Err(ConfigError::InvalidFilament { .. })
        ));
    }

    #[test]
    fn test_default_line_width_follows_nozzle() {
        let filament = Filament::pla();
        let printer = Printer::generic();
        assert_relative_eq!(filament.line_width_for(&printer), 0.45, epsilon = 1e-9);
        let wide = Printer::duet_hevo();
        assert_relative_eq!(filament.line_width_for(&wide), 0.9, epsilon = 1e-9);
    }
}
