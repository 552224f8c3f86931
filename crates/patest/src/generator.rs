//! Calibration document assembly.
//!
//! [`GcodeGenerator`] validates a (printer, filament) pair, lays the
//! sweep out on the bed, and emits the full document in one linear pass:
//! header comments, machine setup, an optional prime line, one patch per
//! pressure-advance value, and the shutdown sequence. Everything is
//! checked before the first line is written, so a caller either gets a
//! complete document or an error and nothing else.

use crate::error::{ConfigError, Result};
use crate::filament::Filament;
use crate::gcode::{GcodeDocument, GcodeWriter};
use crate::geometry::{Point2, Rect, Vec2};
use crate::layout::{layout_grid, Placement};
use crate::pattern::{PatternSettings, Segment, TestPattern};
use crate::printer::Printer;

/// Z clearance used for the approach move and the final hop (mm).
const Z_HOP: f64 = 5.0;

/// Width reserved along the area's left edge for the prime line (mm).
const PRIME_CLEARANCE: f64 = 5.0;

/// Generate a calibration document with default pattern settings.
///
/// Convenience wrapper around [`GcodeGenerator`].
pub fn generate(printer: &Printer, filament: &Filament) -> Result<GcodeDocument> {
    GcodeGenerator::new(printer, filament).generate()
}

/// Builds one calibration document for a (printer, filament) pair.
#[derive(Debug, Clone)]
pub struct GcodeGenerator<'a> {
    printer: &'a Printer,
    filament: &'a Filament,
    settings: PatternSettings,
}

impl<'a> GcodeGenerator<'a> {
    /// Generator with default pattern settings.
    pub fn new(printer: &'a Printer, filament: &'a Filament) -> Self {
        Self {
            printer,
            filament,
            settings: PatternSettings::default(),
        }
    }

    /// Replace the pattern settings.
    pub fn with_settings(mut self, settings: PatternSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Produce the complete document.
    ///
    /// Validates the printer, the filament against the printer, the
    /// pattern settings, and the grid fit before emitting anything.
    pub fn generate(&self) -> Result<GcodeDocument> {
        self.printer.validate()?;
        self.filament.validate_for(self.printer)?;
        self.settings.validate()?;
        if !self.printer.flavor.supports_pressure_advance() {
            return Err(ConfigError::UnsupportedFlavor(self.printer.flavor));
        }

        let pa_values = self.filament.pa_values()?;
        let patterns: Vec<TestPattern> =
            pa_values.iter().map(|&pa| self.settings.plan(pa)).collect();
        // Labels gain a character when the value reaches 10, so patches
        // in one sweep can differ in width. Every grid cell gets the
        // largest footprint.
        let footprint = patterns
            .iter()
            .fold(Vec2::zeros(), |acc, p| acc.sup(&p.size));

        let area = self.printer.printable_area()?;
        let mut patch_area = area;
        if self.settings.prime_line {
            patch_area.min[0] += PRIME_CLEARANCE;
        }
        let placements = layout_grid(&pa_values, footprint, &patch_area, self.settings.spacing)?;

        let mut w = GcodeWriter::new(self.printer, self.filament);
        self.header(&mut w, &pa_values, &patterns[0]);
        self.setup(&mut w, &area, &placements);
        if self.settings.prime_line {
            self.prime(&mut w, &area);
        } else {
            w.travel_z(self.printer.first_layer_height, self.printer.travel_speed);
        }
        for (placement, pattern) in placements.iter().zip(&patterns) {
            self.patch(&mut w, placement, pattern);
        }
        self.shutdown(&mut w);

        let stats = w.stats(placements.len());
        w.comment(&format!(
            "filament used: {:.2} mm ({:.2} cm3, {:.2} g)",
            stats.filament_mm, stats.filament_cm3, stats.filament_grams
        ));
        w.comment(&format!("estimated time: {}", stats.time_formatted()));
        Ok(w.finish(placements.len()))
    }

    fn header(&self, w: &mut GcodeWriter, pa_values: &[f64], pattern: &TestPattern) {
        w.comment(&format!(
            "generated by patest {}",
            env!("CARGO_PKG_VERSION")
        ));
        w.comment(&format!(
            "printer: {} ({:?} flavor)",
            self.printer.name, self.printer.flavor
        ));
        w.comment(&format!("filament: {}", self.filament.name));
        w.comment(&format!(
            "pressure advance: {:.4} to {:.4} step {:.4} ({} patches)",
            self.filament.pa_start,
            self.filament.pa_end,
            self.filament.pa_step,
            pa_values.len()
        ));
        w.comment(&format!(
            "patch: {:?} {:.1}x{:.1} mm, line width {:.2} mm",
            self.settings.kind,
            pattern.size.x,
            pattern.size.y,
            self.filament.line_width_for(self.printer)
        ));
    }

    /// Heat, home, level, then wait for the nozzle next to where printing
    /// starts so any ooze lands away from the patches.
    fn setup(&self, w: &mut GcodeWriter, area: &Rect, placements: &[Placement]) {
        w.comment("");
        w.comment("setup");
        w.set_bed_temp_wait(self.filament.first_layer_bed_temp);
        w.set_hotend_temp(self.filament.first_layer_hotend_temp);
        w.init();
        w.home();
        if let Some(leveling) = self.printer.flavor.bed_leveling_gcode() {
            w.raw(leveling);
        }
        w.set_acceleration(self.printer.print_acceleration);

        let start = if self.settings.prime_line {
            Point2::new(area.min[0], area.min[1])
        } else {
            placements[0].origin
        };
        w.travel_z(Z_HOP, self.printer.travel_speed);
        w.travel_to(start.x, start.y, self.printer.travel_speed);
        w.set_hotend_temp_wait(self.filament.first_layer_hotend_temp);
        w.set_fan(self.filament.first_layer_fan_percent);
        if let Some(snippet) = &self.printer.start_gcode {
            w.comment("start gcode");
            w.raw(snippet);
        }
    }

    /// A single line up the left edge of the printable area to get the
    /// flow going before the first patch.
    fn prime(&self, w: &mut GcodeWriter, area: &Rect) {
        w.comment("");
        w.comment("prime line");
        w.travel_to(area.min[0], area.min[1], self.printer.travel_speed);
        w.travel_z(self.printer.first_layer_height, self.printer.travel_speed);
        w.extrude_to(area.min[0], area.max[1], self.printer.first_layer_speed);
        w.retract();
    }

    fn patch(&self, w: &mut GcodeWriter, placement: &Placement, pattern: &TestPattern) {
        if placement.index == 1 {
            // The first patch doubles as the first layer; later patches
            // run at the steady-state temperatures and fan.
            w.comment("");
            w.comment("steady state");
            w.set_bed_temp(self.filament.bed_temp);
            w.set_hotend_temp(self.filament.hotend_temp);
            w.set_fan(self.filament.fan_percent);
        }
        w.comment("");
        w.comment(&pattern.label);
        w.set_pressure_advance(pattern.pa);
        for segment in &pattern.segments {
            let target = placement.origin + segment.to().coords;
            match segment {
                Segment::Travel { .. } => {
                    w.travel_to(target.x, target.y, self.printer.travel_speed);
                }
                Segment::Print { speed, .. } => {
                    if w.is_retracted() {
                        w.deretract();
                    }
                    w.extrude_to(target.x, target.y, speed.speed_for(self.printer));
                }
            }
        }
        w.retract();
    }

    /// Hop clear of the print, park, and power everything down.
    fn shutdown(&self, w: &mut GcodeWriter) {
        w.comment("");
        w.comment("finish");
        w.retract();
        w.travel_z((w.z() + Z_HOP).min(self.printer.bed_z), self.printer.travel_speed);
        let [park_x, park_y] = self.printer.park_position;
        w.travel_to(park_x, park_y, self.printer.travel_speed);
        if let Some(snippet) = &self.printer.end_gcode {
            w.comment("end gcode");
            w.raw(snippet);
        }
        w.set_fan(0.0);
        w.set_hotend_temp(0);
        w.set_bed_temp(0);
        w.disable_motors();
    }
}
