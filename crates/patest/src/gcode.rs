//! G-code document and the stateful writer that produces it.
//!
//! [`GcodeWriter`] owns the tool state during emission: current X/Y/Z,
//! the absolute extrusion coordinate E, the active feedrate, and the
//! retraction flag. Commands only mention the axes that actually changed,
//! and the feedrate only when it differs from the previous move, so the
//! output stays close to what a careful hand would write.

use std::f64::consts::PI;
use std::fmt;

use crate::filament::Filament;
use crate::flavor::GcodeFlavor;
use crate::geometry::Point2;
use crate::printer::Printer;

/// Coordinates closer than this are treated as unchanged.
const EPSILON: f64 = 1e-9;

/// A complete, ordered G-code document.
///
/// Append-only during generation; read-only once returned. Produced by
/// [`GcodeWriter::finish`].
#[derive(Debug, Clone, Default)]
pub struct GcodeDocument {
    lines: Vec<String>,
    /// Statistics accumulated while the document was written.
    pub stats: GcodeStats,
}

impl GcodeDocument {
    /// The document as a single string, newline-terminated.
    pub fn content(&self) -> String {
        let mut out = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Iterate over the lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Is the document empty?
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for GcodeDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Statistics about a generated document.
#[derive(Debug, Clone, Copy, Default)]
pub struct GcodeStats {
    /// Number of test patches in the document.
    pub pattern_count: usize,
    /// Filament consumed (mm of raw filament).
    pub filament_mm: f64,
    /// Filament consumed (cm³).
    pub filament_cm3: f64,
    /// Filament consumed (grams).
    pub filament_grams: f64,
    /// Extruded path length (mm).
    pub extrusion_mm: f64,
    /// Travel path length (mm).
    pub travel_mm: f64,
    /// Number of retractions.
    pub retraction_count: usize,
    /// Motion-only print time estimate (seconds).
    pub estimated_seconds: f64,
}

impl GcodeStats {
    /// Print time formatted as MM:SS or HH:MM:SS.
    pub fn time_formatted(&self) -> String {
        let total = self.estimated_seconds.round() as u64;
        let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
        if hours > 0 {
            format!("{hours}:{minutes:02}:{seconds:02}")
        } else {
            format!("{minutes}:{seconds:02}")
        }
    }
}

/// Stateful G-code emitter.
///
/// Created fresh per document and consumed by [`finish`](Self::finish).
/// All coordinates are absolute bed coordinates in mm, speeds in mm/s.
#[derive(Debug)]
pub struct GcodeWriter {
    flavor: GcodeFlavor,
    lines: Vec<String>,

    // Tool state.
    x: f64,
    y: f64,
    z: f64,
    e: f64,
    feed: f64,
    retracted: bool,
    last_fan: Option<f64>,
    synced: bool,

    // Extrusion context, fixed for the document.
    e_per_mm: f64,
    filament_area: f64,
    density: f64,

    // Retraction behavior, from the filament profile.
    retract_length: f64,
    retract_speed: f64,
    restart_extra: f64,
    z_lift: f64,
    travel_speed: f64,

    // Accounting.
    extrusion_mm: f64,
    travel_mm: f64,
    filament_mm: f64,
    retraction_count: usize,
    seconds: f64,
}

impl GcodeWriter {
    /// Create a writer for one (printer, filament) pair.
    ///
    /// The extrusion rate is fixed at construction: patches print as a
    /// single layer at the printer's first layer height, so every
    /// extruded millimetre of path advances E by
    /// `line_width * first_layer_height * flow / filament_area`.
    pub fn new(printer: &Printer, filament: &Filament) -> Self {
        let filament_area = PI * (printer.filament_diameter / 2.0).powi(2);
        let section = filament.line_width_for(printer) * printer.first_layer_height;
        let e_per_mm = section * filament.flow_percent / 100.0 / filament_area;
        Self {
            flavor: printer.flavor,
            lines: Vec::new(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
            e: 0.0,
            feed: 0.0,
            retracted: false,
            last_fan: None,
            synced: true,
            e_per_mm,
            filament_area,
            density: filament.density,
            retract_length: filament.retract_length,
            retract_speed: filament.retract_speed,
            restart_extra: filament.restart_extra,
            z_lift: filament.z_lift,
            travel_speed: printer.travel_speed,
            extrusion_mm: 0.0,
            travel_mm: 0.0,
            filament_mm: 0.0,
            retraction_count: 0,
            seconds: 0.0,
        }
    }

    /// Current X position (mm).
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Current Y position (mm).
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Current Z position (mm).
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Current absolute extrusion coordinate (mm of filament).
    pub fn e(&self) -> f64 {
        self.e
    }

    /// Current XY position.
    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    /// Is the filament currently retracted?
    pub fn is_retracted(&self) -> bool {
        self.retracted
    }

    /// Append a comment line.
    pub fn comment(&mut self, text: &str) {
        if text.is_empty() {
            self.lines.push(";".to_string());
        } else {
            self.lines.push(format!("; {text}"));
        }
    }

    /// Append a snippet verbatim, one command per line.
    ///
    /// Blank lines in the snippet are dropped. A snippet may move the
    /// head or change the feedrate, so the writer forgets its modal
    /// memory and the next move spells out every axis.
    pub fn raw(&mut self, snippet: &str) {
        for line in snippet.lines() {
            let line = line.trim_end();
            if !line.is_empty() {
                self.lines.push(line.to_string());
            }
        }
        self.synced = false;
    }

    /// Units, extrusion mode, E reset, absolute positioning.
    pub fn init(&mut self) {
        self.lines.push("G21".to_string());
        self.lines.push("M82".to_string());
        self.lines.push("G92 E0".to_string());
        self.lines.push("G90".to_string());
        self.e = 0.0;
    }

    /// Home all axes.
    pub fn home(&mut self) {
        self.lines.push("G28".to_string());
    }

    /// Set bed temperature without waiting.
    pub fn set_bed_temp(&mut self, temp: u32) {
        self.lines.push(format!("M140 S{temp}"));
    }

    /// Set bed temperature and wait for it.
    pub fn set_bed_temp_wait(&mut self, temp: u32) {
        self.lines.push(format!("M190 S{temp}"));
    }

    /// Set hotend temperature without waiting.
    pub fn set_hotend_temp(&mut self, temp: u32) {
        self.lines.push(format!("M104 S{temp}"));
    }

    /// Set hotend temperature and wait for it.
    pub fn set_hotend_temp_wait(&mut self, temp: u32) {
        self.lines.push(format!("M109 S{temp}"));
    }

    /// Set the part cooling fan (0-100 %). Repeated identical values
    /// emit nothing.
    pub fn set_fan(&mut self, percent: f64) {
        if self.last_fan == Some(percent) {
            return;
        }
        let cmd = self.flavor.fan_gcode(percent);
        self.lines.push(cmd);
        self.last_fan = Some(percent);
    }

    /// Cap print acceleration.
    pub fn set_acceleration(&mut self, accel: f64) {
        let cmd = self.flavor.acceleration_gcode(accel);
        self.lines.push(cmd);
    }

    /// Set pressure advance. No-op when the flavor has no command for it;
    /// the generator rejects such flavors before emission starts.
    pub fn set_pressure_advance(&mut self, value: f64) {
        if let Some(cmd) = self.flavor.pressure_advance_gcode(value) {
            self.lines.push(cmd);
        }
    }

    /// Turn the stepper motors off.
    pub fn disable_motors(&mut self) {
        self.lines.push("M84".to_string());
    }

    /// Travel (non-extruding move) to an XY position.
    pub fn travel_to(&mut self, x: f64, y: f64, speed: f64) {
        let dist = ((x - self.x).powi(2) + (y - self.y).powi(2)).sqrt();
        self.motion(x, y, self.z, 0.0, speed);
        self.travel_mm += dist;
        self.seconds += dist / speed;
    }

    /// Travel to a Z height.
    pub fn travel_z(&mut self, z: f64, speed: f64) {
        let dist = (z - self.z).abs();
        self.motion(self.x, self.y, z, 0.0, speed);
        self.travel_mm += dist;
        self.seconds += dist / speed;
    }

    /// Extrude a straight line to an XY position.
    ///
    /// Advances E by the segment length times the fixed extrusion rate.
    /// Zero-length segments emit nothing.
    pub fn extrude_to(&mut self, x: f64, y: f64, speed: f64) {
        let dist = ((x - self.x).powi(2) + (y - self.y).powi(2)).sqrt();
        if dist < EPSILON {
            return;
        }
        let de = dist * self.e_per_mm;
        self.motion(x, y, self.z, de, speed);
        self.extrusion_mm += dist;
        self.filament_mm += de;
        self.seconds += dist / speed;
    }

    /// Retract, then lift Z if the profile asks for it.
    ///
    /// Does nothing when already retracted, so every emitted retraction
    /// pairs with exactly one deretract (or ends the document).
    pub fn retract(&mut self) {
        if self.retracted || self.retract_length <= 0.0 {
            return;
        }
        self.e -= self.retract_length;
        let feed = (self.retract_speed * 60.0).round();
        self.lines
            .push(format!("G1 E{} F{}", fmt_mm(self.e), feed as u32));
        self.feed = feed;
        self.seconds += self.retract_length / self.retract_speed;
        if self.z_lift > 0.0 {
            self.travel_z(self.z + self.z_lift, self.travel_speed);
        }
        self.retracted = true;
        self.retraction_count += 1;
    }

    /// Undo the Z lift, then push the filament back plus the configured
    /// restart extra. Does nothing when not retracted.
    pub fn deretract(&mut self) {
        if !self.retracted {
            return;
        }
        if self.z_lift > 0.0 {
            self.travel_z(self.z - self.z_lift, self.travel_speed);
        }
        self.e += self.retract_length + self.restart_extra;
        let feed = (self.retract_speed * 60.0).round();
        self.lines
            .push(format!("G1 E{} F{}", fmt_mm(self.e), feed as u32));
        self.feed = feed;
        self.seconds += (self.retract_length + self.restart_extra) / self.retract_speed;
        self.retracted = false;
    }

    /// Statistics for everything written so far.
    pub fn stats(&self, pattern_count: usize) -> GcodeStats {
        let filament_cm3 = self.filament_mm * self.filament_area / 1000.0;
        GcodeStats {
            pattern_count,
            filament_mm: self.filament_mm,
            filament_cm3,
            filament_grams: filament_cm3 * self.density,
            extrusion_mm: self.extrusion_mm,
            travel_mm: self.travel_mm,
            retraction_count: self.retraction_count,
            estimated_seconds: self.seconds,
        }
    }

    /// Consume the writer and produce the finished document.
    pub fn finish(self, pattern_count: usize) -> GcodeDocument {
        let stats = self.stats(pattern_count);
        GcodeDocument {
            lines: self.lines,
            stats,
        }
    }

    /// Emit a G1, mentioning only what changed since the previous move.
    /// After a raw snippet every axis and the feedrate are spelled out.
    fn motion(&mut self, x: f64, y: f64, z: f64, de: f64, speed: f64) {
        let force = !self.synced;
        let mut cmd = String::from("G1");
        if force || (x - self.x).abs() > EPSILON {
            cmd.push_str(&format!(" X{}", fmt_mm(x)));
            self.x = x;
        }
        if force || (y - self.y).abs() > EPSILON {
            cmd.push_str(&format!(" Y{}", fmt_mm(y)));
            self.y = y;
        }
        if force || (z - self.z).abs() > EPSILON {
            cmd.push_str(&format!(" Z{}", fmt_mm(z)));
            self.z = z;
        }
        if de > 0.0 {
            self.e += de;
            cmd.push_str(&format!(" E{}", fmt_mm(self.e)));
        }
        let feed = speed * 60.0;
        if force || (feed - self.feed).abs() > EPSILON {
            cmd.push_str(&format!(" F{}", feed.round() as u32));
            self.feed = feed;
        }
        if cmd != "G1" {
            self.lines.push(cmd);
            self.synced = true;
        }
    }
}

/// Format a coordinate with three decimals, normalizing negative zero.
fn fmt_mm(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.3}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn writer() -> GcodeWriter {
        GcodeWriter::new(&Printer::generic(), &Filament::pla())
    }

    fn last_line(w: &GcodeWriter) -> &str {
        w.lines.last().unwrap()
    }

    #[test]
    fn test_travel_emits_changed_axes_only() {
        let mut w = writer();
        w.travel_to(10.0, 20.0, 150.0);
        assert_eq!(last_line(&w), "G1 X10.000 Y20.000 F9000");
        // Same Y, same feed: only X appears.
        w.travel_to(30.0, 20.0, 150.0);
        assert_eq!(last_line(&w), "G1 X30.000");
    }

    #[test]
    fn test_feed_emitted_on_change_only() {
        let mut w = writer();
        w.travel_to(10.0, 0.0, 150.0);
        w.travel_to(20.0, 0.0, 150.0);
        assert_eq!(last_line(&w), "G1 X20.000");
        w.travel_to(30.0, 0.0, 80.0);
        assert_eq!(last_line(&w), "G1 X30.000 F4800");
    }

    #[test]
    fn test_no_empty_moves() {
        let mut w = writer();
        w.travel_to(10.0, 0.0, 150.0);
        let count = w.lines.len();
        w.travel_to(10.0, 0.0, 150.0);
        w.extrude_to(10.0, 0.0, 25.0);
        assert_eq!(w.lines.len(), count);
    }

    #[test]
    fn test_extrusion_advances_e() {
        let mut w = writer();
        w.extrude_to(10.0, 0.0, 25.0);
        // 0.45 line width * 0.25 first layer height over a 1.75mm filament:
        // 10mm of path moves E by 10 * 0.1125 / 2.405 = 0.4678.
        assert_relative_eq!(w.e(), 0.4678, epsilon = 1e-4);
        assert!(last_line(&w).starts_with("G1 X10.000 E0.468 F"));
    }

    #[test]
    fn test_e_is_monotonic_outside_retracts() {
        let mut w = writer();
        let mut prev = w.e();
        for i in 1..=10 {
            w.extrude_to(i as f64 * 5.0, 0.0, 25.0);
            assert!(w.e() >= prev);
            prev = w.e();
        }
    }

    #[test]
    fn test_retract_deretract_pairing() {
        let mut w = writer();
        w.extrude_to(10.0, 0.0, 25.0);
        let e_before = w.e();
        let z_before = w.z();

        w.retract();
        assert!(w.is_retracted());
        assert_relative_eq!(w.e(), e_before - 0.8, epsilon = 1e-9);
        assert_relative_eq!(w.z(), z_before + 0.2, epsilon = 1e-9);

        // Second retract must not double-count.
        let lines = w.lines.len();
        w.retract();
        assert_eq!(w.lines.len(), lines);

        w.deretract();
        assert!(!w.is_retracted());
        assert_relative_eq!(w.e(), e_before, epsilon = 1e-9);
        assert_relative_eq!(w.z(), z_before, epsilon = 1e-9);
    }

    #[test]
    fn test_restart_extra_overshoots_e() {
        let filament = Filament {
            restart_extra: 0.2,
            z_lift: 0.0,
            ..Filament::pla()
        };
        let mut w = GcodeWriter::new(&Printer::generic(), &filament);
        w.extrude_to(10.0, 0.0, 25.0);
        let e_before = w.e();
        w.retract();
        w.deretract();
        assert_relative_eq!(w.e(), e_before + 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_deretract_without_retract_is_noop() {
        let mut w = writer();
        w.extrude_to(10.0, 0.0, 25.0);
        let lines = w.lines.len();
        w.deretract();
        assert_eq!(w.lines.len(), lines);
    }

    #[test]
    fn test_fan_dedup() {
        let mut w = writer();
        w.set_fan(100.0);
        w.set_fan(100.0);
        w.set_fan(0.0);
        let fans: Vec<_> = w
            .lines
            .iter()
            .filter(|l| l.starts_with("M106") || l.starts_with("M107"))
            .collect();
        assert_eq!(fans, ["M106 S255", "M107"]);
    }

    #[test]
    fn test_init_sequence() {
        let mut w = writer();
        w.init();
        assert_eq!(w.lines, ["G21", "M82", "G92 E0", "G90"]);
    }

    #[test]
    fn test_raw_skips_blank_lines() {
        let mut w = writer();
        w.raw("M300 S440 P200\n\nG4 P100\n");
        assert_eq!(w.lines, ["M300 S440 P200", "G4 P100"]);
    }

    #[test]
    fn test_move_after_raw_spells_out_axes() {
        let mut w = writer();
        w.travel_to(10.0, 20.0, 150.0);
        // The snippet may have moved the head, so the next move must not
        // rely on the modal position memory.
        w.raw("G0 X50");
        w.travel_to(10.0, 25.0, 150.0);
        assert_eq!(last_line(&w), "G1 X10.000 Y25.000 Z0.000 F9000");
        // Modal omission resumes afterwards.
        w.travel_to(10.0, 30.0, 150.0);
        assert_eq!(last_line(&w), "G1 Y30.000");
    }

    #[test]
    fn test_negative_zero_never_printed() {
        let mut w = writer();
        w.travel_to(-5.0, 0.0, 150.0);
        w.travel_to(-1e-12, 0.0, 150.0);
        assert_eq!(last_line(&w), "G1 X0.000");
    }

    #[test]
    fn test_stats_accounting() {
        let mut w = writer();
        w.travel_to(10.0, 0.0, 150.0);
        w.extrude_to(10.0, 20.0, 25.0);
        w.retract();
        let doc = w.finish(1);
        assert_eq!(doc.stats.pattern_count, 1);
        assert_eq!(doc.stats.retraction_count, 1);
        assert_relative_eq!(doc.stats.travel_mm, 10.0 + 0.2, epsilon = 1e-9);
        assert_relative_eq!(doc.stats.extrusion_mm, 20.0, epsilon = 1e-9);
        // Volume and mass follow from the raw filament length: a 1.75mm
        // filament and PLA at 1.24 g/cm³.
        let filament_area = PI * (1.75_f64 / 2.0).powi(2);
        assert_relative_eq!(
            doc.stats.filament_cm3,
            doc.stats.filament_mm * filament_area / 1000.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            doc.stats.filament_grams,
            doc.stats.filament_cm3 * 1.24,
            epsilon = 1e-9
        );
        assert!(doc.stats.filament_grams > 0.0);
        assert!(doc.stats.estimated_seconds > 0.0);
    }

    #[test]
    fn test_document_roundtrip() {
        let mut w = writer();
        w.comment("hello");
        w.travel_to(1.0, 2.0, 150.0);
        let doc = w.finish(0);
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.content(), "; hello\nG1 X1.000 Y2.000 F9000\n");
        assert_eq!(doc.content(), doc.to_string());
    }

    #[test]
    fn test_time_formatting() {
        let stats = GcodeStats {
            estimated_seconds: 754.0,
            ..Default::default()
        };
        assert_eq!(stats.time_formatted(), "12:34");
        let stats = GcodeStats {
            estimated_seconds: 3754.0,
            ..Default::default()
        };
        assert_eq!(stats.time_formatted(), "1:02:34");
    }
}
