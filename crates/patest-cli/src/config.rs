//! TOML configuration for the generate command.
//!
//! A config file carries `[[printer]]` and `[[filament]]` arrays plus an
//! optional `[pattern]` table. An entry may name a built-in `profile` to
//! start from; any other keys in the entry override that profile's
//! fields. Entries without a profile fall back to the generic defaults
//! for whatever they leave out.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use patest::{Filament, PatternSettings, Printer};

/// A commented starter configuration, written by `patest init`.
pub const STARTER: &str = r#"# patest configuration.
# Run `patest profiles` for the built-in printer and filament profiles,
# and `patest generate` to write one G-code file per printer/filament pair.

[[printer]]
profile = "creality ender 3"

# Start from a profile and override fields:
# [[printer]]
# profile = "voron 2.4 (350mm)"
# margin = 15.0

# Or describe a printer inline; omitted fields use generic defaults.
# flavor is one of "marlin", "klipper", "reprap", "bambu".
# [[printer]]
# name = "My printer"
# flavor = "klipper"
# bed = { type = "rectangular", x = 300.0, y = 300.0 }
# bed = { type = "round", diameter = 300.0 }

[[filament]]
profile = "pla"
pa_start = 0.0
pa_end = 0.08
pa_step = 0.005

# [pattern]
# kind = "line_tower"        # or "zig_zag"
# line_length = 40.0
# lines_per_patch = 5
# label_height = 4.0         # 0 disables the printed value labels
# spacing = 5.0
# prime_line = true
"#;

/// A resolved configuration. Generation covers the full printer ×
/// filament cross product.
#[derive(Debug)]
pub struct Config {
    /// Printers to generate files for.
    pub printers: Vec<Printer>,
    /// Filaments to test on each printer.
    pub filaments: Vec<Filament>,
    /// Pattern settings shared by every document.
    pub pattern: PatternSettings,
}

/// The on-disk shape, before profile resolution.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    printer: Vec<toml::Table>,
    filament: Vec<toml::Table>,
    pattern: PatternSettings,
}

impl Config {
    /// Load and resolve a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parse and resolve configuration text.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text)?;
        if raw.printer.is_empty() {
            bail!("no [[printer]] entries");
        }
        if raw.filament.is_empty() {
            bail!("no [[filament]] entries");
        }
        let printers = raw
            .printer
            .into_iter()
            .map(resolve_printer)
            .collect::<Result<_>>()?;
        let filaments = raw
            .filament
            .into_iter()
            .map(resolve_filament)
            .collect::<Result<_>>()?;
        Ok(Self {
            printers,
            filaments,
            pattern: raw.pattern,
        })
    }
}

fn resolve_printer(mut entry: toml::Table) -> Result<Printer> {
    match entry.remove("profile") {
        Some(toml::Value::String(name)) => {
            let base = Printer::builtin(&name)
                .with_context(|| format!("unknown printer profile '{name}'"))?;
            merge(base, entry)
        }
        Some(_) => bail!("printer profile must be a string"),
        None => Ok(toml::Value::Table(entry).try_into()?),
    }
}

fn resolve_filament(mut entry: toml::Table) -> Result<Filament> {
    match entry.remove("profile") {
        Some(toml::Value::String(name)) => {
            let base = Filament::builtin(&name)
                .with_context(|| format!("unknown filament profile '{name}'"))?;
            merge(base, entry)
        }
        Some(_) => bail!("filament profile must be a string"),
        None => Ok(toml::Value::Table(entry).try_into()?),
    }
}

/// Apply entry keys on top of a serialized profile. Whole values replace;
/// there is no deep merge, so overriding `bed` means giving all of it.
fn merge<T>(base: T, overrides: toml::Table) -> Result<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let toml::Value::Table(mut table) = toml::Value::try_from(base)? else {
        bail!("profile did not serialize to a table");
    };
    for (key, value) in overrides {
        table.insert(key, value);
    }
    Ok(toml::Value::Table(table).try_into()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use patest::{BedShape, GcodeFlavor, PatternKind};

    #[test]
    fn test_starter_config_parses() {
        let config = Config::parse(STARTER).unwrap();
        assert_eq!(config.printers.len(), 1);
        assert_eq!(config.printers[0].name, "Creality Ender 3");
        assert_eq!(config.filaments[0].name, "PLA");
        assert_relative_eq!(config.filaments[0].pa_end, 0.08);
        assert_relative_eq!(config.filaments[0].pa_step, 0.005);
    }

    #[test]
    fn test_starter_config_generates() {
        let config = Config::parse(STARTER).unwrap();
        for printer in &config.printers {
            for filament in &config.filaments {
                patest::GcodeGenerator::new(printer, filament)
                    .with_settings(config.pattern)
                    .generate()
                    .unwrap_or_else(|e| panic!("{} / {}: {e}", printer.name, filament.name));
            }
        }
    }

    #[test]
    fn test_profile_with_overrides() {
        let config = Config::parse(
            r#"
[[printer]]
profile = "voron 2.4 (350mm)"
margin = 20.0

[[filament]]
profile = "petg"
"#,
        )
        .unwrap();
        let printer = &config.printers[0];
        assert_eq!(printer.name, "Voron 2.4 (350mm)");
        assert_relative_eq!(printer.margin, 20.0);
        // Untouched fields keep the profile's values.
        assert_relative_eq!(printer.fast_speed, 120.0);
        assert_eq!(config.filaments[0].hotend_temp, 240);
    }

    #[test]
    fn test_inline_printer_uses_defaults() {
        let config = Config::parse(
            r#"
[[printer]]
name = "custom"
flavor = "klipper"
bed = { type = "rectangular", x = 300.0, y = 300.0 }

[[filament]]
profile = "pla"
"#,
        )
        .unwrap();
        let printer = &config.printers[0];
        assert_eq!(printer.name, "custom");
        assert_eq!(printer.flavor, GcodeFlavor::Klipper);
        assert_relative_eq!(printer.nozzle_diameter, 0.4);
    }

    #[test]
    fn test_round_bed_entry() {
        let config = Config::parse(
            r#"
[[printer]]
name = "delta"
bed = { type = "round", diameter = 260.0 }
park_position = [0.0, 110.0]

[[filament]]
profile = "pla"
"#,
        )
        .unwrap();
        assert_eq!(
            config.printers[0].bed,
            BedShape::Round { diameter: 260.0 }
        );
    }

    #[test]
    fn test_pattern_table() {
        let config = Config::parse(
            r#"
[[printer]]
profile = "generic"

[[filament]]
profile = "pla"

[pattern]
kind = "zig_zag"
line_length = 60.0
"#,
        )
        .unwrap();
        assert_eq!(config.pattern.kind, PatternKind::ZigZag);
        assert_relative_eq!(config.pattern.line_length, 60.0);
        // Unset pattern keys keep their defaults.
        assert_relative_eq!(config.pattern.spacing, 5.0);
    }

    #[test]
    fn test_unknown_profile_is_error() {
        let err = Config::parse(
            r#"
[[printer]]
profile = "not-a-printer"

[[filament]]
profile = "pla"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown printer profile"));
    }

    #[test]
    fn test_missing_sections_are_errors() {
        assert!(Config::parse("").is_err());
        assert!(Config::parse("[[printer]]\nprofile = \"generic\"\n").is_err());
    }
}
