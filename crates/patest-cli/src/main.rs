//! patest CLI - pressure advance calibration generator
//!
//! Generates one G-code test file per printer/filament pair described in
//! a TOML configuration.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use patest::{BedShape, Filament, GcodeGenerator, Printer};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "patest")]
#[command(about = "Pressure advance calibration G-code generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate G-code for every printer/filament pair in the config
    Generate {
        /// Configuration file
        #[arg(short, long, default_value = "patest.toml")]
        config: PathBuf,
        /// Output directory; one subdirectory is created per printer
        #[arg(short, long, default_value = "gcode")]
        output: PathBuf,
    },
    /// Write a commented starter configuration file
    Init {
        /// Where to write it
        #[arg(default_value = "patest.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// List the built-in printer and filament profiles
    Profiles,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Generate { config, output }) => {
            generate_all(&config, &output)?;
        }
        Some(Commands::Init { path, force }) => {
            init_config(&path, force)?;
        }
        Some(Commands::Profiles) => {
            list_profiles();
        }
        None => {
            // Default to generating with the default paths
            generate_all(Path::new("patest.toml"), Path::new("gcode"))?;
        }
    }

    Ok(())
}

fn generate_all(config_path: &Path, output: &Path) -> Result<()> {
    let config = Config::load(config_path)?;

    let mut files = 0usize;
    let mut grams = 0.0;
    for printer in &config.printers {
        let dir = output.join(sanitize(&printer.name));
        fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
        for filament in &config.filaments {
            let doc = GcodeGenerator::new(printer, filament)
                .with_settings(config.pattern)
                .generate()
                .with_context(|| {
                    format!("generation failed for {} / {}", printer.name, filament.name)
                })?;
            let path = dir.join(format!("{}.gcode", sanitize(&filament.name)));
            fs::write(&path, doc.content())
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!(
                "{}: {} patches, {:.2} g, about {}",
                path.display(),
                doc.stats.pattern_count,
                doc.stats.filament_grams,
                doc.stats.time_formatted()
            );
            files += 1;
            grams += doc.stats.filament_grams;
        }
    }
    println!("{} file(s), {:.2} g of filament total", files, grams);
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    fs::write(path, config::STARTER)
        .with_context(|| format!("cannot write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn list_profiles() {
    println!("Printers:");
    for printer in Printer::all_profiles() {
        let note = if printer.flavor.supports_pressure_advance() {
            ""
        } else {
            " - no pressure advance command"
        };
        println!(
            "  {} ({:?}, {}){}",
            printer.name,
            printer.flavor,
            bed_description(&printer.bed),
            note
        );
    }
    println!();
    println!("Filaments:");
    for filament in Filament::all_profiles() {
        println!(
            "  {} ({}C/{}C, PA {} to {} step {})",
            filament.name,
            filament.hotend_temp,
            filament.bed_temp,
            filament.pa_start,
            filament.pa_end,
            filament.pa_step
        );
    }
}

fn bed_description(bed: &BedShape) -> String {
    match *bed {
        BedShape::Rectangular { x, y } => format!("{x:.0}x{y:.0}mm"),
        BedShape::Round { diameter } => format!("{diameter:.0}mm round"),
    }
}

/// File-system friendly version of a profile name.
fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_') {
            out.push(c);
            prev_dash = false;
        } else if !prev_dash && !out.is_empty() {
            out.push('-');
            prev_dash = true;
        }
    }
    let out = out.trim_matches(['.', '-']);
    if out.is_empty() {
        "unnamed".to_string()
    } else {
        out.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_names() {
        assert_eq!(sanitize("Creality Ender 3"), "Creality-Ender-3");
        assert_eq!(sanitize("Voron 2.4 (350mm)"), "Voron-2.4-350mm");
        assert_eq!(sanitize("PLA"), "PLA");
        assert_eq!(sanitize("../../etc"), "etc");
        assert_eq!(sanitize(""), "unnamed");
    }
}
