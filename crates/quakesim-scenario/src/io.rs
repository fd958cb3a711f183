//! Run directory layout plus the CSV trace and JSON summary writers

use anyhow::{bail, Context, Result};
use chrono::Utc;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";

/// One tick of a scenario run.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRow {
    pub tick: usize,
    pub time: f64,
    pub phase: &'static str,
    /// `None` outside the running phase
    pub envelope: Option<f64>,
    pub published: Option<f64>,
    pub rig_offset: f64,
    pub lights_active: usize,
    pub objects_active: usize,
    pub rumble_gain: Option<f64>,
    pub stress_gain: Option<f64>,
    pub ambience_gain: Option<f64>,
    pub aperture: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub schema_version: String,
    pub created_utc: String,
    pub seed: u64,
    pub tick_rate: f64,
    pub duration: f64,
    pub tier: String,
    pub activations: u64,
    pub ticks: usize,
    pub running_ticks: usize,
    pub fading_ticks: usize,
    pub peak_published: f64,
    pub final_published: Option<f64>,
    pub one_shots: usize,
    pub haptic_pulses: usize,
    /// Distance of the rig origin from where it started
    pub rig_residual: f64,
    pub lights_restored: bool,
    pub objects_restored: bool,
}

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub run_dir: PathBuf,
    pub trace_csv: PathBuf,
    pub summary_json: PathBuf,
}

fn fmt_f64(v: f64) -> String {
    format!("{v:.10}")
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) => fmt_f64(x),
        None => "NA".to_string(),
    }
}

pub fn ensure_outdir(outdir: &Path) -> Result<()> {
    fs::create_dir_all(outdir)
        .with_context(|| format!("failed to create output directory: {}", outdir.display()))
}

/// Creates a fresh `<base>/<UTC timestamp>` directory, suffixed when taken.
pub fn create_run_dir(base_outdir: &Path) -> Result<PathBuf> {
    ensure_outdir(base_outdir)?;

    let stamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
    let mut candidate = base_outdir.join(&stamp);
    let mut suffix = 1usize;
    while candidate.exists() {
        if suffix > 999 {
            bail!(
                "failed to allocate unique run output directory under {}",
                base_outdir.display()
            );
        }
        candidate = base_outdir.join(format!("{stamp}_{suffix:03}"));
        suffix += 1;
    }

    ensure_outdir(&candidate)?;
    Ok(candidate)
}

pub fn write_trace_csv(path: &Path, rows: &[TraceRow]) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to open trace.csv for writing: {}", path.display()))?;

    wtr.write_record([
        "tick",
        "time",
        "phase",
        "envelope",
        "published",
        "rig_offset",
        "lights_active",
        "objects_active",
        "rumble_gain",
        "stress_gain",
        "ambience_gain",
        "aperture",
    ])?;

    for row in rows {
        wtr.write_record([
            row.tick.to_string(),
            fmt_f64(row.time),
            row.phase.to_string(),
            fmt_opt(row.envelope),
            fmt_opt(row.published),
            fmt_f64(row.rig_offset),
            row.lights_active.to_string(),
            row.objects_active.to_string(),
            fmt_opt(row.rumble_gain),
            fmt_opt(row.stress_gain),
            fmt_opt(row.ambience_gain),
            fmt_opt(row.aperture),
        ])?;
    }

    wtr.flush()
        .with_context(|| format!("failed to flush trace.csv: {}", path.display()))?;
    Ok(())
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("failed to serialize summary")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write summary.json: {}", path.display()))
}
