//! Headless scenario runner for quakesim
//!
//! Builds a scene from a [`ScenarioConfig`], ticks it at a fixed rate until the
//! disturbance and its fade tails have finished, and records one
//! [`TraceRow`] per tick.

pub mod config;
pub mod io;

use anyhow::{bail, Result};
use chrono::Utc;
use nalgebra::Vector3;
use quakesim::driver::DriverPhase;
use quakesim::sinks::{RecordingAudio, RecordingHaptics, RecordingVignette};
use quakesim::subscribers::{EffectState, Light, RigidBody};
use quakesim::transform::euler_degrees;
use quakesim::{
    AudioChannel, DisturbanceDriver, LightFlicker, ObjectShaker, RigTransforms, Scene,
    SignalSubscriber, SubscriberId, Transform,
};
use std::path::Path;
use tracing::info;

pub use config::ScenarioConfig;
pub use io::{OutputPaths, RunSummary, TraceRow, OUTPUT_SCHEMA_VERSION};

/// Extra time allowed past the configured activations for fade tails [s]
const SETTLE_MARGIN_S: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct Simulation {
    pub rows: Vec<TraceRow>,
    pub summary: RunSummary,
}

struct Recorders {
    audio: Option<RecordingAudio>,
    haptics: Option<RecordingHaptics>,
}

fn phase_label(phase: DriverPhase) -> &'static str {
    match phase {
        DriverPhase::Inactive => "inactive",
        DriverPhase::Running => "running",
        DriverPhase::FadingOut => "fading_out",
    }
}

fn build_scene(cfg: &ScenarioConfig, seed: u64) -> Result<(Scene, Recorders)> {
    let mut rig = RigTransforms::new(Transform::identity());
    if cfg.collaborators.controllers {
        rig = rig.with_controllers(
            Transform::from_position(Vector3::new(-0.2, 1.2, 0.3)),
            Transform::from_position(Vector3::new(0.2, 1.2, 0.3)),
        );
    }

    let mut driver = DisturbanceDriver::new(cfg.disturbance.clone()).with_rig(rig);
    let mut recorders = Recorders {
        audio: None,
        haptics: None,
    };
    if cfg.collaborators.audio {
        let audio = RecordingAudio::new();
        driver = driver.with_audio(Box::new(audio.clone()));
        recorders.audio = Some(audio);
    }
    if cfg.collaborators.haptics {
        let haptics = RecordingHaptics::new();
        driver = driver.with_haptics(Box::new(haptics.clone()));
        recorders.haptics = Some(haptics);
    }
    if cfg.collaborators.vignette {
        driver = driver.with_vignette(Box::new(RecordingVignette::new()));
    }

    let mut scene = Scene::with_seed(driver, seed);
    for spec in &cfg.lights {
        let light = LightFlicker::new(Light::new(spec.intensity), spec.flicker)?;
        let id = scene.attach(light);
        scene.set_enabled(id, spec.enabled);
    }
    for spec in &cfg.objects {
        let [x, y, z] = spec.position;
        let pose = Transform::new(Vector3::new(x, y, z), euler_degrees(0.0, spec.yaw_deg, 0.0));
        let object = if spec.physical {
            ObjectShaker::physical(RigidBody::new(pose), spec.shake)?
        } else {
            ObjectShaker::kinematic(pose, spec.shake)?
        };
        scene.attach(object);
    }
    Ok((scene, recorders))
}

fn count_active(scene: &Scene, ids: &[SubscriberId]) -> usize {
    ids.iter()
        .filter_map(|id| scene.subscriber(*id))
        .filter(|subscriber| subscriber.state() == EffectState::Active)
        .count()
}

fn capture(
    scene: &Scene,
    tick: usize,
    lights: &[SubscriberId],
    objects: &[SubscriberId],
) -> TraceRow {
    let driver = scene.driver();
    let run = driver.run();
    TraceRow {
        tick,
        time: scene.time(),
        phase: phase_label(driver.phase()),
        envelope: run.map(|r| r.envelope),
        published: scene.bus().latest(),
        rig_offset: run.map_or(0.0, |r| r.rig_offset.norm()),
        lights_active: count_active(scene, lights),
        objects_active: count_active(scene, objects),
        rumble_gain: driver.loop_gain(AudioChannel::Rumble),
        stress_gain: driver.loop_gain(AudioChannel::StressLoop),
        ambience_gain: driver.loop_gain(AudioChannel::Ambience),
        aperture: driver.aperture(),
    }
}

/// Runs the scenario in memory.
pub fn simulate(cfg: &ScenarioConfig) -> Result<Simulation> {
    cfg.validate()?;
    let seed = cfg.seed.unwrap_or_else(rand::random);
    let (mut scene, recorders) = build_scene(cfg, seed)?;
    let dt = cfg.dt();

    let (lights, objects): (Vec<_>, Vec<_>) = scene
        .subscriber_ids()
        .partition(|id| scene.subscriber(*id).and_then(|s| s.as_light()).is_some());
    let rig_start = scene
        .driver()
        .rig()
        .map(|rig| rig.origin.position)
        .unwrap_or_else(Vector3::zeros);

    let horizon = cfg.restart_at.unwrap_or(0.0) + cfg.disturbance.duration + SETTLE_MARGIN_S;
    let max_ticks = (horizon * cfg.tick_rate).ceil() as usize;

    scene.start()?;
    let mut restart_pending = cfg.restart_at;
    let mut rows = Vec::new();
    let mut tick = 0usize;
    while scene.phase() != DriverPhase::Inactive || restart_pending.is_some() {
        if tick >= max_ticks {
            bail!("scenario did not settle within {max_ticks} ticks");
        }
        if let Some(at) = restart_pending {
            if scene.time() >= at {
                scene.start()?;
                restart_pending = None;
            }
        }
        scene.tick(dt);
        rows.push(capture(&scene, tick, &lights, &objects));
        tick += 1;
    }

    let rig_end = scene
        .driver()
        .rig()
        .map(|rig| rig.origin.position)
        .unwrap_or_else(Vector3::zeros);

    let lights_restored = lights.iter().all(|id| {
        scene
            .subscriber(*id)
            .and_then(|s| s.as_light())
            .map_or(true, |light| light.light() == light.baseline())
    });
    let objects_restored = objects.iter().all(|id| {
        scene
            .subscriber(*id)
            .and_then(|s| s.as_object())
            .map_or(true, |object| {
                object.is_physical() || object.transform() == object.baseline()
            })
    });

    let summary = RunSummary {
        schema_version: OUTPUT_SCHEMA_VERSION.to_string(),
        created_utc: Utc::now().to_rfc3339(),
        seed,
        tick_rate: cfg.tick_rate,
        duration: cfg.disturbance.duration,
        tier: cfg.disturbance.tier.label().to_string(),
        activations: scene.driver().activations(),
        ticks: rows.len(),
        running_ticks: rows.iter().filter(|r| r.phase == "running").count(),
        fading_ticks: rows.iter().filter(|r| r.phase == "fading_out").count(),
        peak_published: rows
            .iter()
            .filter_map(|r| r.published)
            .fold(0.0, f64::max),
        final_published: scene.bus().latest(),
        one_shots: recorders.audio.map_or(0, |a| a.one_shots().len()),
        haptic_pulses: recorders.haptics.map_or(0, |h| h.pulses().len()),
        rig_residual: (rig_end - rig_start).norm(),
        lights_restored,
        objects_restored,
    };

    info!(
        seed,
        ticks = summary.ticks,
        activations = summary.activations,
        peak = summary.peak_published,
        "scenario complete"
    );
    Ok(Simulation { rows, summary })
}

/// Runs the scenario and writes `trace.csv` and `summary.json` into a fresh
/// timestamped directory under `base_outdir`.
pub fn run_scenario(
    cfg: &ScenarioConfig,
    base_outdir: &Path,
) -> Result<(RunSummary, OutputPaths)> {
    let sim = simulate(cfg)?;
    let run_dir = io::create_run_dir(base_outdir)?;
    let paths = OutputPaths {
        trace_csv: run_dir.join("trace.csv"),
        summary_json: run_dir.join("summary.json"),
        run_dir,
    };
    io::write_trace_csv(&paths.trace_csv, &sim.rows)?;
    io::write_summary_json(&paths.summary_json, &sim.summary)?;
    info!(run_dir = %paths.run_dir.display(), "outputs written");
    Ok((sim.summary, paths))
}
