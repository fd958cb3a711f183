use quakesim::IntensityTier;
use quakesim_scenario::config::{Collaborators, ObjectSpec};
use quakesim_scenario::{run_scenario, simulate, ScenarioConfig};

fn short(seed: u64) -> ScenarioConfig {
    let mut cfg = ScenarioConfig {
        tick_rate: 16.0,
        seed: Some(seed),
        ..ScenarioConfig::default()
    };
    cfg.disturbance.duration = 4.0;
    cfg.objects.push(ObjectSpec {
        physical: true,
        ..ObjectSpec::default()
    });
    cfg
}

#[test]
fn run_settles_and_restores() {
    let sim = simulate(&short(1)).unwrap();
    let summary = &sim.summary;

    assert_eq!(summary.activations, 1);
    assert_eq!(summary.running_ticks, 64);
    assert!(summary.fading_ticks > 0);
    assert_eq!(summary.final_published, Some(0.0));
    assert!((summary.peak_published - 0.5).abs() < 1e-12);
    assert_eq!(summary.rig_residual, 0.0);
    assert!(summary.lights_restored);
    assert!(summary.objects_restored);

    let last = sim.rows.last().unwrap();
    assert_eq!(last.phase, "inactive");
    assert_eq!(last.lights_active, 0);
    assert_eq!(last.objects_active, 0);
    assert_eq!(last.aperture, Some(1.0));
    assert_eq!(last.rumble_gain, Some(0.0));
}

#[test]
fn same_seed_same_trace() {
    let a = simulate(&short(42)).unwrap();
    let b = simulate(&short(42)).unwrap();
    assert_eq!(a.rows, b.rows);
}

#[test]
fn restart_supersedes_the_first_run() {
    let mut cfg = short(3);
    cfg.restart_at = Some(1.0);
    let sim = simulate(&cfg).unwrap();
    assert_eq!(sim.summary.activations, 2);
    assert_eq!(sim.summary.running_ticks, 80);
    assert_eq!(sim.summary.rig_residual, 0.0);
}

#[test]
fn bare_scene_runs_without_collaborators() {
    let mut cfg = short(4);
    cfg.disturbance.tier = IntensityTier::High;
    cfg.collaborators = Collaborators {
        audio: false,
        haptics: false,
        vignette: false,
        controllers: false,
    };
    let sim = simulate(&cfg).unwrap();
    assert_eq!(sim.summary.fading_ticks, 0);
    assert_eq!(sim.summary.one_shots, 0);
    assert_eq!(sim.summary.haptic_pulses, 0);
    assert!(sim.rows.iter().all(|r| r.rumble_gain.is_none()));
}

#[test]
fn writes_trace_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let (summary, paths) = run_scenario(&short(5), dir.path()).unwrap();

    let trace = std::fs::read_to_string(&paths.trace_csv).unwrap();
    let mut lines = trace.lines();
    assert!(lines.next().unwrap().starts_with("tick,time,phase,envelope"));
    assert_eq!(lines.count(), summary.ticks);

    let raw = std::fs::read_to_string(&paths.summary_json).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["seed"], 5);
    assert_eq!(json["schema_version"], "1.0.0");
}

#[test]
fn default_config_file_parses() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/default.toml");
    let cfg = ScenarioConfig::from_toml_file(&path).unwrap();
    assert_eq!(cfg.lights.len(), 2);
    assert!(cfg.objects[1].physical);
}
