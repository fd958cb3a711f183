//! Disturbance driver: the activation lifecycle
//!
//! One activation moves through `Inactive -> Running -> FadingOut -> Inactive`.
//! While running, the driver evaluates the envelope once per tick, publishes
//! the scaled intensity on the [`SignalBus`], jitters the rig, follows the
//! envelope with the audio loops, rolls for one-shot clips and pulses the hand
//! controllers. When the duration elapses it publishes a terminal zero and
//! hands over to two independent fade tails (vignette and audio).
//!
//! The running loop and both tails are [`TaskSlot`] tasks owned by the driver,
//! so starting a new activation cancels all three synchronously.

use std::collections::BTreeMap;

use nalgebra::Vector3;
use rand::{Rng, RngCore};
use tracing::{debug, info};

use crate::bus::SignalBus;
use crate::config::DisturbanceConfig;
use crate::envelope::QuakeEnvelope;
use crate::noise::random_offset;
use crate::sinks::{AudioChannel, AudioSink, ClipHandle, Hand, HapticSink, VignetteSink};
use crate::task::{TaskSlot, TaskStatus, TickTask};
use crate::transform::Transform;
use crate::QuakeError;

/// Gain applied to the strength before publishing; subscriber multipliers are
/// tuned against it.
pub const PUBLISH_GAIN: f64 = 10.0;
/// Fraction of the rig offset applied to each hand controller.
pub const CONTROLLER_SHAKE_SCALE: f64 = 0.75;
/// Length of each haptic impulse [s]
pub const HAPTIC_PULSE_S: f64 = 0.1;
/// Vignette tail length [s]
pub const VIGNETTE_FADE_S: f64 = 1.0;
/// Audio tail length [s]
pub const AUDIO_FADE_S: f64 = 2.0;
/// One-shot clips only play above this strength.
pub const ONE_SHOT_MIN_STRENGTH: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverPhase {
    Inactive,
    Running,
    FadingOut,
}

/// Camera rig moved by the driver. The origin is required; the controllers
/// are optional children that receive a reduced offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RigTransforms {
    pub origin: Transform,
    pub left_controller: Option<Transform>,
    pub right_controller: Option<Transform>,
}

impl RigTransforms {
    pub fn new(origin: Transform) -> Self {
        Self {
            origin,
            left_controller: None,
            right_controller: None,
        }
    }

    pub fn with_controllers(mut self, left: Transform, right: Transform) -> Self {
        self.left_controller = Some(left);
        self.right_controller = Some(right);
        self
    }
}

/// Snapshot of the running activation as of its last tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisturbanceRun {
    pub elapsed: f64,
    pub envelope: f64,
    /// `base_intensity * tier * envelope`
    pub strength: f64,
    /// Value published on the bus this tick
    pub published: f64,
    /// Offset currently applied to the rig origin
    pub rig_offset: Vector3<f64>,
}

impl DisturbanceRun {
    fn idle() -> Self {
        Self {
            elapsed: 0.0,
            envelope: 1.0,
            strength: 0.0,
            published: 0.0,
            rig_offset: Vector3::zeros(),
        }
    }
}

/// An offset written to one position, remembered so it can be taken back.
#[derive(Debug, Clone, Copy)]
struct Jitter {
    before: Vector3<f64>,
    after: Vector3<f64>,
}

impl Jitter {
    fn apply(target: &mut Vector3<f64>, offset: Vector3<f64>) -> Self {
        let before = *target;
        *target += offset;
        Self {
            before,
            after: *target,
        }
    }

    /// Removes the offset while keeping any motion made by others since it was
    /// applied. Without such motion the original position comes back bit-exact.
    fn revert(self, target: &mut Vector3<f64>) {
        *target = self.before + (*target - self.after);
    }

    fn offset(&self) -> Vector3<f64> {
        self.after - self.before
    }
}

#[derive(Debug, Clone, Copy)]
struct RigJitter {
    origin: Jitter,
    left: Option<Jitter>,
    right: Option<Jitter>,
}

/// Collaborators the driver's tasks write to, plus mirrors of the values last
/// written so fade tails know where to start.
#[derive(Default)]
struct Outputs {
    rig: Option<RigTransforms>,
    audio: Option<Box<dyn AudioSink>>,
    haptics: Option<Box<dyn HapticSink>>,
    vignette: Option<Box<dyn VignetteSink>>,
    gains: BTreeMap<AudioChannel, f64>,
    aperture: Option<f64>,
}

impl Outputs {
    fn begin(&mut self, config: &DisturbanceConfig) {
        self.gains.clear();
        if let Some(audio) = self.audio.as_mut() {
            for channel in AudioChannel::LOOPS {
                if audio.supports(channel) {
                    audio.set_gain(channel, 0.0);
                    audio.play(channel);
                    self.gains.insert(channel, 0.0);
                }
            }
        }

        if let Some(vignette) = self.vignette.as_mut() {
            vignette.set_enabled(true);
            vignette.set_aperture_size(config.vignette_size_during_quake);
            self.aperture = Some(config.vignette_size_during_quake);
        }
    }

    fn follow_envelope(&mut self, envelope: f64) {
        let Some(audio) = self.audio.as_mut() else {
            return;
        };
        for (channel, gain) in self.gains.iter_mut() {
            *gain = envelope * loop_gain_scale(*channel);
            audio.set_gain(*channel, *gain);
        }
    }

    fn roll_one_shots(
        &mut self,
        config: &DisturbanceConfig,
        strength: f64,
        rng: &mut dyn RngCore,
    ) {
        let Some(audio) = self.audio.as_mut() else {
            return;
        };
        if !audio.supports(AudioChannel::OneShot) || strength <= ONE_SHOT_MIN_STRENGTH {
            return;
        }

        let tier = config.tier.multiplier();

        if !config.debris_clips.is_empty() && rng.gen::<f64>() < 0.02 * tier {
            let clip = pick_clip(&config.debris_clips, rng);
            audio.play_one_shot(clip, 0.5 + 0.5 * tier);
        }

        if !config.stress_clips.is_empty() && rng.gen::<f64>() < 0.01 * tier {
            let clip = pick_clip(&config.stress_clips, rng);
            audio.play_one_shot(clip, 0.7 + 0.3 * tier);
        }
    }

    fn jitter_rig(&mut self, offset: Vector3<f64>) -> Option<RigJitter> {
        let rig = self.rig.as_mut()?;
        let hand_offset = offset * CONTROLLER_SHAKE_SCALE;
        Some(RigJitter {
            origin: Jitter::apply(&mut rig.origin.position, offset),
            left: rig
                .left_controller
                .as_mut()
                .map(|t| Jitter::apply(&mut t.position, hand_offset)),
            right: rig
                .right_controller
                .as_mut()
                .map(|t| Jitter::apply(&mut t.position, hand_offset)),
        })
    }

    fn settle_rig(&mut self, jitter: RigJitter) {
        let Some(rig) = self.rig.as_mut() else {
            return;
        };
        jitter.origin.revert(&mut rig.origin.position);
        if let (Some(j), Some(t)) = (jitter.left, rig.left_controller.as_mut()) {
            j.revert(&mut t.position);
        }
        if let (Some(j), Some(t)) = (jitter.right, rig.right_controller.as_mut()) {
            j.revert(&mut t.position);
        }
    }

    fn pulse_hands(&mut self, strength: f64) {
        let Some(haptics) = self.haptics.as_mut() else {
            return;
        };
        let amplitude = strength.clamp(0.0, 1.0);
        for hand in Hand::BOTH {
            if haptics.device_available(hand) {
                haptics.pulse(hand, amplitude, HAPTIC_PULSE_S);
            }
        }
    }

    fn set_aperture(&mut self, size: f64) {
        if let Some(vignette) = self.vignette.as_mut() {
            vignette.set_aperture_size(size);
            self.aperture = Some(size);
        }
    }
}

fn loop_gain_scale(channel: AudioChannel) -> f64 {
    match channel {
        AudioChannel::Rumble => 1.0,
        AudioChannel::StressLoop => 0.8,
        AudioChannel::Ambience => 0.6,
        AudioChannel::OneShot => 0.0,
    }
}

fn pick_clip(clips: &[ClipHandle], rng: &mut dyn RngCore) -> ClipHandle {
    clips[rng.gen_range(0..clips.len())]
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t.clamp(0.0, 1.0)
}

struct ShakeContext<'a> {
    out: &'a mut Outputs,
    bus: &'a mut SignalBus,
    rng: &'a mut dyn RngCore,
}

/// The running loop of one activation.
struct ShakeTask {
    config: DisturbanceConfig,
    envelope: QuakeEnvelope,
    elapsed: f64,
    /// The first poll runs at elapsed 0.
    polled: bool,
    jitter: Option<RigJitter>,
    last: DisturbanceRun,
}

impl ShakeTask {
    fn new(config: DisturbanceConfig, envelope: QuakeEnvelope) -> Self {
        Self {
            config,
            envelope,
            elapsed: 0.0,
            polled: false,
            jitter: None,
            last: DisturbanceRun::idle(),
        }
    }

    /// Takes back the rig offset of a loop that is being abandoned mid-tick.
    fn unwind(self, out: &mut Outputs) {
        if let Some(jitter) = self.jitter {
            out.settle_rig(jitter);
        }
    }
}

impl<'a> TickTask<ShakeContext<'a>> for ShakeTask {
    fn poll(&mut self, ctx: &mut ShakeContext<'a>, dt: f64) -> TaskStatus {
        // Resume: undo last tick's offset before anything else moves.
        if let Some(jitter) = self.jitter.take() {
            ctx.out.settle_rig(jitter);
        }
        if std::mem::replace(&mut self.polled, true) {
            self.elapsed += dt;
        }

        if self.elapsed >= self.envelope.duration() {
            ctx.bus.publish(0.0);
            self.last = DisturbanceRun {
                elapsed: self.elapsed,
                envelope: 0.0,
                ..DisturbanceRun::idle()
            };
            return TaskStatus::Finished;
        }

        let envelope = self.envelope.at(self.elapsed);
        let strength = self.config.target_strength() * envelope;

        ctx.out.follow_envelope(envelope);
        ctx.out.roll_one_shots(&self.config, strength, &mut *ctx.rng);

        let published = strength * PUBLISH_GAIN;
        ctx.bus.publish(published);

        let offset = random_offset(&mut *ctx.rng, strength);
        self.jitter = ctx.out.jitter_rig(offset);

        ctx.out.pulse_hands(strength);

        self.last = DisturbanceRun {
            elapsed: self.elapsed,
            envelope,
            strength,
            published,
            rig_offset: self
                .jitter
                .map(|j| j.origin.offset())
                .unwrap_or_else(Vector3::zeros),
        };
        TaskStatus::Pending
    }
}

/// Opens the vignette back up, then turns it off.
struct VignetteFade {
    from: f64,
    elapsed: f64,
}

impl TickTask<Outputs> for VignetteFade {
    fn poll(&mut self, out: &mut Outputs, dt: f64) -> TaskStatus {
        self.elapsed += dt;
        if self.elapsed >= VIGNETTE_FADE_S {
            out.set_aperture(1.0);
            if let Some(vignette) = out.vignette.as_mut() {
                vignette.set_enabled(false);
            }
            return TaskStatus::Finished;
        }
        out.set_aperture(lerp(self.from, 1.0, self.elapsed / VIGNETTE_FADE_S));
        TaskStatus::Pending
    }
}

/// Ramps every looping channel to silence, then stops them.
struct AudioFade {
    from: Vec<(AudioChannel, f64)>,
    elapsed: f64,
}

impl TickTask<Outputs> for AudioFade {
    fn poll(&mut self, out: &mut Outputs, dt: f64) -> TaskStatus {
        self.elapsed += dt;
        let Some(audio) = out.audio.as_mut() else {
            return TaskStatus::Finished;
        };

        if self.elapsed >= AUDIO_FADE_S {
            for (channel, _) in &self.from {
                audio.set_gain(*channel, 0.0);
                audio.stop(*channel);
                out.gains.insert(*channel, 0.0);
            }
            return TaskStatus::Finished;
        }

        let t = self.elapsed / AUDIO_FADE_S;
        for (channel, start) in &self.from {
            let gain = lerp(*start, 0.0, t);
            audio.set_gain(*channel, gain);
            out.gains.insert(*channel, gain);
        }
        TaskStatus::Pending
    }
}

/// Owns the activation lifecycle and the collaborators it drives.
pub struct DisturbanceDriver {
    config: DisturbanceConfig,
    out: Outputs,
    shake: TaskSlot<ShakeTask>,
    vignette_fade: TaskSlot<VignetteFade>,
    audio_fade: TaskSlot<AudioFade>,
    activations: u64,
}

impl DisturbanceDriver {
    pub fn new(config: DisturbanceConfig) -> Self {
        Self {
            config,
            out: Outputs::default(),
            shake: TaskSlot::new(),
            vignette_fade: TaskSlot::new(),
            audio_fade: TaskSlot::new(),
            activations: 0,
        }
    }

    pub fn with_rig(mut self, rig: RigTransforms) -> Self {
        self.out.rig = Some(rig);
        self
    }

    pub fn with_audio(mut self, audio: Box<dyn AudioSink>) -> Self {
        self.out.audio = Some(audio);
        self
    }

    pub fn with_haptics(mut self, haptics: Box<dyn HapticSink>) -> Self {
        self.out.haptics = Some(haptics);
        self
    }

    pub fn with_vignette(mut self, vignette: Box<dyn VignetteSink>) -> Self {
        self.out.vignette = Some(vignette);
        self
    }

    pub fn config(&self) -> &DisturbanceConfig {
        &self.config
    }

    /// Replaces the configuration used by the next [`start`](Self::start).
    pub fn set_config(&mut self, config: DisturbanceConfig) {
        self.config = config;
    }

    pub fn rig(&self) -> Option<&RigTransforms> {
        self.out.rig.as_ref()
    }

    /// Swaps the rig. The outgoing rig gets back the offset of the current
    /// tick and the new one is first moved on the next tick.
    pub fn set_rig(&mut self, rig: Option<RigTransforms>) {
        if let Some(jitter) = self.shake.get_mut().and_then(|task| task.jitter.take()) {
            self.out.settle_rig(jitter);
        }
        self.out.rig = rig;
    }

    pub fn phase(&self) -> DriverPhase {
        if self.shake.is_running() {
            DriverPhase::Running
        } else if self.vignette_fade.is_running() || self.audio_fade.is_running() {
            DriverPhase::FadingOut
        } else {
            DriverPhase::Inactive
        }
    }

    /// State of the running activation, `None` unless Running.
    pub fn run(&self) -> Option<DisturbanceRun> {
        self.shake.get().map(|task| task.last)
    }

    /// Last gain written to a looping channel by the current or latest activation.
    pub fn loop_gain(&self, channel: AudioChannel) -> Option<f64> {
        self.out.gains.get(&channel).copied()
    }

    /// Last aperture written to the vignette.
    pub fn aperture(&self) -> Option<f64> {
        self.out.aperture
    }

    /// Number of activations started successfully.
    pub fn activations(&self) -> u64 {
        self.activations
    }

    /// Begins a new activation, superseding any run or fade still in flight.
    ///
    /// An invalid configuration or a missing rig halts the driver and leaves it
    /// Inactive.
    pub fn start(&mut self) -> Result<(), QuakeError> {
        let prepared = self.prepare();
        let superseded = self.phase();
        self.cancel_all();

        let envelope = prepared?;
        if superseded != DriverPhase::Inactive {
            info!(?superseded, "superseding disturbance in flight");
        }

        self.log_missing_collaborators();
        self.out.begin(&self.config);
        self.shake.spawn(ShakeTask::new(self.config.clone(), envelope));
        self.activations += 1;

        info!(
            duration = self.config.duration,
            tier = self.config.tier.label(),
            base_intensity = self.config.base_intensity,
            activation = self.activations,
            "disturbance started"
        );
        Ok(())
    }

    /// Cancels the running loop and both tails without publishing anything.
    /// The rig keeps no offset.
    pub fn stop(&mut self) {
        if self.phase() != DriverPhase::Inactive {
            info!("disturbance stopped");
        }
        self.cancel_all();
    }

    /// Advances the running loop and any fade tails by one tick.
    pub fn tick(&mut self, dt: f64, bus: &mut SignalBus, rng: &mut dyn RngCore) {
        if self.vignette_fade.poll(&mut self.out, dt) == Some(TaskStatus::Finished) {
            debug!("vignette fade complete");
        }
        if self.audio_fade.poll(&mut self.out, dt) == Some(TaskStatus::Finished) {
            debug!("audio fade complete");
        }

        let mut ctx = ShakeContext {
            out: &mut self.out,
            bus,
            rng,
        };
        if self.shake.poll(&mut ctx, dt) == Some(TaskStatus::Finished) {
            self.begin_fade_out();
        }
    }

    fn prepare(&self) -> Result<QuakeEnvelope, QuakeError> {
        self.config.validate()?;
        let envelope = QuakeEnvelope::new(self.config.duration)?;
        if self.out.rig.is_none() {
            return Err(QuakeError::MissingRig);
        }
        Ok(envelope)
    }

    fn cancel_all(&mut self) {
        if let Some(task) = self.shake.cancel() {
            task.unwind(&mut self.out);
        }
        self.vignette_fade.cancel();
        self.audio_fade.cancel();
    }

    fn begin_fade_out(&mut self) {
        info!("disturbance finished, fading out");

        if self.out.vignette.is_some() {
            let from = self
                .out
                .aperture
                .unwrap_or(self.config.vignette_size_during_quake);
            self.vignette_fade.spawn(VignetteFade { from, elapsed: 0.0 });
        }

        if self.out.audio.is_some() && !self.out.gains.is_empty() {
            let from = self.out.gains.iter().map(|(c, g)| (*c, *g)).collect();
            self.audio_fade.spawn(AudioFade { from, elapsed: 0.0 });
        }
    }

    fn log_missing_collaborators(&self) {
        if self.out.audio.is_none() {
            debug!("no audio sink attached, skipping audio");
        }
        if self.out.haptics.is_none() {
            debug!("no haptic sink attached, skipping haptics");
        }
        if self.out.vignette.is_none() {
            debug!("no vignette sink attached, skipping comfort vignette");
        }
        if self.config.debris_clips.is_empty() {
            debug!("no debris clips configured");
        }
        if self.config.stress_clips.is_empty() {
            debug!("no stress clips configured");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntensityTier;
    use crate::sinks::{AudioEvent, RecordingAudio, RecordingHaptics, RecordingVignette};
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(duration: f64) -> DisturbanceConfig {
        DisturbanceConfig {
            duration,
            tier: IntensityTier::Medium,
            base_intensity: 0.05,
            ..DisturbanceConfig::default()
        }
    }

    fn rig() -> RigTransforms {
        RigTransforms::new(Transform::from_position(Vector3::new(0.3, 1.7, -2.1))).with_controllers(
            Transform::from_position(Vector3::new(-0.2, 1.1, 0.4)),
            Transform::from_position(Vector3::new(0.2, 1.1, 0.4)),
        )
    }

    /// Ticks until the run reaches `until` seconds and returns the value the
    /// bus holds afterwards.
    fn tick_until(
        driver: &mut DisturbanceDriver,
        bus: &mut SignalBus,
        rng: &mut StdRng,
        dt: f64,
        until: f64,
    ) -> Option<f64> {
        while driver.phase() == DriverPhase::Running {
            driver.tick(dt, bus, rng);
            if driver.run().map_or(false, |r| r.elapsed >= until) {
                break;
            }
        }
        bus.latest()
    }

    #[test]
    fn start_without_rig_is_fatal() {
        let mut driver = DisturbanceDriver::new(config(10.0));
        assert_eq!(driver.start(), Err(QuakeError::MissingRig));
        assert_eq!(driver.phase(), DriverPhase::Inactive);
    }

    #[test]
    fn start_with_zero_duration_is_fatal() {
        let mut driver = DisturbanceDriver::new(config(0.0)).with_rig(rig());
        assert!(matches!(driver.start(), Err(QuakeError::InvalidConfig(_))));
        assert_eq!(driver.phase(), DriverPhase::Inactive);
        assert_eq!(driver.activations(), 0);
    }

    #[test]
    fn publishes_documented_intensities() {
        let mut driver = DisturbanceDriver::new(config(10.0)).with_rig(rig());
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(1);
        driver.start().expect("start");

        let at_5 = tick_until(&mut driver, &mut bus, &mut rng, 0.5, 5.0).expect("published");
        assert_abs_diff_eq!(at_5, 0.5, epsilon = 1e-9);

        let at_9 = tick_until(&mut driver, &mut bus, &mut rng, 0.5, 9.0).expect("published");
        assert_abs_diff_eq!(at_9, 0.25, epsilon = 1e-9);

        while driver.phase() == DriverPhase::Running {
            driver.tick(0.5, &mut bus, &mut rng);
        }
        assert_eq!(bus.latest(), Some(0.0));
    }

    #[test]
    fn rig_returns_exactly_after_run() {
        let start_rig = rig();
        let mut driver = DisturbanceDriver::new(config(2.0)).with_rig(start_rig);
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(99);
        driver.start().expect("start");

        let mut moved = false;
        while driver.phase() == DriverPhase::Running {
            driver.tick(1.0 / 72.0, &mut bus, &mut rng);
            if driver.rig() != Some(&start_rig) {
                moved = true;
            }
        }
        assert!(moved, "rig should jitter while running");
        assert_eq!(driver.rig(), Some(&start_rig));
    }

    #[test]
    fn rig_swapped_mid_run_is_left_untouched() {
        let old_rig = rig();
        let new_rig = RigTransforms::new(Transform::from_position(Vector3::new(5.0, 5.0, 5.0)));
        let mut driver = DisturbanceDriver::new(config(2.0)).with_rig(old_rig);
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(21);
        driver.start().expect("start");
        for _ in 0..10 {
            driver.tick(0.05, &mut bus, &mut rng);
        }
        assert_ne!(driver.rig(), Some(&old_rig));

        driver.set_rig(Some(new_rig));
        assert_eq!(driver.rig(), Some(&new_rig));
        driver.tick(0.05, &mut bus, &mut rng);
        assert_ne!(driver.rig(), Some(&new_rig));
        while driver.phase() == DriverPhase::Running {
            driver.tick(0.05, &mut bus, &mut rng);
        }
        assert_eq!(driver.rig(), Some(&new_rig));
    }

    #[test]
    fn run_without_rig_still_finishes() {
        let mut driver = DisturbanceDriver::new(config(1.0)).with_rig(rig());
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(22);
        driver.start().expect("start");
        driver.tick(0.1, &mut bus, &mut rng);
        driver.set_rig(None);
        for _ in 0..20 {
            driver.tick(0.1, &mut bus, &mut rng);
        }
        assert_ne!(driver.phase(), DriverPhase::Running);
        assert_eq!(bus.latest(), Some(0.0));
    }

    #[test]
    fn controllers_get_three_quarter_offset() {
        let start_rig = rig();
        let mut driver = DisturbanceDriver::new(config(2.0)).with_rig(start_rig);
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(4);
        driver.start().expect("start");
        driver.tick(0.02, &mut bus, &mut rng);

        let now = driver.rig().expect("rig");
        let origin_offset = now.origin.position - start_rig.origin.position;
        let left = now.left_controller.expect("left").position
            - start_rig.left_controller.expect("left").position;
        assert_abs_diff_eq!(left, origin_offset * 0.75, epsilon = 1e-12);
        assert!(origin_offset.norm() <= 0.05 + 1e-12);
    }

    #[test]
    fn audio_follows_envelope_and_fades() {
        let audio = RecordingAudio::new();
        let mut driver = DisturbanceDriver::new(config(1.0))
            .with_rig(rig())
            .with_audio(Box::new(audio.clone()));
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(2);
        driver.start().expect("start");

        let events = audio.events();
        assert!(events.contains(&AudioEvent::Play(AudioChannel::Rumble)));
        assert!(events.contains(&AudioEvent::Gain(AudioChannel::Ambience, 0.0)));

        driver.tick(0.1, &mut bus, &mut rng);
        assert_eq!(audio.last_gain(AudioChannel::Rumble), Some(1.0));
        assert_abs_diff_eq!(audio.last_gain(AudioChannel::StressLoop).unwrap(), 0.8);
        assert_abs_diff_eq!(audio.last_gain(AudioChannel::Ambience).unwrap(), 0.6);

        while driver.phase() == DriverPhase::Running {
            driver.tick(0.1, &mut bus, &mut rng);
        }
        assert_eq!(driver.phase(), DriverPhase::FadingOut);
        for _ in 0..25 {
            driver.tick(0.1, &mut bus, &mut rng);
        }
        assert_eq!(driver.phase(), DriverPhase::Inactive);
        for channel in AudioChannel::LOOPS {
            assert!(!audio.is_playing(channel));
            assert_eq!(audio.last_gain(channel), Some(0.0));
        }
    }

    #[test]
    fn missing_loop_channels_are_skipped() {
        let audio = RecordingAudio::without(&[AudioChannel::Ambience, AudioChannel::OneShot]);
        let mut cfg = config(1.0);
        cfg.debris_clips = vec![ClipHandle(1)];
        cfg.tier = IntensityTier::High;
        let mut driver = DisturbanceDriver::new(cfg)
            .with_rig(rig())
            .with_audio(Box::new(audio.clone()));
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(8);
        driver.start().expect("start");
        for _ in 0..200 {
            driver.tick(0.01, &mut bus, &mut rng);
        }
        assert_eq!(audio.last_gain(AudioChannel::Ambience), None);
        assert!(audio.one_shots().is_empty());
    }

    #[test]
    fn one_shot_volumes_follow_tier() {
        let audio = RecordingAudio::new();
        let mut cfg = config(1000.0);
        cfg.tier = IntensityTier::High;
        cfg.debris_clips = vec![ClipHandle(10), ClipHandle(11)];
        cfg.stress_clips = vec![ClipHandle(20)];
        let mut driver = DisturbanceDriver::new(cfg)
            .with_rig(rig())
            .with_audio(Box::new(audio.clone()));
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(12);
        driver.start().expect("start");
        for _ in 0..2_000 {
            driver.tick(0.01, &mut bus, &mut rng);
        }

        let shots = audio.one_shots();
        assert!(!shots.is_empty());
        for (clip, volume) in shots {
            match clip.0 {
                10 | 11 => assert_abs_diff_eq!(volume, 0.5 + 0.5 * 2.5),
                20 => assert_abs_diff_eq!(volume, 0.7 + 0.3 * 2.5),
                other => panic!("unexpected clip {other}"),
            }
        }
    }

    #[test]
    fn no_one_shots_below_strength_gate() {
        let audio = RecordingAudio::new();
        let mut cfg = config(1000.0);
        cfg.base_intensity = 0.005;
        cfg.debris_clips = vec![ClipHandle(1)];
        cfg.stress_clips = vec![ClipHandle(2)];
        let mut driver = DisturbanceDriver::new(cfg)
            .with_rig(rig())
            .with_audio(Box::new(audio.clone()));
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(12);
        driver.start().expect("start");
        for _ in 0..2_000 {
            driver.tick(0.01, &mut bus, &mut rng);
        }
        assert!(audio.one_shots().is_empty());
    }

    #[test]
    fn haptics_skip_missing_hand_and_clamp() {
        let haptics = RecordingHaptics::with_hands(&[Hand::Right]);
        let mut cfg = config(5.0);
        cfg.base_intensity = 4.0;
        let mut driver = DisturbanceDriver::new(cfg)
            .with_rig(rig())
            .with_haptics(Box::new(haptics.clone()));
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(3);
        driver.start().expect("start");
        driver.tick(0.02, &mut bus, &mut rng);

        let pulses = haptics.pulses();
        assert_eq!(pulses.len(), 1);
        assert_eq!(pulses[0].hand, Hand::Right);
        assert_eq!(pulses[0].amplitude, 1.0);
        assert_eq!(pulses[0].duration_s, HAPTIC_PULSE_S);
    }

    #[test]
    fn vignette_opens_then_disables() {
        let vignette = RecordingVignette::new();
        let mut driver = DisturbanceDriver::new(config(0.5))
            .with_rig(rig())
            .with_vignette(Box::new(vignette.clone()));
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(5);
        driver.start().expect("start");
        assert!(vignette.is_enabled());
        assert_eq!(vignette.aperture(), Some(0.3));

        while driver.phase() == DriverPhase::Running {
            driver.tick(0.1, &mut bus, &mut rng);
        }
        driver.tick(0.5, &mut bus, &mut rng);
        assert_abs_diff_eq!(vignette.aperture().unwrap(), 0.65, epsilon = 1e-12);
        driver.tick(0.5, &mut bus, &mut rng);
        assert_eq!(vignette.aperture(), Some(1.0));
        assert!(!vignette.is_enabled());
        assert_eq!(driver.phase(), DriverPhase::Inactive);
    }

    #[test]
    fn restart_during_fade_silences_old_tails() {
        let audio = RecordingAudio::new();
        let vignette = RecordingVignette::new();
        let mut driver = DisturbanceDriver::new(config(0.2))
            .with_rig(rig())
            .with_audio(Box::new(audio.clone()))
            .with_vignette(Box::new(vignette.clone()));
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(6);
        driver.start().expect("start");
        while driver.phase() == DriverPhase::Running {
            driver.tick(0.05, &mut bus, &mut rng);
        }
        driver.tick(0.05, &mut bus, &mut rng);
        assert_eq!(driver.phase(), DriverPhase::FadingOut);

        driver.set_config(config(100.0));
        driver.start().expect("restart");
        assert_eq!(driver.phase(), DriverPhase::Running);
        audio.clear();
        vignette.clear();

        driver.tick(0.05, &mut bus, &mut rng);
        // Only the new loop writes: full-envelope gains and the quake aperture
        // stays untouched instead of opening up.
        assert_eq!(audio.last_gain(AudioChannel::Rumble), Some(1.0));
        assert!(!audio.events().iter().any(|e| matches!(e, AudioEvent::Stop(_))));
        assert!(vignette.events().is_empty());
    }

    #[test]
    fn restart_while_running_keeps_rig_clean() {
        let start_rig = rig();
        let mut driver = DisturbanceDriver::new(config(5.0)).with_rig(start_rig);
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(10);
        driver.start().expect("start");
        driver.tick(0.02, &mut bus, &mut rng);
        assert_ne!(driver.rig(), Some(&start_rig));

        driver.start().expect("restart");
        assert_eq!(driver.rig(), Some(&start_rig));
        assert_eq!(driver.phase(), DriverPhase::Running);
        assert_eq!(driver.run().map(|r| r.elapsed), Some(0.0));
    }

    #[test]
    fn stop_cancels_everything() {
        let start_rig = rig();
        let mut driver = DisturbanceDriver::new(config(5.0)).with_rig(start_rig);
        let mut bus = SignalBus::new();
        let mut rng = StdRng::seed_from_u64(10);
        driver.start().expect("start");
        driver.tick(0.02, &mut bus, &mut rng);
        let published = bus.sequence();
        driver.stop();
        driver.tick(0.02, &mut bus, &mut rng);
        assert_eq!(driver.phase(), DriverPhase::Inactive);
        assert_eq!(driver.rig(), Some(&start_rig));
        assert_eq!(bus.sequence(), published);
    }

    proptest! {
        #[test]
        fn rig_never_drifts(seed in any::<u64>(), dts in prop::collection::vec(0.001f64..0.05, 1..200)) {
            let start_rig = rig();
            let mut driver = DisturbanceDriver::new(config(1.0)).with_rig(start_rig);
            let mut bus = SignalBus::new();
            let mut rng = StdRng::seed_from_u64(seed);
            driver.start().unwrap();
            for dt in dts.iter().cycle().take(10_000) {
                driver.tick(*dt, &mut bus, &mut rng);
                if driver.phase() != DriverPhase::Running {
                    break;
                }
            }
            prop_assert_eq!(driver.phase(), DriverPhase::Inactive);
            prop_assert_eq!(driver.rig(), Some(&start_rig));
        }
    }
}
