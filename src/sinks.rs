//! Output collaborators driven by the disturbance driver
//!
//! Audio playback, haptic devices and the comfort vignette live outside this
//! crate. The driver only talks to them through these traits, and every one of
//! them is optional: a driver without a sink simply skips that effect.
//!
//! The `Recording*` sinks keep a shared log of every call. They back headless
//! scenario runs and tests; clones share the same log.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Opaque handle to a clip owned by the audio collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipHandle(pub u32);

/// Audio outputs the driver addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioChannel {
    /// Primary looping rumble
    Rumble,
    /// Looping structural creaks
    StressLoop,
    /// Looping environmental ambience
    Ambience,
    /// Source used for one-shot debris and crack clips
    OneShot,
}

impl AudioChannel {
    /// Looping channels whose gain follows the envelope.
    pub const LOOPS: [AudioChannel; 3] = [
        AudioChannel::Rumble,
        AudioChannel::StressLoop,
        AudioChannel::Ambience,
    ];
}

pub trait AudioSink {
    /// Whether the collaborator has a source wired for `channel`.
    fn supports(&self, _channel: AudioChannel) -> bool {
        true
    }
    fn set_gain(&mut self, channel: AudioChannel, gain: f64);
    fn play(&mut self, channel: AudioChannel);
    fn stop(&mut self, channel: AudioChannel);
    fn play_one_shot(&mut self, clip: ClipHandle, volume_scale: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];
}

pub trait HapticSink {
    /// Whether a device is currently present for `hand`.
    fn device_available(&self, _hand: Hand) -> bool {
        true
    }
    fn pulse(&mut self, hand: Hand, amplitude: f64, duration_s: f64);
}

pub trait VignetteSink {
    fn set_enabled(&mut self, enabled: bool);
    fn set_aperture_size(&mut self, size: f64);
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    Gain(AudioChannel, f64),
    Play(AudioChannel),
    Stop(AudioChannel),
    OneShot(ClipHandle, f64),
}

/// Audio sink that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    log: Rc<RefCell<Vec<AudioEvent>>>,
    missing: Vec<AudioChannel>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that reports `missing` channels as unwired.
    pub fn without(missing: &[AudioChannel]) -> Self {
        Self {
            log: Rc::default(),
            missing: missing.to_vec(),
        }
    }

    pub fn events(&self) -> Vec<AudioEvent> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    /// Most recent gain written to `channel`.
    pub fn last_gain(&self, channel: AudioChannel) -> Option<f64> {
        self.log.borrow().iter().rev().find_map(|event| match event {
            AudioEvent::Gain(c, g) if *c == channel => Some(*g),
            _ => None,
        })
    }

    pub fn is_playing(&self, channel: AudioChannel) -> bool {
        self.log
            .borrow()
            .iter()
            .rev()
            .find_map(|event| match event {
                AudioEvent::Play(c) if *c == channel => Some(true),
                AudioEvent::Stop(c) if *c == channel => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn one_shots(&self) -> Vec<(ClipHandle, f64)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|event| match event {
                AudioEvent::OneShot(clip, volume) => Some((*clip, *volume)),
                _ => None,
            })
            .collect()
    }
}

impl AudioSink for RecordingAudio {
    fn supports(&self, channel: AudioChannel) -> bool {
        !self.missing.contains(&channel)
    }

    fn set_gain(&mut self, channel: AudioChannel, gain: f64) {
        self.log.borrow_mut().push(AudioEvent::Gain(channel, gain));
    }

    fn play(&mut self, channel: AudioChannel) {
        self.log.borrow_mut().push(AudioEvent::Play(channel));
    }

    fn stop(&mut self, channel: AudioChannel) {
        self.log.borrow_mut().push(AudioEvent::Stop(channel));
    }

    fn play_one_shot(&mut self, clip: ClipHandle, volume_scale: f64) {
        self.log
            .borrow_mut()
            .push(AudioEvent::OneShot(clip, volume_scale));
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HapticPulse {
    pub hand: Hand,
    pub amplitude: f64,
    pub duration_s: f64,
}

/// Haptic sink that records pulses for the hands it reports as present.
#[derive(Debug, Clone)]
pub struct RecordingHaptics {
    log: Rc<RefCell<Vec<HapticPulse>>>,
    present: Vec<Hand>,
}

impl RecordingHaptics {
    pub fn new() -> Self {
        Self::with_hands(&Hand::BOTH)
    }

    pub fn with_hands(present: &[Hand]) -> Self {
        Self {
            log: Rc::default(),
            present: present.to_vec(),
        }
    }

    pub fn pulses(&self) -> Vec<HapticPulse> {
        self.log.borrow().clone()
    }
}

impl Default for RecordingHaptics {
    fn default() -> Self {
        Self::new()
    }
}

impl HapticSink for RecordingHaptics {
    fn device_available(&self, hand: Hand) -> bool {
        self.present.contains(&hand)
    }

    fn pulse(&mut self, hand: Hand, amplitude: f64, duration_s: f64) {
        self.log.borrow_mut().push(HapticPulse {
            hand,
            amplitude,
            duration_s,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VignetteEvent {
    Enabled(bool),
    Aperture(f64),
}

/// Vignette sink that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingVignette {
    log: Rc<RefCell<Vec<VignetteEvent>>>,
}

impl RecordingVignette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<VignetteEvent> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn aperture(&self) -> Option<f64> {
        self.log.borrow().iter().rev().find_map(|event| match event {
            VignetteEvent::Aperture(size) => Some(*size),
            _ => None,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.log
            .borrow()
            .iter()
            .rev()
            .find_map(|event| match event {
                VignetteEvent::Enabled(on) => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl VignetteSink for RecordingVignette {
    fn set_enabled(&mut self, enabled: bool) {
        self.log.borrow_mut().push(VignetteEvent::Enabled(enabled));
    }

    fn set_aperture_size(&mut self, size: f64) {
        self.log.borrow_mut().push(VignetteEvent::Aperture(size));
    }
}
