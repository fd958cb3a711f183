//! Flickering light subscriber
//!
//! Captures the light's brightness on creation and puts it back exactly when
//! the intensity falls to the threshold.

use rand::{Rng, RngCore};
use tracing::debug;

use crate::config::LightConfig;
use crate::subscribers::{EffectState, SignalSubscriber};
use crate::task::{TaskSlot, TaskStatus, TickTask};
use crate::QuakeError;

/// Probability that a flicker step leaves the light on.
pub const FLICKER_ON_PROBABILITY: f64 = 0.7;
/// Shortest wait between flicker steps [s]
pub const MIN_FLICKER_WAIT_S: f64 = 0.02;

/// Visible state of a light source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub enabled: bool,
    pub intensity: f64,
}

impl Light {
    pub fn new(intensity: f64) -> Self {
        Self {
            enabled: true,
            intensity,
        }
    }
}

struct FlickerContext<'a> {
    light: &'a mut Light,
    rng: &'a mut dyn RngCore,
}

struct FlickerTask {
    original: f64,
    max_wait: f64,
    wait: f64,
}

impl<'a> TickTask<FlickerContext<'a>> for FlickerTask {
    fn poll(&mut self, ctx: &mut FlickerContext<'a>, dt: f64) -> TaskStatus {
        self.wait -= dt;
        if self.wait > 0.0 {
            return TaskStatus::Pending;
        }

        let on = ctx.rng.gen::<f64>() < FLICKER_ON_PROBABILITY;
        ctx.light.enabled = on;
        if on {
            ctx.light.intensity = self.original * ctx.rng.gen_range(0.5..=1.2);
        }

        self.wait = if self.max_wait > MIN_FLICKER_WAIT_S {
            ctx.rng.gen_range(MIN_FLICKER_WAIT_S..=self.max_wait)
        } else {
            MIN_FLICKER_WAIT_S
        };
        TaskStatus::Pending
    }
}

/// Light that flickers while the intensity stays above its threshold.
pub struct LightFlicker {
    config: LightConfig,
    light: Light,
    baseline: Light,
    state: EffectState,
    flicker: TaskSlot<FlickerTask>,
    /// Set on the activating tick, whose first step already ran.
    just_activated: bool,
}

impl LightFlicker {
    /// Captures `light` as the baseline restored when the shaking stops.
    pub fn new(light: Light, config: LightConfig) -> Result<Self, QuakeError> {
        config.validate()?;
        Ok(Self {
            config,
            light,
            baseline: light,
            state: EffectState::Idle,
            flicker: TaskSlot::new(),
            just_activated: false,
        })
    }

    pub fn light(&self) -> Light {
        self.light
    }

    pub fn baseline(&self) -> Light {
        self.baseline
    }

    pub fn config(&self) -> &LightConfig {
        &self.config
    }

    pub fn is_flickering(&self) -> bool {
        self.flicker.is_running()
    }

    fn activate(&mut self, rng: &mut dyn RngCore) {
        self.state = EffectState::Active;
        self.flicker.spawn(FlickerTask {
            original: self.baseline.intensity,
            max_wait: self.config.flicker_speed * 5.0,
            wait: 0.0,
        });
        // First step lands on the activating tick.
        let mut ctx = FlickerContext {
            light: &mut self.light,
            rng,
        };
        self.flicker.poll(&mut ctx, 0.0);
        self.just_activated = true;
        debug!(threshold = self.config.flicker_threshold, "light flicker started");
    }

    fn restore(&mut self) {
        self.flicker.cancel();
        self.state = EffectState::Idle;
        self.just_activated = false;
        self.light.enabled = true;
        self.light.intensity = self.baseline.intensity;
        debug!("light restored");
    }
}

impl SignalSubscriber for LightFlicker {
    fn on_signal(&mut self, intensity: f64, rng: &mut dyn RngCore) {
        if intensity > self.config.flicker_threshold {
            if self.state == EffectState::Idle {
                self.activate(rng);
            }
        } else if self.state == EffectState::Active {
            self.restore();
        }
    }

    fn advance(&mut self, dt: f64, rng: &mut dyn RngCore) {
        if self.state != EffectState::Active {
            return;
        }
        if std::mem::take(&mut self.just_activated) {
            return;
        }
        let mut ctx = FlickerContext {
            light: &mut self.light,
            rng,
        };
        self.flicker.poll(&mut ctx, dt);
    }

    fn release(&mut self) {
        if self.state == EffectState::Active {
            self.restore();
        }
    }

    fn state(&self) -> EffectState {
        self.state
    }
}
