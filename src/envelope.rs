use crate::QuakeError;

/// Normalized time after which the envelope ramps down to zero.
pub const FADE_OUT_POINT: f64 = 0.8;

/// Hold-then-fade gain for one activation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuakeEnvelope {
    duration: f64,
}

impl QuakeEnvelope {
    pub fn new(duration: f64) -> Result<Self, QuakeError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(QuakeError::InvalidConfig(format!(
                "envelope duration must be finite and > 0, got {duration}"
            )));
        }
        Ok(Self { duration })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Gain in [0, 1] at `elapsed` seconds into the activation.
    pub fn at(&self, elapsed: f64) -> f64 {
        let normalized = elapsed / self.duration;
        if normalized <= FADE_OUT_POINT {
            return 1.0;
        }
        (1.0 - (normalized - FADE_OUT_POINT) / (1.0 - FADE_OUT_POINT)).clamp(0.0, 1.0)
    }
}

/// One-shot form of [`QuakeEnvelope::at`].
pub fn envelope(elapsed: f64, duration: f64) -> Result<f64, QuakeError> {
    Ok(QuakeEnvelope::new(duration)?.at(elapsed))
}
