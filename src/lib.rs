//! quakesim - timed earthquake disturbance engine
//!
//! A single envelope-shaped intensity signal is generated per activation and
//! broadcast over a last-value-wins bus to independent subscriber effects
//! (flickering lights, shaking props) while the driver jitters the camera rig
//! and feeds audio, haptic and comfort-vignette sinks.

pub mod bus;
pub mod config;
pub mod driver;
pub mod envelope;
pub mod gadgets;
pub mod noise;
pub mod scene;
pub mod sinks;
pub mod subscribers;
pub mod task;
pub mod transform;

use thiserror::Error;

// Re-export main types
pub use bus::{SignalBus, SubscriptionId};
pub use config::{DisturbanceConfig, IntensityTier, LightConfig, LockedAxis, ShakerConfig};
pub use driver::{DisturbanceDriver, DisturbanceRun, DriverPhase, RigTransforms};
pub use envelope::{envelope, QuakeEnvelope};
pub use scene::{Scene, SubscriberId};
pub use sinks::{AudioChannel, AudioSink, ClipHandle, Hand, HapticSink, VignetteSink};
pub use subscribers::{LightFlicker, ObjectShaker, SignalSubscriber, Subscriber};
pub use transform::Transform;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuakeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("no rig transform attached to the disturbance driver")]
    MissingRig,
}
