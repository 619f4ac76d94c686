pub mod animation;
pub mod config;
pub mod controller;
pub mod error;
pub mod polling;
pub mod sequence;

pub use animation::{AnimationEngine, AnimationHandle, AnimationMode, Bar, Frame, Geometry};
pub use config::{Endpoints, Layout, SyncConfig};
pub use controller::{FaultReason, Phase, SyncController, ViewModel};
pub use error::{ConfigError, PollError, PollErrorKind};
pub use polling::{PollingClient, StatusSource};
pub use sequence::SequenceBuffer;
