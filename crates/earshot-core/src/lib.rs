//! Core types, math, and configuration for earshot.
//!
//! This crate provides the foundational types shared by the audio and scene crates:
//! - Rigid poses and point transforms between world and local space
//! - Authored playback settings (clip, volume, pitch, rolloff, routing)
//! - Engine configuration and the pool exhaustion policy
//! - Common error types

pub mod config;
pub mod error;
pub mod math;
pub mod types;

pub use config::{ExhaustionPolicy, PoolConfig, VirtualAudioConfig};
pub use error::{Error, Result};
pub use math::Pose;
pub use types::{ClipId, MixerGroupId, PlaybackParams, RolloffMode, VoiceSettings};

/// Engine-wide constants
pub mod constants {
    /// Playhead difference (seconds) above which a mirrored proxy is snapped to its source.
    pub const DRIFT_TOLERANCE: f32 = 0.1;
    /// Smallest pitch magnitude used when estimating one-shot durations.
    pub const PITCH_EPSILON: f32 = 0.01;
    /// Authored pitch range.
    pub const MIN_PITCH: f32 = -3.0;
    /// Authored pitch range.
    pub const MAX_PITCH: f32 = 3.0;
}
