//! Virtual listeners and proxy voices for earshot.
//!
//! Native audio engines usually support a single listener. This crate lets any
//! number of virtual listeners (split-screen cameras, spectator views) share it:
//! each emitter is rendered through a pooled proxy handle placed so that the
//! real listener hears it exactly as its closest virtual listener would.
//!
//! # Core Types
//!
//! - [`VirtualAudio`]: Context owning the backend, clock and lazily created manager
//! - [`ListenerRegistry`]: Live virtual listeners with nearest-neighbour lookup
//! - [`ProxyPool`]: Recycled native playback handles
//! - [`ReferenceAnchor`]: Fixed pose hosting the real listener
//! - [`VirtualVoice`]: Per-emitter state machine, primary or adapter
//! - [`PlaybackBackend`]: Seam to the native playback engine
//!
//! # Playback Helpers
//!
//! - [`Radio`] / [`RadioStations`]: Native handles streaming synced playlists
//! - [`LoopSequence`]: Intro, loop and outro on one voice
//! - [`Motor`]: Engine loop with speed-driven pitch and thrust-driven volume
//!
//! # Usage
//!
//! ```
//! use earshot_audio::{HeadlessBackend, VirtualAudio, VirtualVoice};
//! use earshot_core::{Pose, VirtualAudioConfig, VoiceSettings};
//! use glam::Vec3;
//!
//! let mut backend = HeadlessBackend::new();
//! let clip = backend.add_clip(2.0);
//! let mut audio = VirtualAudio::new(backend, VirtualAudioConfig::default());
//!
//! // One listener per split-screen camera.
//! audio.register_listener(Pose::from_position(Vec3::ZERO));
//! audio.register_listener(Pose::from_position(Vec3::new(100.0, 0.0, 0.0)));
//!
//! let mut voice = VirtualVoice::primary(VoiceSettings::with_clip(clip))
//!     .with_pose(Pose::from_position(Vec3::new(98.0, 0.0, 0.0)));
//! voice.start(&mut audio)?;
//!
//! // Once per frame
//! audio.advance(1.0 / 60.0);
//! voice.tick(&mut audio)?;
//! assert!(voice.state().is_active());
//! # Ok::<(), earshot_core::Error>(())
//! ```

mod anchor;
mod backend;
mod context;
mod headless;
#[cfg(feature = "kira")]
mod kira_backend;
mod listener;
mod motor;
mod pool;
mod radio;
mod sequence;
mod voice;

pub use anchor::ReferenceAnchor;
pub use backend::{NativeHandleId, PlaybackBackend};
pub use context::{AudioSession, VirtualAudio, VirtualAudioManager};
pub use headless::{HeadlessBackend, HeadlessHandle, HeadlessOneShot};
#[cfg(feature = "kira")]
pub use kira_backend::KiraBackend;
pub use listener::{ListenerId, ListenerRegistry, VirtualListener};
pub use motor::{Motor, MotorSettings};
pub use pool::{ProxyId, ProxyLease, ProxyPool};
pub use radio::{LiveClip, Playlist, Radio, RadioStations};
pub use sequence::{LoopClips, LoopSequence, SequencePhase};
pub use voice::{
    drift_exceeds, one_shot_duration, AdaptedSource, PrimarySource, VirtualVoice, VoiceSource,
    VoiceState,
};
