//! Interface to the native playback engine.

use earshot_core::{ClipId, PlaybackParams, Pose, Result};
use glam::Vec3;

/// Opaque id of a native playback handle, issued by a [`PlaybackBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeHandleId(pub u32);

/// A native playback engine with one real listener.
///
/// earshot never mixes audio itself. It creates handles through this trait,
/// pushes parameters and positions to them, and queries their playback state.
/// Setters and queries on an unknown handle are ignored or return defaults;
/// only operations that start sound are fallible.
pub trait PlaybackBackend {
    /// Create a new, stopped, inactive handle. Handles never auto-play.
    fn create_handle(&mut self) -> Result<NativeHandleId>;

    /// Current scalar parameters of a handle.
    fn params(&self, handle: NativeHandleId) -> Option<PlaybackParams>;

    /// Overwrite the scalar parameters of a handle.
    fn set_params(&mut self, handle: NativeHandleId, params: &PlaybackParams);

    /// Clip assigned for primary playback.
    fn clip(&self, handle: NativeHandleId) -> Option<ClipId>;

    /// Assign the primary clip. Reassigning may interrupt playback.
    fn set_clip(&mut self, handle: NativeHandleId, clip: Option<ClipId>);

    /// Start primary playback from the current playhead.
    fn play(&mut self, handle: NativeHandleId) -> Result<()>;

    /// Stop primary and one-shot playback and rewind the playhead.
    fn stop(&mut self, handle: NativeHandleId);

    /// Fire an overlapping one-shot that does not touch the primary clip.
    fn play_one_shot(&mut self, handle: NativeHandleId, clip: ClipId, volume_scale: f32)
        -> Result<()>;

    /// Whether the primary clip is playing.
    fn is_playing(&self, handle: NativeHandleId) -> bool;

    /// Primary playhead in seconds.
    fn time(&self, handle: NativeHandleId) -> f32;

    /// Move the primary playhead.
    fn set_time(&mut self, handle: NativeHandleId, seconds: f32);

    /// Whether the handle is muted.
    fn is_muted(&self, handle: NativeHandleId) -> bool;

    /// Mute or unmute the handle without affecting its playback state.
    fn set_muted(&mut self, handle: NativeHandleId, muted: bool);

    /// Activate or deactivate the handle's scene node.
    fn set_active(&mut self, handle: NativeHandleId, active: bool);

    /// Place the handle in world space.
    fn set_position(&mut self, handle: NativeHandleId, position: Vec3);

    /// Place the engine's single real listener.
    fn set_listener_pose(&mut self, pose: &Pose);

    /// Length of a clip in seconds at unit pitch.
    fn clip_length(&self, clip: ClipId) -> Option<f32>;

    /// Advance engine time. Real-time engines can ignore this.
    fn update(&mut self, _dt: f32) {}
}
