//! Deterministic in-memory playback engine.
//!
//! Playheads only move when [`PlaybackBackend::update`] is called, which makes
//! it suitable for tests and offline simulation.

use earshot_core::{ClipId, Error, PlaybackParams, Pose, Result};
use glam::Vec3;

use crate::backend::{NativeHandleId, PlaybackBackend};

/// A one-shot still sounding on a headless handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessOneShot {
    /// Clip being played
    pub clip: ClipId,
    /// Volume multiplier passed at trigger time
    pub volume_scale: f32,
    /// Clip time left (seconds at unit pitch)
    pub remaining: f32,
}

/// State of a single headless playback handle.
#[derive(Debug, Clone, Default)]
pub struct HeadlessHandle {
    /// Last parameters pushed to the handle
    pub params: PlaybackParams,
    /// Assigned clip
    pub clip: Option<ClipId>,
    /// Whether the primary clip is playing
    pub playing: bool,
    /// Primary playhead in seconds
    pub time: f32,
    /// Muted handles keep playing silently
    pub muted: bool,
    /// Cleared while the handle sits idle in a pool
    pub active: bool,
    /// World position
    pub position: Vec3,
    /// One-shots still sounding
    pub one_shots: Vec<HeadlessOneShot>,
    /// Number of times `play` started primary playback.
    pub play_count: u32,
}

/// In-memory [`PlaybackBackend`].
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    clips: Vec<f32>,
    handles: Vec<HeadlessHandle>,
    listener: Pose,
}

impl HeadlessBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clip of the given length in seconds.
    pub fn add_clip(&mut self, length: f32) -> ClipId {
        let id = ClipId(self.clips.len() as u32);
        self.clips.push(length.max(0.0));
        id
    }

    /// Inspect a handle.
    #[must_use]
    pub fn handle(&self, handle: NativeHandleId) -> Option<&HeadlessHandle> {
        self.handles.get(handle.0 as usize)
    }

    /// Number of handles ever created.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Pose of the real listener.
    #[must_use]
    pub const fn listener_pose(&self) -> &Pose {
        &self.listener
    }

    fn get_mut(&mut self, handle: NativeHandleId) -> Option<&mut HeadlessHandle> {
        self.handles.get_mut(handle.0 as usize)
    }

    fn length_of(&self, clip: Option<ClipId>) -> Option<f32> {
        clip.and_then(|c| self.clips.get(c.0 as usize).copied())
    }
}

impl PlaybackBackend for HeadlessBackend {
    fn create_handle(&mut self) -> Result<NativeHandleId> {
        let id = NativeHandleId(self.handles.len() as u32);
        self.handles.push(HeadlessHandle::default());
        Ok(id)
    }

    fn params(&self, handle: NativeHandleId) -> Option<PlaybackParams> {
        self.handle(handle).map(|h| h.params)
    }

    fn set_params(&mut self, handle: NativeHandleId, params: &PlaybackParams) {
        if let Some(h) = self.get_mut(handle) {
            h.params = *params;
        }
    }

    fn clip(&self, handle: NativeHandleId) -> Option<ClipId> {
        self.handle(handle).and_then(|h| h.clip)
    }

    fn set_clip(&mut self, handle: NativeHandleId, clip: Option<ClipId>) {
        if let Some(h) = self.get_mut(handle) {
            if h.clip != clip {
                // Swapping the clip interrupts primary playback.
                h.clip = clip;
                h.playing = false;
                h.time = 0.0;
            }
        }
    }

    fn play(&mut self, handle: NativeHandleId) -> Result<()> {
        let clip = self.clip(handle);
        let length = self.length_of(clip);
        let h = self
            .get_mut(handle)
            .ok_or(Error::UnknownHandle(handle.0))?;
        match length {
            Some(length) => {
                if h.time >= length {
                    h.time = 0.0;
                }
                h.playing = true;
                h.play_count += 1;
            }
            // Playing without a clip is silent.
            None => h.playing = false,
        }
        Ok(())
    }

    fn stop(&mut self, handle: NativeHandleId) {
        if let Some(h) = self.get_mut(handle) {
            h.playing = false;
            h.time = 0.0;
            h.one_shots.clear();
        }
    }

    fn play_one_shot(
        &mut self,
        handle: NativeHandleId,
        clip: ClipId,
        volume_scale: f32,
    ) -> Result<()> {
        let length = self
            .length_of(Some(clip))
            .ok_or(Error::UnknownClip(clip.0))?;
        let h = self
            .get_mut(handle)
            .ok_or(Error::UnknownHandle(handle.0))?;
        h.one_shots.push(HeadlessOneShot {
            clip,
            volume_scale,
            remaining: length,
        });
        Ok(())
    }

    fn is_playing(&self, handle: NativeHandleId) -> bool {
        self.handle(handle).is_some_and(|h| h.playing)
    }

    fn time(&self, handle: NativeHandleId) -> f32 {
        self.handle(handle).map_or(0.0, |h| h.time)
    }

    fn set_time(&mut self, handle: NativeHandleId, seconds: f32) {
        let length = self.length_of(self.clip(handle)).unwrap_or(0.0);
        if let Some(h) = self.get_mut(handle) {
            h.time = seconds.clamp(0.0, length);
        }
    }

    fn is_muted(&self, handle: NativeHandleId) -> bool {
        self.handle(handle).is_some_and(|h| h.muted)
    }

    fn set_muted(&mut self, handle: NativeHandleId, muted: bool) {
        if let Some(h) = self.get_mut(handle) {
            h.muted = muted;
        }
    }

    fn set_active(&mut self, handle: NativeHandleId, active: bool) {
        if let Some(h) = self.get_mut(handle) {
            h.active = active;
        }
    }

    fn set_position(&mut self, handle: NativeHandleId, position: Vec3) {
        if let Some(h) = self.get_mut(handle) {
            h.position = position;
        }
    }

    fn set_listener_pose(&mut self, pose: &Pose) {
        self.listener = *pose;
    }

    fn clip_length(&self, clip: ClipId) -> Option<f32> {
        self.length_of(Some(clip))
    }

    fn update(&mut self, dt: f32) {
        for h in &mut self.handles {
            let step = dt * h.params.pitch.abs();

            h.one_shots.retain_mut(|shot| {
                shot.remaining -= step;
                shot.remaining > 0.0
            });

            if !h.playing {
                continue;
            }
            let length = h
                .clip
                .and_then(|c| self.clips.get(c.0 as usize).copied())
                .unwrap_or(0.0);
            h.time += step;
            if h.time >= length {
                if h.params.looping && length > 0.0 {
                    h.time %= length;
                } else {
                    h.playing = false;
                    h.time = 0.0;
                }
            }
        }
    }
}
