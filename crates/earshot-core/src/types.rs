//! Authored playback types.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_PITCH, MIN_PITCH};

/// Identifier for a loaded audio clip.
///
/// Clips are owned by the playback backend; earshot only passes ids around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ClipId(pub u32);

/// Identifier for an output routing (mixer) group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct MixerGroupId(pub u32);

/// How volume falls off between the min and max distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloffMode {
    /// Inverse-distance falloff.
    #[default]
    Logarithmic,
    /// Straight line from full volume at min distance to silence at max distance.
    Linear,
    /// No distance attenuation.
    None,
}

/// Scalar playback parameters forwarded to a native playback handle.
///
/// Everything except the clip reference, which is synced separately.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackParams {
    /// Volume (0.0-1.0)
    pub volume: f32,
    /// Pitch multiplier (-3.0-3.0), negative plays backwards
    pub pitch: f32,
    /// 0.0 = fully 2D, 1.0 = fully 3D
    pub spatial_blend: f32,
    /// Distance at which attenuation starts
    pub min_distance: f32,
    /// Distance at which attenuation stops
    pub max_distance: f32,
    /// Attenuation curve
    pub rolloff: RolloffMode,
    /// Doppler scale (0.0 disables)
    pub doppler_level: f32,
    /// Loop the primary clip
    pub looping: bool,
    /// Output routing group
    pub output: Option<MixerGroupId>,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pitch: 1.0,
            spatial_blend: 0.0,
            min_distance: 1.0,
            max_distance: 500.0,
            rolloff: RolloffMode::Logarithmic,
            doppler_level: 1.0,
            looping: false,
            output: None,
        }
    }
}

impl PlaybackParams {
    /// Clamp every field to its authored range.
    #[must_use]
    pub fn clamped(self) -> Self {
        let min_distance = self.min_distance.max(0.0);
        Self {
            volume: self.volume.clamp(0.0, 1.0),
            pitch: self.pitch.clamp(MIN_PITCH, MAX_PITCH),
            spatial_blend: self.spatial_blend.clamp(0.0, 1.0),
            min_distance,
            max_distance: self.max_distance.max(min_distance),
            doppler_level: self.doppler_level.max(0.0),
            ..self
        }
    }
}

/// Per-voice authored configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Primary clip
    pub clip: Option<ClipId>,
    /// Mixing and spatialization parameters
    pub params: PlaybackParams,
    /// Re-resolve the closest listener every tick instead of locking it at playback start
    pub update_listener_while_playing: bool,
    /// Start the primary clip when the voice starts
    pub play_on_awake: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            clip: None,
            params: PlaybackParams::default(),
            update_listener_while_playing: false,
            play_on_awake: true,
        }
    }
}

impl VoiceSettings {
    /// Settings playing the given clip.
    #[must_use]
    pub fn with_clip(clip: ClipId) -> Self {
        Self {
            clip: Some(clip),
            ..Self::default()
        }
    }

    /// Set the looping flag.
    #[must_use]
    pub const fn looping(mut self, looping: bool) -> Self {
        self.params.looping = looping;
        self
    }

    /// Set the volume.
    #[must_use]
    pub const fn volume(mut self, volume: f32) -> Self {
        self.params.volume = volume;
        self
    }

    /// Set the pitch.
    #[must_use]
    pub const fn pitch(mut self, pitch: f32) -> Self {
        self.params.pitch = pitch;
        self
    }

    /// Set the spatial blend.
    #[must_use]
    pub const fn spatial_blend(mut self, spatial_blend: f32) -> Self {
        self.params.spatial_blend = spatial_blend;
        self
    }

    /// Set whether the closest listener follows the emitter during playback.
    #[must_use]
    pub const fn update_listener_while_playing(mut self, update: bool) -> Self {
        self.update_listener_while_playing = update;
        self
    }

    /// Set whether the clip starts automatically.
    #[must_use]
    pub const fn play_on_awake(mut self, play_on_awake: bool) -> Self {
        self.play_on_awake = play_on_awake;
        self
    }
}
