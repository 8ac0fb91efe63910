//! Engine-style looping voice whose pitch follows speed and whose volume
//! follows thrust.

use earshot_core::{ClipId, Result};
use glam::FloatExt;
use serde::{Deserialize, Serialize};

use crate::backend::PlaybackBackend;
use crate::context::VirtualAudio;
use crate::voice::VirtualVoice;

/// Volume under which a stopping motor is silenced.
const SILENCE: f32 = 1e-3;

/// Pitch and volume ranges of a motor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorSettings {
    /// Looped engine clip
    pub clip: Option<ClipId>,
    /// Pitch when switched off
    pub min_pitch: f32,
    /// Pitch at zero speed
    pub idle_pitch: f32,
    /// Pitch at full speed
    pub max_pitch: f32,
    /// How fast pitch reaches its target, per second
    pub pitch_response: f32,
    /// Volume without thrust
    pub idle_volume: f32,
    /// Volume at full thrust
    pub thrust_volume: f32,
    /// How fast volume reaches its target, per second
    pub volume_response: f32,
}

impl Default for MotorSettings {
    fn default() -> Self {
        Self {
            clip: None,
            min_pitch: 0.2,
            idle_pitch: 0.5,
            max_pitch: 1.5,
            pitch_response: 1.0,
            idle_volume: 0.6,
            thrust_volume: 1.0,
            volume_response: 10.0,
        }
    }
}

/// Drives a primary voice like an engine.
///
/// Starting spins the motor up from `min_pitch` and silence to idle. Speed and
/// thrust then move the targets, and [`update`](Self::update) eases the voice
/// towards them. Stopping winds the pitch down while the volume fades out; the
/// voice is stopped once it is silent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motor {
    settings: MotorSettings,
    running: bool,
    speed: f32,
    target_pitch: f32,
    target_volume: f32,
}

impl Motor {
    /// Create a switched-off motor.
    #[must_use]
    pub const fn new(settings: MotorSettings) -> Self {
        Self {
            running: false,
            speed: 0.0,
            target_pitch: settings.min_pitch,
            target_volume: 0.0,
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &MotorSettings {
        &self.settings
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Normalized speed (0.0-1.0), e.g. to drive a tyre voice alongside.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    #[must_use]
    pub const fn target_pitch(&self) -> f32 {
        self.target_pitch
    }

    #[must_use]
    pub const fn target_volume(&self) -> f32 {
        self.target_volume
    }

    /// Switch the motor on and start its clip from silence.
    pub fn start<B: PlaybackBackend>(
        &mut self,
        voice: &mut VirtualVoice,
        audio: &mut VirtualAudio<B>,
    ) -> Result<()> {
        if self.running {
            return Ok(());
        }
        let Some(voice_settings) = voice.settings_mut() else {
            tracing::debug!("Motors need a primary voice");
            return Ok(());
        };
        if let Some(clip) = self.settings.clip {
            voice_settings.clip = Some(clip);
        }
        voice_settings.params.looping = true;
        voice_settings.params.pitch = self.settings.min_pitch;
        voice_settings.params.volume = 0.0;

        self.running = true;
        self.speed = 0.0;
        self.target_pitch = self.settings.idle_pitch;
        self.target_volume = self.settings.idle_volume;
        tracing::debug!("Motor started");
        voice.play(audio)
    }

    /// Switch the motor off. The voice winds down over the next updates.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.speed = 0.0;
        self.target_pitch = self.settings.min_pitch;
        self.target_volume = 0.0;
        tracing::debug!("Motor stopping");
    }

    /// Set the normalized speed (0.0-1.0). Ignored while switched off.
    pub fn set_target_speed(&mut self, speed: f32) {
        if !self.running {
            return;
        }
        self.speed = speed.clamp(0.0, 1.0);
        self.target_pitch = self
            .settings
            .idle_pitch
            .lerp(self.settings.max_pitch, self.speed);
    }

    /// Set the normalized thrust (0.0-1.0). Ignored while switched off.
    pub fn set_target_thrust(&mut self, thrust: f32) {
        if !self.running {
            return;
        }
        self.target_volume = self
            .settings
            .idle_volume
            .lerp(self.settings.thrust_volume, thrust.clamp(0.0, 1.0));
    }

    /// Ease the voice's pitch and volume towards their targets.
    pub fn update<B: PlaybackBackend>(
        &self,
        voice: &mut VirtualVoice,
        audio: &mut VirtualAudio<B>,
        dt: f32,
    ) {
        let Some(voice_settings) = voice.settings_mut() else {
            return;
        };
        let params = &mut voice_settings.params;
        let pitch_step = (dt * self.settings.pitch_response).clamp(0.0, 1.0);
        let volume_step = (dt * self.settings.volume_response).clamp(0.0, 1.0);
        params.pitch = params.pitch.lerp(self.target_pitch, pitch_step);
        params.volume = params.volume.lerp(self.target_volume, volume_step);

        if !self.running && params.volume < SILENCE {
            params.volume = 0.0;
            if voice.state().is_active() {
                tracing::debug!("Motor silent");
                voice.stop(audio);
            }
        }
    }
}
