//! Playback through a kira spatial scene.
//!
//! Every handle is a kira emitter plus the static sound currently routed to
//! it. The engine's real listener is the scene's single listener.
//!
//! Limitations: emitter distances are fixed when a handle is created, and
//! spatial blend, doppler and mixer routing are not forwarded.

use std::path::Path;

use earshot_core::{ClipId, Error, PlaybackParams, Pose, Result};
use glam::{Quat, Vec3};
use kira::manager::backend::DefaultBackend;
use kira::manager::{AudioManager, AudioManagerSettings};
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::sound::{PlaybackRate, PlaybackState};
use kira::spatial::emitter::{EmitterDistances, EmitterHandle, EmitterSettings};
use kira::spatial::listener::{ListenerHandle, ListenerSettings};
use kira::spatial::scene::{SpatialSceneHandle, SpatialSceneSettings};
use kira::tween::Tween;
use kira::Volume;

use crate::backend::{NativeHandleId, PlaybackBackend};

fn backend_error(context: &str, err: impl std::fmt::Debug) -> Error {
    Error::Backend(format!("{context}: {err:?}"))
}

struct KiraHandle {
    emitter: EmitterHandle,
    params: PlaybackParams,
    clip: Option<ClipId>,
    sound: Option<StaticSoundHandle>,
    one_shots: Vec<StaticSoundHandle>,
    /// Playhead used while no sound is running.
    paused_time: f32,
    muted: bool,
    active: bool,
}

impl KiraHandle {
    fn amplitude(&self, scale: f32) -> Volume {
        if self.muted {
            Volume::Amplitude(0.0)
        } else {
            Volume::Amplitude(f64::from(self.params.volume * scale))
        }
    }

    fn is_playing(&self) -> bool {
        self.sound
            .as_ref()
            .is_some_and(|sound| sound.state() == PlaybackState::Playing)
    }

    fn apply_live_params(&mut self) {
        let volume = self.amplitude(1.0);
        let rate = PlaybackRate::Factor(f64::from(self.params.pitch));
        if let Some(sound) = self.sound.as_mut() {
            sound.set_volume(volume, Tween::default());
            sound.set_playback_rate(rate, Tween::default());
        }
        for shot in &mut self.one_shots {
            shot.set_playback_rate(rate, Tween::default());
        }
    }
}

/// [`PlaybackBackend`] rendering through kira.
pub struct KiraBackend {
    manager: AudioManager<DefaultBackend>,
    scene: SpatialSceneHandle,
    listener: ListenerHandle,
    clips: Vec<StaticSoundData>,
    handles: Vec<KiraHandle>,
}

impl KiraBackend {
    /// Open the default audio device and create the spatial scene.
    pub fn new() -> Result<Self> {
        let mut manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| backend_error("failed to open audio device", e))?;
        let mut scene = manager
            .add_spatial_scene(SpatialSceneSettings::default())
            .map_err(|e| backend_error("failed to create spatial scene", e))?;
        let listener = scene
            .add_listener(Vec3::ZERO, Quat::IDENTITY, ListenerSettings::default())
            .map_err(|e| backend_error("failed to create listener", e))?;

        tracing::info!("Kira audio backend initialized");
        Ok(Self {
            manager,
            scene,
            listener,
            clips: Vec::new(),
            handles: Vec::new(),
        })
    }

    /// Register decoded sound data as a clip.
    pub fn add_clip(&mut self, data: StaticSoundData) -> ClipId {
        let id = ClipId(self.clips.len() as u32);
        self.clips.push(data);
        id
    }

    /// Decode an audio file and register it as a clip.
    pub fn load_clip(&mut self, path: impl AsRef<Path>) -> Result<ClipId> {
        let path = path.as_ref();
        let data = StaticSoundData::from_file(path)
            .map_err(|e| backend_error(&format!("failed to load {}", path.display()), e))?;
        tracing::debug!(path = %path.display(), "Loaded clip");
        Ok(self.add_clip(data))
    }

    fn get_mut(&mut self, handle: NativeHandleId) -> Option<&mut KiraHandle> {
        self.handles.get_mut(handle.0 as usize)
    }

    fn get(&self, handle: NativeHandleId) -> Option<&KiraHandle> {
        self.handles.get(handle.0 as usize)
    }

    fn sound_data(&self, clip: ClipId) -> Result<StaticSoundData> {
        self.clips
            .get(clip.0 as usize)
            .cloned()
            .ok_or(Error::UnknownClip(clip.0))
    }
}

impl std::fmt::Debug for KiraBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KiraBackend")
            .field("clips", &self.clips.len())
            .field("handles", &self.handles.len())
            .finish_non_exhaustive()
    }
}

impl PlaybackBackend for KiraBackend {
    fn create_handle(&mut self) -> Result<NativeHandleId> {
        let params = PlaybackParams::default();
        let settings = EmitterSettings::new().distances(EmitterDistances {
            min_distance: params.min_distance,
            max_distance: params.max_distance,
        });
        let emitter = self
            .scene
            .add_emitter(Vec3::ZERO, settings)
            .map_err(|e| backend_error("failed to create emitter", e))?;

        let id = NativeHandleId(self.handles.len() as u32);
        self.handles.push(KiraHandle {
            emitter,
            params,
            clip: None,
            sound: None,
            one_shots: Vec::new(),
            paused_time: 0.0,
            muted: false,
            active: true,
        });
        Ok(id)
    }

    fn params(&self, handle: NativeHandleId) -> Option<PlaybackParams> {
        self.get(handle).map(|h| h.params)
    }

    fn set_params(&mut self, handle: NativeHandleId, params: &PlaybackParams) {
        if let Some(h) = self.get_mut(handle) {
            h.params = *params;
            h.apply_live_params();
        }
    }

    fn clip(&self, handle: NativeHandleId) -> Option<ClipId> {
        self.get(handle).and_then(|h| h.clip)
    }

    fn set_clip(&mut self, handle: NativeHandleId, clip: Option<ClipId>) {
        if let Some(h) = self.get_mut(handle) {
            if h.clip != clip {
                if let Some(mut sound) = h.sound.take() {
                    sound.stop(Tween::default());
                }
                h.clip = clip;
                h.paused_time = 0.0;
            }
        }
    }

    fn play(&mut self, handle: NativeHandleId) -> Result<()> {
        let h = self.get(handle).ok_or(Error::UnknownHandle(handle.0))?;
        let Some(clip) = h.clip else {
            return Ok(());
        };
        let mut data = self
            .sound_data(clip)?
            .output_destination(&h.emitter)
            .volume(h.amplitude(1.0))
            .playback_rate(PlaybackRate::Factor(f64::from(h.params.pitch)))
            .start_position(f64::from(h.paused_time));
        if h.params.looping {
            data = data.loop_region(..);
        }

        let sound = self
            .manager
            .play(data)
            .map_err(|e| backend_error("failed to play clip", e))?;
        if let Some(h) = self.get_mut(handle) {
            if let Some(mut previous) = h.sound.replace(sound) {
                previous.stop(Tween::default());
            }
        }
        Ok(())
    }

    fn stop(&mut self, handle: NativeHandleId) {
        if let Some(h) = self.get_mut(handle) {
            if let Some(mut sound) = h.sound.take() {
                sound.stop(Tween::default());
            }
            for mut shot in h.one_shots.drain(..) {
                shot.stop(Tween::default());
            }
            h.paused_time = 0.0;
        }
    }

    fn play_one_shot(
        &mut self,
        handle: NativeHandleId,
        clip: ClipId,
        volume_scale: f32,
    ) -> Result<()> {
        let data = self.sound_data(clip)?;
        let h = self.get(handle).ok_or(Error::UnknownHandle(handle.0))?;
        let data = data
            .output_destination(&h.emitter)
            .volume(h.amplitude(volume_scale))
            .playback_rate(PlaybackRate::Factor(f64::from(h.params.pitch)));

        let shot = self
            .manager
            .play(data)
            .map_err(|e| backend_error("failed to play one-shot", e))?;
        if let Some(h) = self.get_mut(handle) {
            h.one_shots.push(shot);
        }
        Ok(())
    }

    fn is_playing(&self, handle: NativeHandleId) -> bool {
        self.get(handle).is_some_and(KiraHandle::is_playing)
    }

    fn time(&self, handle: NativeHandleId) -> f32 {
        self.get(handle).map_or(0.0, |h| match &h.sound {
            Some(sound) if h.is_playing() => sound.position() as f32,
            _ => h.paused_time,
        })
    }

    fn set_time(&mut self, handle: NativeHandleId, seconds: f32) {
        let length = self
            .clip(handle)
            .and_then(|clip| self.clip_length(clip))
            .unwrap_or(0.0);
        if let Some(h) = self.get_mut(handle) {
            let seconds = seconds.clamp(0.0, length);
            h.paused_time = seconds;
            if let Some(sound) = h.sound.as_mut() {
                sound.seek_to(f64::from(seconds));
            }
        }
    }

    fn is_muted(&self, handle: NativeHandleId) -> bool {
        self.get(handle).is_some_and(|h| h.muted)
    }

    fn set_muted(&mut self, handle: NativeHandleId, muted: bool) {
        if let Some(h) = self.get_mut(handle) {
            h.muted = muted;
            h.apply_live_params();
        }
    }

    fn set_active(&mut self, handle: NativeHandleId, active: bool) {
        if let Some(h) = self.get_mut(handle) {
            h.active = active;
        }
    }

    fn set_position(&mut self, handle: NativeHandleId, position: Vec3) {
        if let Some(h) = self.get_mut(handle) {
            h.emitter.set_position(position, Tween::default());
        }
    }

    fn set_listener_pose(&mut self, pose: &Pose) {
        self.listener.set_position(pose.position, Tween::default());
        self.listener.set_orientation(pose.rotation, Tween::default());
    }

    fn clip_length(&self, clip: ClipId) -> Option<f32> {
        self.clips
            .get(clip.0 as usize)
            .map(|data| data.duration().as_secs_f32())
    }

    fn update(&mut self, _dt: f32) {
        for h in &mut self.handles {
            h.one_shots
                .retain(|shot| shot.state() != PlaybackState::Stopped);
            if !h.active && !h.is_playing() {
                h.sound = None;
            }
        }
    }
}
