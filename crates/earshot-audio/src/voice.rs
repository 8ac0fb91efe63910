//! Virtual voices: per-emitter playback routed through pooled proxies.
//!
//! A [`VirtualVoice`] is either the primary playback API for an emitter, owning
//! its clip and parameters, or an adapter mirroring a native handle someone
//! else plays. Both run the same per-tick state machine:
//!
//! ```text
//!            should be active
//!   Idle ──────────────────────────> Active ──┐ sync params, reposition,
//!    ^                                 │  ^   │ correct drift (adapter)
//!    │     inactive / stop / disable   │  └───┘
//!    └─────────────────────────────────┘
//! ```
//!
//! A voice holds a proxy lease exactly while it is `Active`.

use earshot_core::{ClipId, Error, PlaybackParams, Pose, Result, VoiceSettings};
use glam::Vec3;

use crate::backend::{NativeHandleId, PlaybackBackend};
use crate::context::{AudioSession, VirtualAudio};
use crate::listener::ListenerId;
use crate::pool::ProxyLease;

/// Whether a voice currently holds a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceState {
    /// No proxy held.
    #[default]
    Idle,
    /// Holding a proxy that is playing or inside a one-shot window.
    Active,
}

impl VoiceState {
    /// Returns `true` if the voice holds a proxy.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Primary voice state: the authoritative playback settings.
#[derive(Debug, Clone)]
pub struct PrimarySource {
    settings: VoiceSettings,
    /// End of the latest pending one-shot, in context time.
    one_shot_end: Option<f64>,
    started: bool,
}

impl PrimarySource {
    fn one_shot_active(&self, now: f64) -> bool {
        self.one_shot_end.is_some_and(|end| now < end)
    }
}

/// Adapter state: the native handle being mirrored.
#[derive(Debug, Clone, Copy)]
pub struct AdaptedSource {
    native: NativeHandleId,
    update_listener_while_playing: bool,
}

/// Where a voice's playback parameters come from.
#[derive(Debug, Clone)]
pub enum VoiceSource {
    /// The voice owns its clip and parameters.
    Primary(PrimarySource),
    /// The voice mirrors a pre-existing native handle, which it keeps muted.
    Adapter(AdaptedSource),
}

/// A virtual emitter rendered through a pooled proxy.
#[derive(Debug, Clone)]
pub struct VirtualVoice {
    source: VoiceSource,
    pose: Pose,
    proxy: Option<ProxyLease>,
    cached_listener: Option<ListenerId>,
    was_active: bool,
}

impl VirtualVoice {
    /// Create a primary voice.
    #[must_use]
    pub const fn primary(settings: VoiceSettings) -> Self {
        Self::with_source(VoiceSource::Primary(PrimarySource {
            settings,
            one_shot_end: None,
            started: false,
        }))
    }

    /// Create a voice mirroring an existing native handle.
    #[must_use]
    pub const fn adapter(native: NativeHandleId) -> Self {
        Self::with_source(VoiceSource::Adapter(AdaptedSource {
            native,
            update_listener_while_playing: false,
        }))
    }

    const fn with_source(source: VoiceSource) -> Self {
        Self {
            source,
            pose: Pose::IDENTITY,
            proxy: None,
            cached_listener: None,
            was_active: false,
        }
    }

    /// Set the emitter pose.
    #[must_use]
    pub const fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    /// Set whether the closest listener is re-resolved every tick while playing.
    #[must_use]
    pub fn with_update_listener_while_playing(mut self, update: bool) -> Self {
        self.set_update_listener_while_playing(update);
        self
    }

    /// Parameter source.
    #[must_use]
    pub const fn source(&self) -> &VoiceSource {
        &self.source
    }

    /// Wrapped native handle, for adapter voices.
    #[must_use]
    pub const fn native_handle(&self) -> Option<NativeHandleId> {
        match &self.source {
            VoiceSource::Adapter(adapted) => Some(adapted.native),
            VoiceSource::Primary(_) => None,
        }
    }

    /// Authored settings, for primary voices.
    #[must_use]
    pub const fn settings(&self) -> Option<&VoiceSettings> {
        match &self.source {
            VoiceSource::Primary(primary) => Some(&primary.settings),
            VoiceSource::Adapter(_) => None,
        }
    }

    /// Mutable authored settings, for primary voices. Edits apply on the next tick.
    pub fn settings_mut(&mut self) -> Option<&mut VoiceSettings> {
        match &mut self.source {
            VoiceSource::Primary(primary) => Some(&mut primary.settings),
            VoiceSource::Adapter(_) => None,
        }
    }

    /// Emitter pose.
    #[must_use]
    pub const fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Set the emitter pose, usually from its scene node each frame.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Set only the emitter position.
    pub fn set_position(&mut self, position: Vec3) {
        self.pose.position = position;
    }

    /// Whether the closest listener follows the emitter during playback.
    #[must_use]
    pub const fn update_listener_while_playing(&self) -> bool {
        match &self.source {
            VoiceSource::Primary(primary) => primary.settings.update_listener_while_playing,
            VoiceSource::Adapter(adapted) => adapted.update_listener_while_playing,
        }
    }

    /// Set whether the closest listener follows the emitter during playback.
    pub fn set_update_listener_while_playing(&mut self, update: bool) {
        match &mut self.source {
            VoiceSource::Primary(primary) => {
                primary.settings.update_listener_while_playing = update;
            }
            VoiceSource::Adapter(adapted) => adapted.update_listener_while_playing = update,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> VoiceState {
        if self.proxy.is_some() {
            VoiceState::Active
        } else {
            VoiceState::Idle
        }
    }

    /// Lease on the proxy currently held.
    #[must_use]
    pub const fn proxy(&self) -> Option<ProxyLease> {
        self.proxy
    }

    /// Listener the proxy was last positioned against.
    #[must_use]
    pub const fn listener(&self) -> Option<ListenerId> {
        self.cached_listener
    }

    /// End time of the one-shot window, for primary voices.
    #[must_use]
    pub const fn one_shot_end(&self) -> Option<f64> {
        match &self.source {
            VoiceSource::Primary(primary) => primary.one_shot_end,
            VoiceSource::Adapter(_) => None,
        }
    }

    /// Start a primary voice: plays its clip once if `play_on_awake` is set.
    ///
    /// Only the first call has any effect.
    pub fn start<B: PlaybackBackend>(&mut self, audio: &mut VirtualAudio<B>) -> Result<()> {
        let VoiceSource::Primary(primary) = &mut self.source else {
            return Ok(());
        };
        if primary.started {
            return Ok(());
        }
        primary.started = true;
        if primary.settings.play_on_awake && primary.settings.clip.is_some() {
            self.play(audio)?;
        }
        Ok(())
    }

    /// Assign the primary clip to the proxy and start it.
    ///
    /// No-op for adapters, for voices without a clip, and after shutdown.
    pub fn play<B: PlaybackBackend>(&mut self, audio: &mut VirtualAudio<B>) -> Result<()> {
        let VoiceSource::Primary(primary) = &self.source else {
            tracing::debug!("Ignoring play on an adapter voice");
            return Ok(());
        };
        if primary.settings.clip.is_none() {
            return Ok(());
        }
        let Some(mut session) = audio.session() else {
            return Ok(());
        };
        let Some(handle) = self.ensure_proxy(&mut session)? else {
            return Ok(());
        };

        self.sync_properties(session.backend, handle);
        self.update_proxy_position(&mut session, handle);
        session.backend.play(handle)?;
        self.was_active = true;
        Ok(())
    }

    /// Stop immediately: release the proxy and cancel any one-shot window.
    ///
    /// For adapters the wrapped native handle is stopped as well, otherwise the
    /// next tick would pick it straight back up.
    pub fn stop<B: PlaybackBackend>(&mut self, audio: &mut VirtualAudio<B>) {
        if let VoiceSource::Adapter(adapted) = &self.source {
            if audio.existing_manager().is_some() {
                audio.backend_mut().stop(adapted.native);
            }
        }
        self.disable(audio);
    }

    /// Release the proxy without touching authored settings, e.g. when the owner
    /// is disabled or destroyed.
    ///
    /// Releasing the proxy silences its one-shots, so the one-shot window is
    /// cleared too. Otherwise the next tick would take a proxy back for nothing.
    pub fn disable<B: PlaybackBackend>(&mut self, audio: &mut VirtualAudio<B>) {
        if let Some(lease) = self.proxy.take() {
            audio.release_proxy(lease);
        }
        if let VoiceSource::Primary(primary) = &mut self.source {
            primary.one_shot_end = None;
        }
        self.cached_listener = None;
        self.was_active = false;
    }

    /// Fire a one-shot through the proxy without touching the primary clip.
    ///
    /// Keeps the voice active until the one-shot's estimated end, computed once
    /// from the current pitch. Overlapping one-shots only ever extend the window.
    pub fn play_one_shot<B: PlaybackBackend>(
        &mut self,
        audio: &mut VirtualAudio<B>,
        clip: ClipId,
        volume_scale: f32,
    ) -> Result<()> {
        let pitch = match &self.source {
            VoiceSource::Primary(primary) => primary.settings.params.clamped().pitch,
            VoiceSource::Adapter(_) => {
                tracing::debug!("Ignoring one-shot on an adapter voice");
                return Ok(());
            }
        };
        let Some(mut session) = audio.session() else {
            return Ok(());
        };
        let length = session
            .backend
            .clip_length(clip)
            .ok_or(Error::UnknownClip(clip.0))?;
        let Some(handle) = self.ensure_proxy(&mut session)? else {
            return Ok(());
        };

        self.sync_properties(session.backend, handle);
        self.update_proxy_position(&mut session, handle);
        session.backend.play_one_shot(handle, clip, volume_scale)?;
        self.was_active = true;

        let duration = one_shot_duration(length, pitch, session.config.pitch_epsilon);
        let end = session.now + f64::from(duration);
        if let VoiceSource::Primary(primary) = &mut self.source {
            primary.one_shot_end = Some(primary.one_shot_end.map_or(end, |cur| cur.max(end)));
        }
        tracing::trace!(?clip, duration, end, "One-shot triggered");
        Ok(())
    }

    /// Run one tick of the state machine.
    ///
    /// Returns the state after the tick. A missing manager makes this a no-op.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn tick<B: PlaybackBackend>(&mut self, audio: &mut VirtualAudio<B>) -> Result<VoiceState> {
        let Some(mut session) = audio.session() else {
            return Ok(self.state());
        };

        if let Some(lease) = self.proxy {
            if !session.manager.pool.is_current(lease) {
                tracing::debug!(proxy = lease.id().index(), "Proxy was reclaimed by the pool");
                self.proxy = None;
                self.cached_listener = None;
                self.was_active = false;
            }
        }

        let should_be_active = match &self.source {
            VoiceSource::Primary(primary) => {
                let proxy_playing = self
                    .proxy
                    .and_then(|lease| session.manager.pool.handle(lease))
                    .is_some_and(|handle| session.backend.is_playing(handle));
                proxy_playing || primary.one_shot_active(session.now)
            }
            VoiceSource::Adapter(adapted) => {
                // The native handle keeps running for its playhead and looping;
                // only the proxy is heard.
                if !session.backend.is_muted(adapted.native) {
                    session.backend.set_muted(adapted.native, true);
                }
                session.backend.is_playing(adapted.native)
            }
        };

        if !should_be_active {
            if let Some(lease) = self.proxy.take() {
                session.manager.pool.release(session.backend, lease);
                tracing::debug!("Voice went idle");
            }
            self.cached_listener = None;
            self.was_active = false;
            return Ok(VoiceState::Idle);
        }

        let joining = self.proxy.is_none();
        let Some(handle) = self.ensure_proxy(&mut session)? else {
            self.was_active = false;
            return Ok(VoiceState::Idle);
        };

        self.sync_properties(session.backend, handle);

        if let VoiceSource::Adapter(adapted) = &self.source {
            let native_time = session.backend.time(adapted.native);
            if joining || !session.backend.is_playing(handle) {
                // Join at the source's playhead instead of restarting the sound.
                // A clip swap on the source stops the proxy, which rejoins the same way.
                session.backend.set_time(handle, native_time);
                session.backend.play(handle)?;
                tracing::debug!(native_time, joining, "Adapter joined native playback");
            } else if drift_exceeds(
                session.backend.time(handle),
                native_time,
                session.config.drift_tolerance,
            ) {
                tracing::trace!(native_time, "Correcting proxy drift");
                session.backend.set_time(handle, native_time);
            }
        }

        self.update_proxy_position(&mut session, handle);
        self.was_active = true;
        Ok(VoiceState::Active)
    }

    fn ensure_proxy<B: PlaybackBackend>(
        &mut self,
        session: &mut AudioSession<'_, B>,
    ) -> Result<Option<NativeHandleId>> {
        if let Some(lease) = self.proxy {
            if let Some(handle) = session.manager.pool.handle(lease) {
                return Ok(Some(handle));
            }
            self.proxy = None;
        }

        let park_at = session.manager.anchor.origin();
        let Some(lease) = session.manager.pool.acquire(session.backend, park_at)? else {
            return Ok(None);
        };
        self.proxy = Some(lease);
        Ok(session.manager.pool.handle(lease))
    }

    /// Copy every parameter onto the proxy. Only the clip is diffed.
    fn sync_properties<B: PlaybackBackend>(&self, backend: &mut B, handle: NativeHandleId) {
        let (params, clip) = match &self.source {
            VoiceSource::Primary(primary) => (primary.settings.params, primary.settings.clip),
            VoiceSource::Adapter(adapted) => (
                backend
                    .params(adapted.native)
                    .unwrap_or_else(PlaybackParams::default),
                backend.clip(adapted.native),
            ),
        };

        backend.set_params(handle, &params.clamped());
        if backend.clip(handle) != clip {
            backend.set_clip(handle, clip);
        }
    }

    fn update_proxy_position<B: PlaybackBackend>(
        &mut self,
        session: &mut AudioSession<'_, B>,
        handle: NativeHandleId,
    ) {
        let listeners = &session.manager.listeners;
        let emitter = self.pose.position;

        let locked = !self.update_listener_while_playing();
        let keep_cached = locked
            && self.was_active
            && self.cached_listener.is_some_and(|id| listeners.contains(id));
        if !keep_cached {
            self.cached_listener = listeners.closest(emitter);
        }

        let listener_pose = self.cached_listener.and_then(|id| listeners.pose(id));
        let position = session
            .manager
            .anchor
            .proxy_position(listener_pose.as_ref(), emitter);
        session.backend.set_position(handle, position);
        tracing::trace!(listener = ?self.cached_listener, ?position, "Positioned proxy");
    }
}

/// Estimated one-shot duration: clip length over pitch magnitude, clamped away from zero.
#[must_use]
pub fn one_shot_duration(clip_length: f32, pitch: f32, pitch_epsilon: f32) -> f32 {
    clip_length / pitch.abs().max(pitch_epsilon)
}

/// Whether two playheads differ by strictly more than `tolerance`.
#[must_use]
pub fn drift_exceeds(proxy_time: f32, source_time: f32, tolerance: f32) -> bool {
    (proxy_time - source_time).abs() > tolerance
}
