//! Process-scoped virtual audio context.

use earshot_core::{Pose, VirtualAudioConfig};

use crate::anchor::ReferenceAnchor;
use crate::backend::PlaybackBackend;
use crate::listener::{ListenerId, ListenerRegistry};
use crate::pool::{ProxyLease, ProxyPool};

/// Shared state behind every virtual voice: anchor, listeners and proxies.
#[derive(Debug)]
pub struct VirtualAudioManager {
    /// Anchor hosting the real listener.
    pub anchor: ReferenceAnchor,
    /// Live virtual listeners.
    pub listeners: ListenerRegistry,
    /// Proxy playback handles.
    pub pool: ProxyPool,
}

impl VirtualAudioManager {
    fn new<B: PlaybackBackend + ?Sized>(config: &VirtualAudioConfig, backend: &mut B) -> Self {
        tracing::info!(
            anchor = ?config.anchor.position,
            capacity = ?config.pool.capacity,
            "Virtual audio manager created"
        );
        Self {
            anchor: ReferenceAnchor::new(config.anchor, backend),
            listeners: ListenerRegistry::new(),
            pool: ProxyPool::new(config.pool),
        }
    }
}

/// Borrowed view of the manager and backend for one voice operation.
pub struct AudioSession<'a, B> {
    /// Anchor, listeners and proxy pool.
    pub manager: &'a mut VirtualAudioManager,
    /// Playback engine the proxies live on.
    pub backend: &'a mut B,
    /// Active configuration.
    pub config: &'a VirtualAudioConfig,
    /// Tick time in seconds.
    pub now: f64,
}

/// Virtual audio context passed to every voice.
///
/// Owns the playback backend and the clock. The manager (anchor, listener
/// registry and proxy pool) is created on first use so that scenes which never
/// virtualize pay nothing. After [`shutdown`](Self::shutdown) every voice
/// operation degrades to a no-op.
#[derive(Debug)]
pub struct VirtualAudio<B> {
    backend: B,
    config: VirtualAudioConfig,
    manager: Option<VirtualAudioManager>,
    shut_down: bool,
    now: f64,
    frame_number: u64,
}

impl<B: PlaybackBackend> VirtualAudio<B> {
    /// Create a context. Nothing is allocated on the backend yet.
    pub fn new(backend: B, config: VirtualAudioConfig) -> Self {
        Self {
            backend,
            config,
            manager: None,
            shut_down: false,
            now: 0.0,
            frame_number: 0,
        }
    }

    /// The playback backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the playback backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Active configuration.
    pub const fn config(&self) -> &VirtualAudioConfig {
        &self.config
    }

    /// Current time in seconds.
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// Number of frames advanced.
    pub const fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Advance the clock and let the backend advance its playheads.
    pub fn advance(&mut self, dt: f32) {
        self.backend.update(dt);
        self.now += f64::from(dt);
        self.frame_number += 1;
    }

    /// Check if the manager has been created.
    pub const fn is_initialized(&self) -> bool {
        self.manager.is_some()
    }

    /// Check if the context was shut down.
    pub const fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// The manager, creating it on first access. `None` after shutdown.
    pub fn manager(&mut self) -> Option<&mut VirtualAudioManager> {
        self.session().map(|session| session.manager)
    }

    /// The manager if it already exists.
    pub const fn existing_manager(&self) -> Option<&VirtualAudioManager> {
        self.manager.as_ref()
    }

    /// Borrow manager and backend together, creating the manager on first access.
    pub fn session(&mut self) -> Option<AudioSession<'_, B>> {
        if self.shut_down {
            return None;
        }
        if self.manager.is_none() {
            self.manager = Some(VirtualAudioManager::new(&self.config, &mut self.backend));
        }
        self.existing_session()
    }

    /// Borrow manager and backend together without creating the manager.
    pub fn existing_session(&mut self) -> Option<AudioSession<'_, B>> {
        let manager = self.manager.as_mut()?;
        Some(AudioSession {
            manager,
            backend: &mut self.backend,
            config: &self.config,
            now: self.now,
        })
    }

    /// Register a virtual listener. `None` after shutdown.
    pub fn register_listener(&mut self, pose: Pose) -> Option<ListenerId> {
        let id = self.manager()?.listeners.register(pose);
        tracing::debug!(?id, "Registered virtual listener");
        Some(id)
    }

    /// Unregister a virtual listener. No-op for unknown ids or a missing manager.
    pub fn unregister_listener(&mut self, id: ListenerId) -> bool {
        let removed = self
            .manager
            .as_mut()
            .is_some_and(|manager| manager.listeners.unregister(id));
        if removed {
            tracing::debug!(?id, "Unregistered virtual listener");
        }
        removed
    }

    /// Move a virtual listener.
    pub fn set_listener_pose(&mut self, id: ListenerId, pose: Pose) -> bool {
        self.manager
            .as_mut()
            .is_some_and(|manager| manager.listeners.set_pose(id, pose))
    }

    /// Return a proxy lease to the pool. No-op for stale leases or a missing manager.
    pub fn release_proxy(&mut self, lease: ProxyLease) -> bool {
        self.existing_session()
            .is_some_and(|session| session.manager.pool.release(session.backend, lease))
    }

    /// Stop every proxy and drop the manager.
    ///
    /// Voices still holding leases become idle on their next call.
    pub fn shutdown(&mut self) {
        if let Some(mut manager) = self.manager.take() {
            manager.pool.release_all(&mut self.backend);
            tracing::info!(proxies = manager.pool.len(), "Virtual audio shut down");
        }
        self.shut_down = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessBackend;
    use glam::Vec3;

    #[test]
    fn manager_is_lazy() {
        let config = VirtualAudioConfig::default()
            .with_anchor(Pose::from_position(Vec3::new(0.0, -100.0, 0.0)));
        let mut audio = VirtualAudio::new(HeadlessBackend::new(), config);
        assert!(!audio.is_initialized());
        assert_eq!(audio.backend().listener_pose(), &Pose::IDENTITY);

        audio.register_listener(Pose::IDENTITY).unwrap();
        assert!(audio.is_initialized());
        assert_eq!(audio.backend().listener_pose().position, Vec3::new(0.0, -100.0, 0.0));
    }

    #[test]
    fn unregister_without_manager_is_noop() {
        let mut audio = VirtualAudio::new(HeadlessBackend::new(), VirtualAudioConfig::default());
        let other = {
            let mut scratch =
                VirtualAudio::new(HeadlessBackend::new(), VirtualAudioConfig::default());
            scratch.register_listener(Pose::IDENTITY).unwrap()
        };
        assert!(!audio.unregister_listener(other));
        assert!(!audio.is_initialized());
    }

    #[test]
    fn shutdown_disables_manager() {
        let mut audio = VirtualAudio::new(HeadlessBackend::new(), VirtualAudioConfig::default());
        let id = audio.register_listener(Pose::IDENTITY).unwrap();
        audio.shutdown();

        assert!(audio.is_shut_down());
        assert!(audio.manager().is_none());
        assert!(audio.register_listener(Pose::IDENTITY).is_none());
        assert!(!audio.unregister_listener(id));
    }

    #[test]
    fn advance_moves_clock() {
        let mut audio = VirtualAudio::new(HeadlessBackend::new(), VirtualAudioConfig::default());
        audio.advance(0.5);
        audio.advance(0.25);
        assert!((audio.now() - 0.75).abs() < 1e-9);
        assert_eq!(audio.frame_number(), 2);
    }
}
