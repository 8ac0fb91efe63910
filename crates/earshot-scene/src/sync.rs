//! Per-frame synchronization between the world and the virtual audio context.

use earshot_audio::{ListenerId, PlaybackBackend, ProxyLease, VirtualAudio, VirtualVoice};
use hashbrown::{HashMap, HashSet};
use hecs::{Entity, World};

use crate::components::{AudioListener, Transform};

/// Mirrors [`AudioListener`] entities into the listener registry.
#[derive(Debug, Default)]
pub struct ListenerSync {
    registered: HashMap<Entity, ListenerId>,
    seen: HashSet<Entity>,
}

impl ListenerSync {
    /// Create an empty synchronizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry id of an entity's listener, if registered.
    #[must_use]
    pub fn listener_id(&self, entity: Entity) -> Option<ListenerId> {
        self.registered.get(&entity).copied()
    }

    /// Number of registered listener entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// Check if no listener entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Register new listeners, move existing ones and drop the ones whose
    /// entity was despawned or disabled.
    pub fn sync<B: PlaybackBackend>(&mut self, world: &World, audio: &mut VirtualAudio<B>) {
        self.seen.clear();

        let mut query = world.query::<(&Transform, &AudioListener)>();
        for (entity, (transform, listener)) in query.iter() {
            if !listener.enabled {
                continue;
            }
            let pose = transform.pose();
            match self.registered.get(&entity) {
                Some(&id) => {
                    audio.set_listener_pose(id, pose);
                }
                None => {
                    let Some(id) = audio.register_listener(pose) else {
                        continue;
                    };
                    self.registered.insert(entity, id);
                }
            }
            self.seen.insert(entity);
        }

        let seen = &self.seen;
        self.registered.retain(|entity, id| {
            let keep = seen.contains(entity);
            if !keep {
                audio.unregister_listener(*id);
            }
            keep
        });
    }
}

/// Outcome of one [`VoiceSync::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoiceFrame {
    /// Voices holding a proxy after the tick.
    pub active: usize,
    /// Voices without a proxy after the tick.
    pub idle: usize,
    /// Leases returned for despawned voice entities.
    pub reclaimed: usize,
}

/// Drives every [`VirtualVoice`] component once per frame.
#[derive(Debug, Default)]
pub struct VoiceSync {
    leases: HashMap<Entity, ProxyLease>,
    seen: HashSet<Entity>,
}

impl VoiceSync {
    /// Create an empty synchronizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start, move and tick every voice.
    ///
    /// Voices on entities with a [`Transform`] follow it. Proxies held by voices
    /// whose entity has been despawned are returned to the pool. A failing
    /// voice is logged and skipped.
    pub fn tick<B: PlaybackBackend>(
        &mut self,
        world: &mut World,
        audio: &mut VirtualAudio<B>,
    ) -> VoiceFrame {
        let mut frame = VoiceFrame::default();
        self.seen.clear();

        for (entity, (voice, transform)) in
            world.query_mut::<(&mut VirtualVoice, Option<&Transform>)>()
        {
            if let Some(transform) = transform {
                voice.set_pose(transform.pose());
            }
            let ticked = voice.start(audio).and_then(|()| voice.tick(audio));
            if let Err(err) = ticked {
                tracing::warn!(?entity, %err, "Virtual voice tick failed");
            }

            match voice.proxy() {
                Some(lease) => {
                    self.leases.insert(entity, lease);
                    frame.active += 1;
                }
                None => {
                    self.leases.remove(&entity);
                    frame.idle += 1;
                }
            }
            self.seen.insert(entity);
        }

        let seen = &self.seen;
        self.leases.retain(|entity, lease| {
            let keep = seen.contains(entity);
            if !keep && audio.release_proxy(*lease) {
                tracing::debug!(?entity, "Reclaimed proxy from despawned voice");
                frame.reclaimed += 1;
            }
            keep
        });
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use earshot_audio::HeadlessBackend;
    use earshot_core::{VirtualAudioConfig, VoiceSettings};
    use glam::Vec3;

    fn audio() -> VirtualAudio<HeadlessBackend> {
        VirtualAudio::new(HeadlessBackend::new(), VirtualAudioConfig::default())
    }

    fn camera(world: &mut World, x: f32) -> Entity {
        world.spawn((
            Transform::from_position(Vec3::new(x, 0.0, 0.0)),
            AudioListener::default(),
        ))
    }

    fn registry_len(audio: &VirtualAudio<HeadlessBackend>) -> usize {
        audio
            .existing_manager()
            .map_or(0, |manager| manager.listeners.len())
    }

    #[test]
    fn listeners_follow_entities() {
        let mut world = World::new();
        let mut audio = audio();
        let mut listeners = ListenerSync::new();

        let a = camera(&mut world, 0.0);
        let b = camera(&mut world, 50.0);
        listeners.sync(&world, &mut audio);
        assert_eq!(listeners.len(), 2);
        assert_eq!(registry_len(&audio), 2);

        world.get::<&mut Transform>(a).unwrap().position = Vec3::new(10.0, 0.0, 0.0);
        listeners.sync(&world, &mut audio);
        let id = listeners.listener_id(a).unwrap();
        let pose = audio.existing_manager().unwrap().listeners.pose(id).unwrap();
        assert_eq!(pose.position, Vec3::new(10.0, 0.0, 0.0));

        world.despawn(b).unwrap();
        listeners.sync(&world, &mut audio);
        assert_eq!(listeners.len(), 1);
        assert_eq!(registry_len(&audio), 1);
        assert!(listeners.listener_id(b).is_none());
    }

    #[test]
    fn disabled_listener_is_unregistered() {
        let mut world = World::new();
        let mut audio = audio();
        let mut listeners = ListenerSync::new();

        let a = camera(&mut world, 0.0);
        listeners.sync(&world, &mut audio);
        world.get::<&mut AudioListener>(a).unwrap().enabled = false;
        listeners.sync(&world, &mut audio);
        assert!(listeners.is_empty());
        assert_eq!(registry_len(&audio), 0);

        world.get::<&mut AudioListener>(a).unwrap().enabled = true;
        listeners.sync(&world, &mut audio);
        assert_eq!(registry_len(&audio), 1);
    }

    #[test]
    fn voices_start_and_follow_transform() {
        let mut world = World::new();
        let mut audio = audio();
        let clip = audio.backend_mut().add_clip(1.0);
        let mut listeners = ListenerSync::new();
        let mut voices = VoiceSync::new();

        camera(&mut world, 0.0);
        let emitter = world.spawn((
            Transform::from_position(Vec3::new(3.0, 0.0, 0.0)),
            VirtualVoice::primary(VoiceSettings::with_clip(clip).looping(true)),
        ));
        world.spawn((VirtualVoice::primary(
            VoiceSettings::with_clip(clip).play_on_awake(false),
        ),));

        listeners.sync(&world, &mut audio);
        let frame = voices.tick(&mut world, &mut audio);
        assert_eq!(frame.active, 1);
        assert_eq!(frame.idle, 1);

        let voice = world.get::<&VirtualVoice>(emitter).unwrap();
        assert_eq!(voice.pose().position, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn despawned_voice_returns_proxy() {
        let mut world = World::new();
        let mut audio = audio();
        let clip = audio.backend_mut().add_clip(1.0);
        let mut voices = VoiceSync::new();

        let emitter = world.spawn((VirtualVoice::primary(
            VoiceSettings::with_clip(clip).looping(true),
        ),));
        voices.tick(&mut world, &mut audio);
        let pool = &audio.existing_manager().unwrap().pool;
        assert_eq!(pool.lent_len(), 1);

        world.despawn(emitter).unwrap();
        audio.advance(1.0 / 60.0);
        let frame = voices.tick(&mut world, &mut audio);
        assert_eq!(frame.reclaimed, 1);
        let pool = &audio.existing_manager().unwrap().pool;
        assert_eq!(pool.lent_len(), 0);
        assert_eq!(pool.free_len(), 1);
    }
}
