//! Registry of virtual listeners.

use earshot_core::Pose;
use glam::Vec3;

/// Handle to a registered virtual listener.
///
/// Carries a generation so a handle kept after its listener was unregistered
/// resolves to nothing instead of to whichever listener reused the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId {
    index: u32,
    generation: u32,
}

/// A logical listening position, e.g. one split-screen camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VirtualListener {
    /// World pose of the listener.
    pub pose: Pose,
}

#[derive(Debug)]
struct ListenerSlot {
    generation: u32,
    listener: Option<VirtualListener>,
}

/// Live set of virtual listeners with nearest-neighbour lookup.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    slots: Vec<ListenerSlot>,
    free: Vec<u32>,
    len: usize,
}

impl ListenerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered listeners.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if no listener is registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Register a listener at the given pose.
    pub fn register(&mut self, pose: Pose) -> ListenerId {
        let listener = Some(VirtualListener { pose });
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.listener = listener;
            return ListenerId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(ListenerSlot {
            generation: 0,
            listener,
        });
        ListenerId {
            index,
            generation: 0,
        }
    }

    /// Remove a listener. Unregistering a stale or unknown id is a no-op.
    ///
    /// Returns whether a listener was removed.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        slot.listener = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        true
    }

    /// Check if a listener is still registered.
    #[must_use]
    pub fn contains(&self, id: ListenerId) -> bool {
        self.get(id).is_some()
    }

    /// Look up a live listener.
    #[must_use]
    pub fn get(&self, id: ListenerId) -> Option<&VirtualListener> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.listener.as_ref())
    }

    /// Pose of a live listener.
    #[must_use]
    pub fn pose(&self, id: ListenerId) -> Option<Pose> {
        self.get(id).map(|l| l.pose)
    }

    /// Move a listener. Returns `false` if the id is stale.
    pub fn set_pose(&mut self, id: ListenerId, pose: Pose) -> bool {
        match self.slot_mut(id) {
            Some(slot) => {
                if let Some(listener) = slot.listener.as_mut() {
                    listener.pose = pose;
                }
                true
            }
            None => false,
        }
    }

    /// Iterate over live listeners.
    pub fn iter(&self) -> impl Iterator<Item = (ListenerId, &VirtualListener)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.listener.as_ref().map(|listener| {
                (
                    ListenerId {
                        index: i as u32,
                        generation: slot.generation,
                    },
                    listener,
                )
            })
        })
    }

    /// Find the listener closest to `position` by squared distance.
    ///
    /// Ties go to the first listener encountered. Returns `None` when no
    /// listener is registered.
    #[must_use]
    pub fn closest(&self, position: Vec3) -> Option<ListenerId> {
        let mut closest = None;
        let mut min_distance = f32::MAX;

        for (id, listener) in self.iter() {
            let distance = listener.pose.distance_squared(position);
            if distance < min_distance {
                min_distance = distance;
                closest = Some(id);
            }
        }
        closest
    }

    fn slot_mut(&mut self, id: ListenerId) -> Option<&mut ListenerSlot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.listener.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32) -> Pose {
        Pose::from_position(Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn closest_of_two() {
        let mut registry = ListenerRegistry::new();
        let a = registry.register(at(0.0));
        let b = registry.register(at(10.0));

        assert_eq!(registry.closest(Vec3::new(1.0, 0.0, 0.0)), Some(a));
        assert_eq!(registry.closest(Vec3::new(9.0, 0.0, 0.0)), Some(b));
    }

    #[test]
    fn closest_empty() {
        let registry = ListenerRegistry::new();
        assert_eq!(registry.closest(Vec3::ZERO), None);
    }

    #[test]
    fn tie_goes_to_first() {
        let mut registry = ListenerRegistry::new();
        let a = registry.register(at(-1.0));
        let _b = registry.register(at(1.0));
        assert_eq!(registry.closest(Vec3::ZERO), Some(a));
    }

    #[test]
    fn unregister_skips_listener() {
        let mut registry = ListenerRegistry::new();
        let a = registry.register(at(0.0));
        let b = registry.register(at(10.0));

        assert!(registry.unregister(a));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.closest(Vec3::ZERO), Some(b));
    }

    #[test]
    fn unregister_twice_is_noop() {
        let mut registry = ListenerRegistry::new();
        let a = registry.register(at(0.0));
        assert!(registry.unregister(a));
        assert!(!registry.unregister(a));
        assert!(registry.is_empty());
    }

    #[test]
    fn stale_id_does_not_alias_reused_slot() {
        let mut registry = ListenerRegistry::new();
        let a = registry.register(at(0.0));
        registry.unregister(a);
        let b = registry.register(at(5.0));

        assert!(!registry.contains(a));
        assert!(registry.contains(b));
        assert_eq!(registry.pose(a), None);
        assert!(!registry.set_pose(a, at(1.0)));
        assert!(!registry.unregister(a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn set_pose_moves_listener() {
        let mut registry = ListenerRegistry::new();
        let a = registry.register(at(0.0));
        let b = registry.register(at(10.0));
        assert!(registry.set_pose(a, at(20.0)));
        assert_eq!(registry.closest(Vec3::new(1.0, 0.0, 0.0)), Some(b));
    }
}
