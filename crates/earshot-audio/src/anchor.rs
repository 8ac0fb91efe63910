//! Reference-frame anchor hosting the real listener.

use earshot_core::Pose;
use glam::Vec3;

use crate::backend::PlaybackBackend;

/// Fixed pose of the engine's single real listener.
///
/// Every proxy is positioned in this anchor's frame: an emitter's offset from
/// its closest virtual listener is replayed as the same offset from the anchor,
/// so the real listener hears it the way that virtual listener would.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceAnchor {
    pose: Pose,
}

impl ReferenceAnchor {
    /// Create the anchor and place the backend's real listener on it.
    pub fn new<B: PlaybackBackend + ?Sized>(pose: Pose, backend: &mut B) -> Self {
        backend.set_listener_pose(&pose);
        Self { pose }
    }

    /// The anchor pose.
    #[must_use]
    pub const fn pose(&self) -> &Pose {
        &self.pose
    }

    /// The anchor's local origin in world space, where unplaced proxies are parked.
    #[must_use]
    pub const fn origin(&self) -> Vec3 {
        self.pose.position
    }

    /// World position for a proxy of an emitter at `emitter`.
    ///
    /// Expresses the emitter in `listener`'s local frame, then re-expresses that
    /// offset in the anchor frame. Without a listener the proxy sits at the
    /// anchor origin.
    #[must_use]
    pub fn proxy_position(&self, listener: Option<&Pose>, emitter: Vec3) -> Vec3 {
        listener.map_or_else(
            || self.origin(),
            |listener| {
                let relative = listener.world_to_local(emitter);
                self.pose.local_to_world(relative)
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessBackend;
    use approx::assert_relative_eq;
    use glam::Quat;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn places_real_listener() {
        let mut backend = HeadlessBackend::new();
        let pose = Pose::from_position(Vec3::new(0.0, -1000.0, 0.0));
        let anchor = ReferenceAnchor::new(pose, &mut backend);
        assert_eq!(backend.listener_pose(), &pose);
        assert_eq!(anchor.origin(), pose.position);
    }

    #[test]
    fn no_listener_parks_at_origin() {
        let mut backend = HeadlessBackend::new();
        let anchor =
            ReferenceAnchor::new(Pose::from_position(Vec3::new(3.0, 4.0, 5.0)), &mut backend);
        assert_eq!(
            anchor.proxy_position(None, Vec3::new(100.0, 0.0, 0.0)),
            Vec3::new(3.0, 4.0, 5.0)
        );
    }

    #[test]
    fn offset_is_replayed_from_anchor() {
        let mut backend = HeadlessBackend::new();
        let anchor = ReferenceAnchor::new(
            Pose::from_position(Vec3::new(0.0, -1000.0, 0.0)),
            &mut backend,
        );
        let listener = Pose::from_position(Vec3::new(50.0, 0.0, 50.0));
        let emitter = Vec3::new(52.0, 1.0, 50.0);

        let proxy = anchor.proxy_position(Some(&listener), emitter);
        assert_relative_eq!(proxy.x, 2.0);
        assert_relative_eq!(proxy.y, -999.0);
        assert_relative_eq!(proxy.z, 0.0);
    }

    #[test]
    fn listener_rotation_is_respected() {
        let mut backend = HeadlessBackend::new();
        let anchor = ReferenceAnchor::new(Pose::IDENTITY, &mut backend);

        // Listener turned a quarter left: something on its world -X is straight ahead.
        let listener = Pose::new(Vec3::ZERO, Quat::from_rotation_y(FRAC_PI_2));
        let proxy = anchor.proxy_position(Some(&listener), Vec3::new(-3.0, 0.0, 0.0));
        assert_relative_eq!(proxy.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(proxy.z, -3.0, epsilon = 1e-5);
    }
}
