//! Math utilities and helpers.

use glam::{Affine3A, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A position, orientation and scale in world space.
///
/// Poses are what listeners, emitters and the reference anchor are
/// positioned with. Point transforms follow the usual scene-graph
/// convention: scale, then rotate, then translate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pose {
    /// World position
    pub position: Vec3,
    /// World orientation
    pub rotation: Quat,
    /// Per-axis scale
    pub scale: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    /// Pose at the origin with no rotation and unit scale.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a pose from a position and rotation with unit scale.
    #[inline]
    #[must_use]
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Create an unrotated pose at a position.
    #[inline]
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Set the scale.
    #[inline]
    #[must_use]
    pub const fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Affine matrix mapping local points into world space.
    #[inline]
    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Transform a point from this pose's local space into world space.
    #[inline]
    #[must_use]
    pub fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.rotation * (local * self.scale) + self.position
    }

    /// Transform a world space point into this pose's local space.
    ///
    /// Axes with zero scale are left unscaled instead of producing infinities.
    #[inline]
    #[must_use]
    pub fn world_to_local(&self, world: Vec3) -> Vec3 {
        let unrotated = self.rotation.inverse() * (world - self.position);
        let safe_scale = Vec3::select(self.scale.cmpeq(Vec3::ZERO), Vec3::ONE, self.scale);
        unrotated / safe_scale
    }

    /// Squared distance between this pose's position and a point.
    #[inline]
    #[must_use]
    pub fn distance_squared(&self, point: Vec3) -> f32 {
        self.position.distance_squared(point)
    }
}
