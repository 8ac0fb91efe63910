//! Scene components.

use earshot_core::Pose;
use glam::{Quat, Vec3};

/// Transform component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// World position
    pub position: Vec3,
    /// World orientation
    pub rotation: Quat,
    /// Per-axis scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Transform at a position with no rotation.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Transform at a position looking towards `target`.
    #[must_use]
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let forward = (target - position).normalize_or_zero();
        let rotation = if forward == Vec3::ZERO {
            Quat::IDENTITY
        } else {
            Quat::from_rotation_arc(Vec3::NEG_Z, forward)
        };
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Pose equivalent of this transform.
    #[must_use]
    pub const fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
        }
    }
}

impl From<Transform> for Pose {
    fn from(transform: Transform) -> Self {
        transform.pose()
    }
}

/// Marks an entity (usually a camera) as a virtual listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioListener {
    /// Disabled listeners are unregistered until re-enabled.
    pub enabled: bool,
}

impl Default for AudioListener {
    fn default() -> Self {
        Self { enabled: true }
    }
}
