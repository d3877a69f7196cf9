use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A rigid transform relative to a parent frame (or the world when the part
/// is free-standing).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }

    /// `self` is the parent frame, `local` is expressed in it.
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose {
            translation: self.translation + self.rotation * local.translation,
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }

    pub fn approx_eq(&self, other: &Pose, eps: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, eps)
            && self.rotation.abs_diff_eq(other.rotation, eps)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}
