//! Math utilities and types
//!
//! Fundamental math types for instance transforms and steering, built on
//! `nalgebra`.

pub use nalgebra::{Matrix4, Unit, UnitQuaternion, Vector2, Vector3};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Transform representing position, rotation, and scale
///
/// Used as the world anchor of an instance grid; per-instance transforms are
/// stored as raw [`Mat4`] values.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// Extension trait for [`Mat4`] with instance-transform accessors
///
/// Instance matrices are stored column-major; these helpers name the pieces
/// the steering update reads and writes.
pub trait Mat4Ext {
    /// Compose a transform matrix from position, rotation, and scale
    fn from_trs(position: Vec3, rotation: Quat, scale: Vec3) -> Mat4;

    /// Extract the translation column
    fn translation(&self) -> Vec3;

    /// The up basis vector (second column), scale included
    fn basis_y(&self) -> Vec3;

    /// The forward basis vector (third column), scale included
    fn basis_z(&self) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn from_trs(position: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
        Mat4::new_translation(&position)
            * rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&scale)
    }

    fn translation(&self) -> Vec3 {
        Vec3::new(self[(0, 3)], self[(1, 3)], self[(2, 3)])
    }

    fn basis_y(&self) -> Vec3 {
        Vec3::new(self[(0, 1)], self[(1, 1)], self[(2, 1)])
    }

    fn basis_z(&self) -> Vec3 {
        Vec3::new(self[(0, 2)], self[(1, 2)], self[(2, 2)])
    }
}

/// Math utility functions
pub mod utils {
    /// Clamp a value between min and max
    #[must_use]
    pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
        if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        }
    }
}
