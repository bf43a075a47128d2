//! Camera pass-through

use crate::foundation::math::Vec3;

/// View information handed through to the draw backend
///
/// The renderer does no culling or projection of its own; the camera is an
/// opaque per-frame input forwarded with every draw so backends can route
/// submissions to the right view.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Eye position
    pub position: Vec3,

    /// Point the camera looks at
    pub look_at: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 10.0, -10.0),
            look_at: Vec3::zeros(),
        }
    }
}
