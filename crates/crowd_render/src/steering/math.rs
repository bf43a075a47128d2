//! Pure steering math
//!
//! Stateless routines shared by the flock update. All steering happens in
//! the horizontal (XZ) plane; the vertical component is dropped from the
//! pursuit direction, not re-normalized afterwards.

use crate::foundation::math::{utils, Quat, Vec3};

/// Blend weight between the pursuit direction and the separation-derived
/// forward vector when building the look rotation. 0.3 favors the pursuit
/// direction.
pub const HEADING_BLEND: f32 = 0.3;

/// Normalized direction from `from` to `to` with the vertical component
/// zeroed.
///
/// The result is normalized *before* flattening, so its magnitude can be
/// below 1 when the two points differ in height. A zero-length offset
/// produces NaN components.
#[must_use]
pub fn horizontal_direction(from: Vec3, to: Vec3) -> Vec3 {
    let mut dir = (to - from).normalize();
    dir.y = 0.0;
    dir
}

/// Separation contribution pushing `self_pos` away from `neighbor_pos`.
///
/// The push scales linearly from full strength at zero distance down to
/// nothing at `separation_dist` and beyond.
///
/// Two instances at the exact same position make the divisor zero and the
/// contribution NaN, which then propagates through that instance's
/// transform for the frame. This matches the reference behavior and is
/// intentionally not guarded; the cache rebuild path self-corrects on the
/// next topology change.
#[must_use]
pub fn separation_vector(self_pos: Vec3, neighbor_pos: Vec3, separation_dist: f32) -> Vec3 {
    let diff = self_pos - neighbor_pos;
    let diff_len = diff.norm();
    let scale = utils::clamp(1.0 - diff_len / separation_dist, 0.0, 1.0);
    diff * (scale / diff_len)
}

/// Rotation whose local +Z axis faces `forward`, with `up` as the up hint.
#[must_use]
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    Quat::face_towards(&forward, &up)
}

/// Blend the pursuit direction with the separation forward vector.
#[must_use]
pub fn blend_heading(target_dir: Vec3, forward: Vec3) -> Vec3 {
    target_dir.lerp(&forward, HEADING_BLEND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn horizontal_direction_drops_vertical_component() {
        let dir = horizontal_direction(Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 4.0, 0.0));
        assert_relative_eq!(dir.y, 0.0);
        // Normalized before flattening: x keeps its 3/5 share.
        assert_relative_eq!(dir.x, 0.6, epsilon = 1.0e-6);
        assert_relative_eq!(dir.z, 0.0);
    }

    #[test]
    fn separation_fades_out_at_distance() {
        let push = separation_vector(
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
            3.0,
        );
        assert_relative_eq!(push, Vec3::zeros());
    }

    #[test]
    fn separation_pushes_away_from_close_neighbor() {
        let push = separation_vector(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
            3.0,
        );
        assert!(push.x > 0.0);
        assert_relative_eq!(push.y, 0.0);
        // |diff| = 1, scale = 1 - 1/3, contribution = diff * scale / |diff|.
        assert_relative_eq!(push.x, 2.0 / 3.0, epsilon = 1.0e-6);
    }

    #[test]
    fn coincident_neighbor_produces_nan() {
        let pos = Vec3::new(2.0, 0.0, 2.0);
        let push = separation_vector(pos, pos, 3.0);
        assert!(push.x.is_nan());
    }

    #[test]
    fn look_rotation_faces_forward() {
        let rot = look_rotation(Vec3::new(1.0, 0.0, 0.0), Vec3::y());
        let forward = rot * Vec3::z();
        assert_relative_eq!(forward, Vec3::new(1.0, 0.0, 0.0), epsilon = 1.0e-6);
    }

    #[test]
    fn heading_blend_favors_target_direction() {
        let blended = blend_heading(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(blended.x, 0.7, epsilon = 1.0e-6);
        assert_relative_eq!(blended.z, 0.3, epsilon = 1.0e-6);
    }
}
