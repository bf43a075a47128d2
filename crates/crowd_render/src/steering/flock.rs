//! Per-frame flock update over an instance transform array

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::steering::math::{blend_heading, horizontal_direction, look_rotation, separation_vector};

/// Instances closer to the target than this are considered arrived and are
/// left untouched for the frame.
pub const ARRIVAL_RADIUS: f32 = 1.0;

/// Time constant (seconds) for orientation smoothing. The slerp factor is
/// the frame delta divided by this, independent of the steering delta.
pub const ROTATION_SMOOTHING: f32 = 0.2;

/// Default seed for the neighbor-sampling stream.
pub const DEFAULT_SEED: u64 = 100;

/// Steering tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockParams {
    /// Movement speed in units per second
    pub speed: f32,

    /// Distance under which neighbors start pushing each other apart
    pub separation_distance: f32,

    /// Number of random neighbor samples per instance per frame
    pub max_neighbors: usize,
}

impl Default for FlockParams {
    fn default() -> Self {
        Self {
            speed: 1.0,
            separation_distance: 3.0,
            max_neighbors: 50,
        }
    }
}

/// Applies the steering pass across a full instance set once per frame.
///
/// Owns the random stream used for neighbor sampling. The stream is seeded
/// once at construction and never reseeded, so the sample sequence is
/// deterministic for a given seed but cumulative across frames: two
/// updaters built from the same seed stay in lockstep only if they process
/// identical instance counts every frame.
pub struct FlockUpdater {
    rng: StdRng,
}

impl Default for FlockUpdater {
    fn default() -> Self {
        Self::new()
    }
}

impl FlockUpdater {
    /// Create an updater with the default seed
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Create an updater with an explicit seed
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Recompute position and orientation for every instance transform.
    ///
    /// `delta_time` scales the positional step (uncapped: a large value
    /// overshoots rather than clamping); `frame_delta` drives the 0.2 s
    /// orientation smoothing. The two are distinct timing sources even
    /// though callers typically pass the same frame delta for both.
    ///
    /// Aliasing policy: this is a single in-place pass. Neighbor samples at
    /// indices below the current one observe positions already rewritten
    /// this frame; samples above observe last frame's values. The loop body
    /// carries no other cross-instance dependency, so splitting the pass
    /// over disjoint chunks preserves the same (accepted) read race.
    ///
    /// Degenerate inputs are not guarded: coincident instances or a target
    /// exactly at an instance's position can introduce NaN into that
    /// instance's transform for the frame.
    pub fn update(
        &mut self,
        matrices: &mut [Mat4],
        target: Vec3,
        params: &FlockParams,
        delta_time: f32,
        frame_delta: f32,
    ) {
        let len = matrices.len();
        for i in 0..len {
            let matrix = matrices[i];
            let position = matrix.translation();
            if (target - position).norm() < ARRIVAL_RADIUS {
                continue;
            }

            let target_dir = horizontal_direction(position, target);
            let mut separation = target_dir;
            for k in 0..params.max_neighbors {
                // Sample count is bounded by the instance count; out-of-range
                // sample slots do not consume from the random stream.
                if k >= len {
                    continue;
                }
                let index = self.rng.gen_range(0..len);
                if index == i {
                    continue;
                }
                let neighbor = matrices[index].translation();
                separation += separation_vector(position, neighbor, params.separation_distance);
            }

            let forward = separation.normalize();
            let position = position.lerp(&(position + forward), delta_time * params.speed);

            let look = look_rotation(blend_heading(target_dir, forward), Vec3::y());
            let previous = look_rotation(matrix.basis_z(), matrix.basis_y());
            let look = previous
                .try_slerp(&look, frame_delta / ROTATION_SMOOTHING, 1.0e-9)
                .unwrap_or(look);

            // Scale intentionally resets to 1: grid scale from creation does
            // not survive steering.
            matrices[i] = Mat4::from_trs(position, look, Vec3::new(1.0, 1.0, 1.0));
        }
    }
}
