//! Crowd demo: a grid of animated walkers chasing an orbiting target
//!
//! Runs the full render cycle over the headless backend and logs cache and
//! draw statistics, standing in for a windowed animation driver.

use std::sync::Arc;

use crowd_render::config::CrowdSettings;
use crowd_render::foundation::math::Vec3;
use crowd_render::foundation::time::FrameTimer;
use crowd_render::render::backends::headless::{HeadlessDevice, RecordingBackend};
use crowd_render::render::gpu::GpuDevice;
use crowd_render::render::primitives::{Camera, Material, Mesh, PropertyBlock, SubMesh};
use crowd_render::render::renderer::InstancedRenderer;

// Demo configuration
const CLIPS_COUNT: u32 = 4; // idle, walk, run, wave
const FRAME_COUNT: u64 = 600; // ten seconds at the fixed step
const FIXED_DELTA: f32 = 1.0 / 60.0;
const TARGET_ORBIT_RADIUS: f32 = 30.0;
const TARGET_ORBIT_SPEED: f32 = 0.4; // radians per second
const LOG_EVERY: u64 = 60;
const SETTINGS_PATH: &str = "crowd_settings.toml";

fn walker_mesh() -> Mesh {
    // Body plus a separately-textured head, so the indirect path exercises
    // multiple sub-mesh draws per entry.
    Mesh::new(
        "walker",
        1_024,
        vec![
            SubMesh {
                index_count: 2_400,
                index_start: 0,
                base_vertex: 0,
            },
            SubMesh {
                index_count: 720,
                index_start: 2_400,
                base_vertex: 640,
            },
        ],
    )
}

fn main() {
    env_logger::init();

    let settings = match CrowdSettings::load_from_file(SETTINGS_PATH) {
        Ok(settings) => {
            log::info!("loaded settings from {SETTINGS_PATH}");
            settings
        }
        Err(err) => {
            log::info!("using default settings ({err})");
            CrowdSettings::default()
        }
    };

    let device = Arc::new(HeadlessDevice::new());
    let mut renderer =
        InstancedRenderer::new(Arc::clone(&device) as Arc<dyn GpuDevice>, &settings);

    let mesh = walker_mesh();
    let mut material = Material::new("walker_mat");
    material.enable_instancing();
    let mut block = PropertyBlock::default();
    let mut backend = RecordingBackend::default();
    let camera = Camera::default();
    let mut timer = FrameTimer::new();

    log::info!(
        "starting crowd demo: {}x{} grid, {CLIPS_COUNT} clips, {FRAME_COUNT} frames",
        settings.grid.count_x,
        settings.grid.count_y,
    );

    for frame in 0..FRAME_COUNT {
        timer.update();

        let angle = frame as f32 * FIXED_DELTA * TARGET_ORBIT_SPEED;
        renderer.set_target(Vec3::new(
            angle.cos() * TARGET_ORBIT_RADIUS,
            0.0,
            angle.sin() * TARGET_ORBIT_RADIUS,
        ));

        renderer.begin_frame();
        backend.clear();
        for clip in 0..CLIPS_COUNT {
            if let Err(err) = renderer.tick(
                &camera,
                &mesh,
                &mut material,
                &mut block,
                clip,
                CLIPS_COUNT,
                FIXED_DELTA,
                &mut backend,
            ) {
                log::error!("frame {frame} clip {clip}: {err}");
                return;
            }
        }

        if frame % LOG_EVERY == 0 {
            let stats = renderer.stats();
            log::info!(
                "frame {frame}: {} instances, {} vertices, {} draws, {} live buffers, {} bytes uploaded",
                stats.instance_count,
                stats.vertex_count,
                stats.draw_calls,
                device.live_allocations(),
                device.bytes_uploaded(),
            );
        }
    }

    renderer.on_disabled();
    log::info!(
        "done after {:.2}s wall time: {} total allocations, {} live",
        timer.total_time(),
        device.total_allocations(),
        device.live_allocations(),
    );
}
