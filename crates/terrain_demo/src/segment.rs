//! One scrolling terrain segment: a heightmap floor plus randomly placed
//! arch tubes, meshed by its own octree volume.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use glam::{Vec3, Vec4};
use tracing::info;

use terrain_core::{
  MainThreadQueue, MaterialState, NormalMode, OctreeVolume, PoolError, ThreadPool, TriangleBuffer,
  TriangleConsumer, TubeConfig, TubeSampler,
};

use crate::heightmap;
use crate::rng::XorShift64;

const MIN_NODE_SIZE: u32 = 4;
const FUZZINESS: f32 = 2.0;
const FLOOR_THRESHOLD: f32 = 1.0;
pub const MAX_TERRAIN_HEIGHT: f32 = 8.0;
const MAX_ARCHES: usize = 7;

fn floor_terrain_material() -> MaterialState {
  MaterialState::new(Vec4::new(0.0, 0.0, 0.0, 1.0), 1.0, 0.0, 0.0)
}

fn low_terrain_material() -> MaterialState {
  MaterialState::new(Vec4::new(1.0, 1.0, 1.0, 1.0), 0.0, 1.0, 0.0)
}

fn high_terrain_material() -> MaterialState {
  MaterialState::new(Vec4::new(0.3, 0.3, 0.3, 1.0), 0.0, 1.0, 1.0)
}

fn arch_material() -> MaterialState {
  MaterialState::new(Vec4::new(0.1, 0.2, 0.1, 1.0), 0.125, 0.0, 1.0)
}

pub struct TerrainSegment {
  pub idx: i32,
  size: u32,
  volume: OctreeVolume,
  buffers: Vec<Arc<Mutex<TriangleBuffer>>>,
  pub waypoints: Vec<Vec3>,
  triangle_count: Arc<AtomicUsize>,
}

impl TerrainSegment {
  pub fn new(size: u32, pool: Arc<ThreadPool>, queue: MainThreadQueue) -> Self {
    let buffers: Vec<_> = (0..pool.num_threads())
      .map(|_| Arc::new(Mutex::new(TriangleBuffer::new())))
      .collect();
    let consumers: Vec<Box<dyn TriangleConsumer>> = buffers
      .iter()
      .map(|b| Box::new(Arc::clone(b)) as Box<dyn TriangleConsumer>)
      .collect();

    let volume = OctreeVolume::new(size, FUZZINESS, MIN_NODE_SIZE, pool, consumers, queue);

    Self {
      idx: -1,
      size,
      volume,
      buffers,
      waypoints: Vec::new(),
      triangle_count: Arc::new(AtomicUsize::new(0)),
    }
  }

  /// Rebuild this segment's samplers for position `idx` along the run.
  pub fn build(&mut self, idx: i32) {
    self.idx = idx;
    self.volume.clear();
    self.triangle_count.store(0, Ordering::Relaxed);
    for buffer in &self.buffers {
      buffer.lock().unwrap().clear();
    }
    self.waypoints.clear();

    let size = self.size as f32;
    let center = Vec3::splat(size / 2.0);

    // terrain floor
    let heights = heightmap::generate(idx, self.size, MAX_TERRAIN_HEIGHT);
    self.volume.add(Box::new(terrain_core::HeightmapSampler::new(
      heights,
      (self.size + 1) as usize,
      MAX_TERRAIN_HEIGHT,
      FLOOR_THRESHOLD,
      floor_terrain_material(),
      low_terrain_material(),
      high_terrain_material(),
    )));

    // an RNG seeded for this segment, so rebuilds reproduce it exactly
    let mut rng = XorShift64::new(12345 * (idx as u64 + 1));

    // arches
    for i in 0..MAX_ARCHES {
      // roll the dice to see if we get an arch here
      if rng.next_int(10) < 5 {
        continue;
      }

      let arch_z = 30.0 + (size - 60.0) * i as f32 / MAX_ARCHES as f32;
      let arch_x = center.x + rng.next_f32(-1.0, 1.0) * size * 0.125;

      let axis_dir = Vec3::new(rng.next_f32(-0.6, 0.6), rng.next_f32(-0.2, 0.2), 1.0).normalize();
      let axis_perp = Vec3::new(rng.next_f32(-0.2, 0.2), 1.0, 0.0).normalize();
      let inner_radius = rng.next_f32(35.0, 43.0);

      let arch = TubeConfig {
        axis_origin: Vec3::new(arch_x, 0.0, arch_z),
        axis_dir,
        axis_perp,
        inner_radius_axis_offset: Vec3::new(0.0, rng.next_f32(4.0, 10.0), 0.0),
        inner_radius,
        outer_radius: rng.next_f32(48.0, 55.0),
        length: rng.next_f32(7.0, 11.0),
        cut_angle: rng.next_f32(16.0, 32.0).to_radians(),
        front_face_normal: axis_dir,
        back_face_normal: -axis_dir,
        material: arch_material(),
      };
      self.volume.add(Box::new(TubeSampler::new(arch)));

      let mut waypoint =
        arch.axis_origin + axis_perp * inner_radius * rng.next_f32(0.2, 0.8);
      waypoint.y = waypoint.y.max(MAX_TERRAIN_HEIGHT + 2.0);
      self.waypoints.push(waypoint);
    }

    // every segment needs at least one waypoint for the runner to aim at
    if self.waypoints.is_empty() {
      let y = MAX_TERRAIN_HEIGHT + rng.next_f32(0.0, 10.0);
      self.waypoints.push(Vec3::new(center.x, y, center.z));
    }
  }

  /// Kick off an asynchronous march; completion lands on the main-thread
  /// queue.
  pub fn march(&self) -> Result<(), PoolError> {
    let idx = self.idx;
    let triangle_count = Arc::clone(&self.triangle_count);

    self.volume.march_async(
      None,
      NormalMode::default(),
      move |stats| {
        triangle_count.store(stats.triangle_count, Ordering::Relaxed);
        info!(
          segment = idx,
          nodes = stats.node_count,
          triangles = stats.triangle_count,
          us = stats.total_us,
          "march of segment complete"
        );
      },
      None,
    )
  }

  /// Triangles produced by the most recent completed march.
  pub fn triangle_count(&self) -> usize {
    self.triangle_count.load(Ordering::Relaxed)
  }

  pub fn volume(&self) -> &OctreeVolume {
    &self.volume
  }

  pub fn buffers(&self) -> &[Arc<Mutex<TriangleBuffer>>] {
    &self.buffers
  }
}

/// Smoke test helper: a segment with a single sphere instead of terrain.
#[cfg(test)]
pub fn sphere_segment(pool: Arc<ThreadPool>, queue: MainThreadQueue) -> TerrainSegment {
  let mut segment = TerrainSegment::new(32, pool, queue);
  segment.idx = 0;
  segment.volume.add(Box::new(terrain_core::SphereSampler::new(
    Vec3::splat(16.0),
    6.0,
    terrain_core::Mode::Additive,
  )));
  segment
}
