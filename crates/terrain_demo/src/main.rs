//! Headless infinite-runner terrain demo.
//!
//! Builds a short chain of terrain segments, marches them asynchronously,
//! then scrolls the world: whenever the front segment slides out of view it
//! is recycled to the back with freshly generated terrain and re-marched.
//! The main loop drains the completion queue once per frame, exactly as a
//! render loop would.

mod heightmap;
mod rng;
mod segment;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use tracing::info;

use terrain_core::{Affinity, MainThreadQueue, SleepConfig, ThreadPool};

use segment::TerrainSegment;

const SEGMENT_SIZE: u32 = 64;
const SEGMENT_COUNT: usize = 3;
const SCROLL_SPEED: f32 = 100.0;
const FRAME_DT: f32 = 1.0 / 30.0;
const FRAMES: usize = 240;

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt::init();

  let pool = Arc::new(ThreadPool::new(
    Affinity::All,
    false,
    usize::MAX,
    SleepConfig::none(),
  ));
  let queue = MainThreadQueue::new();

  info!(threads = pool.num_threads(), "building terrain segments");

  let mut segments: VecDeque<TerrainSegment> = VecDeque::new();
  for i in 0..SEGMENT_COUNT {
    let mut segment = TerrainSegment::new(SEGMENT_SIZE, Arc::clone(&pool), queue.clone());
    segment.build(i as i32);
    segment.march()?;
    segments.push_back(segment);
  }

  let mut distance_along_z = 0.0_f32;
  let mut next_waypoint = segments.front().unwrap().waypoints[0];
  let mut recycles = 0_usize;

  for frame in 0..FRAMES {
    queue.drain();

    let scroll_delta = SCROLL_SPEED * FRAME_DT;
    distance_along_z += scroll_delta;

    if distance_along_z > SEGMENT_SIZE as f32 {
      distance_along_z -= SEGMENT_SIZE as f32;

      // the front segment scrolled out of view; pop it, rebuild it as the
      // new far segment, and push it to the back
      let mut segment = segments.pop_front().unwrap();
      let next_idx = segments.back().unwrap().idx + 1;
      segment.build(next_idx);
      segment.march()?;
      segments.push_back(segment);
      recycles += 1;
    }

    next_waypoint.z -= scroll_delta;

    // aim at the nearest upcoming waypoint across all segments
    if next_waypoint.z <= 0.0 {
      'search: for (i, segment) in segments.iter().enumerate() {
        let dz = (i as f32) * SEGMENT_SIZE as f32 - distance_along_z;
        for waypoint in &segment.waypoints {
          let world = Vec3::new(waypoint.x, waypoint.y, waypoint.z + dz);
          if world.z > 0.0 {
            next_waypoint = world;
            break 'search;
          }
        }
      }
    }

    if frame % 30 == 0 {
      let triangles: usize = segments.iter().map(|s| s.triangle_count()).sum();
      info!(
        frame,
        triangles,
        heading = ?next_waypoint,
        "scrolling"
      );
    }

    std::thread::sleep(Duration::from_secs_f32(FRAME_DT));
  }

  // let in-flight marches land
  std::thread::sleep(Duration::from_millis(250));
  queue.drain();

  let triangles: usize = segments.iter().map(|s| s.triangle_count()).sum();
  info!(recycles, triangles, "demo finished");

  Ok(())
}
