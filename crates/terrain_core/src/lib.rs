//! terrain_core - Framework/engine independent octree terrain meshing
//!
//! This crate incrementally meshes a streaming, procedurally-generated
//! isosurface volume. A `CompositeVolume` aggregates shape samplers
//! (additive and subtractive), an `OctreeVolume` narrows each pass down to
//! the minimal set of octree nodes whose contents changed, and a classic
//! table-driven marching-cubes pass extracts triangles from those nodes in
//! parallel on a fixed worker pool.
//!
//! # Features
//!
//! - **Volume samplers**: sphere, halfspace, bounded plane, oriented prism,
//!   tube with angular cut, and heightmap fields with a configurable
//!   "fuzziness" blend band at their boundaries
//! - **Octree mark/collect**: per-pass occupancy marking with coarsening of
//!   fully-occupied octants, so work stays proportional to surface area
//! - **Marching cubes**: deterministic 256-case triangulation with gradient
//!   or face normals
//! - **Thread pool**: stable worker indices, optional core pinning, and a
//!   periodic sleep policy for thermally constrained devices
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use terrain_core::{
//!   MainThreadQueue, Mode, NormalMode, OctreeVolume, SphereSampler,
//!   ThreadPool, TriangleBuffer,
//! };
//!
//! let pool = Arc::new(ThreadPool::with_threads(4));
//! let buffers: Vec<_> = (0..pool.num_threads())
//!   .map(|_| std::sync::Arc::new(std::sync::Mutex::new(TriangleBuffer::new())))
//!   .collect();
//! let consumers = buffers
//!   .iter()
//!   .map(|b| Box::new(Arc::clone(b)) as Box<dyn terrain_core::TriangleConsumer>)
//!   .collect();
//! let queue = MainThreadQueue::new();
//!
//! let volume = OctreeVolume::new(64, 2.0, 4, pool, consumers, queue);
//! volume.add(Box::new(SphereSampler::new(
//!   glam::Vec3::splat(32.0),
//!   10.0,
//!   Mode::Additive,
//! )));
//!
//! let stats = volume.march(None, NormalMode::default(), None).unwrap();
//! println!("meshed {} nodes into {} triangles", stats.node_count, stats.triangle_count);
//! ```

pub mod aabb;
pub mod types;

// Re-export commonly used items
pub use aabb::Aabb;
pub use types::{FieldSample, MaterialState, NormalMode, Triangle, Vertex, ISO_LEVEL};

// Marching cubes triangulation
pub mod march;
pub mod tables;
pub use march::march_region;

// Volume samplers
pub mod sampler;
pub mod samplers;
pub use sampler::{AabbIntersection, Mode, VolumeSampler};
pub use samplers::{
  BoundedPlaneSampler, HalfspaceSampler, HeightmapSampler, RectPrismSampler, SphereSampler,
  TubeConfig, TubeSampler,
};

// Triangle sinks fed by the marching pass
pub mod consumer;
pub use consumer::{CountingConsumer, TriangleBuffer, TriangleConsumer};

// Worker pool driving parallel node marching
pub mod thread_pool;
pub use thread_pool::{Affinity, PoolError, SleepConfig, SleepMethod, TaskHandle, ThreadPool};

// Cooperative completion queue for the async march path
pub mod main_queue;
pub use main_queue::MainThreadQueue;

// Composite/octree volume and march orchestration
pub mod volume;
pub use volume::{
  CompositeVolume, MarchStats, MarchedNode, Node, NodeObserver, OctreeVolume, SamplerId,
};
