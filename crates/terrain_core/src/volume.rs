//! Composite and octree volumes: sampler ownership, the mark/collect pass,
//! and parallel march orchestration.
//!
//! An [`OctreeVolume`] owns a set of shape samplers and a fixed octree built
//! once over its bounds. Every march pass re-marks the tree from scratch:
//! each node records which samplers affect it, fully-subtracted nodes are
//! pruned, and an octant whose 8 children are all occupied is coalesced into
//! its parent so uniformly-solid regions mesh as one node. The collected
//! nodes are then marched in parallel, workers pulling from a shared stack
//! so slow and fast threads self-balance.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use glam::{Mat4, Vec3, Vec4};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::aabb::Aabb;
use crate::consumer::TriangleConsumer;
use crate::main_queue::MainThreadQueue;
use crate::march::march_region;
use crate::sampler::{AabbIntersection, Mode, VolumeSampler};
use crate::thread_pool::{PoolError, ThreadPool};
use crate::types::{FieldSample, MaterialState, NormalMode};

/// Stable handle to a sampler owned by a [`CompositeVolume`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SamplerId(usize);

type SamplerSet = SmallVec<[usize; 8]>;

// =============================================================================
// CompositeVolume
// =============================================================================

/// A volume made up of a collection of [`VolumeSampler`] instances.
///
/// Owns every sampler; the additive/subtractive partitions hold indices into
/// the owning list. Clearing the volume destroys all samplers.
pub struct CompositeVolume {
  samplers: Vec<Box<dyn VolumeSampler>>,
  additive: Vec<usize>,
  subtractive: Vec<usize>,
  fuzziness: f32,
}

impl CompositeVolume {
  pub fn new(fuzziness: f32) -> Self {
    Self {
      samplers: Vec::new(),
      additive: Vec::new(),
      subtractive: Vec::new(),
      fuzziness: fuzziness.max(0.0),
    }
  }

  /// Take ownership of a sampler, partitioning it by mode.
  pub fn add(&mut self, sampler: Box<dyn VolumeSampler>) -> SamplerId {
    let id = self.samplers.len();
    match sampler.mode() {
      Mode::Additive => self.additive.push(id),
      Mode::Subtractive => self.subtractive.push(id),
    }
    self.samplers.push(sampler);
    SamplerId(id)
  }

  /// Destroy all samplers.
  pub fn clear(&mut self) {
    self.samplers.clear();
    self.additive.clear();
    self.subtractive.clear();
  }

  pub fn sampler_count(&self) -> usize {
    self.samplers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samplers.is_empty()
  }

  pub fn fuzziness(&self) -> f32 {
    self.fuzziness
  }

  pub fn set_fuzziness(&mut self, fuzziness: f32) {
    self.fuzziness = fuzziness.max(0.0);
  }

  /// Typed mutable access to a sampler, for animating pose/shape fields
  /// between marches.
  pub fn sampler_mut<T: VolumeSampler + 'static>(&mut self, id: SamplerId) -> Option<&mut T> {
    self
      .samplers
      .get_mut(id.0)
      .and_then(|s| s.as_any_mut().downcast_mut::<T>())
  }

  /// Combined occupancy and blended material over the given sampler
  /// subsets.
  ///
  /// Additive contributions sum (clamped to 1) and their materials blend
  /// weighted by contribution; subtractive samplers then carve the value
  /// back down, clamped to 0.
  fn field_sample(&self, additive: &[usize], subtractive: &[usize], p: Vec3, fuzziness: f32) -> FieldSample {
    let mut value = 0.0_f32;
    let mut weight = 0.0_f32;
    let mut color = Vec4::ZERO;
    let mut shininess = 0.0_f32;
    let mut texture0 = 0.0_f32;
    let mut texture1 = 0.0_f32;

    for &id in additive {
      let sample = self.samplers[id].value_at(p, fuzziness);
      if sample.value > 0.0 {
        value += sample.value;
        weight += sample.value;
        color += sample.material.color * sample.value;
        shininess += sample.material.shininess * sample.value;
        texture0 += sample.material.texture0 * sample.value;
        texture1 += sample.material.texture1 * sample.value;
      }
    }

    let material = if weight > 0.0 {
      MaterialState::new(
        color / weight,
        shininess / weight,
        texture0 / weight,
        texture1 / weight,
      )
    } else {
      MaterialState::default()
    };

    value = value.min(1.0);
    for &id in subtractive {
      value -= self.samplers[id].value_at(p, fuzziness).value;
    }

    FieldSample::new(value.max(0.0), material)
  }
}

// =============================================================================
// Octree nodes
// =============================================================================

/// One cubic region of the octree.
///
/// Nodes are created once at construction and mutated by every mark pass;
/// the sampler sets are cleared and rebuilt each time.
pub struct Node {
  bounds: Aabb,
  depth: usize,
  child_idx: usize,
  children: Vec<Node>,
  empty: bool,
  march: bool,
  additive: SamplerSet,
  subtractive: SamplerSet,
}

impl Node {
  fn new(bounds: Aabb, depth: usize, child_idx: usize) -> Self {
    Self {
      bounds,
      depth,
      child_idx,
      children: Vec::new(),
      empty: true,
      march: false,
      additive: SamplerSet::new(),
      subtractive: SamplerSet::new(),
    }
  }

  pub fn bounds(&self) -> Aabb {
    self.bounds
  }

  pub fn depth(&self) -> usize {
    self.depth
  }

  /// Which octant of the parent this node fills.
  pub fn child_idx(&self) -> usize {
    self.child_idx
  }

  pub fn is_leaf(&self) -> bool {
    self.children.is_empty()
  }

  /// True when no sampler touched this node in the last mark pass.
  pub fn is_empty(&self) -> bool {
    self.empty
  }

  /// True when this node is the chosen granularity to mesh.
  pub fn is_marked(&self) -> bool {
    self.march
  }

  pub fn children(&self) -> &[Node] {
    &self.children
  }

  /// Number of (additive, subtractive) samplers recorded for this node.
  pub fn sampler_counts(&self) -> (usize, usize) {
    (self.additive.len(), self.subtractive.len())
  }
}

struct Octree {
  root: Node,
  depth: usize,
}

fn build_octree(bounds: Aabb, min_node_size: u32) -> Octree {
  let mut depth = 0;
  let root = build_node(bounds, min_node_size, 0, 0, &mut depth);
  Octree { root, depth }
}

fn build_node(
  bounds: Aabb,
  min_node_size: u32,
  depth: usize,
  child_idx: usize,
  tree_depth: &mut usize,
) -> Node {
  *tree_depth = (*tree_depth).max(depth);
  let mut node = Node::new(bounds, depth, child_idx);

  // nodes are cubes, so only one edge length needs checking
  let size = bounds.size().x as u32;
  if size / 2 >= min_node_size {
    node.children = bounds
      .octree_subdivide()
      .iter()
      .enumerate()
      .map(|(i, child_bounds)| build_node(*child_bounds, min_node_size, depth + 1, i, tree_depth))
      .collect();
  }

  node
}

/// Mark the nodes which should be marched. Returns true if `node` is
/// occupied.
fn mark(node: &mut Node, composite: &CompositeVolume) -> bool {
  node.empty = true;
  node.march = false;
  node.additive.clear();
  node.subtractive.clear();

  for &id in &composite.additive {
    if composite.samplers[id].intersects(node.bounds) {
      node.additive.push(id);
      node.empty = false;
    }
  }

  // subtractive samplers only matter when the node has additive ones;
  // without them there is no volume to subtract from
  if !node.empty {
    for &id in &composite.subtractive {
      match composite.samplers[id].intersection(node.bounds) {
        AabbIntersection::Intersects => node.subtractive.push(id),
        AabbIntersection::Contains => {
          // special case - the node is completely inside the subtracted
          // volume, which means it is EMPTY
          node.additive.clear();
          node.subtractive.clear();
          node.empty = true;
        }
        AabbIntersection::None => {}
      }

      // a subtractive sampler cleared this node, we're done
      if node.empty {
        break;
      }
    }
  }

  if !node.empty {
    if node.is_leaf() {
      node.march = true;
      return true;
    }

    // some samplers intersect this node; traverse down
    let mut occupied = 0;
    for child in &mut node.children {
      if mark(child, composite) {
        occupied += 1;
      }
    }

    if occupied == 8 {
      // all 8 children are occupied; mark self to march and coalesce
      // their samplers up so the whole octant meshes as one node
      node.march = true;

      let Node {
        children,
        additive,
        subtractive,
        ..
      } = node;
      for child in children.iter_mut() {
        child.march = false;
        for &id in &child.additive {
          if !additive.contains(&id) {
            additive.push(id);
          }
        }
        for &id in &child.subtractive {
          if !subtractive.contains(&id) {
            subtractive.push(id);
          }
        }
      }

      return true;
    }
  }

  false
}

/// After marking, gather all nodes which should be marched.
fn collect<'a>(node: &'a Node, nodes_to_march: &mut Vec<&'a Node>) {
  if node.empty {
    return;
  }

  if node.march {
    // collect this node, don't recurse further
    nodes_to_march.push(node);
  } else if !node.is_leaf() {
    for child in &node.children {
      collect(child, nodes_to_march);
    }
  }
}

// =============================================================================
// March orchestration
// =============================================================================

/// Value snapshot of a collected node, handed to observers.
#[derive(Clone, Copy, Debug)]
pub struct MarchedNode {
  pub bounds: Aabb,
  pub depth: usize,
}

/// Summary of one march pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarchStats {
  /// Number of octree nodes marched.
  pub node_count: usize,
  /// Number of triangles emitted across all consumers.
  pub triangle_count: usize,
  /// Wall time of the pass in microseconds.
  pub total_us: u64,
}

/// Per-node work item: the node's bounds plus its sampler sets collapsed to
/// plain vectors for fast iteration in the per-voxel loop.
struct MarchJob {
  bounds: Aabb,
  additive: Vec<usize>,
  subtractive: Vec<usize>,
}

struct VolumeShared {
  tree: Mutex<Octree>,
  composite: RwLock<CompositeVolume>,
  consumers: Vec<Mutex<Box<dyn TriangleConsumer>>>,
  /// March-pass generation, bumped by every `march_async` submission.
  generation: AtomicU64,
}

/// Observer invoked with each collected node during publishing.
pub type NodeObserver = Box<dyn FnMut(&MarchedNode) + Send + 'static>;

/// A [`CompositeVolume`] under a fixed octree, marched in parallel.
///
/// The tree is built once at construction down to `min_node_size`; node
/// count and depth never change afterwards. Passes on one volume must be
/// serialized by the caller: the stale-pass generation counter only guards
/// the publishing step, not concurrent marking.
pub struct OctreeVolume {
  shared: Arc<VolumeShared>,
  pool: Arc<ThreadPool>,
  main_queue: MainThreadQueue,
  bounds: Aabb,
  size: u32,
}

impl OctreeVolume {
  /// Build a volume over the cube `[0, size]³`, subdivided until node edges
  /// reach `min_node_size`. One triangle consumer per pool worker keeps the
  /// marching hot path free of cross-thread synchronization.
  ///
  /// # Panics
  /// Panics if `consumers` is empty.
  pub fn new(
    size: u32,
    fuzziness: f32,
    min_node_size: u32,
    pool: Arc<ThreadPool>,
    consumers: Vec<Box<dyn TriangleConsumer>>,
    main_queue: MainThreadQueue,
  ) -> Self {
    assert!(!consumers.is_empty(), "at least one triangle consumer is required");

    let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(size as f32));
    let tree = build_octree(bounds, min_node_size.max(1));
    debug!(size, tree_depth = tree.depth, "octree volume built");

    Self {
      shared: Arc::new(VolumeShared {
        tree: Mutex::new(tree),
        composite: RwLock::new(CompositeVolume::new(fuzziness)),
        consumers: consumers.into_iter().map(Mutex::new).collect(),
        generation: AtomicU64::new(0),
      }),
      pool,
      main_queue,
      bounds,
      size,
    }
  }

  /// The bounds of this volume - no geometry will exceed this region.
  pub fn bounds(&self) -> Aabb {
    self.bounds
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  /// Max octree node depth.
  pub fn depth(&self) -> usize {
    self.shared.tree.lock().unwrap().depth
  }

  /// Take ownership of a sampler.
  pub fn add(&self, sampler: Box<dyn VolumeSampler>) -> SamplerId {
    self.shared.composite.write().unwrap().add(sampler)
  }

  /// Destroy all samplers.
  pub fn clear(&self) {
    self.shared.composite.write().unwrap().clear();
  }

  pub fn fuzziness(&self) -> f32 {
    self.shared.composite.read().unwrap().fuzziness()
  }

  pub fn set_fuzziness(&self, fuzziness: f32) {
    self.shared.composite.write().unwrap().set_fuzziness(fuzziness);
  }

  pub fn sampler_count(&self) -> usize {
    self.shared.composite.read().unwrap().sampler_count()
  }

  /// Run `f` against a sampler with mutable, typed access. Returns `None`
  /// if the id is stale or the type does not match.
  ///
  /// Must not be called while a march pass is in flight.
  pub fn with_sampler_mut<T, R>(&self, id: SamplerId, f: impl FnOnce(&mut T) -> R) -> Option<R>
  where
    T: VolumeSampler + 'static,
  {
    let mut composite = self.shared.composite.write().unwrap();
    composite.sampler_mut::<T>(id).map(f)
  }

  /// Depth-first visit of the octree. The visitor returns whether to
  /// recurse into a node's children.
  pub fn walk<F>(&self, mut visitor: F)
  where
    F: FnMut(&Node) -> bool,
  {
    fn walker(node: &Node, visitor: &mut dyn FnMut(&Node) -> bool) {
      if visitor(node) && !node.is_leaf() {
        for child in node.children() {
          walker(child, visitor);
        }
      }
    }

    let tree = self.shared.tree.lock().unwrap();
    walker(&tree.root, &mut visitor);
  }

  /// March the volume into the consumers provided at construction,
  /// blocking until every collected node has been meshed and every
  /// consumer finished.
  ///
  /// The observer, when present, sees each collected node before meshing
  /// begins.
  pub fn march(
    &self,
    transform: Option<Mat4>,
    normal_mode: NormalMode,
    mut observer: Option<&mut dyn FnMut(&MarchedNode)>,
  ) -> Result<MarchStats, PoolError> {
    let start = Instant::now();
    let (jobs, marched) = self.mark_and_collect();

    if let Some(observer) = observer.as_mut() {
      for node in &marched {
        observer(node);
      }
    }

    for consumer in &self.shared.consumers {
      consumer.lock().unwrap().start();
    }

    let stack = Arc::new(Mutex::new(jobs));
    let triangles = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::with_capacity(self.pool.num_threads());

    for _ in 0..self.pool.num_threads() {
      let shared = Arc::clone(&self.shared);
      let stack = Arc::clone(&stack);
      let triangles = Arc::clone(&triangles);
      handles.push(self.pool.enqueue(move |worker_idx| {
        march_worker(&shared, &stack, worker_idx, transform, normal_mode, &triangles);
      })?);
    }

    for handle in &handles {
      handle.wait();
    }

    for consumer in &self.shared.consumers {
      consumer.lock().unwrap().finish();
    }

    let stats = MarchStats {
      node_count: marched.len(),
      triangle_count: triangles.load(Ordering::Relaxed),
      total_us: start.elapsed().as_micros() as u64,
    };
    debug!(
      nodes = stats.node_count,
      triangles = stats.triangle_count,
      us = stats.total_us,
      "march complete"
    );
    Ok(stats)
  }

  /// March without blocking the caller.
  ///
  /// The whole mark→collect→mesh sequence runs on the pool; publishing
  /// (consumer `finish()`, the node observer, and `on_ready`) is deferred
  /// to the main-thread queue, preserving the invariant that consumer
  /// finalization happens on the one thread that drains it.
  ///
  /// If a newer `march_async` is submitted before this pass publishes, this
  /// pass's publishing step is skipped entirely: its consumers are left
  /// un-finished for the pass and are restarted on the next one. Workers
  /// still run the stale pass to completion; that is wasted work, not a
  /// correctness risk.
  pub fn march_async<F>(
    &self,
    transform: Option<Mat4>,
    normal_mode: NormalMode,
    on_ready: F,
    observer: Option<NodeObserver>,
  ) -> Result<(), PoolError>
  where
    F: FnOnce(MarchStats) + Send + 'static,
  {
    let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
    let shared = Arc::clone(&self.shared);
    let pool = Arc::clone(&self.pool);
    let queue = self.main_queue.clone();

    trace!(generation, "march pass submitted");

    self.pool.enqueue(move |worker_idx| {
      let start = Instant::now();

      let (jobs, marched) = mark_and_collect(&shared);

      for consumer in &shared.consumers {
        consumer.lock().unwrap().start();
      }

      let publish = PublishState {
        shared: Arc::clone(&shared),
        queue: queue.clone(),
        marched,
        observer,
        on_ready: Box::new(on_ready),
        generation,
        start,
      };

      if jobs.is_empty() {
        publish.post(0);
        return;
      }

      let job_count = jobs.len();
      let pass = Arc::new(AsyncPass {
        stack: Mutex::new(jobs),
        remaining: AtomicUsize::new(job_count),
        triangles: AtomicUsize::new(0),
        publish: Mutex::new(Some(publish)),
      });

      // helpers on the other workers; this task marches too, so a
      // single-threaded pool cannot deadlock waiting for itself
      for _ in 1..pool.num_threads() {
        let shared = Arc::clone(&shared);
        let pass = Arc::clone(&pass);
        let handle = pool.enqueue(move |idx| {
          async_march_worker(&shared, &pass, idx, transform, normal_mode);
        });
        if handle.is_err() {
          // pool is shutting down; the orchestrator still drains the stack
          break;
        }
      }

      async_march_worker(&shared, &pass, worker_idx, transform, normal_mode);
    })?;

    Ok(())
  }

  fn mark_and_collect(&self) -> (Vec<MarchJob>, Vec<MarchedNode>) {
    mark_and_collect(&self.shared)
  }
}

/// Run the mark and collect passes, snapshotting each collected node's
/// bounds and sampler sets so worker tasks borrow nothing from the tree.
fn mark_and_collect(shared: &VolumeShared) -> (Vec<MarchJob>, Vec<MarchedNode>) {
  let composite = shared.composite.read().unwrap();
  let mut tree = shared.tree.lock().unwrap();

  mark(&mut tree.root, &composite);

  let mut nodes = Vec::new();
  collect(&tree.root, &mut nodes);

  let jobs = nodes
    .iter()
    .map(|node| MarchJob {
      bounds: node.bounds,
      additive: node.additive.to_vec(),
      subtractive: node.subtractive.to_vec(),
    })
    .collect();
  let marched = nodes
    .iter()
    .map(|node| MarchedNode {
      bounds: node.bounds,
      depth: node.depth,
    })
    .collect();

  trace!(collected = nodes.len(), "mark/collect pass");
  (jobs, marched)
}

/// Pull jobs from the shared stack until it runs dry, marching each into
/// the consumer bound to this worker's index.
fn march_worker(
  shared: &VolumeShared,
  stack: &Mutex<Vec<MarchJob>>,
  worker_idx: usize,
  transform: Option<Mat4>,
  normal_mode: NormalMode,
  triangles: &AtomicUsize,
) {
  let composite = shared.composite.read().unwrap();
  let fuzziness = composite.fuzziness();
  let consumer = &shared.consumers[worker_idx % shared.consumers.len()];

  loop {
    let job = {
      let mut stack = stack.lock().unwrap();
      match stack.pop() {
        Some(job) => job,
        None => break,
      }
    };

    let field = |p: Vec3| composite.field_sample(&job.additive, &job.subtractive, p, fuzziness);
    let mut tc = consumer.lock().unwrap();
    let emitted = march_region(job.bounds, &field, normal_mode, transform.as_ref(), &mut **tc);
    triangles.fetch_add(emitted, Ordering::Relaxed);
  }
}

/// Everything the deferred publishing step needs, free of tree borrows.
struct PublishState {
  shared: Arc<VolumeShared>,
  queue: MainThreadQueue,
  marched: Vec<MarchedNode>,
  observer: Option<NodeObserver>,
  on_ready: Box<dyn FnOnce(MarchStats) + Send + 'static>,
  generation: u64,
  start: Instant,
}

impl PublishState {
  /// Queue the publishing step onto the main thread.
  fn post(self, triangle_count: usize) {
    let queue = self.queue.clone();
    queue.add(move || {
      let current = self.shared.generation.load(Ordering::SeqCst);
      if current != self.generation {
        debug!(
          generation = self.generation,
          current, "stale march pass dropped before publishing"
        );
        return;
      }

      for consumer in &self.shared.consumers {
        consumer.lock().unwrap().finish();
      }

      let mut observer = self.observer;
      if let Some(observer) = observer.as_mut() {
        for node in &self.marched {
          observer(node);
        }
      }

      let stats = MarchStats {
        node_count: self.marched.len(),
        triangle_count,
        total_us: self.start.elapsed().as_micros() as u64,
      };
      debug!(
        generation = self.generation,
        nodes = stats.node_count,
        triangles = stats.triangle_count,
        "async march published"
      );
      (self.on_ready)(stats);
    });
  }
}

struct AsyncPass {
  stack: Mutex<Vec<MarchJob>>,
  remaining: AtomicUsize,
  triangles: AtomicUsize,
  publish: Mutex<Option<PublishState>>,
}

/// Like [`march_worker`], but tracks pass completion: whichever worker
/// finishes the last job posts the publishing step.
fn async_march_worker(
  shared: &VolumeShared,
  pass: &AsyncPass,
  worker_idx: usize,
  transform: Option<Mat4>,
  normal_mode: NormalMode,
) {
  let composite = shared.composite.read().unwrap();
  let fuzziness = composite.fuzziness();
  let consumer = &shared.consumers[worker_idx % shared.consumers.len()];

  loop {
    let job = {
      let mut stack = pass.stack.lock().unwrap();
      match stack.pop() {
        Some(job) => job,
        None => break,
      }
    };

    let field = |p: Vec3| composite.field_sample(&job.additive, &job.subtractive, p, fuzziness);
    {
      let mut tc = consumer.lock().unwrap();
      let emitted = march_region(job.bounds, &field, normal_mode, transform.as_ref(), &mut **tc);
      pass.triangles.fetch_add(emitted, Ordering::Relaxed);
    }

    if pass.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
      // last job in the pass
      if let Some(publish) = pass.publish.lock().unwrap().take() {
        publish.post(pass.triangles.load(Ordering::Relaxed));
      }
    }
  }
}

#[cfg(test)]
#[path = "volume_test.rs"]
mod volume_test;
