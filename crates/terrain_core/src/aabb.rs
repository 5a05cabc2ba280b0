//! Axis-aligned bounding boxes for octree nodes and sampler broad-phase tests.

use glam::{IVec3, Vec3};

/// Single-precision axis-aligned bounding box.
///
/// Octree node bounds are cubes with integer-valued coordinates; sampler
/// broad-phase tests use the same type for arbitrary regions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
  /// Minimum corner (inclusive).
  pub min: Vec3,
  /// Maximum corner (inclusive).
  pub max: Vec3,
}

impl Aabb {
  /// Create a new AABB from min and max corners.
  ///
  /// # Panics
  /// Debug-asserts that min <= max on all axes.
  pub fn new(min: Vec3, max: Vec3) -> Self {
    debug_assert!(
      min.x <= max.x && min.y <= max.y && min.z <= max.z,
      "AABB min must be <= max on all axes"
    );
    Self { min, max }
  }

  /// Create a new AABB from center and half-extents.
  pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
    Self {
      min: center - half_extents,
      max: center + half_extents,
    }
  }

  /// Create an AABB with inverted extents, ready to accumulate points.
  pub fn invalid() -> Self {
    Self {
      min: Vec3::INFINITY,
      max: Vec3::NEG_INFINITY,
    }
  }

  /// True when min <= max on all axes (at least one point was added).
  pub fn is_valid(&self) -> bool {
    self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
  }

  /// Expand to include a point.
  #[inline]
  pub fn add_point(&mut self, p: Vec3) {
    self.min = self.min.min(p);
    self.max = self.max.max(p);
  }

  /// Get the size of the AABB (max - min).
  #[inline]
  pub fn size(&self) -> Vec3 {
    self.max - self.min
  }

  /// Get the center of the AABB.
  #[inline]
  pub fn center(&self) -> Vec3 {
    (self.min + self.max) * 0.5
  }

  /// Check if this AABB overlaps with another.
  ///
  /// Boxes sharing only a boundary count as overlapping.
  #[inline]
  pub fn overlaps(&self, other: &Aabb) -> bool {
    self.min.x <= other.max.x
      && self.max.x >= other.min.x
      && self.min.y <= other.max.y
      && self.max.y >= other.min.y
      && self.min.z <= other.max.z
      && self.max.z >= other.min.z
  }

  /// Check if this AABB contains a point (boundary inclusive).
  #[inline]
  pub fn contains_point(&self, point: Vec3) -> bool {
    point.x >= self.min.x
      && point.x <= self.max.x
      && point.y >= self.min.y
      && point.y <= self.max.y
      && point.z >= self.min.z
      && point.z <= self.max.z
  }

  /// Shrink (or grow, for negative amounts) the box by `amount` on every side.
  pub fn inset(&self, amount: f32) -> Aabb {
    Aabb {
      min: self.min + Vec3::splat(amount),
      max: self.max - Vec3::splat(amount),
    }
  }

  /// The 8 corners of the box.
  ///
  /// Corner index bits select the max corner per axis: bit 0 = +X,
  /// bit 1 = +Y, bit 2 = +Z. Matches the cell-corner convention used by the
  /// marching tables.
  pub fn corners(&self) -> [Vec3; 8] {
    let (lo, hi) = (self.min, self.max);
    [
      Vec3::new(lo.x, lo.y, lo.z),
      Vec3::new(hi.x, lo.y, lo.z),
      Vec3::new(lo.x, hi.y, lo.z),
      Vec3::new(hi.x, hi.y, lo.z),
      Vec3::new(lo.x, lo.y, hi.z),
      Vec3::new(hi.x, lo.y, hi.z),
      Vec3::new(lo.x, hi.y, hi.z),
      Vec3::new(hi.x, hi.y, hi.z),
    ]
  }

  /// Split into 8 equal octants, ordered by the corner convention above.
  pub fn octree_subdivide(&self) -> [Aabb; 8] {
    let c = self.center();
    let (lo, hi) = (self.min, self.max);
    let cell = |ox: bool, oy: bool, oz: bool| {
      let min = Vec3::new(
        if ox { c.x } else { lo.x },
        if oy { c.y } else { lo.y },
        if oz { c.z } else { lo.z },
      );
      let max = Vec3::new(
        if ox { hi.x } else { c.x },
        if oy { hi.y } else { c.y },
        if oz { hi.z } else { c.z },
      );
      Aabb { min, max }
    };
    [
      cell(false, false, false),
      cell(true, false, false),
      cell(false, true, false),
      cell(true, true, false),
      cell(false, false, true),
      cell(true, false, true),
      cell(false, true, true),
      cell(true, true, true),
    ]
  }

  /// Integer grid corner at `min`, for iterating unit voxel cells.
  #[inline]
  pub fn grid_min(&self) -> IVec3 {
    self.min.floor().as_ivec3()
  }

  /// Integer grid corner at `max`.
  #[inline]
  pub fn grid_max(&self) -> IVec3 {
    self.max.ceil().as_ivec3()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_center_half_extents() {
    let aabb = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(10.0));
    assert_eq!(aabb.min, Vec3::splat(-10.0));
    assert_eq!(aabb.max, Vec3::splat(10.0));
  }

  #[test]
  fn test_overlaps() {
    let a = Aabb::new(Vec3::ZERO, Vec3::splat(10.0));
    let b = Aabb::new(Vec3::splat(5.0), Vec3::splat(15.0));
    let c = Aabb::new(Vec3::splat(11.0), Vec3::splat(20.0));

    assert!(a.overlaps(&b));
    assert!(b.overlaps(&a));
    assert!(!a.overlaps(&c));

    // Touching at a face counts as overlap
    let d = Aabb::new(Vec3::splat(10.0), Vec3::splat(20.0));
    assert!(a.overlaps(&d));
  }

  #[test]
  fn test_contains_point() {
    let aabb = Aabb::new(Vec3::ZERO, Vec3::splat(10.0));
    assert!(aabb.contains_point(Vec3::splat(5.0)));
    assert!(aabb.contains_point(Vec3::ZERO));
    assert!(!aabb.contains_point(Vec3::splat(-1.0)));
  }

  #[test]
  fn test_corners_ordering() {
    let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
    let corners = aabb.corners();

    for (i, corner) in corners.iter().enumerate() {
      assert_eq!(corner.x, if i & 1 != 0 { 1.0 } else { 0.0 });
      assert_eq!(corner.y, if i & 2 != 0 { 1.0 } else { 0.0 });
      assert_eq!(corner.z, if i & 4 != 0 { 1.0 } else { 0.0 });
    }
  }

  #[test]
  fn test_octree_subdivide_partitions() {
    let aabb = Aabb::new(Vec3::ZERO, Vec3::splat(8.0));
    let octants = aabb.octree_subdivide();

    for (i, octant) in octants.iter().enumerate() {
      assert_eq!(octant.size(), Vec3::splat(4.0), "octant {} size", i);
      assert!(aabb.contains_point(octant.min));
      assert!(aabb.contains_point(octant.max));
    }

    // Octant ordering matches the corner convention
    assert_eq!(octants[0].min, Vec3::ZERO);
    assert_eq!(octants[7].max, Vec3::splat(8.0));
    assert_eq!(octants[1].min, Vec3::new(4.0, 0.0, 0.0));
  }

  #[test]
  fn test_accumulate_points() {
    let mut aabb = Aabb::invalid();
    assert!(!aabb.is_valid());

    aabb.add_point(Vec3::new(1.0, -2.0, 3.0));
    aabb.add_point(Vec3::new(-1.0, 2.0, 0.0));

    assert!(aabb.is_valid());
    assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
    assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
  }
}
