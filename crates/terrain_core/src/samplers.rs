//! Shape samplers with closed-form intersection tests and value fields.
//!
//! Each sampler decides, for every point in space, how "inside" its shape
//! that point is, with a gradient band of width `fuzziness` at the boundary
//! for smooth blending into neighboring samplers. Degenerate dimensions
//! (negative radii, extents, thickness) clamp to zero at the API boundary,
//! turning would-be crashes into well-defined empty volumes.

use std::any::Any;

use glam::{Mat3, Vec3};

use crate::aabb::Aabb;
use crate::sampler::{bounded_plane_intersection, AabbIntersection, Mode, VolumeSampler};
use crate::types::{FieldSample, MaterialState};

// =============================================================================
// Sphere
// =============================================================================

/// A simple sphere.
pub struct SphereSampler {
  position: Vec3,
  radius: f32,
  radius2: f32,
  mode: Mode,
  material: MaterialState,
}

impl SphereSampler {
  pub fn new(position: Vec3, radius: f32, mode: Mode) -> Self {
    let radius = radius.max(0.0);
    Self {
      position,
      radius,
      radius2: radius * radius,
      mode,
      material: MaterialState::default(),
    }
  }

  pub fn with_material(mut self, material: MaterialState) -> Self {
    self.material = material;
    self
  }

  pub fn position(&self) -> Vec3 {
    self.position
  }

  pub fn set_position(&mut self, position: Vec3) {
    self.position = position;
  }

  pub fn radius(&self) -> f32 {
    self.radius
  }

  pub fn set_radius(&mut self, radius: f32) {
    self.radius = radius.max(0.0);
    self.radius2 = self.radius * self.radius;
  }
}

impl VolumeSampler for SphereSampler {
  fn mode(&self) -> Mode {
    self.mode
  }

  fn intersects(&self, bounds: Aabb) -> bool {
    // early exit if the center is contained by bounds
    if bounds.contains_point(self.position) {
      return true;
    }

    // closest point on the surface of bounds to the center
    let closest = self.position.clamp(bounds.min, bounds.max);
    closest.distance_squared(self.position) <= self.radius2
  }

  fn intersection(&self, bounds: Aabb) -> AabbIntersection {
    assert_eq!(
      self.mode,
      Mode::Subtractive,
      "intersection() is only meaningful for subtractive volumes"
    );

    let mut inside = 0;
    for v in bounds.corners() {
      if v.distance_squared(self.position) < self.radius2 {
        inside += 1;
      }
    }

    match inside {
      0 => AabbIntersection::None,
      8 => AabbIntersection::Contains,
      _ => AabbIntersection::Intersects,
    }
  }

  fn value_at(&self, p: Vec3, fuzziness: f32) -> FieldSample {
    let d2 = p.distance_squared(self.position);
    let inner_radius = self.radius - fuzziness;

    let min2 = inner_radius * inner_radius;
    if d2 <= min2 {
      return FieldSample::new(1.0, self.material);
    }

    if d2 >= self.radius2 {
      return FieldSample::new(0.0, self.material);
    }

    let d = d2.sqrt() - inner_radius;
    FieldSample::new(1.0 - d / fuzziness, self.material)
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }
}

// =============================================================================
// Halfspace
// =============================================================================

/// A plane dividing space; points on the negative side of the normal are
/// inside the volume, points in the direction of the normal are not.
pub struct HalfspaceSampler {
  origin: Vec3,
  normal: Vec3,
  mode: Mode,
  material: MaterialState,
}

impl HalfspaceSampler {
  pub fn new(plane_origin: Vec3, plane_normal: Vec3, mode: Mode) -> Self {
    Self {
      origin: plane_origin,
      normal: plane_normal.normalize(),
      mode,
      material: MaterialState::default(),
    }
  }

  pub fn with_material(mut self, material: MaterialState) -> Self {
    self.material = material;
    self
  }

  pub fn plane_origin(&self) -> Vec3 {
    self.origin
  }

  pub fn set_plane_origin(&mut self, origin: Vec3) {
    self.origin = origin;
  }

  pub fn plane_normal(&self) -> Vec3 {
    self.normal
  }

  pub fn set_plane_normal(&mut self, normal: Vec3) {
    self.normal = normal.normalize();
  }
}

impl VolumeSampler for HalfspaceSampler {
  fn mode(&self) -> Mode {
    self.mode
  }

  fn intersects(&self, bounds: Aabb) -> bool {
    for v in bounds.corners() {
      if self.normal.dot(v - self.origin) < 0.0 {
        return true;
      }
    }
    false
  }

  fn intersection(&self, bounds: Aabb) -> AabbIntersection {
    assert_eq!(
      self.mode,
      Mode::Subtractive,
      "intersection() is only meaningful for subtractive volumes"
    );

    let mut inside = 0;
    for v in bounds.corners() {
      if self.normal.dot(v - self.origin) < 0.0 {
        inside += 1;
      }
    }

    match inside {
      0 => AabbIntersection::None,
      8 => AabbIntersection::Contains,
      _ => AabbIntersection::Intersects,
    }
  }

  fn value_at(&self, p: Vec3, fuzziness: f32) -> FieldSample {
    let signed_dist = self.normal.dot(p - self.origin);
    let value = if signed_dist < -fuzziness {
      1.0
    } else if signed_dist > 0.0 {
      0.0
    } else {
      -signed_dist / fuzziness
    };
    FieldSample::new(value, self.material)
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }
}

// =============================================================================
// Bounded plane
// =============================================================================

/// A plane with thickness; points less than half the thickness from the
/// plane are inside the volume.
pub struct BoundedPlaneSampler {
  origin: Vec3,
  normal: Vec3,
  thickness: f32,
  mode: Mode,
  material: MaterialState,
}

impl BoundedPlaneSampler {
  pub fn new(plane_origin: Vec3, plane_normal: Vec3, plane_thickness: f32, mode: Mode) -> Self {
    Self {
      origin: plane_origin,
      normal: plane_normal.normalize(),
      thickness: plane_thickness.max(0.0),
      mode,
      material: MaterialState::default(),
    }
  }

  pub fn with_material(mut self, material: MaterialState) -> Self {
    self.material = material;
    self
  }

  pub fn plane_origin(&self) -> Vec3 {
    self.origin
  }

  pub fn set_plane_origin(&mut self, origin: Vec3) {
    self.origin = origin;
  }

  pub fn plane_normal(&self) -> Vec3 {
    self.normal
  }

  pub fn set_plane_normal(&mut self, normal: Vec3) {
    self.normal = normal.normalize();
  }

  pub fn thickness(&self) -> f32 {
    self.thickness
  }

  pub fn set_thickness(&mut self, thickness: f32) {
    self.thickness = thickness.max(0.0);
  }
}

impl VolumeSampler for BoundedPlaneSampler {
  fn mode(&self) -> Mode {
    self.mode
  }

  fn intersects(&self, bounds: Aabb) -> bool {
    bounded_plane_intersection(self.origin, self.normal, self.thickness / 2.0, &bounds.corners())
      != AabbIntersection::None
  }

  fn intersection(&self, bounds: Aabb) -> AabbIntersection {
    assert_eq!(
      self.mode,
      Mode::Subtractive,
      "intersection() is only meaningful for subtractive volumes"
    );

    bounded_plane_intersection(self.origin, self.normal, self.thickness / 2.0, &bounds.corners())
  }

  fn value_at(&self, p: Vec3, fuzziness: f32) -> FieldSample {
    // distance of p from the plane
    let dist = self.normal.dot(p - self.origin).abs();
    let outer_dist = self.thickness * 0.5;
    let inner_dist = outer_dist - fuzziness;

    let value = if dist <= inner_dist {
      1.0
    } else if dist >= outer_dist {
      0.0
    } else {
      1.0 - (dist - inner_dist) / fuzziness
    };
    FieldSample::new(value, self.material)
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }
}

// =============================================================================
// Oriented rectangular prism
// =============================================================================

/// An arbitrarily rotated rectangular prism.
///
/// The prism is treated as the intersection of three bounded planar volumes
/// along its local axes; the same decomposition drives the broad-phase
/// tests, a simplification of separating axes against an AABB.
pub struct RectPrismSampler {
  origin: Vec3,
  half_extents: Vec3,
  rotation: Mat3,
  mode: Mode,
  material: MaterialState,

  // derived state, rebuilt on every mutation
  pos_x: Vec3,
  pos_y: Vec3,
  pos_z: Vec3,
  corners: [Vec3; 8],
  bounds: Aabb,
}

impl RectPrismSampler {
  pub fn new(origin: Vec3, half_extents: Vec3, rotation: Mat3, mode: Mode) -> Self {
    let mut sampler = Self {
      origin,
      half_extents: half_extents.max(Vec3::ZERO),
      rotation,
      mode,
      material: MaterialState::default(),
      pos_x: Vec3::X,
      pos_y: Vec3::Y,
      pos_z: Vec3::Z,
      corners: [Vec3::ZERO; 8],
      bounds: Aabb::new(Vec3::ZERO, Vec3::ZERO),
    };
    sampler.update();
    sampler
  }

  pub fn with_material(mut self, material: MaterialState) -> Self {
    self.material = material;
    self
  }

  pub fn position(&self) -> Vec3 {
    self.origin
  }

  pub fn set_position(&mut self, position: Vec3) {
    self.origin = position;
    self.update();
  }

  pub fn half_extents(&self) -> Vec3 {
    self.half_extents
  }

  pub fn set_half_extents(&mut self, half_extents: Vec3) {
    self.half_extents = half_extents.max(Vec3::ZERO);
    self.update();
  }

  pub fn rotation(&self) -> Mat3 {
    self.rotation
  }

  pub fn set_rotation(&mut self, rotation: Mat3) {
    self.rotation = rotation;
    self.update();
  }

  pub fn set_all(&mut self, position: Vec3, half_extents: Vec3, rotation: Mat3) {
    self.origin = position;
    self.half_extents = half_extents.max(Vec3::ZERO);
    self.rotation = rotation;
    self.update();
  }

  /// World-space bounding box of the rotated prism.
  pub fn bounds(&self) -> Aabb {
    self.bounds
  }

  pub fn corners(&self) -> [Vec3; 8] {
    self.corners
  }

  fn update(&mut self) {
    // local axes are the rotation's columns
    self.pos_x = self.rotation.x_axis;
    self.pos_y = self.rotation.y_axis;
    self.pos_z = self.rotation.z_axis;

    let e = self.half_extents;
    let offsets = [
      Vec3::new(e.x, -e.y, -e.z),
      Vec3::new(e.x, -e.y, e.z),
      Vec3::new(-e.x, -e.y, e.z),
      Vec3::new(-e.x, -e.y, -e.z),
      Vec3::new(e.x, e.y, -e.z),
      Vec3::new(e.x, e.y, e.z),
      Vec3::new(-e.x, e.y, e.z),
      Vec3::new(-e.x, e.y, -e.z),
    ];

    let mut bounds = Aabb::invalid();
    for (corner, offset) in self.corners.iter_mut().zip(offsets) {
      *corner = self.origin + self.rotation * offset;
      bounds.add_point(*corner);
    }
    self.bounds = bounds;
  }
}

impl VolumeSampler for RectPrismSampler {
  fn mode(&self) -> Mode {
    self.mode
  }

  fn intersects(&self, bounds: Aabb) -> bool {
    // coarse AABB check
    if !bounds.overlaps(&self.bounds) {
      return false;
    }

    // if the box intersects all three bounded planar volumes along the
    // prism's local axes, it intersects the prism
    let corners = bounds.corners();
    bounded_plane_intersection(self.origin, self.pos_x, self.half_extents.x, &corners)
      != AabbIntersection::None
      && bounded_plane_intersection(self.origin, self.pos_y, self.half_extents.y, &corners)
        != AabbIntersection::None
      && bounded_plane_intersection(self.origin, self.pos_z, self.half_extents.z, &corners)
        != AabbIntersection::None
  }

  fn intersection(&self, bounds: Aabb) -> AabbIntersection {
    assert_eq!(
      self.mode,
      Mode::Subtractive,
      "intersection() is only meaningful for subtractive volumes"
    );

    // coarse AABB check
    if !bounds.overlaps(&self.bounds) {
      return AabbIntersection::None;
    }

    let corners = bounds.corners();

    // if any axis is not ContainsAABB, that axis' verdict is the verdict
    let intersection =
      bounded_plane_intersection(self.origin, self.pos_x, self.half_extents.x, &corners);
    if intersection != AabbIntersection::Contains {
      return intersection;
    }

    let intersection =
      bounded_plane_intersection(self.origin, self.pos_y, self.half_extents.y, &corners);
    if intersection != AabbIntersection::Contains {
      return intersection;
    }

    bounded_plane_intersection(self.origin, self.pos_z, self.half_extents.z, &corners)
  }

  fn value_at(&self, p: Vec3, fuzziness: f32) -> FieldSample {
    let fuzziness = fuzziness + 1e-5;

    // positive distances mean the point is outside that face's slab; the
    // point is inside the prism only if all six are non-positive
    let dir = p - self.origin;
    let pos_x_distance = self.pos_x.dot(dir);
    let pos_y_distance = self.pos_y.dot(dir);
    let pos_z_distance = self.pos_z.dot(dir);

    let pos_x = pos_x_distance - self.half_extents.x;
    let neg_x = -pos_x_distance - self.half_extents.x;
    let pos_y = pos_y_distance - self.half_extents.y;
    let neg_y = -pos_y_distance - self.half_extents.y;
    let pos_z = pos_z_distance - self.half_extents.z;
    let neg_z = -pos_z_distance - self.half_extents.z;

    let value = if pos_x <= 0.0 && neg_x <= 0.0 && pos_y <= 0.0 && neg_y <= 0.0 && pos_z <= 0.0 && neg_z <= 0.0
    {
      let amounts = [
        -pos_x / fuzziness,
        -neg_x / fuzziness,
        -pos_y / fuzziness,
        -neg_y / fuzziness,
        -pos_z / fuzziness,
        -neg_z / fuzziness,
      ];
      amounts.iter().fold(1.0_f32, |acc, &a| acc.min(a))
    } else {
      0.0
    };

    FieldSample::new(value, self.material)
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }
}

// =============================================================================
// Tube
// =============================================================================

/// Configuration for a [`TubeSampler`].
#[derive(Clone, Copy)]
pub struct TubeConfig {
  /// Origin of the cylinder representing the outer radius of the tube.
  pub axis_origin: Vec3,
  /// Major axis of the cylinder making the outer radius of the tube.
  pub axis_dir: Vec3,
  /// Perpendicular to `axis_dir`, used for computing the cut angle.
  pub axis_perp: Vec3,
  /// Offset of the inner-radius cylinder from `axis_origin`. When zero both
  /// cylinders are coaxial; an offset produces interesting asymmetries.
  pub inner_radius_axis_offset: Vec3,
  /// Inner radius of the tube.
  pub inner_radius: f32,
  /// Outer radius of the tube.
  pub outer_radius: f32,
  /// Length of the tube, end to end.
  pub length: f32,
  /// [0, 2π] cuts a notch out of the tube lengthwise, with the center of
  /// the notch aligned via `axis_perp`.
  pub cut_angle: f32,
  /// Normal of the front capping plane.
  pub front_face_normal: Vec3,
  /// Normal of the back capping plane.
  pub back_face_normal: Vec3,
  /// Material the tube emits.
  pub material: MaterialState,
}

impl Default for TubeConfig {
  fn default() -> Self {
    Self {
      axis_origin: Vec3::ZERO,
      axis_dir: Vec3::Z,
      axis_perp: Vec3::Y,
      inner_radius_axis_offset: Vec3::ZERO,
      inner_radius: 0.0,
      outer_radius: 0.0,
      length: 1.0,
      cut_angle: 0.0,
      front_face_normal: Vec3::Z,
      back_face_normal: Vec3::NEG_Z,
      material: MaterialState::default(),
    }
  }
}

/// A cylindrical shell with capped ends and an optional lengthwise notch.
/// Always additive.
pub struct TubeSampler {
  axis_origin: Vec3,
  axis_dir: Vec3,
  axis_perp: Vec3,
  inner_radius_offset: Vec3,
  inner_radius: f32,
  outer_radius: f32,
  inner_radius2: f32,
  outer_radius2: f32,
  front_face_normal: Vec3,
  front_face_origin: Vec3,
  back_face_normal: Vec3,
  back_face_origin: Vec3,
  cut_angle: f32,
  cos_cut_angle: f32,
  has_inner_offset: bool,
  material: MaterialState,
}

impl TubeSampler {
  pub fn new(c: TubeConfig) -> Self {
    let axis_dir = c.axis_dir.normalize();
    let inner_radius = c.inner_radius.max(0.0);
    let outer_radius = c.outer_radius.max(0.0);
    let cut_angle = c.cut_angle.clamp(0.0, 2.0 * std::f32::consts::PI);

    Self {
      axis_origin: c.axis_origin,
      axis_dir,
      axis_perp: c.axis_perp.normalize(),
      inner_radius_offset: c.inner_radius_axis_offset,
      inner_radius,
      outer_radius,
      inner_radius2: inner_radius * inner_radius,
      outer_radius2: outer_radius * outer_radius,
      front_face_normal: c.front_face_normal.normalize(),
      front_face_origin: c.axis_origin + axis_dir * (c.length / 2.0),
      back_face_normal: c.back_face_normal.normalize(),
      back_face_origin: c.axis_origin - axis_dir * (c.length / 2.0),
      cut_angle,
      cos_cut_angle: cut_angle.cos(),
      has_inner_offset: c.inner_radius_axis_offset.length_squared() > 0.0,
      material: c.material,
    }
  }

  // http://mathworld.wolfram.com/Point-LineDistance3-Dimensional.html
  #[inline]
  fn distance_to_outer_axis2(&self, p: Vec3) -> (f32, Vec3) {
    let t = -(self.axis_origin - p).dot(self.axis_dir);
    let point_on_axis = self.axis_origin + t * self.axis_dir;
    (point_on_axis.distance_squared(p), point_on_axis)
  }

  #[inline]
  fn distance_to_inner_axis2(&self, p: Vec3) -> f32 {
    let origin = self.axis_origin + self.inner_radius_offset;
    let t = -(origin - p).dot(self.axis_dir);
    let point_on_axis = origin + t * self.axis_dir;
    point_on_axis.distance_squared(p)
  }

  /// Intersection of a box with the space between the two capping planes.
  fn bounded_space_intersection(&self, corners: &[Vec3; 8]) -> AabbIntersection {
    let mut on_positive_side = 0;
    let mut on_negative_side = 0;
    let mut inside = 0;

    for v in corners {
      let front_dist = self.front_face_normal.dot(*v - self.front_face_origin);
      let back_dist = self.back_face_normal.dot(*v - self.back_face_origin);

      if front_dist > 0.0 {
        on_positive_side += 1;
      } else if back_dist > 0.0 {
        on_negative_side += 1;
      } else {
        inside += 1;
      }

      if on_positive_side > 0 && on_negative_side > 0 {
        return AabbIntersection::Intersects;
      }
    }

    match inside {
      0 => AabbIntersection::None,
      8 => AabbIntersection::Contains,
      _ => AabbIntersection::Intersects,
    }
  }
}

impl VolumeSampler for TubeSampler {
  fn mode(&self) -> Mode {
    Mode::Additive
  }

  fn intersects(&self, bounds: Aabb) -> bool {
    let corners = bounds.corners();

    // quick check against the capping planes
    if self.bounded_space_intersection(&corners) == AabbIntersection::None {
      return false;
    }

    // find the closest and farthest corners to the axis; discard if the
    // closest is beyond the outer radius, or the farthest inside the inner
    let mut closest_dist2 = f32::MAX;
    let mut farthest_dist2 = 0.0_f32;

    for c in &corners {
      let (d2, _) = self.distance_to_outer_axis2(*c);
      closest_dist2 = closest_dist2.min(d2);

      let d2 = if self.has_inner_offset {
        self.distance_to_inner_axis2(*c)
      } else {
        d2
      };
      farthest_dist2 = farthest_dist2.max(d2);
    }

    if closest_dist2 > self.outer_radius2 {
      return false;
    }
    if farthest_dist2 < self.inner_radius2 {
      return false;
    }

    true
  }

  fn intersection(&self, _bounds: Aabb) -> AabbIntersection {
    panic!("intersection() is only meaningful for subtractive volumes");
  }

  fn value_at(&self, p: Vec3, fuzziness: f32) -> FieldSample {
    // A point is inside the tube volume if:
    // - on the negative side of both capping planes
    // - between the inner and outer radius from the axis

    let front_face_dist = self.front_face_normal.dot(p - self.front_face_origin);
    let back_face_dist = self.back_face_normal.dot(p - self.back_face_origin);

    // early exit
    if front_face_dist > 0.0 || back_face_dist > 0.0 {
      return FieldSample::new(0.0, self.material);
    }

    let (dist_outer2, closest_on_axis) = self.distance_to_outer_axis2(p);
    let dist_inner2 = if self.has_inner_offset {
      self.distance_to_inner_axis2(p)
    } else {
      dist_outer2
    };

    // early exit
    if dist_outer2 > self.outer_radius2 || dist_inner2 < self.inner_radius2 {
      return FieldSample::new(0.0, self.material);
    }

    let front_contribution = (-front_face_dist / fuzziness).min(1.0);
    let back_contribution = (-back_face_dist / fuzziness).min(1.0);

    let mut tube_contribution = 1.0;
    let outer_radius_inner = self.outer_radius - fuzziness;
    let inner_radius_inner = self.inner_radius + fuzziness;
    let outer_radius_inner2 = outer_radius_inner * outer_radius_inner;
    let inner_radius_inner2 = inner_radius_inner * inner_radius_inner;

    if dist_inner2 < inner_radius_inner2 {
      // gradient on the inner wall
      let radial_dist = dist_inner2.sqrt();
      tube_contribution = (radial_dist - self.inner_radius) / fuzziness;
    } else if dist_outer2 > outer_radius_inner2 {
      // gradient on the outer wall
      let radial_dist = dist_outer2.sqrt();
      tube_contribution = 1.0 - (radial_dist - outer_radius_inner) / fuzziness;
    }

    let mut total = front_contribution * back_contribution * tube_contribution;

    if self.cut_angle > 0.0 {
      let dir = (p - closest_on_axis).normalize_or_zero();
      if self.axis_perp.dot(dir) > self.cos_cut_angle {
        total = 0.0;
      }
    }

    FieldSample::new(total, self.material)
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }
}

// =============================================================================
// Heightmap
// =============================================================================

/// A y-up heightfield over a square grid, with a three-way material ramp
/// from a floor band up to the terrain peaks. Always additive.
pub struct HeightmapSampler {
  heightmap: Vec<f32>,
  dim: usize,
  max_height: f32,
  floor_threshold: f32,
  floor_material: MaterialState,
  low_material: MaterialState,
  high_material: MaterialState,
}

impl HeightmapSampler {
  /// `heightmap` holds `dim * dim` heights sampled at integer (x, z)
  /// positions.
  ///
  /// # Panics
  /// Panics if `heightmap.len() != dim * dim`.
  pub fn new(
    heightmap: Vec<f32>,
    dim: usize,
    max_height: f32,
    floor_threshold: f32,
    floor_material: MaterialState,
    low_material: MaterialState,
    high_material: MaterialState,
  ) -> Self {
    assert_eq!(
      heightmap.len(),
      dim * dim,
      "heightmap must hold dim * dim samples"
    );
    Self {
      heightmap,
      dim,
      max_height: max_height.max(0.0),
      floor_threshold,
      floor_material,
      low_material,
      high_material,
    }
  }

  pub fn max_height(&self) -> f32 {
    self.max_height
  }

  #[inline]
  fn height(&self, x: f32, z: f32) -> f32 {
    let xi = (x as isize).clamp(0, self.dim as isize - 1) as usize;
    let zi = (z as isize).clamp(0, self.dim as isize - 1) as usize;
    self.heightmap[zi * self.dim + xi]
  }
}

impl VolumeSampler for HeightmapSampler {
  fn mode(&self) -> Mode {
    Mode::Additive
  }

  fn intersects(&self, bounds: Aabb) -> bool {
    // the geometry spans the whole (x, z) footprint and rises no higher
    // than max_height, so a cheap test suffices
    bounds.min.y <= self.max_height
  }

  fn intersection(&self, _bounds: Aabb) -> AabbIntersection {
    panic!("intersection() is only meaningful for subtractive volumes");
  }

  fn value_at(&self, p: Vec3, fuzziness: f32) -> FieldSample {
    let height = self.height(p.x, p.z);
    let inner_height = (height - fuzziness).max(1.0);

    let material = if height < self.floor_threshold {
      let t = height / self.floor_threshold;
      MaterialState::mix(&self.floor_material, &self.low_material, t)
    } else {
      let t = (height - self.floor_threshold) / (self.max_height - self.floor_threshold);
      MaterialState::mix(&self.low_material, &self.high_material, t)
    };

    let value = if p.y > height {
      0.0
    } else if p.y < inner_height || p.y < 1e-3 {
      1.0
    } else {
      1.0 - (p.y - inner_height) / fuzziness
    };

    FieldSample::new(value, material)
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }
}

#[cfg(test)]
#[path = "samplers_test.rs"]
mod samplers_test;
