use glam::{Mat3, Vec3, Vec4};

use super::*;
use crate::aabb::Aabb;

/// Simple xorshift32 PRNG for deterministic randomized tests.
struct XorShift32 {
  state: u32,
}

impl XorShift32 {
  fn new(seed: u32) -> Self {
    Self {
      state: if seed == 0 { 1 } else { seed },
    }
  }

  fn next(&mut self) -> u32 {
    let mut x = self.state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    self.state = x;
    x
  }

  fn next_f32(&mut self, lo: f32, hi: f32) -> f32 {
    lo + (self.next() as f32 / u32::MAX as f32) * (hi - lo)
  }

  fn next_vec3(&mut self, lo: f32, hi: f32) -> Vec3 {
    Vec3::new(
      self.next_f32(lo, hi),
      self.next_f32(lo, hi),
      self.next_f32(lo, hi),
    )
  }
}

// =============================================================================
// Sphere
// =============================================================================

#[test]
fn sphere_value_is_one_deep_inside_zero_outside() {
  let sphere = SphereSampler::new(Vec3::ZERO, 10.0, Mode::Additive);
  let fuzz = 2.0;

  // deep inside: distance < radius - fuzziness
  assert_eq!(sphere.value_at(Vec3::new(3.0, 0.0, 0.0), fuzz).value, 1.0);
  // outside
  assert_eq!(sphere.value_at(Vec3::new(10.5, 0.0, 0.0), fuzz).value, 0.0);
}

#[test]
fn sphere_value_decreases_across_fuzz_band() {
  let sphere = SphereSampler::new(Vec3::ZERO, 10.0, Mode::Additive);
  let fuzz = 2.0;

  let mut last = 1.0;
  let mut d = 8.0;
  while d <= 10.0 {
    let value = sphere.value_at(Vec3::new(d, 0.0, 0.0), fuzz).value;
    assert!(
      value <= last + 1e-6,
      "value must not increase with distance (d={}, {} > {})",
      d,
      value,
      last
    );
    assert!((0.0..=1.0).contains(&value));
    last = value;
    d += 0.125;
  }
}

#[test]
fn sphere_intersects_has_no_false_negatives() {
  let sphere = SphereSampler::new(Vec3::new(4.0, -2.0, 7.0), 6.0, Mode::Additive);
  let mut rng = XorShift32::new(0xC0FFEE);

  for _ in 0..500 {
    let min = rng.next_vec3(-20.0, 20.0);
    let bounds = Aabb::new(min, min + rng.next_vec3(0.5, 12.0).abs());

    // probe a grid of points inside the box
    let mut any_inside = false;
    for i in 0..64 {
      let f = Vec3::new(
        (i & 3) as f32 / 3.0,
        ((i >> 2) & 3) as f32 / 3.0,
        ((i >> 4) & 3) as f32 / 3.0,
      );
      let p = bounds.min + f * bounds.size();
      if sphere.value_at(p, 0.0).value > 0.0 {
        any_inside = true;
        break;
      }
    }

    if any_inside {
      assert!(
        sphere.intersects(bounds),
        "false negative for box {:?}",
        bounds
      );
    }
  }
}

#[test]
fn sphere_intersection_classifies_containment() {
  let sphere = SphereSampler::new(Vec3::ZERO, 10.0, Mode::Subtractive);

  let contained = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(2.0));
  assert_eq!(sphere.intersection(contained), AabbIntersection::Contains);

  let straddling = Aabb::from_center_half_extents(Vec3::new(10.0, 0.0, 0.0), Vec3::splat(2.0));
  assert_eq!(sphere.intersection(straddling), AabbIntersection::Intersects);

  let outside = Aabb::from_center_half_extents(Vec3::splat(50.0), Vec3::splat(2.0));
  assert_eq!(sphere.intersection(outside), AabbIntersection::None);
}

#[test]
#[should_panic(expected = "only meaningful for subtractive")]
fn sphere_additive_intersection_panics() {
  let sphere = SphereSampler::new(Vec3::ZERO, 5.0, Mode::Additive);
  let _ = sphere.intersection(Aabb::new(Vec3::ZERO, Vec3::ONE));
}

#[test]
fn degenerate_sphere_is_empty_not_a_crash() {
  let sphere = SphereSampler::new(Vec3::ZERO, -5.0, Mode::Additive);
  assert_eq!(sphere.radius(), 0.0);
  assert_eq!(sphere.value_at(Vec3::ZERO, 1.0).value, 0.0);
}

// =============================================================================
// Halfspace
// =============================================================================

#[test]
fn halfspace_negative_side_is_inside() {
  let plane = HalfspaceSampler::new(Vec3::ZERO, Vec3::Y, Mode::Additive);
  let fuzz = 1.0;

  assert_eq!(plane.value_at(Vec3::new(0.0, -5.0, 0.0), fuzz).value, 1.0);
  assert_eq!(plane.value_at(Vec3::new(0.0, 2.0, 0.0), fuzz).value, 0.0);

  let mid = plane.value_at(Vec3::new(0.0, -0.5, 0.0), fuzz).value;
  assert!((mid - 0.5).abs() < 1e-6);
}

#[test]
fn halfspace_intersection_counts_corners() {
  let plane = HalfspaceSampler::new(Vec3::ZERO, Vec3::Y, Mode::Subtractive);

  let below = Aabb::new(Vec3::new(-1.0, -5.0, -1.0), Vec3::new(1.0, -1.0, 1.0));
  assert_eq!(plane.intersection(below), AabbIntersection::Contains);

  let above = Aabb::new(Vec3::new(-1.0, 1.0, -1.0), Vec3::new(1.0, 5.0, 1.0));
  assert_eq!(plane.intersection(above), AabbIntersection::None);

  let spanning = Aabb::new(Vec3::new(-1.0, -2.0, -1.0), Vec3::new(1.0, 2.0, 1.0));
  assert_eq!(plane.intersection(spanning), AabbIntersection::Intersects);
}

// =============================================================================
// Bounded plane
// =============================================================================

#[test]
fn bounded_plane_value_falls_off_with_distance() {
  let slab = BoundedPlaneSampler::new(Vec3::ZERO, Vec3::Y, 4.0, Mode::Additive);
  let fuzz = 1.0;

  assert_eq!(slab.value_at(Vec3::ZERO, fuzz).value, 1.0);
  assert_eq!(slab.value_at(Vec3::new(0.0, 0.5, 0.0), fuzz).value, 1.0);
  assert_eq!(slab.value_at(Vec3::new(0.0, 3.0, 0.0), fuzz).value, 0.0);

  let in_band = slab.value_at(Vec3::new(0.0, 1.5, 0.0), fuzz).value;
  assert!((in_band - 0.5).abs() < 1e-6);
}

#[test]
fn bounded_plane_thickness_clamps_to_zero() {
  let slab = BoundedPlaneSampler::new(Vec3::ZERO, Vec3::Y, -3.0, Mode::Additive);
  assert_eq!(slab.thickness(), 0.0);
  assert_eq!(slab.value_at(Vec3::ZERO, 1.0).value, 0.0);
}

// =============================================================================
// Rectangular prism
// =============================================================================

#[test]
fn axis_aligned_prism_contains_its_interior() {
  let prism = RectPrismSampler::new(Vec3::ZERO, Vec3::new(4.0, 2.0, 3.0), Mat3::IDENTITY, Mode::Additive);
  let fuzz = 0.5;

  assert_eq!(prism.value_at(Vec3::ZERO, fuzz).value, 1.0);
  assert_eq!(prism.value_at(Vec3::new(5.0, 0.0, 0.0), fuzz).value, 0.0);
  assert_eq!(prism.value_at(Vec3::new(0.0, 3.0, 0.0), fuzz).value, 0.0);
}

#[test]
fn rotated_prism_tracks_its_corners() {
  let rotation = Mat3::from_rotation_z(std::f32::consts::FRAC_PI_4);
  let prism = RectPrismSampler::new(Vec3::ZERO, Vec3::splat(1.0), rotation, Mode::Additive);

  // rotated by 45° around Z, the corners reach sqrt(2) along X/Y
  let bounds = prism.bounds();
  assert!(bounds.max.x > 1.3 && bounds.max.x < 1.5);
  assert!(bounds.max.z > 0.9 && bounds.max.z < 1.1);

  // the center is still deep inside
  assert_eq!(prism.value_at(Vec3::ZERO, 0.25).value, 1.0);
  // a point that would be inside the unrotated box is now outside
  assert_eq!(prism.value_at(Vec3::new(0.95, 0.95, 0.0), 0.25).value, 0.0);
}

#[test]
fn prism_intersects_has_no_false_negatives() {
  let rotation = Mat3::from_rotation_y(0.7) * Mat3::from_rotation_x(0.3);
  let prism = RectPrismSampler::new(
    Vec3::new(1.0, 2.0, -1.0),
    Vec3::new(5.0, 3.0, 4.0),
    rotation,
    Mode::Additive,
  );
  let mut rng = XorShift32::new(99);

  for _ in 0..500 {
    let min = rng.next_vec3(-15.0, 15.0);
    let bounds = Aabb::new(min, min + rng.next_vec3(0.5, 8.0).abs());

    let mut any_inside = false;
    for i in 0..64 {
      let f = Vec3::new(
        (i & 3) as f32 / 3.0,
        ((i >> 2) & 3) as f32 / 3.0,
        ((i >> 4) & 3) as f32 / 3.0,
      );
      let p = bounds.min + f * bounds.size();
      if prism.value_at(p, 0.0).value > 0.0 {
        any_inside = true;
        break;
      }
    }

    if any_inside {
      assert!(
        prism.intersects(bounds),
        "false negative for box {:?}",
        bounds
      );
    }
  }
}

#[test]
fn prism_subtractive_containment() {
  let prism = RectPrismSampler::new(Vec3::ZERO, Vec3::splat(8.0), Mat3::IDENTITY, Mode::Subtractive);

  let contained = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(2.0));
  assert_eq!(prism.intersection(contained), AabbIntersection::Contains);

  let outside = Aabb::from_center_half_extents(Vec3::splat(30.0), Vec3::splat(2.0));
  assert_eq!(prism.intersection(outside), AabbIntersection::None);
}

// =============================================================================
// Tube
// =============================================================================

fn test_tube() -> TubeSampler {
  TubeSampler::new(TubeConfig {
    axis_origin: Vec3::ZERO,
    axis_dir: Vec3::Z,
    axis_perp: Vec3::Y,
    inner_radius: 4.0,
    outer_radius: 6.0,
    length: 10.0,
    ..TubeConfig::default()
  })
}

#[test]
fn tube_shell_is_inside_between_radii() {
  let tube = test_tube();
  let fuzz = 0.5;

  // in the shell, mid-length
  assert!(tube.value_at(Vec3::new(5.0, 0.0, 0.0), fuzz).value > 0.9);
  // inside the hole
  assert_eq!(tube.value_at(Vec3::new(0.0, 0.0, 0.0), fuzz).value, 0.0);
  // beyond the outer radius
  assert_eq!(tube.value_at(Vec3::new(8.0, 0.0, 0.0), fuzz).value, 0.0);
  // past the front cap
  assert_eq!(tube.value_at(Vec3::new(5.0, 0.0, 7.0), fuzz).value, 0.0);
}

#[test]
fn tube_cut_angle_removes_a_notch() {
  let notched = TubeSampler::new(TubeConfig {
    axis_origin: Vec3::ZERO,
    axis_dir: Vec3::Z,
    axis_perp: Vec3::Y,
    inner_radius: 4.0,
    outer_radius: 6.0,
    length: 10.0,
    cut_angle: std::f32::consts::FRAC_PI_4,
    ..TubeConfig::default()
  });

  // directly along axis_perp: inside the notch
  assert_eq!(notched.value_at(Vec3::new(0.0, 5.0, 0.0), 0.5).value, 0.0);
  // opposite side is untouched
  assert!(notched.value_at(Vec3::new(0.0, -5.0, 0.0), 0.5).value > 0.9);
}

#[test]
fn tube_intersects_respects_caps_and_radii() {
  let tube = test_tube();

  // box around the shell
  let shell = Aabb::from_center_half_extents(Vec3::new(5.0, 0.0, 0.0), Vec3::splat(1.0));
  assert!(tube.intersects(shell));

  // box entirely inside the hole
  let hole = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(1.0));
  assert!(!tube.intersects(hole));

  // box beyond the front cap
  let past = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 20.0), Vec3::splat(1.0));
  assert!(!tube.intersects(past));
}

#[test]
#[should_panic(expected = "only meaningful for subtractive")]
fn tube_intersection_panics() {
  let tube = test_tube();
  let _ = tube.intersection(Aabb::new(Vec3::ZERO, Vec3::ONE));
}

// =============================================================================
// Heightmap
// =============================================================================

fn flat_heightmap(dim: usize, height: f32) -> HeightmapSampler {
  HeightmapSampler::new(
    vec![height; dim * dim],
    dim,
    8.0,
    1.0,
    MaterialState::new(Vec4::new(0.0, 0.0, 0.0, 1.0), 1.0, 0.0, 0.0),
    MaterialState::new(Vec4::ONE, 0.0, 1.0, 0.0),
    MaterialState::new(Vec4::new(0.3, 0.3, 0.3, 1.0), 0.0, 1.0, 1.0),
  )
}

#[test]
fn heightmap_solid_below_air_above() {
  let sampler = flat_heightmap(17, 5.0);
  let fuzz = 2.0;

  assert_eq!(sampler.value_at(Vec3::new(8.0, 1.0, 8.0), fuzz).value, 1.0);
  assert_eq!(sampler.value_at(Vec3::new(8.0, 6.0, 8.0), fuzz).value, 0.0);

  let band = sampler.value_at(Vec3::new(8.0, 4.0, 8.0), fuzz).value;
  assert!(band > 0.0 && band < 1.0);
}

#[test]
fn heightmap_intersects_is_a_height_test() {
  let sampler = flat_heightmap(17, 5.0);

  let low = Aabb::new(Vec3::ZERO, Vec3::splat(4.0));
  assert!(sampler.intersects(low));

  let high = Aabb::new(Vec3::new(0.0, 20.0, 0.0), Vec3::new(4.0, 24.0, 4.0));
  assert!(!sampler.intersects(high));
}

#[test]
#[should_panic(expected = "only meaningful for subtractive")]
fn heightmap_intersection_panics() {
  let sampler = flat_heightmap(9, 2.0);
  let _ = sampler.intersection(Aabb::new(Vec3::ZERO, Vec3::ONE));
}

#[test]
fn heightmap_materials_ramp_with_height() {
  let dim = 9;
  let mut heights = vec![0.5; dim * dim];
  // one tall column
  heights[4 * dim + 4] = 8.0;
  let sampler = HeightmapSampler::new(
    heights,
    dim,
    8.0,
    1.0,
    MaterialState::new(Vec4::new(0.0, 0.0, 0.0, 1.0), 1.0, 0.0, 0.0),
    MaterialState::new(Vec4::ONE, 0.0, 1.0, 0.0),
    MaterialState::new(Vec4::new(0.3, 0.3, 0.3, 1.0), 0.0, 1.0, 1.0),
  );

  // below the floor threshold: floor/low blend, shininess still present
  let floor = sampler.value_at(Vec3::new(1.0, 0.25, 1.0), 0.5);
  assert!(floor.material.shininess > 0.0);

  // at the peak: fully the high material
  let peak = sampler.value_at(Vec3::new(4.0, 7.0, 4.0), 0.5);
  assert!((peak.material.texture1 - 1.0).abs() < 1e-6);
}
