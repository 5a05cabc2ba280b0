//! Table-driven marching-cubes surface extraction.
//!
//! Walks every unit voxel cell of an axis-aligned region, samples a scalar
//! field at the 8 cell corners, and emits triangles approximating the
//! `occupancy == ISO_LEVEL` surface into a [`TriangleConsumer`].
//!
//! The pass is deterministic: a fixed field and region always produce the
//! identical triangle sequence, independent of what other regions are being
//! marched concurrently.

use glam::{Mat4, Vec3};

use crate::aabb::Aabb;
use crate::consumer::TriangleConsumer;
use crate::tables::{CORNER_OFFSETS, EDGE_CORNERS, MC_TRIS};
use crate::types::{FieldSample, MaterialState, NormalMode, Triangle, Vertex, ISO_LEVEL};

/// March the unit voxel cells of `region` and feed the resulting triangles
/// to `consumer`. Returns the number of triangles emitted.
///
/// `field` is probed at integer corner positions (and, for gradient normals,
/// at small offsets around each emitted vertex). Occupancy values are
/// expected in [0, 1]; edge interpolation only divides by corner-value
/// differences that straddle the isolevel, so it never divides by zero.
///
/// `transform`, when present, is applied to output positions as points and
/// to normals as directions.
pub fn march_region<F>(
  region: Aabb,
  field: &F,
  normal_mode: NormalMode,
  transform: Option<&Mat4>,
  consumer: &mut dyn TriangleConsumer,
) -> usize
where
  F: Fn(Vec3) -> FieldSample,
{
  let min = region.grid_min();
  let max = region.grid_max();

  let mut emitted = 0;
  let mut samples = [FieldSample::empty(); 8];
  // Corner values relative to the isolevel; negative means inside.
  let mut vs = [0.0_f32; 8];

  for z in min.z..max.z {
    for y in min.y..max.y {
      for x in min.x..max.x {
        let base = glam::IVec3::new(x, y, z);

        let mut config = 0_usize;
        for (i, offset) in CORNER_OFFSETS.iter().enumerate() {
          let sample = field((base + *offset).as_vec3());
          vs[i] = ISO_LEVEL - sample.value;
          samples[i] = sample;
          if vs[i] < 0.0 {
            config |= 1 << i;
          }
        }

        // Fully inside or fully outside; no surface in this cell
        if config == 0 || config == 255 {
          continue;
        }

        let packed = MC_TRIS[config];
        let tri_count = (packed & 0xF) as usize;
        let mut edge_bits = packed >> 4;

        for _ in 0..tri_count {
          let mut verts = [Vertex::default(); 3];

          for vert in &mut verts {
            let edge = (edge_bits & 0xF) as usize;
            edge_bits >>= 4;

            let (ca, cb) = EDGE_CORNERS[edge];
            // Linear fraction of the isolevel crossing. The table only
            // references edges whose endpoints straddle the isolevel, so
            // the denominator cannot vanish.
            let t = vs[ca] / (vs[ca] - vs[cb]);

            let pa = (base + CORNER_OFFSETS[ca]).as_vec3();
            let pb = (base + CORNER_OFFSETS[cb]).as_vec3();
            vert.position = pa.lerp(pb, t);
            vert.color = MaterialState::mix(&samples[ca].material, &samples[cb].material, t).color;
          }

          match normal_mode {
            NormalMode::FaceGeometry => {
              let n = (verts[1].position - verts[0].position)
                .cross(verts[2].position - verts[0].position)
                .normalize_or_zero();
              for vert in &mut verts {
                vert.normal = n;
              }
            }
            NormalMode::Gradient { step } => {
              for vert in &mut verts {
                vert.normal = gradient_normal(field, vert.position, step);
              }
            }
          }

          if let Some(m) = transform {
            for vert in &mut verts {
              vert.position = m.transform_point3(vert.position);
              vert.normal = m.transform_vector3(vert.normal).normalize_or_zero();
            }
          }

          consumer.triangle(&Triangle::new(verts[0], verts[1], verts[2]));
          emitted += 1;
        }
      }
    }
  }

  emitted
}

/// Surface normal from a 6-tap central difference of the field.
///
/// Occupancy falls off moving out of a volume, so the negated gradient
/// points outward.
fn gradient_normal<F>(field: &F, p: Vec3, step: f32) -> Vec3
where
  F: Fn(Vec3) -> FieldSample,
{
  let dx = Vec3::new(step, 0.0, 0.0);
  let dy = Vec3::new(0.0, step, 0.0);
  let dz = Vec3::new(0.0, 0.0, step);

  let grad = Vec3::new(
    field(p + dx).value - field(p - dx).value,
    field(p + dy).value - field(p - dy).value,
    field(p + dz).value - field(p - dz).value,
  );

  -grad.normalize_or_zero()
}

#[cfg(test)]
#[path = "march_test.rs"]
mod march_test;
