//! Procedural dune heightmaps for terrain segments.
//!
//! Segments tile along +Z, so the noise field is sampled at a global Z
//! offset per segment; adjacent segments line up without seams.

use simdnoise::NoiseBuilder;

fn smoothstep(t: f32) -> f32 {
  t * t * (3.0 - 2.0 * t)
}

/// Generate a `(size + 1)²` heightmap for the segment at `idx`.
///
/// Three components, averaged: a smoothstepped floor, a squared dune layer,
/// and a second dune layer at twice the frequency. Heights stay within
/// `[0, max_height]`.
pub fn generate(idx: i32, size: u32, max_height: f32) -> Vec<f32> {
  let dim = (size + 1) as usize;
  let z_offset = (idx * size as i32) as f32;
  let frequency = 1.0 / size as f32;

  let (noise, _min, _max) = NoiseBuilder::fbm_2d_offset(0.0, dim, z_offset, dim)
    .with_seed(1337)
    .with_freq(frequency)
    .generate();

  let mut heightmap = vec![0.0_f32; dim * dim];
  for z in 0..dim {
    for x in 0..dim {
      // raw fbm output is small; expand to [0, 1] with a fixed gain so
      // the mapping is identical for every segment
      let raw = noise[z * dim + x];
      let n = ((raw * 8.0).clamp(-1.0, 1.0)) * 0.5 + 0.5;

      // sand-dune like structures
      let mut dune = n - n.floor();
      dune = dune * dune * max_height;

      let mut dune2 = n * 2.0;
      dune2 -= dune2.floor();
      dune2 = smoothstep(dune2) * max_height;

      let floor = smoothstep(n) * max_height;

      heightmap[z * dim + x] = (floor + dune + dune2) / 3.0;
    }
  }

  heightmap
}
