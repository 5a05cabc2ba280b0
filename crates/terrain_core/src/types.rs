//! Core value types shared across the meshing pipeline.

use glam::{Vec3, Vec4};

/// Isosurface threshold. Occupancy above this is "inside" the surface.
///
/// Samplers report occupancy in [0, 1]; the marching pass extracts the
/// `occupancy == ISO_LEVEL` surface.
pub const ISO_LEVEL: f32 = 0.5;

/// Surface material properties emitted by samplers.
///
/// When several additive samplers overlap, the composite volume blends their
/// materials weighted by each sampler's occupancy contribution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialState {
  /// Base surface color.
  pub color: Vec4,
  /// Specular shininess in [0, 1].
  pub shininess: f32,
  /// Blend weight of the first terrain texture.
  pub texture0: f32,
  /// Blend weight of the second terrain texture.
  pub texture1: f32,
}

impl Default for MaterialState {
  fn default() -> Self {
    Self {
      color: Vec4::ONE,
      shininess: 0.0,
      texture0: 0.0,
      texture1: 0.0,
    }
  }
}

impl MaterialState {
  pub fn new(color: Vec4, shininess: f32, texture0: f32, texture1: f32) -> Self {
    Self {
      color,
      shininess,
      texture0,
      texture1,
    }
  }

  /// Linear blend between two materials.
  pub fn mix(a: &MaterialState, b: &MaterialState, t: f32) -> MaterialState {
    MaterialState {
      color: a.color.lerp(b.color, t),
      shininess: a.shininess + (b.shininess - a.shininess) * t,
      texture0: a.texture0 + (b.texture0 - a.texture0) * t,
      texture1: a.texture1 + (b.texture1 - a.texture1) * t,
    }
  }
}

/// One probe of the scalar field: occupancy plus the material at that point.
#[derive(Clone, Copy, Debug)]
pub struct FieldSample {
  /// Occupancy in [0, 1]. 1 = fully inside, 0 = fully outside.
  pub value: f32,
  /// Material at the probed point.
  pub material: MaterialState,
}

impl FieldSample {
  pub fn new(value: f32, material: MaterialState) -> Self {
    Self { value, material }
  }

  /// A sample entirely outside every volume.
  pub fn empty() -> Self {
    Self {
      value: 0.0,
      material: MaterialState::default(),
    }
  }
}

/// Output vertex with position, color, and normal.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
  pub position: Vec3,
  pub color: Vec4,
  pub normal: Vec3,
}

/// A value-type triangle, copied into a consumer at the point of emission.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
  pub a: Vertex,
  pub b: Vertex,
  pub c: Vertex,
}

impl Triangle {
  pub fn new(a: Vertex, b: Vertex, c: Vertex) -> Self {
    Self { a, b, c }
  }

  pub fn vertices(&self) -> [Vertex; 3] {
    [self.a, self.b, self.c]
  }
}

/// Normal computation mode for the marching pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NormalMode {
  /// Flat normals from triangle winding (cheap, faceted).
  FaceGeometry,

  /// Smooth normals from a 6-tap central-difference gradient of the scalar
  /// field. `step` is the tap offset in voxel units.
  Gradient {
    /// Central-difference tap distance (typically 0.05-0.25).
    step: f32,
  },
}

impl Default for NormalMode {
  fn default() -> Self {
    NormalMode::Gradient { step: 0.1 }
  }
}
