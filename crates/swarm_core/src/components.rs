//! Built-in plain-data components
//!
//! Transform, bounds and render references used by the spawn paths. Math
//! types come from glam.

use crate::define_component;
use glam::{Mat4, Vec3};

/// World-space position of an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub position: Vec3,
}

impl Transform {
    pub const fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
        }
    }
}

/// Full local-to-world matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalToWorld(pub Mat4);

impl LocalToWorld {
    pub fn from_translation(translation: Vec3) -> Self {
        Self(Mat4::from_translation(translation))
    }

    pub fn translation(&self) -> Vec3 {
        self.0.w_axis.truncate()
    }
}

/// Axis-aligned bounding box, center plus half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderBounds {
    pub center: Vec3,
    pub extents: Vec3,
}

impl Default for RenderBounds {
    /// Unit cube at the origin.
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            extents: Vec3::splat(0.5),
        }
    }
}

/// Opaque handle to a mesh asset owned by the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MeshRef(pub u32);

/// Opaque handle to a material asset owned by the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MaterialRef(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShadowCasting {
    #[default]
    Off,
    On,
    TwoSided,
    ShadowsOnly,
}

/// Everything a renderer needs to draw one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderMesh {
    pub mesh: MeshRef,
    pub material: MaterialRef,
    pub sub_mesh: u32,
    pub cast_shadows: ShadowCasting,
    pub receive_shadows: bool,
    pub layer_mask: u32,
}

impl RenderMesh {
    pub fn new(mesh: MeshRef, material: MaterialRef) -> Self {
        Self {
            mesh,
            material,
            ..Self::default()
        }
    }
}

impl Default for RenderMesh {
    fn default() -> Self {
        Self {
            mesh: MeshRef::default(),
            material: MaterialRef::default(),
            sub_mesh: 0,
            cast_shadows: ShadowCasting::Off,
            receive_shadows: false,
            layer_mask: 1,
        }
    }
}

define_component!(Transform, 1, "Transform");
define_component!(LocalToWorld, 2, "LocalToWorld");
define_component!(RenderBounds, 3, "RenderBounds");
define_component!(MeshRef, 4, "MeshRef");
define_component!(MaterialRef, 5, "MaterialRef");
define_component!(RenderMesh, 6, "RenderMesh");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_to_world_translation() {
        let m = LocalToWorld::from_translation(Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(m.translation(), Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(LocalToWorld::default().0, Mat4::IDENTITY);
    }

    #[test]
    fn render_defaults() {
        let bounds = RenderBounds::default();
        assert_eq!(bounds.extents, Vec3::splat(0.5));

        let mesh = RenderMesh::new(MeshRef(3), MaterialRef(4));
        assert_eq!(mesh.layer_mask, 1);
        assert_eq!(mesh.cast_shadows, ShadowCasting::Off);
        assert!(!mesh.receive_shadows);
    }
}
