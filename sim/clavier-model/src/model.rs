//! Model struct definition, name decoding, and validation.
//!
//! [`Model`] is the static, immutable description of a loaded scene:
//! entity counts, parallel descriptor arrays indexed by entity id, and a
//! single null-delimited name blob. It is produced once per load by the
//! external solver's loader and shared read-only with the bridge layer.

use nalgebra::{UnitQuaternion, Vector3};

use crate::data::Data;
use crate::enums::{GeomType, JointType};
use crate::error::ModelError;

/// Static scene description (like mjModel).
///
/// Immutable after construction. All positions, orientations, and sizes
/// are in the solver's Z-up world or body-local frames.
///
/// # Memory layout
///
/// Arrays are indexed by their respective entity ids:
/// - `body_*` arrays indexed by `body_id` (0 = world/root body)
/// - `geom_*` arrays indexed by `geom_id`
/// - `jnt_*` arrays indexed by `joint_id`
/// - `light_*`, `mat_*`, `tex_*`, `mesh_*` likewise
///
/// The invariant that every array for entity kind K has length equal to
/// the K count is enforced by [`Model::validate`].
#[derive(Debug, Clone)]
pub struct Model {
    /// Model name.
    pub name: String,

    // ==================== Dimensions ====================
    /// Number of generalized position coordinates.
    pub nq: usize,
    /// Number of generalized velocity coordinates (DOFs).
    pub nv: usize,
    /// Number of bodies (including body 0).
    pub nbody: usize,
    /// Number of joints.
    pub njnt: usize,
    /// Number of geoms.
    pub ngeom: usize,
    /// Number of lights.
    pub nlight: usize,
    /// Number of materials.
    pub nmat: usize,
    /// Number of textures.
    pub ntex: usize,
    /// Number of imported meshes.
    pub nmesh: usize,
    /// Number of actuators.
    pub nu: usize,
    /// Number of mocap bodies.
    pub nmocap: usize,

    // ==================== Options ====================
    /// Solver integration timestep in seconds.
    pub timestep: f64,

    // ==================== Bodies (indexed by body_id) ====================
    /// Parent body index (0 for bodies attached to the world).
    pub body_parent: Vec<usize>,
    /// Body mass in kg.
    pub body_mass: Vec<f64>,
    /// Mocap array index for kinematic bodies, `None` otherwise.
    pub body_mocapid: Vec<Option<usize>>,
    /// First joint of this body in the `jnt_*` arrays, `None` if jointless.
    pub body_jnt_adr: Vec<Option<usize>>,

    // ==================== Geoms (indexed by geom_id) ====================
    /// Shape tag.
    pub geom_type: Vec<GeomType>,
    /// Owning body index.
    pub geom_body: Vec<usize>,
    /// Type-specific size parameters (see [`GeomType`]).
    pub geom_size: Vec<Vector3<f64>>,
    /// Local position offset in the owning body's frame.
    pub geom_pos: Vec<Vector3<f64>>,
    /// Local orientation offset in the owning body's frame.
    pub geom_quat: Vec<UnitQuaternion<f64>>,
    /// Visibility group (groups >= 3 are not rendered).
    pub geom_group: Vec<i32>,
    /// Material table index, `None` for per-geom color.
    pub geom_matid: Vec<Option<usize>>,
    /// Mesh table index for [`GeomType::Mesh`] geoms, `None` otherwise.
    pub geom_dataid: Vec<Option<usize>>,
    /// Per-geom RGBA fallback color.
    pub geom_rgba: Vec<[f32; 4]>,

    // ==================== Joints (indexed by joint_id) ====================
    /// Joint type.
    pub jnt_type: Vec<JointType>,
    /// Body this joint belongs to.
    pub jnt_body: Vec<usize>,
    /// Start index in the qpos array.
    pub jnt_qpos_adr: Vec<usize>,
    /// Joint limits (min, max).
    pub jnt_range: Vec<(f64, f64)>,

    // ==================== Lights (indexed by light_id) ====================
    /// Directional (sun-like) vs. spot light.
    pub light_directional: Vec<bool>,
    /// Body the light is attached to.
    pub light_body: Vec<usize>,

    // ==================== Materials (indexed by mat_id) ====================
    /// Material RGBA color.
    pub mat_rgba: Vec<[f32; 4]>,
    /// Texture table index, `None` for untextured materials.
    pub mat_texid: Vec<Option<usize>>,
    /// Specular intensity in [0, 1].
    pub mat_specular: Vec<f32>,
    /// Shininess in [0, 1] (render roughness = 1 - shininess).
    pub mat_shininess: Vec<f32>,
    /// Reflectance in [0, 1].
    pub mat_reflectance: Vec<f32>,

    // ==================== Textures (indexed by tex_id) ====================
    /// Texture width in pixels.
    pub tex_width: Vec<usize>,
    /// Texture height in pixels.
    pub tex_height: Vec<usize>,
    /// Byte offset of this texture's pixels in `tex_rgb`.
    pub tex_adr: Vec<usize>,
    /// Packed RGB pixel data for all textures (3 bytes per pixel).
    pub tex_rgb: Vec<u8>,

    // ==================== Meshes (indexed by mesh_id) ====================
    /// Vertex positions for all meshes, 3 floats per vertex.
    pub mesh_vert: Vec<f32>,
    /// Vertex normals for all meshes, 3 floats per vertex.
    pub mesh_normal: Vec<f32>,
    /// Texture coordinates for all meshes, 2 floats per vertex.
    pub mesh_texcoord: Vec<f32>,
    /// Triangle indices for all meshes, 3 per face.
    pub mesh_face: Vec<u32>,
    /// First vertex of mesh `m` (in vertices, not floats).
    pub mesh_vert_adr: Vec<usize>,
    /// Vertex count of mesh `m`.
    pub mesh_vert_num: Vec<usize>,
    /// First face of mesh `m` (in faces, not indices).
    pub mesh_face_adr: Vec<usize>,
    /// Face count of mesh `m`.
    pub mesh_face_num: Vec<usize>,
    /// First texcoord of mesh `m`, `None` if the mesh has no UVs.
    pub mesh_texcoord_adr: Vec<Option<usize>>,

    // ==================== Actuators (indexed by actuator_id) ====================
    /// Control range (min, max).
    pub actuator_ctrlrange: Vec<(f64, f64)>,
    /// Whether the control range is enforced.
    pub actuator_ctrllimited: Vec<bool>,

    // ==================== Names ====================
    /// Null-delimited name blob for all entities.
    pub names: Vec<u8>,
    /// Byte offset of each body's name in `names`.
    pub name_body_adr: Vec<usize>,
}

impl Model {
    /// Create an empty model containing only the world body.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            nq: 0,
            nv: 0,
            nbody: 1,
            njnt: 0,
            ngeom: 0,
            nlight: 0,
            nmat: 0,
            ntex: 0,
            nmesh: 0,
            nu: 0,
            nmocap: 0,
            timestep: 0.002,
            body_parent: vec![0],
            body_mass: vec![0.0],
            body_mocapid: vec![None],
            body_jnt_adr: vec![None],
            geom_type: Vec::new(),
            geom_body: Vec::new(),
            geom_size: Vec::new(),
            geom_pos: Vec::new(),
            geom_quat: Vec::new(),
            geom_group: Vec::new(),
            geom_matid: Vec::new(),
            geom_dataid: Vec::new(),
            geom_rgba: Vec::new(),
            jnt_type: Vec::new(),
            jnt_body: Vec::new(),
            jnt_qpos_adr: Vec::new(),
            jnt_range: Vec::new(),
            light_directional: Vec::new(),
            light_body: Vec::new(),
            mat_rgba: Vec::new(),
            mat_texid: Vec::new(),
            mat_specular: Vec::new(),
            mat_shininess: Vec::new(),
            mat_reflectance: Vec::new(),
            tex_width: Vec::new(),
            tex_height: Vec::new(),
            tex_adr: Vec::new(),
            tex_rgb: Vec::new(),
            mesh_vert: Vec::new(),
            mesh_normal: Vec::new(),
            mesh_texcoord: Vec::new(),
            mesh_face: Vec::new(),
            mesh_vert_adr: Vec::new(),
            mesh_vert_num: Vec::new(),
            mesh_face_adr: Vec::new(),
            mesh_face_num: Vec::new(),
            mesh_texcoord_adr: Vec::new(),
            actuator_ctrlrange: Vec::new(),
            actuator_ctrllimited: Vec::new(),
            names: vec![0],
            name_body_adr: vec![0],
        }
    }

    /// Allocate a [`Data`] sized for this model, at the model's initial
    /// configuration (identity orientations, zeroed coordinates).
    #[must_use]
    pub fn make_data(&self) -> Data {
        Data::new(self)
    }

    /// Decode the name starting at byte offset `adr` in the name blob.
    ///
    /// Names are null-delimited; an offset at or past the end of the blob
    /// decodes as the empty string, as does non-UTF-8 data.
    #[must_use]
    pub fn name_at(&self, adr: usize) -> &str {
        let Some(tail) = self.names.get(adr..) else {
            return "";
        };
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        std::str::from_utf8(&tail[..end]).unwrap_or("")
    }

    /// The decoded name of body `body_id`, or the empty string.
    #[must_use]
    pub fn body_name(&self, body_id: usize) -> &str {
        self.name_body_adr
            .get(body_id)
            .map_or("", |&adr| self.name_at(adr))
    }

    /// The first joint attached to `body_id`, if any.
    #[must_use]
    pub fn body_joint(&self, body_id: usize) -> Option<usize> {
        self.body_jnt_adr.get(body_id).copied().flatten()
    }

    /// Validate the descriptor's index invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant: a missing world body, an
    /// array whose length disagrees with its entity count, a geom whose
    /// body/mesh/material reference is out of range, a material whose
    /// texture reference is out of range, or a non-positive timestep.
    pub fn validate(&self) -> Result<(), ModelError> {
        fn check(array: &'static str, actual: usize, expected: usize) -> Result<(), ModelError> {
            if actual == expected {
                Ok(())
            } else {
                Err(ModelError::DimensionMismatch {
                    array,
                    expected,
                    actual,
                })
            }
        }

        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(ModelError::InvalidTimestep(self.timestep));
        }
        if self.nbody == 0 {
            return Err(ModelError::NoWorldBody);
        }

        check("body_parent", self.body_parent.len(), self.nbody)?;
        check("body_mass", self.body_mass.len(), self.nbody)?;
        check("body_mocapid", self.body_mocapid.len(), self.nbody)?;
        check("body_jnt_adr", self.body_jnt_adr.len(), self.nbody)?;
        check("name_body_adr", self.name_body_adr.len(), self.nbody)?;

        check("geom_type", self.geom_type.len(), self.ngeom)?;
        check("geom_body", self.geom_body.len(), self.ngeom)?;
        check("geom_size", self.geom_size.len(), self.ngeom)?;
        check("geom_pos", self.geom_pos.len(), self.ngeom)?;
        check("geom_quat", self.geom_quat.len(), self.ngeom)?;
        check("geom_group", self.geom_group.len(), self.ngeom)?;
        check("geom_matid", self.geom_matid.len(), self.ngeom)?;
        check("geom_dataid", self.geom_dataid.len(), self.ngeom)?;
        check("geom_rgba", self.geom_rgba.len(), self.ngeom)?;

        check("jnt_type", self.jnt_type.len(), self.njnt)?;
        check("jnt_body", self.jnt_body.len(), self.njnt)?;
        check("jnt_qpos_adr", self.jnt_qpos_adr.len(), self.njnt)?;
        check("jnt_range", self.jnt_range.len(), self.njnt)?;

        check("light_directional", self.light_directional.len(), self.nlight)?;
        check("light_body", self.light_body.len(), self.nlight)?;

        check("mat_rgba", self.mat_rgba.len(), self.nmat)?;
        check("mat_texid", self.mat_texid.len(), self.nmat)?;
        check("mat_specular", self.mat_specular.len(), self.nmat)?;
        check("mat_shininess", self.mat_shininess.len(), self.nmat)?;
        check("mat_reflectance", self.mat_reflectance.len(), self.nmat)?;

        check("tex_width", self.tex_width.len(), self.ntex)?;
        check("tex_height", self.tex_height.len(), self.ntex)?;
        check("tex_adr", self.tex_adr.len(), self.ntex)?;

        check("mesh_vert_adr", self.mesh_vert_adr.len(), self.nmesh)?;
        check("mesh_vert_num", self.mesh_vert_num.len(), self.nmesh)?;
        check("mesh_face_adr", self.mesh_face_adr.len(), self.nmesh)?;
        check("mesh_face_num", self.mesh_face_num.len(), self.nmesh)?;
        check("mesh_texcoord_adr", self.mesh_texcoord_adr.len(), self.nmesh)?;

        check("actuator_ctrlrange", self.actuator_ctrlrange.len(), self.nu)?;
        check("actuator_ctrllimited", self.actuator_ctrllimited.len(), self.nu)?;

        for (g, &body) in self.geom_body.iter().enumerate() {
            if body >= self.nbody {
                return Err(ModelError::InvalidBodyReference {
                    geom: g,
                    body,
                    nbody: self.nbody,
                });
            }
        }
        for (g, dataid) in self.geom_dataid.iter().enumerate() {
            if let Some(mesh) = *dataid {
                if mesh >= self.nmesh {
                    return Err(ModelError::InvalidMeshReference {
                        geom: g,
                        mesh,
                        nmesh: self.nmesh,
                    });
                }
            }
        }
        for (g, matid) in self.geom_matid.iter().enumerate() {
            if let Some(material) = *matid {
                if material >= self.nmat {
                    return Err(ModelError::InvalidMaterialReference {
                        geom: g,
                        material,
                        nmat: self.nmat,
                    });
                }
            }
        }
        for (m, texid) in self.mat_texid.iter().enumerate() {
            if let Some(texture) = *texid {
                if texture >= self.ntex {
                    return Err(ModelError::InvalidTextureReference {
                        material: m,
                        texture,
                        ntex: self.ntex,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_model_validates() {
        let model = Model::empty();
        assert!(model.validate().is_ok());
        assert_eq!(model.nbody, 1);
        assert_eq!(model.body_name(0), "");
    }

    #[test]
    fn name_blob_decodes_by_offset() {
        let mut model = Model::empty();
        model.nbody = 3;
        model.names = b"world\0piano/white_key_0\0hand\0".to_vec();
        model.name_body_adr = vec![0, 6, 24];
        model.body_parent = vec![0, 0, 0];
        model.body_mass = vec![0.0; 3];
        model.body_mocapid = vec![None; 3];
        model.body_jnt_adr = vec![None; 3];

        assert_eq!(model.body_name(0), "world");
        assert_eq!(model.body_name(1), "piano/white_key_0");
        assert_eq!(model.body_name(2), "hand");
        // Out-of-range body id decodes as empty, not a panic.
        assert_eq!(model.body_name(99), "");
    }

    #[test]
    fn name_offset_past_end_is_empty() {
        let model = Model::empty();
        assert_eq!(model.name_at(1000), "");
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let mut model = Model::empty();
        model.ngeom = 1; // arrays stay empty
        let err = model.validate().unwrap_err();
        assert!(matches!(err, ModelError::DimensionMismatch { .. }));
    }

    #[test]
    fn dangling_geom_body_is_reported() {
        let mut model = Model::empty();
        model.ngeom = 1;
        model.geom_type = vec![GeomType::Sphere];
        model.geom_body = vec![5];
        model.geom_size = vec![Vector3::new(0.1, 0.0, 0.0)];
        model.geom_pos = vec![Vector3::zeros()];
        model.geom_quat = vec![UnitQuaternion::identity()];
        model.geom_group = vec![0];
        model.geom_matid = vec![None];
        model.geom_dataid = vec![None];
        model.geom_rgba = vec![[1.0; 4]];

        let err = model.validate().unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidBodyReference { geom: 0, body: 5, .. }
        ));
    }

    #[test]
    fn zero_body_model_is_rejected() {
        let mut model = Model::empty();
        model.nbody = 0;
        model.body_parent.clear();
        model.body_mass.clear();
        model.body_mocapid.clear();
        model.body_jnt_adr.clear();
        model.name_body_adr.clear();

        assert_eq!(model.validate(), Err(ModelError::NoWorldBody));
    }

    #[test]
    fn invalid_timestep_is_reported() {
        let mut model = Model::empty();
        model.timestep = 0.0;
        assert!(matches!(
            model.validate(),
            Err(ModelError::InvalidTimestep(_))
        ));
    }
}
