//! Mesh and texture generation for model geometry.
//!
//! Converts the model's geom descriptors into Bevy meshes and its packed
//! texture blobs into Bevy images.
//!
//! ## Coordinate convention
//!
//! Primitive shapes are generated directly in render space: Bevy's
//! capsules and cylinders extend along +Y, which is where the solver's +Z
//! axis lands after the swizzle, so the (swizzled) geom orientation
//! handles the rest. Imported mesh vertex data is permuted **once here at
//! build time** via [`crate::convert::swizzle_triple_in_place`] — rigid
//! transforms are swizzled per frame instead, and applying both to the
//! same buffer would double-convert.

#![allow(clippy::cast_possible_truncation)] // f64 -> f32 is intentional for Bevy meshes

use bevy::asset::RenderAssetUsages;
use bevy::image::Image;
use bevy::mesh::{Indices, Mesh, PrimitiveTopology};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use clavier_model::Model;

use crate::convert::swizzle_triple_in_place;

/// Default shape for unknown or unsupported geom types: a small sphere
/// scaled from the first size parameter. Never fatal.
#[must_use]
pub fn fallback_mesh(size: &nalgebra::Vector3<f64>) -> Mesh {
    sphere_mesh(size.x * 0.5)
}

/// Sphere from its radius.
#[must_use]
pub fn sphere_mesh(radius: f64) -> Mesh {
    Sphere::new(radius.max(f64::EPSILON) as f32).mesh().build()
}

/// Capsule from radius and shaft half-length. Extends along render +Y.
#[must_use]
pub fn capsule_mesh(radius: f64, half_length: f64) -> Mesh {
    Capsule3d::new(radius as f32, half_length as f32 * 2.0)
        .mesh()
        .build()
}

/// Cylinder from radius and half-length. Extends along render +Y.
#[must_use]
pub fn cylinder_mesh(radius: f64, half_length: f64) -> Mesh {
    Cylinder::new(radius as f32, half_length as f32 * 2.0)
        .mesh()
        .build()
}

/// Box from solver-space half-extents. The Y/Z extents trade places so
/// the box matches its swizzled orientation.
#[must_use]
pub fn box_mesh(half_extents: &nalgebra::Vector3<f64>) -> Mesh {
    Cuboid::new(
        half_extents.x as f32 * 2.0,
        half_extents.z as f32 * 2.0,
        half_extents.y as f32 * 2.0,
    )
    .mesh()
    .build()
}

/// Unit sphere for ellipsoid geoms; the per-node `Transform::scale`
/// stretches it to the (swizzled) semi-axes.
#[must_use]
pub fn unit_sphere_mesh() -> Mesh {
    Sphere::new(1.0).mesh().build()
}

/// Large ground quad facing render +Y (solver +Z).
#[must_use]
pub fn plane_mesh() -> Mesh {
    Plane3d::new(Vec3::Y, Vec2::splat(100.0)).mesh().build()
}

/// Extract one imported mesh from the model's flat blobs.
///
/// Pulls the vertex/normal/uv/face sub-ranges for `mesh_id` and permutes
/// each vertex and normal into render space in the copy (the model's own
/// buffers are left untouched). Face indices are mesh-local, matching the
/// extracted vertex range.
///
/// Returns an empty triangle list if the mesh's ranges fall outside the
/// blobs (a lookup failure, skipped silently per the error policy).
#[must_use]
pub fn imported_mesh(model: &Model, mesh_id: usize) -> Mesh {
    let empty = || {
        Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        )
    };

    let (Some(&vert_adr), Some(&vert_num), Some(&face_adr), Some(&face_num)) = (
        model.mesh_vert_adr.get(mesh_id),
        model.mesh_vert_num.get(mesh_id),
        model.mesh_face_adr.get(mesh_id),
        model.mesh_face_num.get(mesh_id),
    ) else {
        return empty();
    };

    let vert_range = vert_adr * 3..(vert_adr + vert_num) * 3;
    let face_range = face_adr * 3..(face_adr + face_num) * 3;
    let (Some(verts), Some(normals), Some(faces)) = (
        model.mesh_vert.get(vert_range.clone()),
        model.mesh_normal.get(vert_range),
        model.mesh_face.get(face_range),
    ) else {
        warn!("mesh {mesh_id} has out-of-range vertex/face data; skipping");
        return empty();
    };

    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(vert_num);
    for chunk in verts.chunks_exact(3) {
        let mut v = [chunk[0], chunk[1], chunk[2]];
        swizzle_triple_in_place(&mut v);
        positions.push(v);
    }
    let mut normal_attr: Vec<[f32; 3]> = Vec::with_capacity(vert_num);
    for chunk in normals.chunks_exact(3) {
        let mut n = [chunk[0], chunk[1], chunk[2]];
        swizzle_triple_in_place(&mut n);
        normal_attr.push(n);
    }

    let mut mesh = empty();
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normal_attr);

    if let Some(tc_adr) = model.mesh_texcoord_adr.get(mesh_id).copied().flatten() {
        if let Some(uvs) = model.mesh_texcoord.get(tc_adr * 2..(tc_adr + vert_num) * 2) {
            let uv_attr: Vec<[f32; 2]> = uvs.chunks_exact(2).map(|c| [c[0], c[1]]).collect();
            mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uv_attr);
        }
    }

    mesh.insert_indices(Indices::U32(faces.to_vec()));
    mesh
}

/// Expand one packed-RGB texture into an RGBA Bevy image (alpha forced
/// opaque). Returns `None` when the texture's byte range is out of range.
#[must_use]
pub fn texture_image(model: &Model, tex_id: usize) -> Option<Image> {
    let width = *model.tex_width.get(tex_id)?;
    let height = *model.tex_height.get(tex_id)?;
    let adr = *model.tex_adr.get(tex_id)?;
    let rgb = model.tex_rgb.get(adr..adr + width * height * 3)?;

    let mut rgba = Vec::with_capacity(width * height * 4);
    for px in rgb.chunks_exact(3) {
        rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }

    Some(Image::new(
        Extent3d {
            width: width as u32,
            height: height as u32,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        rgba,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use bevy::mesh::VertexAttributeValues;
    use clavier_model::Model;

    /// Model with one triangle mesh at table index 0 and junk ahead of it
    /// in the blobs to exercise the address arithmetic.
    fn model_with_mesh() -> Model {
        let mut model = Model::empty();
        model.nmesh = 1;
        // One vertex of padding before the real data.
        model.mesh_vert = vec![9.0, 9.0, 9.0, /* mesh 0 */ 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        model.mesh_normal = vec![9.0, 9.0, 9.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        model.mesh_texcoord = Vec::new();
        model.mesh_face = vec![0, 1, 2];
        model.mesh_vert_adr = vec![1];
        model.mesh_vert_num = vec![3];
        model.mesh_face_adr = vec![0];
        model.mesh_face_num = vec![1];
        model.mesh_texcoord_adr = vec![None];
        model
    }

    #[test]
    fn imported_mesh_extracts_subrange_and_swizzles() {
        let model = model_with_mesh();
        let mesh = imported_mesh(&model, 0);

        let Some(VertexAttributeValues::Float32x3(positions)) =
            mesh.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            panic!("position attribute missing");
        };
        assert_eq!(positions.len(), 3);
        // Solver (0, 1, 0) becomes render (0, 0, -1).
        assert_eq!(positions[2], [0.0, 0.0, -1.0]);
        // Normals along solver +Z become render +Y.
        let Some(VertexAttributeValues::Float32x3(normals)) =
            mesh.attribute(Mesh::ATTRIBUTE_NORMAL)
        else {
            panic!("normal attribute missing");
        };
        assert_eq!(normals[0], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn imported_mesh_out_of_range_is_empty() {
        let mut model = model_with_mesh();
        model.mesh_vert_num = vec![100];
        let mesh = imported_mesh(&model, 0);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_POSITION).is_none());
    }

    #[test]
    fn texture_expands_rgb_to_rgba() {
        let mut model = Model::empty();
        model.ntex = 1;
        model.tex_width = vec![2];
        model.tex_height = vec![1];
        model.tex_adr = vec![0];
        model.tex_rgb = vec![10, 20, 30, 40, 50, 60];

        let image = texture_image(&model, 0).expect("texture should build");
        assert_eq!(
            image.data.as_deref().unwrap(),
            &[10, 20, 30, 255, 40, 50, 60, 255]
        );
    }

    #[test]
    fn truncated_texture_is_none() {
        let mut model = Model::empty();
        model.ntex = 1;
        model.tex_width = vec![4];
        model.tex_height = vec![4];
        model.tex_adr = vec![0];
        model.tex_rgb = vec![0; 10]; // needs 48 bytes

        assert!(texture_image(&model, 0).is_none());
    }

    #[test]
    fn primitive_meshes_have_vertices() {
        for mesh in [
            sphere_mesh(0.3),
            capsule_mesh(0.1, 0.5),
            cylinder_mesh(0.1, 0.5),
            box_mesh(&nalgebra::Vector3::new(0.1, 0.2, 0.3)),
            unit_sphere_mesh(),
            plane_mesh(),
        ] {
            assert!(mesh.attribute(Mesh::ATTRIBUTE_POSITION).is_some());
        }
    }
}
