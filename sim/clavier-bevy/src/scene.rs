//! One-shot scene builder: model descriptor arrays to Bevy entities.
//!
//! Runs once per model load. Translates the flat geom/material/light
//! tables into a two-level entity hierarchy:
//!
//! ```text
//! Model Root
//! ├── body 0 group (when body 0 has geometry)
//! │   ├── its geom primitives
//! │   ├── lights
//! │   └── body 1..N groups (each with its geom primitives)
//! └── (otherwise: every body group directly under the root)
//! ```
//!
//! The model's body→body parent chain is intentionally NOT reproduced:
//! per-frame sync writes world-frame poses into every body group, so
//! nesting groups would apply parent transforms twice.
//!
//! Descriptor anomalies (unknown shape, missing material/texture/mesh
//! data) degrade to documented fallbacks and a log line, never a failure.
//! Load-level failures are caught up front by `Model::validate`; nothing
//! is spawned for an invalid model.

use std::collections::HashMap;

use bevy::prelude::*;
use clavier_model::{Data, GeomType, Model, ModelError};

use crate::convert::{quat_from_sim, vec3_from_sim};
use crate::mesh as shape;

/// Marker for the root entity of a spawned model scene.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct ModelRoot;

/// Links a body group entity to its body index in the model.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyIndex(pub usize);

/// Links a geom primitive entity to its geom index in the model.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeomIndex(pub usize);

/// Links a light entity to its light index in the model.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightIndex(pub usize);

/// Entity map produced by [`spawn_scene`], used by the per-frame sync
/// and the key recolor systems. Topology never changes after creation;
/// only transforms (and key materials) are mutated.
#[derive(Resource, Debug, Clone)]
pub struct SceneEntities {
    /// Root entity; despawning it tears down the whole scene.
    pub root: Entity,
    /// Body id -> group entity. Every body has a group (empty groups are
    /// created for geometry-less bodies so id lookups always succeed).
    pub bodies: Vec<Option<Entity>>,
    /// Geom id -> primitive entity (`None` for non-rendered groups).
    pub geoms: Vec<Option<Entity>>,
    /// Light entities in model order.
    pub lights: Vec<Entity>,
}

impl SceneEntities {
    /// The group entity for `body_id`, if the body exists.
    #[must_use]
    pub fn body(&self, body_id: usize) -> Option<Entity> {
        self.bodies.get(body_id).copied().flatten()
    }
}

/// Build the whole scene for a validated model.
///
/// # Errors
///
/// Fails only when `model` violates its index invariants; in that case
/// nothing is spawned (load is all-or-nothing and any previous scene is
/// left untouched).
pub fn spawn_scene(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    images: &mut Assets<Image>,
    model: &Model,
    data: &Data,
) -> Result<SceneEntities, ModelError> {
    model.validate()?;

    let root = commands
        .spawn((
            Name::new("Model Root"),
            ModelRoot,
            Transform::default(),
            Visibility::default(),
        ))
        .id();

    let mut bodies: Vec<Option<Entity>> = vec![None; model.nbody];
    let mut geoms: Vec<Option<Entity>> = vec![None; model.ngeom];
    // Imported meshes are cached by mesh id: geoms referencing the same
    // mesh share one geometry buffer.
    let mut mesh_cache: HashMap<usize, Handle<Mesh>> = HashMap::new();

    for g in 0..model.ngeom {
        // Visibility groups >= 3 are non-renderable.
        if model.geom_group[g] >= 3 {
            continue;
        }
        let b = model.geom_body[g];
        let body_entity = ensure_body_group(commands, &mut bodies, model, data, b);

        let ty = model.geom_type[g];
        let size = &model.geom_size[g];
        let handle = match ty {
            GeomType::Plane => meshes.add(shape::plane_mesh()),
            GeomType::Sphere => meshes.add(shape::sphere_mesh(size.x)),
            GeomType::Capsule => meshes.add(shape::capsule_mesh(size.x, size.y)),
            GeomType::Cylinder => meshes.add(shape::cylinder_mesh(size.x, size.y)),
            GeomType::Box => meshes.add(shape::box_mesh(size)),
            GeomType::Ellipsoid => meshes.add(shape::unit_sphere_mesh()),
            GeomType::Mesh => match model.geom_dataid[g] {
                Some(mesh_id) => mesh_cache
                    .entry(mesh_id)
                    .or_insert_with(|| meshes.add(shape::imported_mesh(model, mesh_id)))
                    .clone(),
                None => {
                    warn!("geom {g} is a mesh geom without mesh data; using fallback sphere");
                    meshes.add(shape::fallback_mesh(size))
                }
            },
            GeomType::Hfield => {
                warn!("geom {g} has unsupported type {ty:?}; using fallback sphere");
                meshes.add(shape::fallback_mesh(size))
            }
        };

        let material = materials.add(geom_material(model, g, images));

        // Local offsets are body-relative solver-space values; they get
        // the same one-time swizzle the body transforms get per frame.
        let mut transform = Transform {
            translation: vec3_from_sim(&model.geom_pos[g]),
            rotation: quat_from_sim(&model.geom_quat[g]),
            scale: Vec3::ONE,
        };
        if ty == GeomType::Plane {
            // The ground quad already faces render up.
            transform.rotation = Quat::IDENTITY;
        }
        if ty == GeomType::Ellipsoid {
            #[allow(clippy::cast_possible_truncation)]
            {
                transform.scale = Vec3::new(size.x as f32, size.z as f32, size.y as f32);
            }
        }

        let entity = commands
            .spawn((
                GeomIndex(g),
                Mesh3d(handle),
                MeshMaterial3d(material),
                transform,
                Visibility::default(),
                ChildOf(body_entity),
            ))
            .id();
        geoms[g] = Some(entity);
    }

    // Whether body 0 earned a group from its own geometry decides the
    // topology: with one, it is the effective root; without, everything
    // hangs off the scene root.
    let body0_group = bodies[0];

    let mut lights = Vec::with_capacity(model.nlight);
    for l in 0..model.nlight {
        let parent = body0_group.unwrap_or(root);
        let transform = light_transform(&data.light_xpos[l], &data.light_xdir[l]);
        let entity = if model.light_directional[l] {
            commands.spawn((
                LightIndex(l),
                DirectionalLight {
                    shadows_enabled: true,
                    ..default()
                },
                transform,
                ChildOf(parent),
            ))
        } else {
            commands.spawn((
                LightIndex(l),
                SpotLight {
                    shadows_enabled: true,
                    ..default()
                },
                transform,
                ChildOf(parent),
            ))
        }
        .id();
        lights.push(entity);
    }

    // Every body gets a group, geometry or not, so joint-state lookups
    // by body id always resolve.
    for b in 0..model.nbody {
        let entity = ensure_body_group(commands, &mut bodies, model, data, b);
        let parent = match body0_group {
            Some(group) if b != 0 => group,
            _ => root,
        };
        commands.entity(entity).insert(ChildOf(parent));
    }

    info!(
        "spawned scene '{}': {} bodies, {} geoms, {} lights",
        model.name, model.nbody, model.ngeom, model.nlight
    );

    Ok(SceneEntities {
        root,
        bodies,
        geoms,
        lights,
    })
}

/// Replace `old` with a freshly built scene in one command batch.
///
/// The new scene is fully built before the old root is despawned, so a
/// half-updated frame is never rendered; on failure the old scene is
/// left exactly as it was.
///
/// # Errors
///
/// Propagates validation failure from [`spawn_scene`].
pub fn replace_scene(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    images: &mut Assets<Image>,
    old: Option<&SceneEntities>,
    model: &Model,
    data: &Data,
) -> Result<SceneEntities, ModelError> {
    let scene = spawn_scene(commands, meshes, materials, images, model, data)?;
    if let Some(old) = old {
        commands.entity(old.root).despawn();
    }
    Ok(scene)
}

/// Resolve or create the group entity for body `b`.
fn ensure_body_group(
    commands: &mut Commands,
    bodies: &mut [Option<Entity>],
    model: &Model,
    data: &Data,
    b: usize,
) -> Entity {
    if let Some(entity) = bodies[b] {
        return entity;
    }
    let transform = Transform {
        translation: vec3_from_sim(&data.xpos[b]),
        rotation: quat_from_sim(&data.xquat[b]),
        scale: Vec3::ONE,
    };
    let entity = commands
        .spawn((
            Name::new(model.body_name(b).to_owned()),
            BodyIndex(b),
            transform,
            Visibility::default(),
        ))
        .id();
    bodies[b] = Some(entity);
    entity
}

/// World transform for a light: at its position, aimed along its
/// direction (both converted to render space).
#[must_use]
pub fn light_transform(pos: &nalgebra::Vector3<f64>, dir: &nalgebra::Vector3<f64>) -> Transform {
    let translation = vec3_from_sim(pos);
    let target = translation + vec3_from_sim(dir);
    Transform::from_translation(translation).looking_at(target, Vec3::Y)
}

/// Material for geom `g`: material-table color/texture when assigned,
/// otherwise the per-geom RGBA; missing texture data degrades to the
/// untextured color.
fn geom_material(model: &Model, g: usize, images: &mut Assets<Image>) -> StandardMaterial {
    let (rgba, matid) = match model.geom_matid[g] {
        Some(m) => (model.mat_rgba[m], Some(m)),
        None => (model.geom_rgba[g], None),
    };

    let mut material = StandardMaterial {
        base_color: Color::srgba(rgba[0], rgba[1], rgba[2], rgba[3]),
        ..default()
    };
    if rgba[3] < 1.0 {
        material.alpha_mode = AlphaMode::Blend;
    }

    if let Some(m) = matid {
        material.perceptual_roughness = (1.0 - model.mat_shininess[m]).clamp(0.0, 1.0);
        material.reflectance = model.mat_reflectance[m];
        material.metallic = 0.1;

        if let Some(tex_id) = model.mat_texid[m] {
            match shape::texture_image(model, tex_id) {
                Some(image) => material.base_color_texture = Some(images.add(image)),
                None => {
                    warn!("material {m} references unusable texture {tex_id}; using plain color");
                }
            }
        }
    }

    material
}
