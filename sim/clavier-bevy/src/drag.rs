//! Pointer interaction: grab a body with the mouse and pull it.
//!
//! Selection happens in render space (ray against per-geom bounding
//! spheres); the resulting spring force is converted to solver space and
//! injected through [`Solver::apply_force`]. While paused there is no
//! integrator to respond to forces, so dragging teleports instead:
//! mocap bodies through `mocap_pos`, free-rooted bodies through their
//! root `qpos` slice.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use nalgebra::Vector3;

use clavier_model::{Data, JointType, Model, Solver};

use crate::convert::{sim_from_vec3, vec3_from_sim};
use crate::resources::Simulation;

/// Pull strength per meter of pointer displacement, scaled by body mass.
pub const DRAG_STIFFNESS: f64 = 250.0;

/// An active grab.
#[derive(Debug, Clone, Copy)]
pub struct Grab {
    /// Body being pulled.
    pub body: usize,
    /// Render-space point where the pick ray first hit.
    pub hit: Vec3,
    /// Latest pointer projection on the camera-facing plane through `hit`.
    pub current: Vec3,
    /// `current` as of the previous step, for paused-mode deltas.
    pub prev: Vec3,
}

/// Pointer interaction state. `None` between drags.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct DragState {
    /// The grab in progress, if any.
    pub grab: Option<Grab>,
}

impl DragState {
    /// Whether a body is currently held (camera input defers to this).
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.grab.is_some()
    }
}

/// A successful pick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pick {
    /// Body owning the hit geom.
    pub body: usize,
    /// Render-space hit point.
    pub point: Vec3,
    /// Ray parameter at the hit, for nearest-hit selection.
    pub distance: f32,
}

/// Cast a ray against the bounding spheres of every rendered geom and
/// return the nearest hit. Geoms on the world body are not grabbable.
#[must_use]
pub fn pick_body(model: &Model, data: &Data, ray: Ray3d) -> Option<Pick> {
    let mut best: Option<Pick> = None;
    for g in 0..model.ngeom {
        if model.geom_group[g] >= 3 {
            continue;
        }
        let body = model.geom_body[g];
        if body == 0 {
            continue;
        }

        let radius_sim = model.geom_type[g].bounding_radius(model.geom_size[g]);
        if !radius_sim.is_finite() {
            // Planes and height fields are scenery, not grab targets.
            continue;
        }
        let center_sim = data.xpos[body] + data.xquat[body] * model.geom_pos[g];
        let center = vec3_from_sim(&center_sim);
        #[allow(clippy::cast_possible_truncation)]
        let radius = radius_sim as f32;

        let Some(distance) = ray_sphere(ray, center, radius) else {
            continue;
        };
        if best.is_none_or(|b| distance < b.distance) {
            best = Some(Pick {
                body,
                point: ray.origin + *ray.direction * distance,
                distance,
            });
        }
    }
    best
}

/// Nearest non-negative ray parameter hitting the sphere, if any.
fn ray_sphere(ray: Ray3d, center: Vec3, radius: f32) -> Option<f32> {
    let to_center = center - ray.origin;
    let along = to_center.dot(*ray.direction);
    let closest_sq = to_center.length_squared() - along * along;
    if closest_sq > radius * radius {
        return None;
    }
    let half_chord = (radius * radius - closest_sq).sqrt();
    let t = if along - half_chord >= 0.0 {
        along - half_chord
    } else {
        along + half_chord
    };
    (t >= 0.0).then_some(t)
}

/// Frame-rate pointer system: begin a grab on left press, track the
/// pointer on the camera-facing plane while held, clear on release.
#[allow(clippy::needless_pass_by_value)]
pub fn update_drag(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
    sim: Option<Res<Simulation>>,
    mut drag: ResMut<DragState>,
) {
    if buttons.just_released(MouseButton::Left) {
        drag.grab = None;
        return;
    }
    let (Ok(window), Ok((camera, camera_tf)), Some(sim)) =
        (windows.single(), cameras.single(), sim)
    else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(camera_tf, cursor) else {
        return;
    };

    if buttons.just_pressed(MouseButton::Left) {
        if let Some(pick) = pick_body(&sim.model, &sim.data, ray) {
            debug!("grabbed body {} ({})", pick.body, sim.model.body_name(pick.body));
            drag.grab = Some(Grab {
                body: pick.body,
                hit: pick.point,
                current: pick.point,
                prev: pick.point,
            });
        }
        return;
    }

    if buttons.pressed(MouseButton::Left) {
        if let Some(grab) = drag.grab.as_mut() {
            let normal = camera_tf.forward();
            if let Some(point) = project_on_plane(ray, grab.hit, *normal) {
                grab.current = point;
            }
        }
    }
}

/// Intersect the pointer ray with the plane through `anchor` with the
/// given normal.
fn project_on_plane(ray: Ray3d, anchor: Vec3, normal: Vec3) -> Option<Vec3> {
    let denom = ray.direction.dot(normal);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = (anchor - ray.origin).dot(normal) / denom;
    (t >= 0.0).then(|| ray.origin + *ray.direction * t)
}

/// Per-step perturbation, called by the driver with the rest of the step
/// pipeline.
///
/// Always zeroes the applied-force buffer first, so releasing a body
/// stops pulling it immediately. Running: spring force from the hit
/// anchor to the current pointer projection, `max(1, mass)` scaled, zero
/// torque, applied at the (solver-space) grab point so off-center pulls
/// carry their lever-arm torque. Paused: move the body directly by the
/// pointer delta when it is mocap-driven or free-rooted.
pub fn apply_perturbation(
    model: &Model,
    data: &mut Data,
    solver: &mut dyn Solver,
    drag: &mut DragState,
    paused: bool,
) {
    data.clear_applied_forces();
    let Some(grab) = drag.grab.as_mut() else {
        return;
    };
    if grab.body >= model.nbody {
        return;
    }

    if paused {
        let delta = sim_from_vec3(grab.current) - sim_from_vec3(grab.prev);
        teleport(model, data, grab.body, &delta);
        // Keep the anchor with the body so unpausing does not yank it.
        grab.hit = grab.current;
    } else {
        let pull = sim_from_vec3(grab.current) - sim_from_vec3(grab.hit);
        let mass = model.body_mass[grab.body].max(1.0);
        let force = pull * DRAG_STIFFNESS * mass;
        let point = sim_from_vec3(grab.hit);
        solver.apply_force(model, data, force, Vector3::zeros(), point, grab.body);
    }
    grab.prev = grab.current;
}

/// Displace a body without dynamics: mocap bodies via their mocap slot,
/// free-rooted bodies via the translational part of their root joint.
/// Anything else stays put.
fn teleport(model: &Model, data: &mut Data, body: usize, delta: &Vector3<f64>) {
    if let Some(mocap) = model.body_mocapid[body] {
        if let Some(pos) = data.mocap_pos.get_mut(mocap) {
            *pos += delta;
        }
        return;
    }
    let Some(joint) = model.body_joint(body) else {
        return;
    };
    if model.jnt_type[joint] != JointType::Free {
        return;
    }
    let adr = model.jnt_qpos_adr[joint];
    if adr + 3 <= data.qpos.len() {
        data.qpos[adr] += delta.x;
        data.qpos[adr + 1] += delta.y;
        data.qpos[adr + 2] += delta.z;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use clavier_model::GeomType;

    struct AppliedForce {
        force: Vector3<f64>,
        torque: Vector3<f64>,
        point: Vector3<f64>,
        body: usize,
    }

    /// Solver stub that records apply_force calls.
    #[derive(Default)]
    struct RecordingSolver {
        forces: Vec<AppliedForce>,
    }

    impl Solver for RecordingSolver {
        fn step(&mut self, _model: &Model, _data: &mut Data) {}
        fn forward(&mut self, _model: &Model, _data: &mut Data) {}
        fn reset(&mut self, _model: &Model, _data: &mut Data) {}
        fn apply_force(
            &mut self,
            _model: &Model,
            _data: &mut Data,
            force: Vector3<f64>,
            torque: Vector3<f64>,
            point: Vector3<f64>,
            body: usize,
        ) {
            self.forces.push(AppliedForce {
                force,
                torque,
                point,
                body,
            });
        }
    }

    /// World body plus one sphere body at the solver origin.
    fn one_sphere_model(mass: f64) -> Model {
        let mut model = Model::empty();
        model.nbody = 2;
        model.nq = 1;
        model.nv = 1;
        model.body_parent = vec![0, 0];
        model.body_mass = vec![0.0, mass];
        model.body_mocapid = vec![None, None];
        model.body_jnt_adr = vec![None, None];
        model.name_body_adr = vec![0, 0];

        model.ngeom = 1;
        model.geom_type = vec![GeomType::Sphere];
        model.geom_body = vec![1];
        model.geom_size = vec![Vector3::new(0.5, 0.0, 0.0)];
        model.geom_pos = vec![Vector3::zeros()];
        model.geom_quat = vec![nalgebra::UnitQuaternion::identity()];
        model.geom_group = vec![0];
        model.geom_matid = vec![None];
        model.geom_dataid = vec![None];
        model.geom_rgba = vec![[1.0; 4]];
        model
    }

    fn ray(origin: Vec3, toward: Vec3) -> Ray3d {
        Ray3d::new(origin, Dir3::new(toward - origin).unwrap())
    }

    #[test]
    fn pick_hits_the_sphere() {
        let model = one_sphere_model(1.0);
        let data = model.make_data();
        // Body 1 sits at the render origin; look at it from +Z.
        let pick = pick_body(&model, &data, ray(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO)).unwrap();
        assert_eq!(pick.body, 1);
        assert_relative_eq!(pick.point.z, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn pick_misses_off_axis() {
        let model = one_sphere_model(1.0);
        let data = model.make_data();
        let miss = pick_body(
            &model,
            &data,
            ray(Vec3::new(0.0, 5.0, 5.0), Vec3::new(0.0, 10.0, -5.0)),
        );
        assert!(miss.is_none());
    }

    #[test]
    fn light_bodies_get_the_unit_mass_floor() {
        let model = one_sphere_model(0.05);
        let mut data = model.make_data();
        let mut solver = RecordingSolver::default();
        let mut drag = DragState {
            grab: Some(Grab {
                body: 1,
                hit: Vec3::ZERO,
                current: Vec3::new(1.0, 0.0, 0.0),
                prev: Vec3::ZERO,
            }),
        };

        apply_perturbation(&model, &mut data, &mut solver, &mut drag, false);

        let applied = &solver.forces[0];
        assert_eq!(applied.body, 1);
        // 1 m of render +X displacement, stiffness 250, mass floored to 1.
        assert_relative_eq!(applied.force.x, 250.0, epsilon = 1e-4);
        assert_relative_eq!(applied.torque.norm(), 0.0);
    }

    #[test]
    fn force_applies_at_the_grab_point() {
        let mut model = one_sphere_model(1.0);
        // Put the body away from the origin so the two candidate
        // application points differ.
        let mut data = model.make_data();
        data.xpos[1] = Vector3::new(5.0, 5.0, 5.0);
        model.body_mass[1] = 1.0;
        let mut solver = RecordingSolver::default();
        let mut drag = DragState {
            grab: Some(Grab {
                body: 1,
                hit: Vec3::new(0.0, 1.0, 0.0),
                current: Vec3::new(1.0, 1.0, 0.0),
                prev: Vec3::new(0.0, 1.0, 0.0),
            }),
        };

        apply_perturbation(&model, &mut data, &mut solver, &mut drag, false);

        // The force acts where the pick ray hit, render (0, 1, 0), which
        // is solver (0, 0, 1) after conversion. Pushing through the body
        // origin instead would lose the lever-arm torque.
        let point = solver.forces[0].point;
        assert_relative_eq!(point.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(point.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(point.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn heavy_bodies_scale_with_mass() {
        let model = one_sphere_model(4.0);
        let mut data = model.make_data();
        let mut solver = RecordingSolver::default();
        let mut drag = DragState {
            grab: Some(Grab {
                body: 1,
                hit: Vec3::ZERO,
                current: Vec3::new(1.0, 0.0, 0.0),
                prev: Vec3::ZERO,
            }),
        };

        apply_perturbation(&model, &mut data, &mut solver, &mut drag, false);
        assert_relative_eq!(solver.forces[0].force.x, 1000.0, epsilon = 1e-3);
    }

    #[test]
    fn no_grab_means_no_force() {
        let model = one_sphere_model(1.0);
        let mut data = model.make_data();
        data.qfrc_applied[0] = 9.0;
        let mut solver = RecordingSolver::default();
        let mut drag = DragState::default();

        apply_perturbation(&model, &mut data, &mut solver, &mut drag, false);

        assert!(solver.forces.is_empty());
        // Stale forces are cleared even with nothing held.
        assert_relative_eq!(data.qfrc_applied[0], 0.0);
    }

    #[test]
    fn paused_drag_teleports_mocap_bodies() {
        let mut model = one_sphere_model(1.0);
        model.nmocap = 1;
        model.body_mocapid = vec![None, Some(0)];
        let mut data = model.make_data();
        let mut solver = RecordingSolver::default();
        let mut drag = DragState {
            grab: Some(Grab {
                body: 1,
                hit: Vec3::ZERO,
                current: Vec3::new(1.0, 0.0, 0.0),
                prev: Vec3::ZERO,
            }),
        };

        apply_perturbation(&model, &mut data, &mut solver, &mut drag, true);

        // Render +X is solver +X; no force goes through the solver.
        assert!(solver.forces.is_empty());
        assert_relative_eq!(data.mocap_pos[0].x, 1.0, epsilon = 1e-5);
        // The delta is consumed; a second paused step adds nothing.
        apply_perturbation(&model, &mut data, &mut solver, &mut drag, true);
        assert_relative_eq!(data.mocap_pos[0].x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn paused_drag_without_mocap_or_free_root_is_inert() {
        let model = one_sphere_model(1.0);
        let mut data = model.make_data();
        let mut solver = RecordingSolver::default();
        let mut drag = DragState {
            grab: Some(Grab {
                body: 1,
                hit: Vec3::ZERO,
                current: Vec3::new(1.0, 0.0, 0.0),
                prev: Vec3::ZERO,
            }),
        };

        apply_perturbation(&model, &mut data, &mut solver, &mut drag, true);
        assert!(solver.forces.is_empty());
    }

    #[test]
    fn out_of_range_body_is_ignored() {
        let model = one_sphere_model(1.0);
        let mut data = model.make_data();
        let mut solver = RecordingSolver::default();
        let mut drag = DragState {
            grab: Some(Grab {
                body: 99,
                hit: Vec3::ZERO,
                current: Vec3::ONE,
                prev: Vec3::ZERO,
            }),
        };
        apply_perturbation(&model, &mut data, &mut solver, &mut drag, false);
        assert!(solver.forces.is_empty());
    }
}
