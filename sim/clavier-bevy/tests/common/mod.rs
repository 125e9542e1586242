//! Shared fixtures for the integration suites: a headless app, a
//! counting solver with observable call counts, a recording note sink,
//! and small hand-built models.

#![allow(dead_code)] // Each suite uses its own subset.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bevy::ecs::system::RunSystemOnce;
use bevy::prelude::*;
use clavier_bevy::audio::SinkEvent;
use clavier_bevy::prelude::*;
use clavier_model::{Data, GeomType, JointType, Model, Solver};
use nalgebra::{UnitQuaternion, Vector3};

/// Minimal Bevy app for testing (no rendering, no window).
pub fn test_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(bevy::asset::AssetPlugin::default());
    app.init_resource::<Assets<Mesh>>();
    app.init_resource::<Assets<StandardMaterial>>();
    app.init_resource::<Assets<Image>>();
    app.add_plugins(ClavierPlugin::headless());
    app
}

/// Shared call counters for [`CountingSolver`], inspectable after the
/// solver box has been moved into the app.
#[derive(Debug, Default, Clone)]
pub struct SolverCounters {
    pub steps: Arc<AtomicUsize>,
    pub forwards: Arc<AtomicUsize>,
    pub resets: Arc<AtomicUsize>,
}

impl SolverCounters {
    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::SeqCst)
    }

    pub fn forwards(&self) -> usize {
        self.forwards.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

/// Solver stub: counts calls, advances `data.time` on step, zeroes
/// `qpos` and `time` on reset.
pub struct CountingSolver {
    pub counters: SolverCounters,
}

impl CountingSolver {
    pub fn new() -> (Box<dyn Solver>, SolverCounters) {
        let counters = SolverCounters::default();
        (
            Box::new(Self {
                counters: counters.clone(),
            }),
            counters,
        )
    }
}

impl Solver for CountingSolver {
    fn step(&mut self, model: &Model, data: &mut Data) {
        data.time += model.timestep;
        self.counters.steps.fetch_add(1, Ordering::SeqCst);
    }

    fn forward(&mut self, _model: &Model, _data: &mut Data) {
        self.counters.forwards.fetch_add(1, Ordering::SeqCst);
    }

    fn reset(&mut self, _model: &Model, data: &mut Data) {
        data.time = 0.0;
        data.qpos.fill(0.0);
        self.counters.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn apply_force(
        &mut self,
        _model: &Model,
        _data: &mut Data,
        _force: Vector3<f64>,
        _torque: Vector3<f64>,
        _point: Vector3<f64>,
        _body: usize,
    ) {
    }
}

/// Note sink with externally observable event log.
#[derive(Debug, Default, Clone)]
pub struct SharedSink {
    pub events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl PianoSink for SharedSink {
    fn trigger_attack(&mut self, note: u8) {
        self.events.lock().unwrap().push(SinkEvent::Attack(note));
    }

    fn trigger_release(&mut self, note: u8) {
        self.events.lock().unwrap().push(SinkEvent::Release(note));
    }

    fn release_all(&mut self) {
        self.events.lock().unwrap().push(SinkEvent::ReleaseAll);
    }
}

/// Write a name table into `model` (one name per body, in order).
pub fn set_body_names(model: &mut Model, names: &[&str]) {
    let mut blob = Vec::new();
    let mut adrs = Vec::new();
    for name in names {
        adrs.push(blob.len());
        blob.extend_from_slice(name.as_bytes());
        blob.push(0);
    }
    model.names = blob;
    model.name_body_adr = adrs;
}

/// Append one sphere geom on `body` to the model's geom tables.
pub fn push_sphere_geom(model: &mut Model, body: usize, group: i32, radius: f64) {
    model.ngeom += 1;
    model.geom_type.push(GeomType::Sphere);
    model.geom_body.push(body);
    model.geom_size.push(Vector3::new(radius, 0.0, 0.0));
    model.geom_pos.push(Vector3::zeros());
    model.geom_quat.push(UnitQuaternion::identity());
    model.geom_group.push(group);
    model.geom_matid.push(None);
    model.geom_dataid.push(None);
    model.geom_rgba.push([0.5, 0.5, 0.5, 1.0]);
}

/// World body plus `extra_bodies` childless dynamic bodies, no geoms.
pub fn bare_model(extra_bodies: usize) -> Model {
    let mut model = Model::empty();
    let nbody = 1 + extra_bodies;
    model.nbody = nbody;
    model.body_parent = vec![0; nbody];
    model.body_mass = vec![1.0; nbody];
    model.body_mocapid = vec![None; nbody];
    model.body_jnt_adr = vec![None; nbody];
    let names: Vec<String> = (0..nbody)
        .map(|i| if i == 0 { "world".into() } else { format!("body_{i}") })
        .collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    set_body_names(&mut model, &refs);
    model
}

/// Two-key piano model: world, a white key 0 and a black key 1, each a
/// hinged body with one sphere geom.
pub fn piano_model() -> Model {
    let mut model = bare_model(2);
    set_body_names(
        &mut model,
        &["world", "piano/white_key_0", "piano/black_key_1"],
    );
    model.body_jnt_adr = vec![None, Some(0), Some(1)];

    model.njnt = 2;
    model.jnt_type = vec![JointType::Hinge; 2];
    model.jnt_body = vec![1, 2];
    model.jnt_qpos_adr = vec![0, 1];
    model.jnt_range = vec![(0.0, 0.05), (0.0, 0.08)];
    model.nq = 2;
    model.nv = 2;

    push_sphere_geom(&mut model, 1, 0, 0.02);
    push_sphere_geom(&mut model, 2, 0, 0.02);
    model
}

/// Load `model` with a counting solver into the app, returning the
/// solver counters.
pub fn load_into_app(app: &mut App, model: Model) -> SolverCounters {
    let (solver, counters) = CountingSolver::new();
    let mut solver = Some(solver);
    let mut model = Some(model);

    let load = move |mut commands: Commands,
                     mut meshes: ResMut<Assets<Mesh>>,
                     mut materials: ResMut<Assets<StandardMaterial>>,
                     mut images: ResMut<Assets<Image>>| {
        let (Some(model), Some(solver)) = (model.take(), solver.take()) else {
            return;
        };
        // Invalid models leave the app untouched on purpose.
        let _ = load_simulation(
            &mut commands,
            &mut meshes,
            &mut materials,
            &mut images,
            None,
            model,
            solver,
        );
    };
    app.world_mut()
        .run_system_once(load)
        .expect("load system should run");
    counters
}
