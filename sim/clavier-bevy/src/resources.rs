//! Shared resources: the simulation bundle, viewer settings, and the
//! reset / reload operations.

use bevy::prelude::*;
use clavier_model::{Data, Model, ModelError, Solver};

use crate::audio::PianoAudio;
use crate::control::ControlPlayback;
use crate::drag::DragState;
use crate::driver::{RunState, StepClock};
use crate::keys::{restore_key_colors, Activation, KeyBindings, TransitionQueue};
use crate::scene::{self, SceneEntities};

/// The model, its mutable state, and the solver that advances it, bundled
/// so systems can borrow all three together.
#[derive(Resource)]
pub struct Simulation {
    /// Immutable per-load descriptor.
    pub model: Model,
    /// Mutable per-step state.
    pub data: Data,
    /// External stepping capability.
    pub solver: Box<dyn Solver>,
}

impl Simulation {
    /// Bundle a model with a solver, allocating fresh state.
    #[must_use]
    pub fn new(model: Model, solver: Box<dyn Solver>) -> Self {
        let data = model.make_data();
        Self {
            model,
            data,
            solver,
        }
    }
}

/// Viewer settings, the binding surface for an eventual GUI. Read every
/// frame; live pause state is tracked in [`RunState`].
#[derive(Resource, Debug, Clone)]
pub struct ViewerConfig {
    /// Start paused.
    pub paused: bool,
    /// Start with control playback paused.
    pub playback_paused: bool,
    /// Standard deviation of the control noise (0 disables it).
    pub ctrl_noise_std: f64,
    /// Time constant of the control noise filter, in seconds.
    pub ctrl_noise_rate: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            paused: false,
            playback_paused: false,
            ctrl_noise_std: 0.0,
            ctrl_noise_rate: 0.1,
        }
    }
}

/// Set to request a reset on the next frame; cleared once handled.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct ResetRequested(pub bool);

/// Load a simulation into the app: validate and spawn the scene, resolve
/// the key bindings, and insert the state resources. Replaces any
/// previously loaded scene atomically.
///
/// # Errors
///
/// Returns the model's validation error without touching the app state.
#[allow(clippy::too_many_arguments)]
pub fn load_simulation(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    images: &mut Assets<Image>,
    old_scene: Option<&SceneEntities>,
    model: Model,
    solver: Box<dyn Solver>,
) -> Result<(), ModelError> {
    let sim = {
        let mut sim = Simulation::new(model, solver);
        sim.solver.forward(&sim.model, &mut sim.data);
        sim
    };

    let entities = scene::replace_scene(
        commands,
        meshes,
        materials,
        images,
        old_scene,
        &sim.model,
        &sim.data,
    )?;

    let bindings = KeyBindings::resolve(&sim.model);
    info!("resolved {} piano key bindings", bindings.bound_count());

    commands.insert_resource(Activation::for_bindings(&bindings));
    commands.insert_resource(bindings);
    commands.insert_resource(entities);
    commands.insert_resource(StepClock::default());
    commands.insert_resource(DragState::default());
    commands.insert_resource(TransitionQueue::default());
    commands.insert_resource(sim);
    Ok(())
}

/// Handle a pending reset request: solver reset + forward, applied forces
/// and activation cleared, playback rewound, notes silenced, key colors
/// restored.
#[allow(clippy::needless_pass_by_value, clippy::too_many_arguments)]
pub fn handle_reset_request(
    mut requested: ResMut<ResetRequested>,
    sim: Option<ResMut<Simulation>>,
    mut clock: ResMut<StepClock>,
    mut playback: ResMut<ControlPlayback>,
    activation: Option<ResMut<Activation>>,
    mut audio: ResMut<PianoAudio>,
    bindings: Option<Res<KeyBindings>>,
    entities: Option<Res<SceneEntities>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    material_handles: Query<&MeshMaterial3d<StandardMaterial>>,
) {
    if !requested.0 {
        return;
    }
    requested.0 = false;

    let Some(mut sim) = sim else {
        return;
    };
    let Simulation {
        model,
        data,
        solver,
    } = &mut *sim;
    solver.reset(model, data);
    data.clear_applied_forces();
    solver.forward(model, data);

    clock.rewind();
    playback.rewind();
    audio.sink.release_all();

    if let Some(mut activation) = activation {
        activation.clear();
    }
    if let (Some(bindings), Some(entities)) = (bindings, entities) {
        restore_key_colors(
            &bindings,
            &entities,
            &mut materials,
            &material_handles,
        );
    }

    info!("simulation reset");
}

/// Flip between running and paused without resetting anything.
pub fn toggle_pause(run_state: &mut RunState) {
    *run_state = match run_state {
        RunState::Running => RunState::Paused,
        RunState::Paused => RunState::Running,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_pause_round_trips() {
        let mut state = RunState::Running;
        toggle_pause(&mut state);
        assert_eq!(state, RunState::Paused);
        toggle_pause(&mut state);
        assert_eq!(state, RunState::Running);
    }

    #[test]
    fn viewer_config_defaults_run_unpaused_without_noise() {
        let config = ViewerConfig::default();
        assert!(!config.paused);
        assert!((config.ctrl_noise_std - 0.0).abs() < f64::EPSILON);
    }
}
