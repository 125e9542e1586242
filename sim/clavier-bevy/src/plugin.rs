//! Plugin composition for the piano viewer.

use bevy::prelude::*;

use crate::camera::{orbit_camera_input, spawn_piano_camera, update_orbit_camera};
use crate::control::{ControlPlayback, NoiseRng};
use crate::drag::{update_drag, DragState};
use crate::driver::{drive_simulation, RunState, StepClock};
use crate::keys::{recolor_keys, TransitionQueue};
use crate::resources::{handle_reset_request, ResetRequested, ViewerConfig};
use crate::audio::PianoAudio;
use crate::sync::{sync_body_transforms, sync_light_transforms};

/// The full bridge: fixed-step driving, pointer interaction, key events,
/// transform sync, and the orbit camera.
///
/// The plugin does not load a model; call
/// [`load_simulation`](crate::resources::load_simulation) from a startup
/// or asset-ready system to put a [`Simulation`] and its scene in
/// place.
///
/// [`Simulation`]: crate::resources::Simulation
/// Everything here is a no-op until then.
///
/// System order per frame:
/// 1. `Update`: viewer-config changes, reset handling, pointer drag,
///    then the fixed-step drive (all chained).
/// 2. `PostUpdate`: body/light transform sync and key recoloring.
#[derive(Default)]
pub struct ClavierPlugin {
    /// Initial viewer configuration.
    pub config: ViewerConfig,
    /// Spawn the default piano-viewpoint camera at startup.
    pub spawn_camera: bool,
    /// Spawn an ambient fill light at startup.
    pub spawn_lighting: bool,
    /// Add mouse-driven systems (camera orbit and body dragging).
    /// Requires input and window resources.
    pub enable_input: bool,
}

impl ClavierPlugin {
    /// Interactive configuration: camera, lighting, and input.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spawn_camera: true,
            spawn_lighting: true,
            enable_input: true,
            ..Default::default()
        }
    }

    /// Headless configuration for tests: no camera, lighting, or input.
    #[must_use]
    pub fn headless() -> Self {
        Self::default()
    }

    /// Set the initial viewer configuration.
    #[must_use]
    pub fn with_config(mut self, config: ViewerConfig) -> Self {
        self.config = config;
        self
    }

    /// Disable automatic camera spawning.
    #[must_use]
    pub fn without_camera(mut self) -> Self {
        self.spawn_camera = false;
        self
    }
}

impl Plugin for ClavierPlugin {
    fn build(&self, app: &mut App) {
        let run_state = if self.config.paused {
            RunState::Paused
        } else {
            RunState::Running
        };

        app.insert_resource(self.config.clone())
            .insert_resource(run_state)
            .init_resource::<StepClock>()
            .init_resource::<DragState>()
            .init_resource::<TransitionQueue>()
            .init_resource::<ControlPlayback>()
            .init_resource::<NoiseRng>()
            .init_resource::<PianoAudio>()
            .init_resource::<ResetRequested>();

        app.add_systems(
            Update,
            (apply_viewer_config, handle_reset_request, drive_simulation).chain(),
        );
        app.add_systems(
            PostUpdate,
            (sync_body_transforms, sync_light_transforms, recolor_keys),
        );

        if self.enable_input {
            app.add_systems(
                Update,
                (update_drag.before(drive_simulation), orbit_camera_input),
            );
            app.add_systems(Update, update_orbit_camera.after(orbit_camera_input));
        }
        if self.spawn_camera {
            app.add_systems(Startup, spawn_piano_camera);
        }
        if self.spawn_lighting {
            app.add_systems(Startup, spawn_fill_lighting);
        }
    }
}

/// Map viewer-config edits onto the live pause states. The config is the
/// GUI-facing surface; this keeps [`RunState`] and playback in step with
/// it without overriding programmatic toggles on unrelated frames.
#[allow(clippy::needless_pass_by_value)]
fn apply_viewer_config(
    config: Res<ViewerConfig>,
    mut run_state: ResMut<RunState>,
    mut playback: ResMut<ControlPlayback>,
) {
    if !config.is_changed() {
        return;
    }
    *run_state = if config.paused {
        RunState::Paused
    } else {
        RunState::Running
    };
    if config.playback_paused {
        playback.pause();
    } else {
        playback.play();
    }
}

/// Soft ambient fill so unlit models are still visible.
fn spawn_fill_lighting(mut commands: Commands) {
    commands.spawn(AmbientLight {
        color: Color::WHITE,
        brightness: 150.0,
        ..default()
    });
}
