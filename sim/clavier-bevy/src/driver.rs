//! Fixed-step driver: decides how many solver steps each render frame
//! gets, and runs the per-step pipeline.
//!
//! The render clock and the simulation clock advance independently. Each
//! frame the [`StepClock`] plans enough fixed `timestep` steps to bring
//! simulated time up to wall time, with one escape hatch: after a stall
//! (frame gap beyond the threshold) it snaps forward instead of grinding
//! through the backlog, so a tab losing focus never freezes the app on
//! resume.

use bevy::prelude::*;

use crate::audio::PianoAudio;
use crate::control::{apply_ctrl_noise, ControlPlayback, NoiseRng, PlaybackEvent};
use crate::drag::{apply_perturbation, DragState};
use crate::keys::{Activation, KeyBindings, TransitionQueue};
use crate::resources::{Simulation, ViewerConfig};

/// Frame gaps beyond this are treated as stalls and snapped over rather
/// than simulated through.
pub const STALL_THRESHOLD_MS: f64 = 35.0;

/// Whether the simulation advances.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Stepping normally.
    #[default]
    Running,
    /// Holding state; kinematics stay refreshed but time does not pass.
    Paused,
}

/// Simulated-time bookkeeping for the fixed-step loop.
#[derive(Resource, Debug, Clone)]
pub struct StepClock {
    sim_time_ms: f64,
    stall_threshold_ms: f64,
}

impl Default for StepClock {
    fn default() -> Self {
        Self {
            sim_time_ms: 0.0,
            stall_threshold_ms: STALL_THRESHOLD_MS,
        }
    }
}

impl StepClock {
    /// How many fixed steps to run so simulated time catches up to
    /// `frame_time_ms`, advancing the internal clock by `timestep`
    /// (seconds) per planned step.
    ///
    /// A gap beyond the stall threshold snaps the clock to wall time and
    /// plans zero steps, which also bounds the catch-up work of any
    /// normal frame. Zero elapsed time plans zero steps. A non-positive
    /// `timestep` plans zero steps rather than looping forever.
    pub fn plan(&mut self, frame_time_ms: f64, timestep: f64) -> usize {
        if timestep <= 0.0 {
            return 0;
        }
        if frame_time_ms - self.sim_time_ms > self.stall_threshold_ms {
            self.sim_time_ms = frame_time_ms;
            return 0;
        }
        let step_ms = timestep * 1000.0;
        let mut steps = 0;
        while self.sim_time_ms < frame_time_ms {
            self.sim_time_ms += step_ms;
            steps += 1;
        }
        steps
    }

    /// Pin the clock to wall time without stepping, so unpausing does not
    /// replay the paused interval.
    pub fn resync(&mut self, frame_time_ms: f64) {
        self.sim_time_ms = frame_time_ms;
    }

    /// Drop back to time zero (reset).
    pub fn rewind(&mut self) {
        self.sim_time_ms = 0.0;
    }

    /// Current simulated time in milliseconds.
    #[must_use]
    pub fn sim_time_ms(&self) -> f64 {
        self.sim_time_ms
    }
}

/// Run `steps` fixed solver steps, each one executing the full per-step
/// pipeline: control playback, control noise, the pointer perturbation,
/// one solver step, then key-event extraction into the sink and the
/// transition queue. A playback loop-end resets the solver state before
/// the step.
#[allow(clippy::too_many_arguments)]
pub fn advance_steps(
    sim: &mut Simulation,
    steps: usize,
    config: &ViewerConfig,
    drag: &mut DragState,
    playback: &mut ControlPlayback,
    noise: &mut NoiseRng,
    mut keys: Option<(&mut Activation, &KeyBindings)>,
    transitions: &mut TransitionQueue,
    audio: &mut PianoAudio,
) {
    let Simulation {
        model,
        data,
        solver,
    } = sim;

    for _ in 0..steps {
        match playback.tick(data) {
            PlaybackEvent::Advanced | PlaybackEvent::Idle => {}
            PlaybackEvent::Looped => {
                solver.reset(model, data);
                solver.forward(model, data);
            }
        }
        apply_ctrl_noise(model, data, config, noise);
        apply_perturbation(model, data, solver.as_mut(), drag, false);
        solver.step(model, data);

        if let Some((activation, bindings)) = keys.as_mut() {
            for transition in activation.extract(bindings, data) {
                if transition.pressed {
                    audio.sink.trigger_attack(transition.midi);
                } else {
                    audio.sink.trigger_release(transition.midi);
                }
                transitions.push(transition);
            }
        }
    }
}

/// Advance the simulation for one render frame.
///
/// Running: the planned number of steps through [`advance_steps`].
/// Paused: refresh kinematics with `forward`, keep the drag responsive,
/// and silence held notes; nothing is reset.
#[allow(clippy::needless_pass_by_value, clippy::too_many_arguments)]
pub fn drive_simulation(
    time: Res<Time<Real>>,
    run_state: Res<RunState>,
    config: Res<ViewerConfig>,
    sim: Option<ResMut<Simulation>>,
    mut clock: ResMut<StepClock>,
    mut drag: ResMut<DragState>,
    mut playback: ResMut<ControlPlayback>,
    mut noise: ResMut<NoiseRng>,
    mut activation: Option<ResMut<Activation>>,
    bindings: Option<Res<KeyBindings>>,
    mut transitions: ResMut<TransitionQueue>,
    mut audio: ResMut<PianoAudio>,
) {
    let Some(mut sim) = sim else {
        return;
    };
    let frame_time_ms = time.elapsed_secs_f64() * 1000.0;

    if *run_state == RunState::Paused {
        let Simulation {
            model,
            data,
            solver,
        } = &mut *sim;
        clock.resync(frame_time_ms);
        apply_perturbation(model, data, solver.as_mut(), &mut drag, true);
        solver.forward(model, data);
        audio.sink.release_all();
        return;
    }

    let steps = clock.plan(frame_time_ms, sim.model.timestep);
    let keys = match (activation.as_deref_mut(), bindings.as_deref()) {
        (Some(activation), Some(bindings)) => Some((activation, bindings)),
        _ => None,
    };
    advance_steps(
        &mut sim,
        steps,
        &config,
        &mut drag,
        &mut playback,
        &mut noise,
        keys,
        &mut transitions,
        &mut audio,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TIMESTEP: f64 = 0.002;

    #[test]
    fn zero_elapsed_plans_zero_steps() {
        let mut clock = StepClock::default();
        assert_eq!(clock.plan(0.0, TIMESTEP), 0);
        assert_relative_eq!(clock.sim_time_ms(), 0.0);
    }

    #[test]
    fn plans_enough_steps_to_catch_up() {
        let mut clock = StepClock::default();
        // 16 ms frame at 2 ms per step.
        let steps = clock.plan(16.0, TIMESTEP);
        assert_eq!(steps, 8);
        assert!(clock.sim_time_ms() >= 16.0);
    }

    #[test]
    fn consecutive_frames_do_not_double_step() {
        let mut clock = StepClock::default();
        let first = clock.plan(16.0, TIMESTEP);
        // Same wall time again: already caught up.
        let second = clock.plan(16.0, TIMESTEP);
        assert_eq!(first, 8);
        assert_eq!(second, 0);
    }

    #[test]
    fn stall_snaps_instead_of_catching_up() {
        let mut clock = StepClock::default();
        clock.plan(16.0, TIMESTEP);
        // A 5-second hiccup.
        let steps = clock.plan(5016.0, TIMESTEP);
        assert_eq!(steps, 0);
        assert_relative_eq!(clock.sim_time_ms(), 5016.0);
        // The next normal frame steps normally.
        let steps = clock.plan(5032.0, TIMESTEP);
        assert_eq!(steps, 8);
    }

    #[test]
    fn catch_up_work_is_bounded_by_the_threshold() {
        let mut clock = StepClock::default();
        // Worst non-stall gap is the threshold itself.
        let steps = clock.plan(STALL_THRESHOLD_MS, TIMESTEP);
        assert!(steps <= (STALL_THRESHOLD_MS / (TIMESTEP * 1000.0)).ceil() as usize + 1);
    }

    #[test]
    fn non_positive_timestep_is_rejected() {
        let mut clock = StepClock::default();
        assert_eq!(clock.plan(16.0, 0.0), 0);
        assert_eq!(clock.plan(16.0, -1.0), 0);
    }

    #[test]
    fn resync_skips_the_paused_interval() {
        let mut clock = StepClock::default();
        clock.plan(16.0, TIMESTEP);
        clock.resync(3000.0);
        assert_eq!(clock.plan(3001.0, TIMESTEP), 1);
    }
}
