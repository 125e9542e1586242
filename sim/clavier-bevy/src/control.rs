//! Control-sequence playback and actuation noise.
//!
//! A loaded action matrix (recorded at the demo's 100 Hz control rate,
//! one row per control frame) is replayed into `Data.ctrl`, one frame per
//! ten solver steps. Independent of playback, a filtered Gaussian noise
//! process can perturb the controls each step.

use bevy::prelude::*;
use clavier_model::{Data, Model};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::resources::ViewerConfig;

/// Solver steps per control frame (2 ms physics under 20 ms control).
const STEPS_PER_FRAME: usize = 10;

/// What a playback tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Not playing, off a frame boundary, or no sequence loaded.
    Idle,
    /// Wrote the next control frame.
    Advanced,
    /// Ran out of frames: rewound and paused; the caller resets state.
    Looped,
}

/// Replays a control sequence into `Data.ctrl`.
#[derive(Resource, Debug, Default, Clone)]
pub struct ControlPlayback {
    /// Row-major frame data, `nframes * nu` values.
    frames: Vec<f64>,
    nu: usize,
    cursor: usize,
    steps_since_frame: usize,
    playing: bool,
}

impl ControlPlayback {
    /// Load a sequence of `frames.len() / nu` control frames. An empty or
    /// misaligned matrix loads as no sequence.
    #[must_use]
    pub fn from_matrix(frames: Vec<f64>, nu: usize) -> Self {
        if nu == 0 || frames.len() % nu != 0 {
            warn!(
                "control sequence of {} values does not divide into rows of {nu}; ignoring",
                frames.len()
            );
            return Self::default();
        }
        Self {
            frames,
            nu,
            cursor: 0,
            steps_since_frame: 0,
            playing: true,
        }
    }

    /// Number of loaded control frames.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        if self.nu == 0 {
            0
        } else {
            self.frames.len() / self.nu
        }
    }

    /// Whether playback is currently advancing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Resume playback from the current cursor.
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Hold playback; the cursor stays put.
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Back to the first frame.
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.steps_since_frame = 0;
    }

    /// Run one solver step's worth of playback. Advances to the next
    /// frame every [`STEPS_PER_FRAME`] calls; the steps in between
    /// rewrite the held frame into `data.ctrl`, so per-step control
    /// noise filters the song value instead of compounding on its own
    /// output. Reaching the end of the sequence rewinds, pauses, and
    /// reports [`PlaybackEvent::Looped`] so the driver can reset the
    /// solver state.
    pub fn tick(&mut self, data: &mut Data) -> PlaybackEvent {
        if !self.playing || self.frames.is_empty() {
            return PlaybackEvent::Idle;
        }

        let on_boundary = self.steps_since_frame == 0;
        self.steps_since_frame = (self.steps_since_frame + 1) % STEPS_PER_FRAME;

        if on_boundary {
            if self.cursor >= self.frame_count() {
                self.rewind();
                self.playing = false;
                return PlaybackEvent::Looped;
            }
            self.write_frame(self.cursor, data);
            self.cursor += 1;
            return PlaybackEvent::Advanced;
        }

        // Hold: re-assert the current frame under the noise process.
        if let Some(held) = self.cursor.checked_sub(1) {
            self.write_frame(held, data);
        }
        PlaybackEvent::Idle
    }

    fn write_frame(&self, frame: usize, data: &mut Data) {
        let row = &self.frames[frame * self.nu..(frame + 1) * self.nu];
        let n = row.len().min(data.ctrl.len());
        for (i, &value) in row[..n].iter().enumerate() {
            data.ctrl[i] = value;
        }
    }
}

/// Random source for the control noise process.
#[derive(Resource)]
pub struct NoiseRng(pub StdRng);

impl Default for NoiseRng {
    fn default() -> Self {
        Self(StdRng::from_entropy())
    }
}

/// One standard normal draw (Box-Muller).
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Perturb `data.ctrl` with exponentially filtered Gaussian noise:
///
/// ```text
/// rate  = exp(-timestep / max(1e-10, noise_rate))
/// ctrl' = rate * ctrl + std * sqrt(1 - rate^2) * N(0, 1)
/// ```
///
/// A non-positive standard deviation disables the process. Limited
/// actuators are clamped to their control range afterwards.
pub fn apply_ctrl_noise(model: &Model, data: &mut Data, config: &ViewerConfig, rng: &mut NoiseRng) {
    if config.ctrl_noise_std <= 0.0 {
        return;
    }
    let rate = (-model.timestep / config.ctrl_noise_rate.max(1e-10)).exp();
    let scale = config.ctrl_noise_std * (1.0 - rate * rate).sqrt();

    for i in 0..model.nu.min(data.ctrl.len()) {
        let mut value = rate * data.ctrl[i] + scale * standard_normal(&mut rng.0);
        if model.actuator_ctrllimited.get(i).copied().unwrap_or(false) {
            let (lo, hi) = model.actuator_ctrlrange[i];
            value = value.clamp(lo, hi);
        }
        data.ctrl[i] = value;
    }
}
