//! Bevy bridge for a MuJoCo-style piano simulation.
//!
//! The solver owns the physics state (`clavier-model`'s `Model`/`Data`
//! plus an external `Solver`); this crate turns that state into a live
//! scene and feeds pointer interaction back in.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        clavier-bevy                           │
//! │                                                               │
//! │  load:      scene (spawn entities)  ◄── mesh, convert         │
//! │  per frame: driver ─► playback ─► noise ─► drag ─► step       │
//! │                                            │                  │
//! │             keys (edge extract) ──► audio sink + recolor      │
//! │             sync (poses ─► Transforms)                        │
//! └──────────────────────────────┬────────────────────────────────┘
//!                                │ reads / perturbs
//! ┌──────────────────────────────▼────────────────────────────────┐
//! │             clavier-model  Model / Data / Solver              │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Philosophy
//!
//! - The solver state is the source of truth; entities are a projection
//!   of it, rebuilt wholesale on load and overwritten every frame.
//! - Scene topology is fixed after load; per-frame work touches only
//!   transforms and key materials.
//! - `convert` is the single seam between solver space (Z-up, f64) and
//!   render space (Y-up, f32).
//! - Anomalous model data degrades to fallbacks with a log line; only
//!   load-time validation fails hard.
//!
//! # Example
//!
//! ```no_run,ignore
//! use bevy::prelude::*;
//! use clavier_bevy::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(ClavierPlugin::new())
//!         .add_systems(Startup, load_my_model)
//!         .run();
//! }
//! # fn load_my_model() {}
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod audio;
pub mod camera;
pub mod control;
pub mod convert;
pub mod drag;
pub mod driver;
pub mod keys;
pub mod mesh;
pub mod plugin;
pub mod resources;
pub mod scene;
pub mod sync;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::audio::{PianoAudio, PianoSink};
    pub use crate::camera::OrbitCamera;
    pub use crate::control::ControlPlayback;
    pub use crate::drag::DragState;
    pub use crate::driver::{RunState, StepClock};
    pub use crate::keys::{Activation, KeyBindings, KeyTransition};
    pub use crate::plugin::ClavierPlugin;
    pub use crate::resources::{load_simulation, ResetRequested, Simulation, ViewerConfig};
    pub use crate::scene::{BodyIndex, GeomIndex, LightIndex, ModelRoot, SceneEntities};
}
