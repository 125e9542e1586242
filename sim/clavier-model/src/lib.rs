//! Flat Model/Data descriptor types for the clavier viewer.
//!
//! This crate defines the data contract between an external physics solver
//! and the Bevy bridge layer (`clavier-bevy`):
//!
//! - [`Model`] is the static, immutable description of a loaded scene:
//!   parallel arrays indexed by entity id (bodies, geoms, joints, lights,
//!   materials, textures, meshes) plus a single null-delimited name blob.
//! - [`Data`] is the dynamic per-step state: generalized positions,
//!   control inputs, applied forces, and the world-frame body/light poses
//!   the solver recomputes every step.
//! - [`Solver`] is the opaque capability through which the bridge steps
//!   the simulation and injects forces. No solver lives in this repo; the
//!   trait is implemented by whatever engine the application links in.
//!
//! All quantities are expressed in the solver's native Z-up world frame.
//! Conversion to the renderer's Y-up frame happens exclusively in
//! `clavier_bevy::convert`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod data;
pub mod enums;
pub mod error;
pub mod model;
pub mod solver;

pub use data::Data;
pub use enums::{GeomType, JointType};
pub use error::ModelError;
pub use model::Model;
pub use solver::Solver;
