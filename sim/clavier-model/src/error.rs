//! Error types for model loading and validation.

use thiserror::Error;

/// Errors surfaced when a model descriptor is malformed.
///
/// Load/validation failures are fatal for that load only: the caller must
/// keep any previously loaded scene untouched (load is all-or-nothing).
/// Recoverable anomalies (unknown geom type, missing material/texture)
/// are NOT errors — the scene builder substitutes documented fallbacks.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// The model has no bodies. Body 0 (the world body) must exist.
    #[error("model has no bodies; body 0 must be the world body")]
    NoWorldBody,

    /// A parallel array's length disagrees with its entity count.
    #[error("array {array} has length {actual}, expected {expected}")]
    DimensionMismatch {
        /// Name of the offending array.
        array: &'static str,
        /// Expected length (the entity count).
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// A geom references a body index outside `0..nbody`.
    #[error("geom {geom} references invalid body {body} (nbody = {nbody})")]
    InvalidBodyReference {
        /// Offending geom index.
        geom: usize,
        /// Out-of-range body index.
        body: usize,
        /// Number of bodies in the model.
        nbody: usize,
    },

    /// A geom's mesh data id is present but outside `0..nmesh`.
    #[error("geom {geom} references invalid mesh {mesh} (nmesh = {nmesh})")]
    InvalidMeshReference {
        /// Offending geom index.
        geom: usize,
        /// Out-of-range mesh index.
        mesh: usize,
        /// Number of meshes in the model.
        nmesh: usize,
    },

    /// A geom's material id is present but outside `0..nmat`.
    #[error("geom {geom} references invalid material {material} (nmat = {nmat})")]
    InvalidMaterialReference {
        /// Offending geom index.
        geom: usize,
        /// Out-of-range material index.
        material: usize,
        /// Number of materials in the model.
        nmat: usize,
    },

    /// A material's texture id is present but outside `0..ntex`.
    #[error("material {material} references invalid texture {texture} (ntex = {ntex})")]
    InvalidTextureReference {
        /// Offending material index.
        material: usize,
        /// Out-of-range texture index.
        texture: usize,
        /// Number of textures in the model.
        ntex: usize,
    },

    /// The model's timestep is non-positive or non-finite.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),
}
