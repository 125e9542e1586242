//! Data struct definition: the mutable per-step simulation state.

use nalgebra::{DVector, UnitQuaternion, Vector3};

use crate::model::Model;

/// Dynamic simulation state (like mjData).
///
/// Allocated once per model load by [`Model::make_data`], then fully
/// overwritten by every solver `step()`/`forward()` call. The bridge
/// layer reads and writes it only through well-defined slices and never
/// assumes values survive a model reload.
///
/// All poses are world-frame, solver (Z-up) convention.
#[derive(Debug, Clone)]
pub struct Data {
    /// Simulated time in seconds.
    pub time: f64,
    /// Generalized positions (length `nq`).
    pub qpos: DVector<f64>,
    /// Generalized velocities (length `nv`).
    pub qvel: DVector<f64>,
    /// Actuator control inputs (length `nu`).
    pub ctrl: DVector<f64>,
    /// Externally applied generalized forces (length `nv`).
    ///
    /// Forces do not persist across steps unless re-applied: the
    /// interaction controller zeroes this buffer before every step.
    pub qfrc_applied: DVector<f64>,

    /// Body positions in world frame (length `nbody`).
    pub xpos: Vec<Vector3<f64>>,
    /// Body orientations in world frame (length `nbody`).
    pub xquat: Vec<UnitQuaternion<f64>>,

    /// Light positions in world frame (length `nlight`).
    pub light_xpos: Vec<Vector3<f64>>,
    /// Light directions in world frame (length `nlight`).
    pub light_xdir: Vec<Vector3<f64>>,

    /// Mocap body target positions (length `nmocap`). User-settable.
    pub mocap_pos: Vec<Vector3<f64>>,
    /// Mocap body target orientations (length `nmocap`). User-settable.
    pub mocap_quat: Vec<UnitQuaternion<f64>>,
}

impl Data {
    /// Allocate zeroed state sized for `model`.
    #[must_use]
    pub fn new(model: &Model) -> Self {
        Self {
            time: 0.0,
            qpos: DVector::zeros(model.nq),
            qvel: DVector::zeros(model.nv),
            ctrl: DVector::zeros(model.nu),
            qfrc_applied: DVector::zeros(model.nv),
            xpos: vec![Vector3::zeros(); model.nbody],
            xquat: vec![UnitQuaternion::identity(); model.nbody],
            light_xpos: vec![Vector3::zeros(); model.nlight],
            light_xdir: vec![-Vector3::z(); model.nlight],
            mocap_pos: vec![Vector3::zeros(); model.nmocap],
            mocap_quat: vec![UnitQuaternion::identity(); model.nmocap],
        }
    }

    /// Zero the externally applied force buffer.
    ///
    /// Called before each step so that stale perturbations from the
    /// previous step are never integrated twice.
    pub fn clear_applied_forces(&mut self) {
        self.qfrc_applied.fill(0.0);
    }
}
