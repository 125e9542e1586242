//! The external solver capability.

use nalgebra::Vector3;

use crate::data::Data;
use crate::model::Model;

/// Opaque handle to the physics engine driving a [`Model`]/[`Data`] pair.
///
/// The viewer never implements dynamics itself; it consumes an engine
/// through this trait. The state buffers in [`Data`] are exclusively
/// owned by the driver loop for the duration of one step: no mutation is
/// permitted between the applied-force clear and the following
/// [`step`](Solver::step).
pub trait Solver: Send + Sync {
    /// Advance the simulation by one fixed timestep.
    ///
    /// Fully recomputes `xpos`, `xquat`, `light_xpos`, and `light_xdir`
    /// from the integrated generalized coordinates.
    fn step(&mut self, model: &Model, data: &mut Data);

    /// Recompute derived quantities (body/light poses) from the current
    /// generalized coordinates without integrating. Used while paused and
    /// after resets.
    fn forward(&mut self, model: &Model, data: &mut Data);

    /// Reset the state to the model's initial configuration.
    fn reset(&mut self, model: &Model, data: &mut Data);

    /// Accumulate an external force/torque pair, applied at a world-frame
    /// `point` on `body`, into the generalized force buffer.
    ///
    /// All vectors are in the solver's Z-up world frame. Out-of-range
    /// body ids must be ignored, not propagated.
    fn apply_force(
        &mut self,
        model: &Model,
        data: &mut Data,
        force: Vector3<f64>,
        torque: Vector3<f64>,
        point: Vector3<f64>,
        body: usize,
    );
}
