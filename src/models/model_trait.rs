use super::atomic::{AtomicState, OutputCollector};
use super::Bag;
use crate::simulator::Services;
use crate::utils::errors::SimulationError;

/// The `AtomicBehavior` trait defines everything required for an atomic
/// model to operate within the discrete event simulation.  The formalism
/// requires an external transition, an internal transition, an output
/// function, and a time advance function; a confluent transition and a
/// post-simulation hook can be supplied where the defaults do not fit.
///
/// The kernel owns the call order and the `AtomicState` bookkeeping;
/// implementations own everything else.  Transition and output functions
/// must not reenter the simulation.
pub trait AtomicBehavior {
    /// Reacts to incoming messages, after `state.elapsed` time units in
    /// the current state.
    fn external_transition(
        &mut self,
        state: &mut AtomicState,
        bag: &Bag,
        services: &mut Services,
    ) -> Result<(), SimulationError>;

    /// Advances the model through its scheduled activation.
    fn internal_transition(
        &mut self,
        state: &mut AtomicState,
        services: &mut Services,
    ) -> Result<(), SimulationError>;

    /// Reconciles a scheduled activation coinciding with incoming
    /// messages (Parallel formalism only).  The default runs the internal
    /// transition, then the external transition with zero elapsed time.
    fn confluent_transition(
        &mut self,
        state: &mut AtomicState,
        bag: &Bag,
        services: &mut Services,
    ) -> Result<(), SimulationError> {
        self.internal_transition(state, services)?;
        state.elapsed = 0.0;
        self.external_transition(state, bag, services)
    }

    /// Emits output messages through `outputs`, immediately before an
    /// internal (or confluent) transition.
    fn output(
        &mut self,
        state: &AtomicState,
        outputs: &mut OutputCollector,
    ) -> Result<(), SimulationError>;

    /// The delay until the next scheduled activation - a finite
    /// nonnegative number, or infinity for a passive model.  The default
    /// returns the advisory `sigma`; the kernel always consults this
    /// function, never `sigma` itself.
    fn time_advance(&self, state: &AtomicState) -> f64 {
        state.sigma
    }

    /// Invoked once after the simulation ends.
    fn post_simulation(&mut self) {}
}
