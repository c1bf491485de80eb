use std::{cell::RefCell, rc::Rc};

/// Any debuggable `RngCore` implementation can serve as the simulation
/// random number generator.
pub trait SimulationRng: std::fmt::Debug + rand_core::RngCore {}
impl<T: std::fmt::Debug + rand_core::RngCore> SimulationRng for T {}

/// A shared, dynamically-dispatched random number generator handle.  The
/// handle is cloned into user transition functions through `Services`, so
/// stochastic models draw from one generator per simulation run.
pub type DynRng = Rc<RefCell<dyn SimulationRng>>;

pub(crate) fn default_rng() -> DynRng {
    seeded_rng(42)
}

/// Wraps a caller-supplied generator for use as the simulation generator.
pub fn dyn_rng<Rng: SimulationRng + 'static>(rng: Rng) -> DynRng {
    Rc::new(RefCell::new(rng))
}

/// Builds a deterministically-seeded simulation generator.  Replications
/// with the same seed and the same model tree produce identical
/// trajectories.
pub fn seeded_rng(seed: u64) -> DynRng {
    dyn_rng(rand_pcg::Pcg64Mcg::new(seed as u128))
}
