//! The simulator module provides the mechanics to execute a model
//! hierarchy via discrete event simulation.  The specific formalism for
//! simulation execution is the Discrete Event System Specification, in
//! either its Classic or Parallel variant.
//!
//! A `Simulation` is built from a root model and a formalism tag.  It
//! constructs the processor tree (simulators for atomic models,
//! coordinators for coupled models), then drives the abstract simulation
//! protocol from the root: repeatedly advance to the earliest next
//! activation, collect outputs down-tree, and transition the activated
//! components.  Simulation analysis happens through the stats tree and
//! through lifecycle listeners.

use std::f64::INFINITY;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::{Bag, Model};
use crate::utils::dynamic_rng::DynRng;
use crate::utils::errors::SimulationError;

pub mod processor;
pub mod scheduler;
pub mod services;
pub mod stats;

pub use self::processor::Processor;
pub use self::scheduler::CalendarQueue;
pub use self::services::Services;
pub use self::stats::{ProcessorStats, StatsNode};

/// The two supported variants of the formalism.  Classic activates one
/// imminent component at a time, with a tie-break; Parallel activates all
/// imminent components concurrently and delivers inputs as bags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Formalism {
    Classic,
    Parallel,
}

/// The points in a simulation run where registered listeners are
/// invoked, with their argument shapes.
#[derive(Debug, Clone)]
pub enum Lifecycle {
    PostInit { time_next: f64 },
    PostStep { time: f64, time_next: f64 },
    PreTeardown { time: f64 },
}

pub type Listener = Box<dyn FnMut(&Lifecycle)>;

/// The `Simulation` struct is the root coordinator of a simulation run -
/// it owns the processor tree, the global clock and random number
/// generator, and the registered lifecycle listeners, and it drives the
/// collect/transition loop until the horizon is reached or every
/// component is passive.
pub struct Simulation {
    root: Processor,
    services: Services,
    listeners: Vec<Listener>,
}

impl Simulation {
    /// This constructor method creates a simulation from a root model and
    /// a formalism tag.  With `maintain_hierarchy` unset, the hierarchy
    /// is first flattened into an equivalent single-level coupled model.
    /// The model tree is validated either way; every coupling must agree
    /// with the parent/child relation and the declared port directions.
    pub fn post(
        model: Model,
        formalism: Formalism,
        maintain_hierarchy: bool,
    ) -> Result<Self, SimulationError> {
        let model = if maintain_hierarchy {
            model
        } else {
            match model {
                Model::Coupled(coupled) => Model::Coupled(coupled.flatten()),
                atomic => atomic,
            }
        };
        if let Model::Coupled(coupled) = &model {
            coupled.validate()?;
        }
        Ok(Self {
            root: Processor::new(model, formalism),
            services: Services::default(),
            listeners: Vec::new(),
        })
    }

    /// Replaces the simulation random number generator, for seeded
    /// replications or a caller-owned generator.
    pub fn with_rng(mut self, rng: DynRng) -> Self {
        self.services.global_rng = rng;
        self
    }

    /// Registers a listener closure, invoked at the defined lifecycle
    /// points of the next `simulate` call.
    pub fn add_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// An accessor method for the simulation global time.
    pub fn global_time(&self) -> f64 {
        self.services.global_time()
    }

    /// The earliest next activation across the whole tree - infinity once
    /// every component is passive.
    pub fn time_next(&self) -> f64 {
        self.root.time_next()
    }

    /// The stats tree, keyed by model name and mirroring the processor
    /// tree.
    pub fn stats(&self) -> StatsNode {
        self.root.stats()
    }

    /// Executes the simulation from time zero until the next activation
    /// would reach `end_time`.  A quiescent system - no activation
    /// scheduled anywhere - halts regardless of the remaining horizon.
    /// Root-level outputs have no destination and are discarded.
    pub fn simulate(&mut self, end_time: f64) -> Result<(), SimulationError> {
        self.root.initialize(0.0, &mut self.services)?;
        self.notify(&Lifecycle::PostInit {
            time_next: self.root.time_next(),
        });
        while self.root.time_next() < end_time {
            let time = self.root.time_next();
            self.services.set_global_time(time);
            debug!("stepping {} at {}", self.root.name(), time);
            self.root.collect(time, &mut self.services)?;
            self.root.transition(time, Bag::new(), &mut self.services)?;
            self.notify(&Lifecycle::PostStep {
                time,
                time_next: self.root.time_next(),
            });
        }
        self.notify(&Lifecycle::PreTeardown {
            time: self.services.global_time(),
        });
        self.root.tear_down();
        Ok(())
    }

    fn notify(&mut self, event: &Lifecycle) {
        self.listeners.iter_mut().for_each(|listener| listener(event));
    }
}

impl Default for Formalism {
    fn default() -> Self {
        Formalism::Parallel
    }
}

/// Whether a next-activation time marks a passive component - nothing
/// scheduled, ever, absent external input.
pub fn is_passive(time_next: f64) -> bool {
    time_next == INFINITY
}
