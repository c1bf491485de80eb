use std::f64::INFINITY;

use serde::{Deserialize, Serialize};

use super::model_trait::AtomicBehavior;
use super::{Bag, ModelMessage};
use crate::simulator::Services;
use crate::utils::errors::SimulationError;

/// The kernel-visible bookkeeping of an atomic model, shared with user
/// transition code.  `elapsed` is the time spent in the current state,
/// `time` is the time of the last activation, and `sigma` is the advisory
/// next-activation delta that the default time advance function returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomicState {
    pub elapsed: f64,
    pub sigma: f64,
    pub time: f64,
}

impl Default for AtomicState {
    fn default() -> Self {
        Self {
            elapsed: 0.0,
            sigma: INFINITY,
            time: 0.0,
        }
    }
}

/// An atomic model - a leaf of the model hierarchy.  The kernel sees the
/// model name, the declared input and output ports, and the `AtomicState`
/// bookkeeping; all remaining state and behavior is user-owned, behind
/// the boxed `AtomicBehavior`.
pub struct Atomic {
    name: String,
    ports_in: Vec<String>,
    ports_out: Vec<String>,
    state: AtomicState,
    behavior: Box<dyn AtomicBehavior>,
}

impl Atomic {
    pub fn new(
        name: String,
        ports_in: Vec<String>,
        ports_out: Vec<String>,
        behavior: Box<dyn AtomicBehavior>,
    ) -> Self {
        Self {
            name,
            ports_in,
            ports_out,
            state: AtomicState::default(),
            behavior,
        }
    }

    /// Seeds the advisory next-activation delta before initialization.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.state.sigma = sigma;
        self
    }

    /// Seeds the time already spent in the initial state, so the model
    /// joins the simulation mid-cycle.
    pub fn with_elapsed(mut self, elapsed: f64) -> Self {
        self.state.elapsed = elapsed;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_input_port(&self, port: &str) -> bool {
        self.ports_in.iter().any(|candidate| candidate == port)
    }

    pub fn has_output_port(&self, port: &str) -> bool {
        self.ports_out.iter().any(|candidate| candidate == port)
    }

    pub(crate) fn state(&self) -> &AtomicState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut AtomicState {
        &mut self.state
    }

    pub(crate) fn external(
        &mut self,
        bag: &Bag,
        services: &mut Services,
    ) -> Result<(), SimulationError> {
        self.behavior
            .external_transition(&mut self.state, bag, services)
    }

    pub(crate) fn internal(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        self.behavior.internal_transition(&mut self.state, services)
    }

    pub(crate) fn confluent(
        &mut self,
        bag: &Bag,
        services: &mut Services,
    ) -> Result<(), SimulationError> {
        self.behavior
            .confluent_transition(&mut self.state, bag, services)
    }

    /// Runs the output function and harvests the posted messages.  The
    /// output-port buffers drain into the returned vector, so the model
    /// starts the next cycle clean.
    pub(crate) fn collect_outputs(&mut self) -> Result<Vec<ModelMessage>, SimulationError> {
        let mut outputs = OutputCollector {
            model: &self.name,
            ports_in: &self.ports_in,
            ports_out: &self.ports_out,
            messages: Vec::new(),
        };
        self.behavior.output(&self.state, &mut outputs)?;
        Ok(outputs.messages)
    }

    pub(crate) fn time_advance(&self) -> f64 {
        self.behavior.time_advance(&self.state)
    }

    pub(crate) fn tear_down(&mut self) {
        self.behavior.post_simulation();
    }
}

/// The output-port buffer handed to an atomic model's output function.
/// Posting validates the port against the model's declared output ports.
pub struct OutputCollector<'a> {
    model: &'a str,
    ports_in: &'a [String],
    ports_out: &'a [String],
    messages: Vec<ModelMessage>,
}

impl OutputCollector<'_> {
    pub fn post(&mut self, content: String, port: &str) -> Result<(), SimulationError> {
        if !self.ports_out.iter().any(|candidate| candidate == port) {
            if self.ports_in.iter().any(|candidate| candidate == port) {
                return Err(SimulationError::InvalidPortType {
                    model: self.model.to_string(),
                    port: port.to_string(),
                });
            }
            return Err(SimulationError::UnknownPort {
                model: self.model.to_string(),
                port: port.to_string(),
            });
        }
        self.messages.push(ModelMessage::new(port.to_string(), content));
        Ok(())
    }
}
