use std::collections::BTreeMap;
use std::f64::INFINITY;

use log::trace;

use super::scheduler::CalendarQueue;
use super::services::Services;
use super::stats::{ProcessorStats, StatsNode};
use super::Formalism;
use crate::models::coupled::{
    Coupled, ExternalInputCoupling, ExternalOutputCoupling, InternalCoupling, SelectFn,
};
use crate::models::{Atomic, Bag, Model, ModelMessage};
use crate::utils::errors::SimulationError;

/// A processor is the runtime twin of a model - a simulator for an atomic
/// model, a coordinator for a coupled model.  Processors exchange the
/// abstract simulation protocol messages (initialize, collect,
/// transition, tear down) down and up the tree.
pub enum Processor {
    Simulator(Simulator),
    Coordinator(Coordinator),
}

impl Processor {
    pub(crate) fn new(model: Model, formalism: Formalism) -> Self {
        match model {
            Model::Atomic(atomic) => Processor::Simulator(Simulator::new(atomic, formalism)),
            Model::Coupled(coupled) => {
                Processor::Coordinator(Coordinator::new(coupled, formalism))
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Processor::Simulator(simulator) => simulator.atomic.name(),
            Processor::Coordinator(coordinator) => &coordinator.name,
        }
    }

    pub fn time_last(&self) -> f64 {
        match self {
            Processor::Simulator(simulator) => simulator.time_last,
            Processor::Coordinator(coordinator) => coordinator.time_last,
        }
    }

    pub fn time_next(&self) -> f64 {
        match self {
            Processor::Simulator(simulator) => simulator.time_next,
            Processor::Coordinator(coordinator) => coordinator.time_next,
        }
    }

    pub(crate) fn initialize(
        &mut self,
        time: f64,
        services: &mut Services,
    ) -> Result<f64, SimulationError> {
        match self {
            Processor::Simulator(simulator) => simulator.initialize(time, services),
            Processor::Coordinator(coordinator) => coordinator.initialize(time, services),
        }
    }

    pub(crate) fn collect(
        &mut self,
        time: f64,
        services: &mut Services,
    ) -> Result<Vec<ModelMessage>, SimulationError> {
        match self {
            Processor::Simulator(simulator) => simulator.collect(time, services),
            Processor::Coordinator(coordinator) => coordinator.collect(time, services),
        }
    }

    pub(crate) fn transition(
        &mut self,
        time: f64,
        bag: Bag,
        services: &mut Services,
    ) -> Result<(), SimulationError> {
        match self {
            Processor::Simulator(simulator) => simulator.transition(time, bag, services),
            Processor::Coordinator(coordinator) => coordinator.transition(time, bag, services),
        }
    }

    pub(crate) fn tear_down(&mut self) {
        match self {
            Processor::Simulator(simulator) => simulator.atomic.tear_down(),
            Processor::Coordinator(coordinator) => coordinator
                .children
                .iter_mut()
                .for_each(|child| child.tear_down()),
        }
    }

    pub fn stats(&self) -> StatsNode {
        match self {
            Processor::Simulator(simulator) => StatsNode {
                name: simulator.atomic.name().to_string(),
                stats: simulator.stats.clone(),
                children: Vec::new(),
            },
            Processor::Coordinator(coordinator) => StatsNode {
                name: coordinator.name.clone(),
                stats: coordinator.stats.clone(),
                children: coordinator
                    .children
                    .iter()
                    .map(|child| child.stats())
                    .collect(),
            },
        }
    }
}

/// The processor wrapping one atomic model.  A simulator executes the
/// model's output and transition functions at the times its parent
/// dictates, and maintains the time of last/next activation.
pub struct Simulator {
    atomic: Atomic,
    formalism: Formalism,
    time_last: f64,
    time_next: f64,
    stats: ProcessorStats,
}

impl Simulator {
    fn new(atomic: Atomic, formalism: Formalism) -> Self {
        Self {
            atomic,
            formalism,
            time_last: 0.0,
            time_next: INFINITY,
            stats: ProcessorStats::default(),
        }
    }

    fn initialize(&mut self, time: f64, _services: &mut Services) -> Result<f64, SimulationError> {
        let elapsed = self.atomic.state().elapsed;
        self.time_last = time - elapsed;
        self.atomic.state_mut().time = self.time_last;
        self.time_next = self.time_last + self.time_advance()?;
        trace!(
            "initialized {} with next activation at {}",
            self.atomic.name(),
            self.time_next
        );
        Ok(self.time_next)
    }

    fn time_advance(&mut self) -> Result<f64, SimulationError> {
        self.stats.time_advances += 1;
        let advance = self.atomic.time_advance();
        if advance.is_nan() || advance < 0.0 {
            return Err(SimulationError::InvalidTimeAdvance {
                model: self.atomic.name().to_string(),
                value: advance,
            });
        }
        Ok(advance)
    }

    fn bad_synchronization(&self, time: f64) -> SimulationError {
        SimulationError::BadSynchronization {
            processor: self.atomic.name().to_string(),
            time,
            time_last: self.time_last,
            time_next: self.time_next,
        }
    }

    fn collect(
        &mut self,
        time: f64,
        _services: &mut Services,
    ) -> Result<Vec<ModelMessage>, SimulationError> {
        if time != self.time_next {
            return Err(self.bad_synchronization(time));
        }
        self.stats.outputs += 1;
        let messages = self.atomic.collect_outputs()?;
        self.stats.messages_sent += messages.len();
        Ok(messages)
    }

    fn transition(
        &mut self,
        time: f64,
        bag: Bag,
        services: &mut Services,
    ) -> Result<(), SimulationError> {
        if time < self.time_last || time > self.time_next {
            return Err(self.bad_synchronization(time));
        }
        for message in bag.messages() {
            if !self.atomic.has_input_port(&message.port_name) {
                return Err(SimulationError::InvalidPortHost {
                    model: self.atomic.name().to_string(),
                    port: message.port_name.clone(),
                    time,
                });
            }
        }
        self.stats.messages_received += bag.len();
        self.atomic.state_mut().elapsed = time - self.time_last;
        match self.formalism {
            Formalism::Parallel => {
                if time == self.time_next && bag.is_empty() {
                    self.stats.internal_transitions += 1;
                    self.atomic.internal(services)?;
                } else if time == self.time_next {
                    self.stats.confluent_transitions += 1;
                    self.atomic.confluent(&bag, services)?;
                } else if !bag.is_empty() {
                    self.stats.external_transitions += 1;
                    self.atomic.external(&bag, services)?;
                } else {
                    return Err(self.bad_synchronization(time));
                }
            }
            Formalism::Classic => {
                if !bag.is_empty() {
                    self.stats.external_transitions += 1;
                    self.atomic.external(&bag, services)?;
                } else if time == self.time_next {
                    self.stats.internal_transitions += 1;
                    self.atomic.internal(services)?;
                } else {
                    return Err(self.bad_synchronization(time));
                }
            }
        }
        self.time_last = time;
        let state = self.atomic.state_mut();
        state.time = time;
        state.elapsed = 0.0;
        self.time_next = time + self.time_advance()?;
        Ok(())
    }
}

/// The processor wrapping one coupled model.  A coordinator owns its
/// child processors and a calendar queue over their next activations; it
/// routes messages along the coupling relations and keeps its own
/// activation window at the envelope of its children's.
pub struct Coordinator {
    name: String,
    ports_in: Vec<String>,
    external_input_couplings: Vec<ExternalInputCoupling>,
    external_output_couplings: Vec<ExternalOutputCoupling>,
    internal_couplings: Vec<InternalCoupling>,
    select: Option<SelectFn>,
    formalism: Formalism,
    children: Vec<Processor>,
    scheduler: CalendarQueue<usize>,
    imminent: Vec<usize>,
    pending: BTreeMap<usize, Bag>,
    time_last: f64,
    time_next: f64,
    stats: ProcessorStats,
}

impl Coordinator {
    fn new(coupled: Coupled, formalism: Formalism) -> Self {
        let children = coupled
            .components
            .into_iter()
            .map(|component| Processor::new(component, formalism))
            .collect();
        Self {
            name: coupled.name,
            ports_in: coupled.ports_in,
            external_input_couplings: coupled.external_input_couplings,
            external_output_couplings: coupled.external_output_couplings,
            internal_couplings: coupled.internal_couplings,
            select: coupled.select,
            formalism,
            children,
            scheduler: CalendarQueue::new(),
            imminent: Vec::new(),
            pending: BTreeMap::new(),
            time_last: 0.0,
            time_next: INFINITY,
            stats: ProcessorStats::default(),
        }
    }

    fn initialize(&mut self, time: f64, services: &mut Services) -> Result<f64, SimulationError> {
        self.scheduler = CalendarQueue::new();
        self.imminent.clear();
        self.pending.clear();
        for (index, child) in self.children.iter_mut().enumerate() {
            let time_next = child.initialize(time, services)?;
            self.scheduler.enqueue(index, time_next);
        }
        self.time_last = self
            .children
            .iter()
            .map(Processor::time_last)
            .fold(time, f64::max);
        self.time_next = self.peek_time_next();
        trace!(
            "initialized {} with next activation at {}",
            self.name,
            self.time_next
        );
        Ok(self.time_next)
    }

    fn peek_time_next(&mut self) -> f64 {
        self.scheduler.peek().map(|(_, time)| time).unwrap_or(INFINITY)
    }

    fn bad_synchronization(&self, time: f64) -> SimulationError {
        SimulationError::BadSynchronization {
            processor: self.name.clone(),
            time,
            time_last: self.time_last,
            time_next: self.time_next,
        }
    }

    fn child_index(children: &[Processor], name: &str) -> Option<usize> {
        children.iter().position(|child| child.name() == name)
    }

    /// Computes the imminent set from the scheduler, reduces it under the
    /// Classic formalism, runs the survivors' output functions, and
    /// routes the results - external output couplings yield upward,
    /// internal couplings accumulate into per-child pending bags.
    fn collect(
        &mut self,
        time: f64,
        services: &mut Services,
    ) -> Result<Vec<ModelMessage>, SimulationError> {
        if time != self.time_next {
            return Err(self.bad_synchronization(time));
        }
        self.imminent.clear();
        loop {
            let at_time = matches!(self.scheduler.peek(), Some((_, next)) if next == time);
            if !at_time {
                break;
            }
            match self.scheduler.pop() {
                Some((index, _)) => self.imminent.push(index),
                None => break,
            }
        }
        self.imminent.sort_unstable();
        if self.formalism == Formalism::Classic && self.imminent.len() > 1 {
            let names: Vec<&str> = self
                .imminent
                .iter()
                .map(|&index| self.children[index].name())
                .collect();
            let choice = match &self.select {
                Some(select) => select(&names),
                None => 0,
            };
            self.stats.select_calls += 1;
            let selected = match self.imminent.get(choice) {
                Some(&selected) => selected,
                None => {
                    return Err(SimulationError::UserTransitionFailure {
                        model: self.name.clone(),
                        reason: format!(
                            "select returned index {} for {} imminent components",
                            choice,
                            self.imminent.len()
                        ),
                    })
                }
            };
            for &index in &self.imminent {
                if index != selected {
                    self.scheduler.enqueue(index, time);
                }
            }
            self.imminent = vec![selected];
        }

        let imminent = std::mem::take(&mut self.imminent);
        let mut upward: Vec<ModelMessage> = Vec::new();
        for &index in &imminent {
            let messages = self.children[index].collect(time, services)?;
            let source = self.children[index].name().to_string();
            for message in messages {
                for coupling in &self.external_output_couplings {
                    if coupling.source_id == source && coupling.source_port == message.port_name {
                        upward.push(ModelMessage::new(
                            coupling.target_port.clone(),
                            message.content.clone(),
                        ));
                        self.stats.messages_sent += 1;
                    }
                }
                for coupling in &self.internal_couplings {
                    if coupling.source_id == source && coupling.source_port == message.port_name {
                        let target = Self::child_index(&self.children, &coupling.target_id)
                            .ok_or_else(|| SimulationError::NoSuchChild {
                                parent: self.name.clone(),
                                child: coupling.target_id.clone(),
                            })?;
                        self.pending.entry(target).or_default().insert(
                            ModelMessage::new(
                                coupling.target_port.clone(),
                                message.content.clone(),
                            ),
                        );
                        self.stats.messages_sent += 1;
                    }
                }
                // Outputs matching no coupling are dropped.
            }
        }
        self.imminent = imminent;
        trace!(
            "{} collected {} imminent component(s) at {}",
            self.name,
            self.imminent.len(),
            time
        );
        Ok(upward)
    }

    /// Fans inbound messages out through the external input couplings,
    /// transitions every imminent or receiving child, and reschedules the
    /// activated children under their new next-activation times.
    fn transition(
        &mut self,
        time: f64,
        bag: Bag,
        services: &mut Services,
    ) -> Result<(), SimulationError> {
        if time < self.time_last || time > self.time_next {
            return Err(self.bad_synchronization(time));
        }
        self.stats.messages_received += bag.len();
        for message in bag.messages() {
            if !self.ports_in.iter().any(|port| port == &message.port_name) {
                return Err(SimulationError::InvalidPortHost {
                    model: self.name.clone(),
                    port: message.port_name.clone(),
                    time,
                });
            }
            for coupling in &self.external_input_couplings {
                if coupling.source_port == message.port_name {
                    let target = Self::child_index(&self.children, &coupling.target_id)
                        .ok_or_else(|| SimulationError::NoSuchChild {
                            parent: self.name.clone(),
                            child: coupling.target_id.clone(),
                        })?;
                    self.pending.entry(target).or_default().insert(
                        ModelMessage::new(coupling.target_port.clone(), message.content.clone()),
                    );
                }
            }
        }

        let imminent = std::mem::take(&mut self.imminent);
        let mut pending = std::mem::take(&mut self.pending);
        let mut activated: Vec<usize> = imminent.clone();
        activated.extend(pending.keys().copied());
        activated.sort_unstable();
        activated.dedup();
        for index in activated {
            let child_bag = pending.remove(&index).unwrap_or_default();
            let was_imminent = imminent.contains(&index);
            let previous_time_next = self.children[index].time_next();
            if self.formalism == Formalism::Classic && was_imminent && !child_bag.is_empty() {
                // A Classic component that is both activated and receiving
                // takes its scheduled transition first, then the arrivals.
                self.children[index].transition(time, Bag::new(), services)?;
                self.children[index].transition(time, child_bag, services)?;
            } else {
                self.children[index].transition(time, child_bag, services)?;
            }
            let next = self.children[index].time_next();
            if !was_imminent {
                self.scheduler.delete(&index, previous_time_next);
            }
            self.scheduler.enqueue(index, next);
        }
        self.time_last = time;
        self.time_next = self.peek_time_next();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::model_trait::AtomicBehavior;
    use crate::models::{AtomicState, OutputCollector};

    struct Idle;

    impl AtomicBehavior for Idle {
        fn external_transition(
            &mut self,
            _state: &mut AtomicState,
            _bag: &Bag,
            _services: &mut Services,
        ) -> Result<(), SimulationError> {
            Ok(())
        }

        fn internal_transition(
            &mut self,
            state: &mut AtomicState,
            _services: &mut Services,
        ) -> Result<(), SimulationError> {
            state.sigma = INFINITY;
            Ok(())
        }

        fn output(
            &mut self,
            _state: &AtomicState,
            _outputs: &mut OutputCollector,
        ) -> Result<(), SimulationError> {
            Ok(())
        }
    }

    fn idle_processor() -> Processor {
        Processor::new(
            Model::Atomic(
                Atomic::new(
                    String::from("idle"),
                    vec![String::from("recv")],
                    Vec::new(),
                    Box::new(Idle),
                )
                .with_sigma(5.0),
            ),
            Formalism::Classic,
        )
    }

    #[test]
    fn collect_off_schedule_is_bad_synchronization() {
        let mut services = Services::default();
        let mut processor = idle_processor();
        processor.initialize(0.0, &mut services).unwrap();
        match processor.collect(3.0, &mut services) {
            Err(SimulationError::BadSynchronization {
                processor,
                time,
                time_last,
                time_next,
            }) => {
                assert_eq!(processor, "idle");
                assert_eq!(time, 3.0);
                assert_eq!(time_last, 0.0);
                assert_eq!(time_next, 5.0);
            }
            other => panic!("expected BadSynchronization, got {:?}", other.err()),
        }
    }

    #[test]
    fn transition_past_the_window_is_bad_synchronization() {
        let mut services = Services::default();
        let mut processor = idle_processor();
        processor.initialize(0.0, &mut services).unwrap();
        match processor.transition(6.0, Bag::new(), &mut services) {
            Err(SimulationError::BadSynchronization { time, time_next, .. }) => {
                assert_eq!(time, 6.0);
                assert_eq!(time_next, 5.0);
            }
            other => panic!("expected BadSynchronization, got {:?}", other.err()),
        }
    }

    #[test]
    fn misdelivered_messages_name_the_port_host() {
        let mut services = Services::default();
        let mut processor = idle_processor();
        processor.initialize(0.0, &mut services).unwrap();
        let mut bag = Bag::new();
        bag.insert(ModelMessage::new(
            String::from("bogus"),
            String::from("payload"),
        ));
        match processor.transition(2.0, bag, &mut services) {
            Err(SimulationError::InvalidPortHost { model, port, time }) => {
                assert_eq!(model, "idle");
                assert_eq!(port, "bogus");
                assert_eq!(time, 2.0);
            }
            other => panic!("expected InvalidPortHost, got {:?}", other.err()),
        }
    }
}
