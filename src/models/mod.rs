//! The models module provides the static structure of a simulation - the
//! atomic and coupled models, their ports, and the coupling relations
//! between them.  The requirements on user-defined atomic model behavior
//! are specified via the `AtomicBehavior` trait.

use serde::{Deserialize, Serialize};

pub mod atomic;
pub mod coupled;
pub mod model;
pub mod model_trait;

pub use self::atomic::{Atomic, AtomicState, OutputCollector};
pub use self::coupled::{
    Coupled, ExternalInputCoupling, ExternalOutputCoupling, InternalCoupling, SelectFn,
};
pub use self::model::Model;
pub use self::model_trait::AtomicBehavior;

/// Messages are the mechanism of information exchange between models.  A
/// message pairs a payload with the port it traverses; the direction of
/// travel is implied by the port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMessage {
    pub port_name: String,
    pub content: String,
}

impl ModelMessage {
    pub fn new(port_name: String, content: String) -> Self {
        Self { port_name, content }
    }
}

/// A bag is a multiset of messages pending delivery to a single model,
/// preserving per-port arrival order.  Under the Parallel formalism a
/// model receives its entire bag in one external (or confluent)
/// transition.  Under the Classic formalism each delivery carries at most
/// one message, and the scalar `retrieve` view applies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bag {
    messages: Vec<ModelMessage>,
}

impl Bag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn insert(&mut self, message: ModelMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// The distinct ports carrying at least one payload, in first-arrival
    /// order.
    pub fn ports(&self) -> Vec<&str> {
        let mut ports: Vec<&str> = Vec::new();
        self.messages.iter().for_each(|message| {
            if !ports.contains(&message.port_name.as_str()) {
                ports.push(&message.port_name);
            }
        });
        ports
    }

    /// All payloads carried on the given port, in arrival order.
    pub fn values_on<'a>(&'a self, port: &'a str) -> impl Iterator<Item = &'a str> {
        self.messages
            .iter()
            .filter(move |message| message.port_name == port)
            .map(|message| message.content.as_str())
    }

    /// The scalar view of a port, for Classic formalism models - the
    /// single payload on the port, if any.
    pub fn retrieve<'a>(&'a self, port: &'a str) -> Option<&'a str> {
        self.values_on(port).next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag_of(entries: &[(&str, &str)]) -> Bag {
        let mut bag = Bag::new();
        entries.iter().for_each(|(port, content)| {
            bag.insert(ModelMessage::new(port.to_string(), content.to_string()));
        });
        bag
    }

    #[test]
    fn bag_preserves_per_port_arrival_order() {
        let bag = bag_of(&[("a", "1"), ("b", "2"), ("a", "3")]);
        let on_a: Vec<&str> = bag.values_on("a").collect();
        assert_eq!(on_a, vec!["1", "3"]);
        assert_eq!(bag.ports(), vec!["a", "b"]);
        assert_eq!(bag.len(), 3);
    }

    #[test]
    fn retrieve_is_the_first_arrival() {
        let bag = bag_of(&[("a", "1"), ("a", "3")]);
        assert_eq!(bag.retrieve("a"), Some("1"));
        assert_eq!(bag.retrieve("b"), None);
    }
}
