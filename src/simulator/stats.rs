use serde::{Deserialize, Serialize};

use crate::utils::errors::SimulationError;

/// Counters aggregated by every processor over a simulation run.  The
/// counters record kernel-observable activity only - transition and
/// output dispatches, message traffic, time advance consultations, and
/// (for coordinators) tie-break invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorStats {
    pub internal_transitions: usize,
    pub external_transitions: usize,
    pub confluent_transitions: usize,
    pub outputs: usize,
    pub time_advances: usize,
    pub messages_sent: usize,
    pub messages_received: usize,
    pub select_calls: usize,
}

/// A stats tree mirroring the processor tree, keyed by model name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsNode {
    pub name: String,
    pub stats: ProcessorStats,
    pub children: Vec<StatsNode>,
}

impl StatsNode {
    /// Recursive lookup by model name - the node itself, then its
    /// descendants in declaration order.
    pub fn find(&self, name: &str) -> Option<&StatsNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    pub fn to_json(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_descends_the_tree() {
        let tree = StatsNode {
            name: String::from("root"),
            stats: ProcessorStats::default(),
            children: vec![StatsNode {
                name: String::from("branch"),
                stats: ProcessorStats::default(),
                children: vec![StatsNode {
                    name: String::from("leaf"),
                    stats: ProcessorStats {
                        internal_transitions: 3,
                        ..ProcessorStats::default()
                    },
                    children: Vec::new(),
                }],
            }],
        };
        assert_eq!(tree.find("leaf").unwrap().stats.internal_transitions, 3);
        assert!(tree.find("missing").is_none());
    }

    #[test]
    fn stats_render_as_json() {
        let node = StatsNode {
            name: String::from("only"),
            stats: ProcessorStats::default(),
            children: Vec::new(),
        };
        let rendered = node.to_json().unwrap();
        assert!(rendered.contains("\"internalTransitions\":0"));
    }
}
