use serde::{Deserialize, Serialize};

use super::Model;
use crate::utils::errors::SimulationError;

/// Routes messages arriving on a coupled model input port down to a
/// component input port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalInputCoupling {
    pub source_port: String,
    #[serde(rename = "targetID")]
    pub target_id: String,
    pub target_port: String,
}

/// Routes messages leaving a component output port up to a coupled model
/// output port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalOutputCoupling {
    #[serde(rename = "sourceID")]
    pub source_id: String,
    pub source_port: String,
    pub target_port: String,
}

/// Routes messages from a component output port to a sibling component
/// input port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalCoupling {
    #[serde(rename = "sourceID")]
    pub source_id: String,
    pub source_port: String,
    #[serde(rename = "targetID")]
    pub target_id: String,
    pub target_port: String,
}

/// A Classic-formalism tie-break function: given the names of the
/// imminent components (in declaration order), returns the index of the
/// single component permitted to activate.
pub type SelectFn = Box<dyn Fn(&[&str]) -> usize>;

/// A coupled model - an interior node of the model hierarchy.  A coupled
/// model owns its components and the three coupling lists relating them;
/// it carries no behavior of its own.  Under the Classic formalism an
/// optional `select` function breaks ties between simultaneously imminent
/// components; without one, declaration order decides.
pub struct Coupled {
    pub(crate) name: String,
    pub(crate) ports_in: Vec<String>,
    pub(crate) ports_out: Vec<String>,
    pub(crate) components: Vec<Model>,
    pub(crate) external_input_couplings: Vec<ExternalInputCoupling>,
    pub(crate) external_output_couplings: Vec<ExternalOutputCoupling>,
    pub(crate) internal_couplings: Vec<InternalCoupling>,
    pub(crate) select: Option<SelectFn>,
}

impl Coupled {
    pub fn new(
        name: String,
        ports_in: Vec<String>,
        ports_out: Vec<String>,
        components: Vec<Model>,
        external_input_couplings: Vec<ExternalInputCoupling>,
        external_output_couplings: Vec<ExternalOutputCoupling>,
        internal_couplings: Vec<InternalCoupling>,
    ) -> Self {
        Self {
            name,
            ports_in,
            ports_out,
            components,
            external_input_couplings,
            external_output_couplings,
            internal_couplings,
            select: None,
        }
    }

    pub fn with_select(mut self, select: SelectFn) -> Self {
        self.select = Some(select);
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

    fn component(&self, name: &str) -> Option<&Model> {
        self.components
            .iter()
            .find(|component| component.name() == name)
    }

    /// Checks every coupling against the parent/child relation and the
    /// declared port directions, recursively.  All violations are fatal
    /// configuration errors.
    pub fn validate(&self) -> Result<(), SimulationError> {
        for (index, component) in self.components.iter().enumerate() {
            if self.components[..index]
                .iter()
                .any(|other| other.name() == component.name())
            {
                return Err(SimulationError::DuplicateChild {
                    parent: self.name.clone(),
                    child: component.name().to_string(),
                });
            }
        }
        for coupling in &self.external_input_couplings {
            self.require_own_port(&coupling.source_port, &self.ports_in, &self.ports_out)?;
            let target = self.require_component(&coupling.target_id)?;
            Self::require_port(
                target,
                &coupling.target_port,
                Model::has_input_port,
                Model::has_output_port,
            )?;
        }
        for coupling in &self.external_output_couplings {
            let source = self.require_component(&coupling.source_id)?;
            Self::require_port(
                source,
                &coupling.source_port,
                Model::has_output_port,
                Model::has_input_port,
            )?;
            self.require_own_port(&coupling.target_port, &self.ports_out, &self.ports_in)?;
        }
        for coupling in &self.internal_couplings {
            let source = self.require_component(&coupling.source_id)?;
            Self::require_port(
                source,
                &coupling.source_port,
                Model::has_output_port,
                Model::has_input_port,
            )?;
            let target = self.require_component(&coupling.target_id)?;
            Self::require_port(
                target,
                &coupling.target_port,
                Model::has_input_port,
                Model::has_output_port,
            )?;
        }
        self.components.iter().try_for_each(|component| {
            if let Model::Coupled(coupled) = component {
                coupled.validate()
            } else {
                Ok(())
            }
        })
    }

    fn require_component(&self, name: &str) -> Result<&Model, SimulationError> {
        self.component(name)
            .ok_or_else(|| SimulationError::NoSuchChild {
                parent: self.name.clone(),
                child: name.to_string(),
            })
    }

    fn require_own_port(
        &self,
        port: &str,
        expected: &[String],
        opposite: &[String],
    ) -> Result<(), SimulationError> {
        if expected.iter().any(|candidate| candidate == port) {
            Ok(())
        } else if opposite.iter().any(|candidate| candidate == port) {
            Err(SimulationError::InvalidPortType {
                model: self.name.clone(),
                port: port.to_string(),
            })
        } else {
            Err(SimulationError::UnknownPort {
                model: self.name.clone(),
                port: port.to_string(),
            })
        }
    }

    fn require_port(
        model: &Model,
        port: &str,
        expected: fn(&Model, &str) -> bool,
        opposite: fn(&Model, &str) -> bool,
    ) -> Result<(), SimulationError> {
        if expected(model, port) {
            Ok(())
        } else if opposite(model, port) {
            Err(SimulationError::InvalidPortType {
                model: model.name().to_string(),
                port: port.to_string(),
            })
        } else {
            Err(SimulationError::UnknownPort {
                model: model.name().to_string(),
                port: port.to_string(),
            })
        }
    }

    /// Rewrites the hierarchy into an equivalent single-level coupled
    /// model.  Coupled components are absorbed one at a time: their
    /// components are lifted to this level, and every coupling crossing
    /// the absorbed boundary is composed by transitive closure.  Absorbed
    /// `select` functions are discarded; the surviving flat coordinator's
    /// `select` arbitrates all ties.
    pub fn flatten(mut self) -> Self {
        loop {
            let position = self
                .components
                .iter()
                .position(|component| matches!(component, Model::Coupled(_)));
            match position {
                Some(position) => {
                    if let Model::Coupled(inner) = self.components.remove(position) {
                        self.absorb(inner);
                    }
                }
                None => break,
            }
        }
        self
    }

    fn absorb(&mut self, inner: Coupled) {
        let inner_name = inner.name.clone();

        let external_input_couplings: Vec<ExternalInputCoupling> = self
            .external_input_couplings
            .drain(..)
            .flat_map(|coupling| {
                if coupling.target_id == inner_name {
                    inner
                        .external_input_couplings
                        .iter()
                        .filter(|absorbed| absorbed.source_port == coupling.target_port)
                        .map(|absorbed| ExternalInputCoupling {
                            source_port: coupling.source_port.clone(),
                            target_id: absorbed.target_id.clone(),
                            target_port: absorbed.target_port.clone(),
                        })
                        .collect()
                } else {
                    vec![coupling]
                }
            })
            .collect();
        self.external_input_couplings = external_input_couplings;

        let external_output_couplings: Vec<ExternalOutputCoupling> = self
            .external_output_couplings
            .drain(..)
            .flat_map(|coupling| {
                if coupling.source_id == inner_name {
                    inner
                        .external_output_couplings
                        .iter()
                        .filter(|absorbed| absorbed.target_port == coupling.source_port)
                        .map(|absorbed| ExternalOutputCoupling {
                            source_id: absorbed.source_id.clone(),
                            source_port: absorbed.source_port.clone(),
                            target_port: coupling.target_port.clone(),
                        })
                        .collect()
                } else {
                    vec![coupling]
                }
            })
            .collect();
        self.external_output_couplings = external_output_couplings;

        let internal_couplings: Vec<InternalCoupling> = self
            .internal_couplings
            .drain(..)
            .flat_map(|coupling| {
                let sources: Vec<(String, String)> = if coupling.source_id == inner_name {
                    inner
                        .external_output_couplings
                        .iter()
                        .filter(|absorbed| absorbed.target_port == coupling.source_port)
                        .map(|absorbed| {
                            (absorbed.source_id.clone(), absorbed.source_port.clone())
                        })
                        .collect()
                } else {
                    vec![(coupling.source_id.clone(), coupling.source_port.clone())]
                };
                let targets: Vec<(String, String)> = if coupling.target_id == inner_name {
                    inner
                        .external_input_couplings
                        .iter()
                        .filter(|absorbed| absorbed.source_port == coupling.target_port)
                        .map(|absorbed| {
                            (absorbed.target_id.clone(), absorbed.target_port.clone())
                        })
                        .collect()
                } else {
                    vec![(coupling.target_id.clone(), coupling.target_port.clone())]
                };
                sources
                    .iter()
                    .flat_map(|(source_id, source_port)| {
                        targets.iter().map(move |(target_id, target_port)| {
                            InternalCoupling {
                                source_id: source_id.clone(),
                                source_port: source_port.clone(),
                                target_id: target_id.clone(),
                                target_port: target_port.clone(),
                            }
                        })
                    })
                    .collect::<Vec<InternalCoupling>>()
            })
            .collect();
        self.internal_couplings = internal_couplings;

        self.internal_couplings.extend(inner.internal_couplings);
        self.components.extend(inner.components);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::atomic::{Atomic, AtomicState, OutputCollector};
    use crate::models::model_trait::AtomicBehavior;
    use crate::models::Bag;
    use crate::simulator::Services;

    struct Passive;

    impl AtomicBehavior for Passive {
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
            _state: &mut AtomicState,
            _services: &mut Services,
        ) -> Result<(), SimulationError> {
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

    fn atomic(name: &str, ports_in: &[&str], ports_out: &[&str]) -> Model {
        Model::Atomic(Atomic::new(
            name.to_string(),
            ports_in.iter().map(|port| port.to_string()).collect(),
            ports_out.iter().map(|port| port.to_string()).collect(),
            Box::new(Passive),
        ))
    }

    fn nested() -> Coupled {
        let inner = Coupled::new(
            String::from("inner"),
            vec![String::from("in")],
            vec![String::from("out")],
            vec![atomic("a", &["recv"], &["send"])],
            vec![ExternalInputCoupling {
                source_port: String::from("in"),
                target_id: String::from("a"),
                target_port: String::from("recv"),
            }],
            vec![ExternalOutputCoupling {
                source_id: String::from("a"),
                source_port: String::from("send"),
                target_port: String::from("out"),
            }],
            Vec::new(),
        );
        Coupled::new(
            String::from("top"),
            Vec::new(),
            Vec::new(),
            vec![atomic("b", &["recv"], &["send"]), Model::Coupled(inner)],
            Vec::new(),
            Vec::new(),
            vec![
                InternalCoupling {
                    source_id: String::from("b"),
                    source_port: String::from("send"),
                    target_id: String::from("inner"),
                    target_port: String::from("in"),
                },
                InternalCoupling {
                    source_id: String::from("inner"),
                    source_port: String::from("out"),
                    target_id: String::from("b"),
                    target_port: String::from("recv"),
                },
            ],
        )
    }

    #[test]
    fn validation_accepts_nested_couplings() {
        assert!(nested().validate().is_ok());
    }

    #[test]
    fn validation_rejects_unknown_ports() {
        let mut coupled = nested();
        coupled.internal_couplings[0].target_port = String::from("bogus");
        match coupled.validate() {
            Err(SimulationError::UnknownPort { model, port }) => {
                assert_eq!(model, "inner");
                assert_eq!(port, "bogus");
            }
            other => panic!("expected UnknownPort, got {:?}", other.err()),
        }
    }

    #[test]
    fn validation_rejects_direction_misuse() {
        let mut coupled = nested();
        coupled.internal_couplings[0].source_port = String::from("recv");
        match coupled.validate() {
            Err(SimulationError::InvalidPortType { model, port }) => {
                assert_eq!(model, "b");
                assert_eq!(port, "recv");
            }
            other => panic!("expected InvalidPortType, got {:?}", other.err()),
        }
    }

    #[test]
    fn flattening_composes_boundary_couplings() {
        let flat = nested().flatten();
        assert_eq!(flat.components.len(), 2);
        assert!(flat
            .components
            .iter()
            .all(|component| matches!(component, Model::Atomic(_))));
        let pairs: Vec<(&str, &str, &str, &str)> = flat
            .internal_couplings
            .iter()
            .map(|coupling| {
                (
                    coupling.source_id.as_str(),
                    coupling.source_port.as_str(),
                    coupling.target_id.as_str(),
                    coupling.target_port.as_str(),
                )
            })
            .collect();
        assert!(pairs.contains(&("b", "send", "a", "recv")));
        assert!(pairs.contains(&("a", "send", "b", "recv")));
        assert_eq!(pairs.len(), 2);
        assert!(flat.validate().is_ok());
    }
}
