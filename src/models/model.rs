use super::atomic::Atomic;
use super::coupled::Coupled;

/// `Model` is the tagged union over the two node kinds of a model
/// hierarchy - atomic leaves and coupled interiors.  The simulator builds
/// its processor tree from this structure.
pub enum Model {
    Atomic(Atomic),
    Coupled(Coupled),
}

impl Model {
    pub fn name(&self) -> &str {
        match self {
            Model::Atomic(atomic) => atomic.name(),
            Model::Coupled(coupled) => coupled.name(),
        }
    }

    pub fn has_input_port(&self, port: &str) -> bool {
        match self {
            Model::Atomic(atomic) => atomic.has_input_port(port),
            Model::Coupled(coupled) => coupled.has_input_port(port),
        }
    }

    pub fn has_output_port(&self, port: &str) -> bool {
        match self {
            Model::Atomic(atomic) => atomic.has_output_port(port),
            Model::Coupled(coupled) => coupled.has_output_port(port),
        }
    }
}

impl From<Atomic> for Model {
    fn from(atomic: Atomic) -> Self {
        Model::Atomic(atomic)
    }
}

impl From<Coupled> for Model {
    fn from(coupled: Coupled) -> Self {
        Model::Coupled(coupled)
    }
}
