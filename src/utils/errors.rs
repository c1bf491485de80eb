use thiserror::Error;

/// `SimulationError` enumerates all possible errors returned by devs.
/// Every kernel-detected error is fatal - nothing is retried - and the
/// diagnostic names the offending processor or model, along with the
/// simulation time where one is meaningful.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Represents a message traversing a port that its target model does not own
    #[error("model {model} does not own port {port} (simulation time {time})")]
    InvalidPortHost {
        model: String,
        port: String,
        time: f64,
    },

    /// Represents an output port used for input, or an input port used for output
    #[error("port {port} on model {model} was used against its direction")]
    InvalidPortType { model: String, port: String },

    /// Represents a port lookup by name that missed
    #[error("model {model} has no port named {port}")]
    UnknownPort { model: String, port: String },

    /// Represents a child-model lookup by name that missed
    #[error("coupled model {parent} has no component named {child}")]
    NoSuchChild { parent: String, child: String },

    /// Represents two sibling components sharing a name
    #[error("coupled model {parent} declares component {child} more than once")]
    DuplicateChild { parent: String, child: String },

    /// Represents a processor receiving a protocol message at a time
    /// inconsistent with its time of last/next transition
    #[error(
        "bad synchronization in {processor}: message at time {time}, expected within [{time_last}, {time_next}]"
    )]
    BadSynchronization {
        processor: String,
        time: f64,
        time_last: f64,
        time_next: f64,
    },

    /// Represents a time advance function returning a negative or NaN value
    #[error("model {model} returned an invalid time advance of {value}")]
    InvalidTimeAdvance { model: String, value: f64 },

    /// Represents a failure signaled by a user transition or output function
    #[error("transition failure in model {model}: {reason}")]
    UserTransitionFailure { model: String, reason: String },

    /// Transparent serde_json errors
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}
