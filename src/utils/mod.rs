//! The utilities module provides general capabilities that may span the
//! models and simulator modules.  The utilities are centered around
//! error handling and random number generation.

pub mod dynamic_rng;
pub mod errors;
