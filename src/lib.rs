//! # Overview
//! Devs provides a hierarchical discrete event simulation kernel, built on
//! the Discrete Event System Specification formalism.  Both the Classic
//! (sequential, with tie-breaking) and Parallel (concurrent, with message
//! bags) variants of the formalism are supported.
//!
//! This repository contains:
//!
//! * Model framework, for specifying atomic models (with user-defined
//! transition, output, and time advance functions) and coupled models
//! (with components and coupling relations).
//! * Simulator engine, for managing and executing discrete event
//! simulations over a model hierarchy - a processor tree of simulators
//! and coordinators, driven by a root coordinator.
//! * Calendar queue event scheduler, for amortized constant-time
//! scheduling of component activations.
//! * Statistics framework, for aggregating transition, output, and
//! message counts across the processor tree.
//!
//! Devs does not require nightly Rust.

pub mod models;
pub mod simulator;
pub mod utils;
