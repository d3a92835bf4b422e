//! Deterministic simulation harness for Murmur protocol testing.
//!
//! A seeded [`Environment`](murmur_core::Environment) with a virtual clock
//! and a [`Relay`](murmur_core::Relay) wrapper that injects outages, hangs
//! and in-flight tampering, so every failure path of the sync engine can be
//! replayed exactly.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the real engines,
//! and their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty_relay;
pub mod model;
pub mod sim_env;

pub use faulty_relay::{FaultMode, FaultyRelay};
pub use model::{
    ClientId, ModelClient, ModelMessage, ModelRelay, ModelWorld, ObservableState, Operation,
    OperationError, OperationResult, SmallMessage,
};
pub use sim_env::SimEnv;
