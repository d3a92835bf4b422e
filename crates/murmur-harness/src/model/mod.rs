//! Reference model for model-based testing.
//!
//! The model captures what the sync protocol promises, with no keys, no
//! envelopes and no clock: a message handed to a healthy relay is in the
//! sender's thread at once and in the recipient's thread after the
//! recipient's next successful tick. While the relay is unavailable
//! messages wait in the sender's outbox, in order.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Deterministic: Same inputs produce same outputs

mod client;
pub mod operation;
mod relay;
mod world;

pub use client::{ModelClient, ModelMessage};
pub use operation::{ClientId, Operation, OperationError, OperationResult, SmallMessage};
pub use relay::ModelRelay;
pub use world::{ModelWorld, ObservableState};
