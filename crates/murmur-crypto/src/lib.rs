//! Murmur Cryptographic Primitives
//!
//! This crate provides the cryptographic building blocks for Murmur: X25519
//! identities, pairwise session key agreement and XChaCha20-Poly1305
//! sealing.
//!
//! # Design
//!
//! All functions in this crate are pure. Secret key material and nonces are
//! supplied by the caller, so a seeded environment reproduces every byte of
//! ciphertext in simulation.
//!
//! # Security Properties
//!
//! - Confidentiality and integrity of each envelope under the pair's session
//!   key
//! - Symmetric agreement: both sides of a pair derive the same key without
//!   exchanging it
//! - Secret material is zeroized on drop and never printed

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aead;
pub mod agreement;
mod error;
pub mod identity;

pub use aead::{KEY_SIZE, NONCE_SIZE, TAG_SIZE, open, seal};
pub use agreement::{SessionKey, derive_session_key};
pub use error::CryptoError;
pub use identity::{IdentityKeyPair, PUBLIC_KEY_SIZE, PublicKey, SECRET_KEY_SIZE};
