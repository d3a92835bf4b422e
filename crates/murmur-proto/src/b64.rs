//! Base64url (no padding) helpers and serde adapter for byte fields.
//!
//! Use as `#[serde(with = "murmur_proto::b64")]` on a `Vec<u8>` field.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Deserializer, Serializer};

use crate::ProtoError;

/// Encode bytes as base64url without padding.
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url without padding.
pub fn decode(text: &str) -> Result<Vec<u8>, ProtoError> {
    URL_SAFE_NO_PAD.decode(text).map_err(|e| ProtoError::Base64(e.to_string()))
}

/// Serde serializer for byte fields.
pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&encode(bytes))
}

/// Serde deserializer for byte fields.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let text = String::deserialize(deserializer)?;
    decode(&text).map_err(serde::de::Error::custom)
}
