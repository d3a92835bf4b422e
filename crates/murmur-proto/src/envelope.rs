//! The encrypted envelope carried by the relay.

use serde::{Deserialize, Serialize};

/// Opaque encrypted payload: a per-message nonce plus AEAD ciphertext.
///
/// The relay stores and forwards envelopes without inspecting them. Length
/// and authenticity checks happen on decrypt, not here, so a malformed
/// envelope still parses and is rejected later by the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-message nonce.
    #[serde(with = "crate::b64")]
    pub nonce: Vec<u8>,
    /// AEAD ciphertext, authentication tag appended.
    #[serde(with = "crate::b64")]
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Total encoded size in bytes (nonce plus ciphertext).
    pub fn len(&self) -> usize {
        self.nonce.len() + self.ciphertext.len()
    }

    /// Whether both fields are empty.
    pub fn is_empty(&self) -> bool {
        self.nonce.is_empty() && self.ciphertext.is_empty()
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from the JSON wire form.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn json_shape() {
        let envelope = Envelope { nonce: vec![0xfb, 0xff], ciphertext: vec![1, 2, 3] };
        insta::assert_snapshot!(envelope.to_json().unwrap(), @r#"{"nonce":"-_8","ciphertext":"AQID"}"#);
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(Envelope::from_json(r#"{"nonce":"!!","ciphertext":""}"#).is_err());
        assert!(Envelope::from_json(r#"{"nonce":"AA"}"#).is_err());
    }

    #[test]
    fn short_fields_still_parse() {
        let envelope = Envelope::from_json(r#"{"nonce":"","ciphertext":"AQ"}"#).unwrap();
        assert!(envelope.nonce.is_empty());
        assert_eq!(envelope.ciphertext, vec![1]);
    }
}
