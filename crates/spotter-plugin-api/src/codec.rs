//! JSON wire codec.
//!
//! One JSON document per transport message, in both directions.

use crate::error::CodecError;
use spotter_core::{HostRequest, PluginMessage};

/// JSON codec for host envelopes.
pub struct JsonCodec;

impl JsonCodec {
    /// Decode an inbound payload.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Malformed`] when the payload is not JSON, is not
    /// an object, or has no recognized `type`.
    pub fn decode(bytes: &[u8]) -> Result<HostRequest, CodecError> {
        serde_json::from_slice(bytes).map_err(CodecError::Malformed)
    }

    /// Encode an outbound message.
    pub fn encode(message: &PluginMessage) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(message).map_err(CodecError::Encode)
    }
}
