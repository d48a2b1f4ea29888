//! Protocol error taxonomy.

use serde_json::Value;

/// Failures raised while encoding or decoding packets.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    /// The received value is not a valid envelope: it is missing `id` or
    /// `data`, or `id` does not name a registered kind. Raised by the
    /// registry before any kind decoder runs.
    #[error("data received is not a valid packet: {0}")]
    InvalidEnvelope(Value),

    /// The envelope passed the registry's shape check but its `data` is
    /// missing fields the kind requires. Raised inside the kind decoder.
    #[error("malformed payload for kind `{kind}`: {envelope}")]
    MalformedPayload { kind: &'static str, envelope: Value },

    /// A packet was handed to the wrong kind's encoder.
    #[error("wrong packet encoder: expected `{expected}`, got `{actual}`")]
    KindMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}
