use thiserror::Error;

/// Errors raised while decoding or encoding a script export
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Malformed call: {0}")]
    MalformedCall(String),

    #[error("Unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("Signature {signature} takes {expected} argument(s), got {found}")]
    ArityMismatch {
        signature: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid slot key '{0}'")]
    InvalidSlotKey(String),

    #[error("Invalid handler key '{0}'")]
    InvalidHandlerKey(String),

    #[error("Handler {handler} references missing slot {slot_key}")]
    MissingSlot { handler: u32, slot_key: i32 },

    #[error("Argument value {0:?} cannot be represented in this format")]
    UnsupportedArgValue(String),

    #[error("Reserved token '{0}' found in input")]
    ReservedToken(String),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to process autoconf YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
