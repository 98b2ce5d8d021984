use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("unsupported argument type for {key:?}: {kind}")]
    UnsupportedArgumentType { key: String, kind: &'static str },

    #[error("phase must be exactly one character, got {0:?}")]
    InvalidPhase(String),

    #[error("no thread descriptor written for tid {0}")]
    MissingThreadDescriptor(u64),

    #[error("malformed packet stream at offset {offset}: {reason}")]
    Framing { offset: usize, reason: &'static str },

    #[error("protobuf encoding failed: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("protobuf decoding failed: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("write to trace output failed: {0}")]
    Io(#[from] std::io::Error),
}
