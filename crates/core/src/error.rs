//! Core error types for the Athena client

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// A message ended before a field could be read. Only that message is lost.
    #[error("Message 0x{opcode:04x} truncated reading {field}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        opcode: u16,
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("No handler registered for opcode 0x{0:04x}")]
    UnknownOpcode(u16),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentication refused: {0}")]
    AuthRefused(String),

    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    #[error("Opcode 0x{opcode:04x} claimed by both {existing} and {duplicate}")]
    DuplicateOpcode {
        opcode: u16,
        existing: &'static str,
        duplicate: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl ClientError {
    /// Errors confined to a single message: drop it and keep the connection.
    pub fn is_message_local(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. } | Self::UnknownOpcode(_) | Self::InvalidData(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
