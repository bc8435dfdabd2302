//! # Athena Protocol Library
//!
//! Wire-level pieces of the Athena client/server protocol, shared by the
//! TmwAthena and eAthena server families.
//!
//! ## Architecture
//!
//! ### 1. Codecs Layer ([`codecs`])
//! Field encodings that are not plain little-endian integers:
//! - packed x/y/direction coordinate triple
//! - fixed-width NUL padded strings
//!
//! ### 2. Messages ([`message`])
//! [`MessageIn`] reads one complete frame with bounds checking,
//! [`MessageOut`] builds one frame and patches variable lengths.
//!
//! ### 3. Opcodes ([`packets`])
//! Opcode constants, shared ones at module level and family-specific ones in
//! [`packets::tmwa`] and [`packets::eathena`].
//!
//! ### 4. Lengths ([`lengths`])
//! Per-dialect frame length table used by the transport to split the stream.
//!
//! ## Usage Example
//!
//! ```rust
//! use athena_protocol::{packets, MessageIn, MessageOut};
//!
//! let mut out = MessageOut::new(packets::CMSG_CHAR_SELECT);
//! out.write_u8(2, "slot");
//!
//! let mut msg = MessageIn::new(out.finish().unwrap()).unwrap();
//! assert_eq!(msg.opcode(), packets::CMSG_CHAR_SELECT);
//! assert_eq!(msg.read_u8("slot").unwrap(), 2);
//! ```

pub mod codecs;
pub mod lengths;
pub mod message;
pub mod packets;

// Re-export commonly used items
pub use codecs::*;
pub use lengths::{PacketLength, PacketLengths};
pub use message::{MessageIn, MessageOut};
