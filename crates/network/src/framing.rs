//! # Stream Framing
//!
//! [`MessageFramer`] turns the raw TCP byte stream into [`MessageIn`]s using
//! the dialect's packet length table. It only ever yields complete frames and
//! leaves a partial frame in the buffer until the rest arrives.
//!
//! An opcode with no known length is fatal for the connection: without a
//! length there is no way to find where the next message starts.

use athena_core::{ClientError, Dialect};
use athena_protocol::{MessageIn, PacketLength, PacketLengths};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

/// Smallest legal variable-length frame: opcode plus length word
const MIN_VARIABLE_LEN: usize = 4;

/// Length-table driven frame decoder
#[derive(Debug, Clone)]
pub struct MessageFramer {
    lengths: PacketLengths,
    /// Raw bytes to drop before the first frame
    skip: usize,
}

impl MessageFramer {
    pub fn new(lengths: PacketLengths) -> Self {
        Self { lengths, skip: 0 }
    }

    pub fn for_dialect(dialect: Dialect) -> Self {
        Self::new(PacketLengths::for_dialect(dialect))
    }

    /// Drop `count` raw bytes before the first frame
    ///
    /// The eAthena char server answers a connect with the bare 4-byte account
    /// id before any framed message.
    pub fn with_leading_skip(mut self, count: usize) -> Self {
        self.skip = count;
        self
    }

    /// Leading bytes still to be dropped
    pub fn pending_skip(&self) -> usize {
        self.skip
    }

    /// Size of the frame at the start of `src`, if enough is buffered to know
    fn frame_len(&self, src: &BytesMut) -> Result<Option<usize>, ClientError> {
        if src.len() < 2 {
            return Ok(None);
        }

        let opcode = u16::from_le_bytes([src[0], src[1]]);
        match self.lengths.get(opcode) {
            Some(PacketLength::Fixed(len)) => Ok(Some(len)),
            Some(PacketLength::Variable) => {
                if src.len() < MIN_VARIABLE_LEN {
                    return Ok(None);
                }
                let len = u16::from_le_bytes([src[2], src[3]]) as usize;
                if len < MIN_VARIABLE_LEN {
                    return Err(ClientError::ProtocolMismatch(format!(
                        "opcode 0x{:04x} declares length {}",
                        opcode, len
                    )));
                }
                Ok(Some(len))
            }
            None => Err(ClientError::ProtocolMismatch(format!(
                "no {} length known for opcode 0x{:04x}",
                self.lengths.dialect(),
                opcode
            ))),
        }
    }
}

impl Decoder for MessageFramer {
    type Item = MessageIn;
    type Error = ClientError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.skip > 0 {
            let count = self.skip.min(src.len());
            src.advance(count);
            self.skip -= count;
            if self.skip > 0 {
                return Ok(None);
            }
        }

        let len = match self.frame_len(src)? {
            Some(len) => len,
            None => return Ok(None),
        };

        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(len).freeze();
        MessageIn::new(frame).map(Some)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(msg) => Ok(Some(msg)),
            None => {
                if !buf.is_empty() {
                    tracing::debug!("Discarding {} bytes of partial frame at EOF", buf.len());
                    buf.clear();
                }
                Ok(None)
            }
        }
    }
}
