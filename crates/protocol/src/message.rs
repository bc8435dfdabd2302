//! # Message Codec
//!
//! [`MessageIn`] is a cursor over one complete inbound frame; [`MessageOut`]
//! builds one outbound frame.
//!
//! ## Frame Layout
//! ```text
//! fixed:    {u16 opcode}{fields...}
//! variable: {u16 opcode}{u16 total length}{fields...}
//! ```
//!
//! Every accessor takes a field label. Labels never reach the wire; they show
//! up in `trace` logs and in [`ClientError::Truncated`] so a short message can
//! be pinned to the field that ran out.
//!
//! Servers append fields across versions, so a handler reads what it knows
//! and leaves the rest. Unread trailing bytes are not an error.

use athena_core::{ClientError, Coordinates, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codecs::{
    decode_coordinates, decode_fixed_string, encode_coordinates, write_fixed_string,
    COORDINATES_LEN,
};

/// One complete inbound message
#[derive(Debug, Clone)]
pub struct MessageIn {
    opcode: u16,
    /// Whole frame, opcode included
    frame: Bytes,
    /// Unread part of the frame
    body: Bytes,
}

impl MessageIn {
    /// Wrap a complete frame
    ///
    /// # Errors
    /// `InvalidData` if the frame cannot even hold an opcode.
    pub fn new(frame: Bytes) -> Result<Self> {
        if frame.len() < 2 {
            return Err(ClientError::InvalidData(format!(
                "frame of {} bytes has no opcode",
                frame.len()
            )));
        }

        let opcode = u16::from_le_bytes([frame[0], frame[1]]);
        let body = frame.slice(2..);

        Ok(Self {
            opcode,
            frame,
            body,
        })
    }

    #[inline]
    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    /// Total frame length, opcode included
    #[inline]
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Bytes not consumed yet
    #[inline]
    pub fn remaining(&self) -> usize {
        self.body.remaining()
    }

    /// Raw frame bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.frame
    }

    fn ensure(&self, needed: usize, field: &'static str) -> Result<()> {
        if self.body.remaining() < needed {
            return Err(ClientError::Truncated {
                opcode: self.opcode,
                field,
                needed,
                remaining: self.body.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        self.ensure(1, field)?;
        let value = self.body.get_u8();
        tracing::trace!("0x{:04x} {}: {}", self.opcode, field, value);
        Ok(value)
    }

    pub fn read_i8(&mut self, field: &'static str) -> Result<i8> {
        self.ensure(1, field)?;
        let value = self.body.get_i8();
        tracing::trace!("0x{:04x} {}: {}", self.opcode, field, value);
        Ok(value)
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16> {
        self.ensure(2, field)?;
        let value = self.body.get_u16_le();
        tracing::trace!("0x{:04x} {}: {}", self.opcode, field, value);
        Ok(value)
    }

    pub fn read_i16(&mut self, field: &'static str) -> Result<i16> {
        self.ensure(2, field)?;
        let value = self.body.get_i16_le();
        tracing::trace!("0x{:04x} {}: {}", self.opcode, field, value);
        Ok(value)
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32> {
        self.ensure(4, field)?;
        let value = self.body.get_u32_le();
        tracing::trace!("0x{:04x} {}: {}", self.opcode, field, value);
        Ok(value)
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32> {
        self.ensure(4, field)?;
        let value = self.body.get_i32_le();
        tracing::trace!("0x{:04x} {}: {}", self.opcode, field, value);
        Ok(value)
    }

    /// Read a packed x/y/direction triple
    pub fn read_coordinates(&mut self, field: &'static str) -> Result<Coordinates> {
        self.ensure(COORDINATES_LEN, field)?;
        let mut raw = [0u8; COORDINATES_LEN];
        self.body.copy_to_slice(&mut raw);
        let coords = decode_coordinates(raw);
        tracing::trace!("0x{:04x} {}: {:?}", self.opcode, field, coords);
        Ok(coords)
    }

    /// Read an IPv4 address stored in dotted byte order
    pub fn read_ipv4(&mut self, field: &'static str) -> Result<[u8; 4]> {
        self.ensure(4, field)?;
        let mut raw = [0u8; 4];
        self.body.copy_to_slice(&mut raw);
        tracing::trace!("0x{:04x} {}: {:?}", self.opcode, field, raw);
        Ok(raw)
    }

    /// Read a fixed-width string field
    pub fn read_string(&mut self, len: usize, field: &'static str) -> Result<String> {
        self.ensure(len, field)?;
        let raw = self.body.split_to(len);
        let value = decode_fixed_string(&raw);
        tracing::trace!("0x{:04x} {}: {:?}", self.opcode, field, value);
        Ok(value)
    }

    /// Read everything left as a string (variable messages ending in text)
    pub fn read_remaining_string(&mut self, field: &'static str) -> String {
        let raw = self.body.split_to(self.body.remaining());
        let value = decode_fixed_string(&raw);
        tracing::trace!("0x{:04x} {}: {:?}", self.opcode, field, value);
        value
    }

    pub fn read_bytes(&mut self, len: usize, field: &'static str) -> Result<Bytes> {
        self.ensure(len, field)?;
        tracing::trace!("0x{:04x} {}: {} bytes", self.opcode, field, len);
        Ok(self.body.split_to(len))
    }

    pub fn skip(&mut self, len: usize, field: &'static str) -> Result<()> {
        self.ensure(len, field)?;
        tracing::trace!("0x{:04x} {}: skipped {} bytes", self.opcode, field, len);
        self.body.advance(len);
        Ok(())
    }
}

/// One outbound message under construction
///
/// Nothing touches the network until [`MessageOut::finish`] hands the frozen
/// bytes to a connection, so a message is always sent whole.
#[derive(Debug, Clone)]
pub struct MessageOut {
    opcode: u16,
    buf: BytesMut,
    variable: bool,
}

impl MessageOut {
    /// Start a fixed-length message
    pub fn new(opcode: u16) -> Self {
        let mut buf = BytesMut::with_capacity(32);
        buf.put_u16_le(opcode);
        Self {
            opcode,
            buf,
            variable: false,
        }
    }

    /// Start a variable-length message; the length word is patched by `finish`
    pub fn variable(opcode: u16) -> Self {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_u16_le(opcode);
        buf.put_u16_le(0);
        Self {
            opcode,
            buf,
            variable: true,
        }
    }

    #[inline]
    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    /// Bytes written so far, opcode included
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, value: u8, field: &'static str) -> &mut Self {
        tracing::trace!("0x{:04x} {} <- {}", self.opcode, field, value);
        self.buf.put_u8(value);
        self
    }

    pub fn write_i8(&mut self, value: i8, field: &'static str) -> &mut Self {
        tracing::trace!("0x{:04x} {} <- {}", self.opcode, field, value);
        self.buf.put_i8(value);
        self
    }

    pub fn write_u16(&mut self, value: u16, field: &'static str) -> &mut Self {
        tracing::trace!("0x{:04x} {} <- {}", self.opcode, field, value);
        self.buf.put_u16_le(value);
        self
    }

    pub fn write_i16(&mut self, value: i16, field: &'static str) -> &mut Self {
        tracing::trace!("0x{:04x} {} <- {}", self.opcode, field, value);
        self.buf.put_i16_le(value);
        self
    }

    pub fn write_u32(&mut self, value: u32, field: &'static str) -> &mut Self {
        tracing::trace!("0x{:04x} {} <- {}", self.opcode, field, value);
        self.buf.put_u32_le(value);
        self
    }

    pub fn write_i32(&mut self, value: i32, field: &'static str) -> &mut Self {
        tracing::trace!("0x{:04x} {} <- {}", self.opcode, field, value);
        self.buf.put_i32_le(value);
        self
    }

    pub fn write_coordinates(&mut self, coords: Coordinates, field: &'static str) -> &mut Self {
        tracing::trace!("0x{:04x} {} <- {:?}", self.opcode, field, coords);
        self.buf.put_slice(&encode_coordinates(coords));
        self
    }

    pub fn write_ipv4(&mut self, ip: [u8; 4], field: &'static str) -> &mut Self {
        tracing::trace!("0x{:04x} {} <- {:?}", self.opcode, field, ip);
        self.buf.put_slice(&ip);
        self
    }

    /// Write a fixed-width string, truncated or NUL padded to `len`
    pub fn write_string(&mut self, value: &str, len: usize, field: &'static str) -> &mut Self {
        tracing::trace!("0x{:04x} {} <- {:?}", self.opcode, field, value);
        write_fixed_string(&mut self.buf, value, len);
        self
    }

    pub fn write_raw(&mut self, bytes: &[u8], field: &'static str) -> &mut Self {
        tracing::trace!("0x{:04x} {} <- {} bytes", self.opcode, field, bytes.len());
        self.buf.put_slice(bytes);
        self
    }

    /// Freeze the message, patching the length word of variable messages
    ///
    /// # Errors
    /// `InvalidData` if a variable message outgrew its 16-bit length word.
    pub fn finish(mut self) -> Result<Bytes> {
        if self.variable {
            let len = u16::try_from(self.buf.len()).map_err(|_| {
                ClientError::InvalidData(format!(
                    "0x{:04x}: {} bytes does not fit a length word",
                    self.opcode,
                    self.buf.len()
                ))
            })?;
            self.buf[2..4].copy_from_slice(&len.to_le_bytes());
        }
        Ok(self.buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(msg: MessageOut) -> MessageIn {
        MessageIn::new(msg.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_fixed_message_fields() {
        let mut out = MessageOut::new(0x0072);
        out.write_u32(42, "account id")
            .write_u32(150_001, "char id")
            .write_u32(0xAABB_CCDD, "session key1")
            .write_u32(0, "tick")
            .write_u8(1, "sex");
        assert_eq!(out.len(), 19);

        let mut msg = decode(out);
        assert_eq!(msg.opcode(), 0x0072);
        assert_eq!(msg.read_u32("account id").unwrap(), 42);
        assert_eq!(msg.read_u32("char id").unwrap(), 150_001);
        assert_eq!(msg.read_u32("session key1").unwrap(), 0xAABB_CCDD);
        assert_eq!(msg.read_u32("tick").unwrap(), 0);
        assert_eq!(msg.read_u8("sex").unwrap(), 1);
        assert_eq!(msg.remaining(), 0);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut out = MessageOut::new(0x0187);
        out.write_u32(0x0102_0304, "account id");
        let bytes = out.finish().unwrap();
        assert_eq!(&bytes[..], &[0x87, 0x01, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_variable_length_patched() {
        let mut out = MessageOut::variable(0x00b4);
        out.write_u32(110_000_001, "npc id")
            .write_raw(b"Hello\0", "text");
        let bytes = out.finish().unwrap();
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 14);
        assert_eq!(bytes.len(), 14);

        let mut msg = MessageIn::new(bytes).unwrap();
        assert_eq!(msg.read_u16("len").unwrap(), 14);
        assert_eq!(msg.read_u32("npc id").unwrap(), 110_000_001);
        assert_eq!(msg.read_remaining_string("text"), "Hello");
    }

    #[test]
    fn test_oversized_variable_message_is_rejected() {
        let mut out = MessageOut::variable(0x008c);
        out.write_raw(&vec![b'a'; u16::MAX as usize], "text");
        match out.finish() {
            Err(ClientError::InvalidData(reason)) => assert!(reason.contains("0x008c")),
            other => panic!("expected InvalidData, got {other:?}"),
        }

        // Exactly one length word's worth still fits
        let mut out = MessageOut::variable(0x008c);
        out.write_raw(&vec![b'a'; u16::MAX as usize - 4], "text");
        let bytes = out.finish().unwrap();
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), u16::MAX);
    }

    #[test]
    fn test_signed_fields() {
        let mut out = MessageOut::new(0x1234);
        out.write_i8(-5, "a").write_i16(-300, "b").write_i32(-70_000, "c");
        let mut msg = decode(out);
        assert_eq!(msg.read_i8("a").unwrap(), -5);
        assert_eq!(msg.read_i16("b").unwrap(), -300);
        assert_eq!(msg.read_i32("c").unwrap(), -70_000);
    }

    #[test]
    fn test_coordinates_and_strings() {
        let mut out = MessageOut::new(0x0091);
        out.write_string("new_1-1.gat", 16, "map")
            .write_coordinates(Coordinates::new(33, 44, 2), "position")
            .write_ipv4([10, 0, 0, 7], "ip");

        let mut msg = decode(out);
        assert_eq!(msg.read_string(16, "map").unwrap(), "new_1-1.gat");
        assert_eq!(
            msg.read_coordinates("position").unwrap(),
            Coordinates::new(33, 44, 2)
        );
        assert_eq!(msg.read_ipv4("ip").unwrap(), [10, 0, 0, 7]);
    }

    #[test]
    fn test_read_past_end_is_truncated() {
        let mut out = MessageOut::new(0x0073);
        out.write_u32(1, "tick").write_u16(0, "partial");
        let mut msg = decode(out);

        msg.read_u32("tick").unwrap();
        let err = msg.read_coordinates("position").unwrap_err();
        match err {
            ClientError::Truncated {
                opcode,
                field,
                needed,
                remaining,
            } => {
                assert_eq!(opcode, 0x0073);
                assert_eq!(field, "position");
                assert_eq!(needed, 3);
                assert_eq!(remaining, 2);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
        // Nothing was consumed by the failed read
        assert_eq!(msg.remaining(), 2);
    }

    #[test]
    fn test_skip_and_bytes() {
        let mut out = MessageOut::new(0x0001);
        out.write_raw(&[1, 2, 3, 4, 5], "payload");
        let mut msg = decode(out);
        msg.skip(2, "unused").unwrap();
        assert_eq!(&msg.read_bytes(2, "pair").unwrap()[..], &[3, 4]);
        assert!(msg.skip(2, "too far").is_err());
        assert_eq!(msg.remaining(), 1);
    }

    #[test]
    fn test_frame_without_opcode_rejected() {
        assert!(MessageIn::new(Bytes::from_static(&[0x73])).is_err());
    }
}
