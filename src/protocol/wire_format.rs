//! Wire format encoding and decoding.
//!
//! Every frame starts with an 11-byte header:
//! ```text
//! ┌──────────┬───────┬──────────┬──────────┐
//! │ Method ID│ Flags │ Req ID   │ Length   │
//! │ 2 bytes  │ 1 byte│ 4 bytes  │ 4 bytes  │
//! │ uint16 BE│       │ uint32 BE│ uint32 BE│
//! └──────────┴───────┴──────────┴──────────┘
//! ```
//!
//! All multi-byte integers are Big Endian. A response reuses the method ID
//! and request ID of the request it answers.

use crate::error::{CallwireError, Result};

/// Header size in bytes (fixed, exactly 11).
pub const HEADER_SIZE: usize = 11;

/// Default maximum payload size (16 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Reserved method ID (never use).
pub const RESERVED_METHOD_ID: u16 = 0;

/// Method ID of the `Call` method.
pub const CALL_METHOD_ID: u16 = 1;

/// Method ID of the `Ping` liveness probe.
pub const PING_METHOD_ID: u16 = 2;

/// Flag constants for the protocol.
pub mod flags {
    /// Message type: response (1) or request (0).
    pub const IS_RESPONSE: u8 = 0b0000_0001;
    /// Error flag: the payload is an error message instead of a result.
    pub const IS_ERROR: u8 = 0b0000_0010;

    /// Reserved bits mask (bits 2-7).
    pub const RESERVED_MASK: u8 = 0b1111_1100;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u8, flag: u8) -> bool {
        flags & flag != 0
    }

    /// Request flags = 0x00
    pub const REQUEST: u8 = 0;
    /// Response flags = 0x01
    pub const RESPONSE: u8 = IS_RESPONSE;
    /// Error response flags = 0x03
    pub const ERROR_RESPONSE: u8 = IS_RESPONSE | IS_ERROR;
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Method identifier (`CALL_METHOD_ID` or `PING_METHOD_ID`).
    pub method_id: u16,
    /// Flags byte (see `flags` module).
    pub flags: u8,
    /// Request identifier, echoed back in the response.
    pub request_id: u32,
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(method_id: u16, flags: u8, request_id: u32, payload_length: u32) -> Self {
        Self {
            method_id,
            flags,
            request_id,
            payload_length,
        }
    }

    /// Build the response header answering `self`.
    pub fn reply(&self, flags: u8, payload_length: u32) -> Self {
        Self::new(self.method_id, flags, self.request_id, payload_length)
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use callwire::protocol::{Header, flags, CALL_METHOD_ID};
    ///
    /// let header = Header::new(CALL_METHOD_ID, flags::RESPONSE, 42, 100);
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 11);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.method_id.to_be_bytes());
        buf[2] = self.flags;
        buf[3..7].copy_from_slice(&self.request_id.to_be_bytes());
        buf[7..11].copy_from_slice(&self.payload_length.to_be_bytes());
        buf
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            method_id: u16::from_be_bytes([buf[0], buf[1]]),
            flags: buf[2],
            request_id: u32::from_be_bytes([buf[3], buf[4], buf[5], buf[6]]),
            payload_length: u32::from_be_bytes([buf[7], buf[8], buf[9], buf[10]]),
        })
    }

    /// Validate the header for protocol compliance.
    ///
    /// Checks:
    /// - Method ID is not 0 (reserved)
    /// - Payload length doesn't exceed max
    /// - Reserved flag bits are 0
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if self.method_id == RESERVED_METHOD_ID {
            return Err(CallwireError::Protocol(
                "Method ID 0 is reserved".to_string(),
            ));
        }

        if self.payload_length > max_payload_size {
            return Err(CallwireError::Protocol(format!(
                "Payload size {} exceeds maximum {}",
                self.payload_length, max_payload_size
            )));
        }

        if self.flags & flags::RESERVED_MASK != 0 {
            return Err(CallwireError::Protocol(
                "Reserved flag bits must be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if this is a response.
    #[inline]
    pub fn is_response(&self) -> bool {
        flags::has_flag(self.flags, flags::IS_RESPONSE)
    }

    /// Check if this is an error response.
    #[inline]
    pub fn is_error(&self) -> bool {
        flags::has_flag(self.flags, flags::IS_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode_roundtrip() {
        let original = Header::new(CALL_METHOD_ID, flags::RESPONSE, 42, 100);
        let decoded = Header::decode(&original.encode()).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_header_big_endian_byte_order() {
        let header = Header::new(0x0102, 0x03, 0x04050607, 0x08090A0B);
        let bytes = header.encode();

        assert_eq!(&bytes[0..2], &[0x01, 0x02]);
        assert_eq!(bytes[2], 0x03);
        assert_eq!(&bytes[3..7], &[0x04, 0x05, 0x06, 0x07]);
        assert_eq!(&bytes[7..11], &[0x08, 0x09, 0x0A, 0x0B]);
    }

    #[test]
    fn test_decode_too_short_buffer() {
        let buf = [0u8; HEADER_SIZE - 1];
        assert!(Header::decode(&buf).is_none());
    }

    #[test]
    fn test_reply_keeps_method_and_request_id() {
        let request = Header::new(CALL_METHOD_ID, flags::REQUEST, 7, 30);
        let reply = request.reply(flags::ERROR_RESPONSE, 4);

        assert_eq!(reply.method_id, CALL_METHOD_ID);
        assert_eq!(reply.request_id, 7);
        assert_eq!(reply.payload_length, 4);
        assert!(reply.is_response());
        assert!(reply.is_error());
    }

    #[test]
    fn test_validate_method_id_zero_rejected() {
        let header = Header::new(RESERVED_METHOD_ID, 0, 1, 0);
        let err = header.validate(DEFAULT_MAX_PAYLOAD_SIZE).unwrap_err();
        assert!(err.to_string().contains("Method ID 0 is reserved"));
    }

    #[test]
    fn test_validate_payload_too_large() {
        let header = Header::new(CALL_METHOD_ID, 0, 1, 1_000_000);
        let err = header.validate(100).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_validate_reserved_bits_must_be_zero() {
        let header = Header::new(CALL_METHOD_ID, 0b0000_0100, 1, 0);
        let err = header.validate(DEFAULT_MAX_PAYLOAD_SIZE).unwrap_err();
        assert!(err.to_string().contains("Reserved flag bits"));
    }

    #[test]
    fn test_flag_combinations() {
        assert_eq!(flags::REQUEST, 0x00);
        assert_eq!(flags::RESPONSE, 0x01);
        assert_eq!(flags::ERROR_RESPONSE, 0x03);

        let request = Header::new(PING_METHOD_ID, flags::REQUEST, 1, 0);
        assert!(!request.is_response());
        assert!(!request.is_error());
        assert!(request.validate(DEFAULT_MAX_PAYLOAD_SIZE).is_ok());
    }
}
