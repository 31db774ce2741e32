//! Frame struct with typed accessors.
//!
//! Represents a complete protocol frame with header and payload.
//! Uses `bytes::Bytes` for zero-copy payload sharing.

use bytes::Bytes;

use super::wire_format::{Header, CALL_METHOD_ID, HEADER_SIZE, PING_METHOD_ID};

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from header and payload.
    pub fn new(header: Header, payload: Bytes) -> Self {
        Self { header, payload }
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[inline]
    pub fn method_id(&self) -> u16 {
        self.header.method_id
    }

    #[inline]
    pub fn request_id(&self) -> u32 {
        self.header.request_id
    }

    #[inline]
    pub fn is_response(&self) -> bool {
        self.header.is_response()
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.header.is_error()
    }

    #[inline]
    pub fn is_call(&self) -> bool {
        self.header.method_id == CALL_METHOD_ID
    }

    #[inline]
    pub fn is_ping(&self) -> bool {
        self.header.method_id == PING_METHOD_ID
    }
}

/// Build a complete frame as a single byte vector.
///
/// The header's `payload_length` is taken from `payload`.
///
/// # Example
///
/// ```
/// use callwire::protocol::{build_frame, flags, CALL_METHOD_ID};
///
/// let bytes = build_frame(CALL_METHOD_ID, flags::REQUEST, 42, b"hello");
/// assert_eq!(bytes.len(), 11 + 5);
/// ```
pub fn build_frame(method_id: u16, flags: u8, request_id: u32, payload: &[u8]) -> Vec<u8> {
    let header = Header::new(method_id, flags, request_id, payload.len() as u32);
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{flags, FrameBuffer};

    #[test]
    fn test_frame_accessors() {
        let header = Header::new(CALL_METHOD_ID, flags::ERROR_RESPONSE, 42, 5);
        let frame = Frame::new(header, Bytes::from_static(b"hello"));

        assert_eq!(frame.method_id(), CALL_METHOD_ID);
        assert_eq!(frame.request_id(), 42);
        assert_eq!(frame.payload(), b"hello");
        assert!(frame.is_call());
        assert!(!frame.is_ping());
        assert!(frame.is_response());
        assert!(frame.is_error());
    }

    #[test]
    fn test_build_frame_parses_back() {
        let bytes = build_frame(PING_METHOD_ID, flags::RESPONSE, 456, b"");
        assert_eq!(bytes.len(), HEADER_SIZE);

        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&bytes).unwrap();

        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_ping());
        assert!(frames[0].is_response());
        assert_eq!(frames[0].request_id(), 456);
    }
}
