//! MsgPack codec using `rmp-serde`.
//!
//! Always `to_vec_named`: structs go on the wire as maps keyed by field
//! name, so `CallRequest`/`CallResponse` can be read by any MessagePack
//! implementation without knowing the field order.

use crate::error::Result;

/// MessagePack codec for structured data.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map format).
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallwireError;
    use crate::message::{CallRequest, CallResponse};

    #[test]
    fn test_call_request_is_a_named_map() {
        let request = CallRequest::new("SayHello", "world");
        let encoded = MsgPackCodec::encode(&request).unwrap();

        // fixmap with 2 entries
        assert_eq!(encoded[0], 0x82);

        let decoded: CallRequest = MsgPackCodec::decode(&encoded).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_buffers_encode_as_binary() {
        let response = CallResponse::ok(vec![0x00, 0xFF, 0x10]);
        let encoded = MsgPackCodec::encode(&response).unwrap();

        // bin8 marker followed by the 3-byte length
        let bin = encoded
            .windows(2)
            .position(|w| w == [0xc4, 0x03])
            .expect("result_buffer should be msgpack bin");
        assert_eq!(&encoded[bin + 2..bin + 5], &[0x00, 0xFF, 0x10]);
    }

    #[test]
    fn test_error_message_is_plain_string() {
        let encoded = MsgPackCodec::encode(&"boom").unwrap();
        let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
        assert_eq!(decoded, "boom");
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let result: Result<CallRequest> = MsgPackCodec::decode(b"not valid msgpack");
        assert!(matches!(result, Err(CallwireError::MsgPackDecode(_))));
    }
}
