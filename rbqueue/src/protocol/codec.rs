use bytes::{
    Bytes,
    BytesMut,
};
use tokio_util::codec::{
    Decoder,
    Encoder,
    LengthDelimitedCodec,
};

use crate::{
    config::DEFAULT_MAX_FRAME_LENGTH,
    error::ProtocolError,
    protocol::Message,
};

/// Frames a `Message` as a big-endian `u32` byte length followed by that
/// many bytes of UTF-8 JSON.
#[derive(Debug)]
pub struct MessageCodec {
    inner: LengthDelimitedCodec,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::with_max_frame_length(DEFAULT_MAX_FRAME_LENGTH)
    }

    pub fn with_max_frame_length(max_frame_length: usize) -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .length_field_length(4)
                .big_endian()
                .max_frame_length(max_frame_length)
                .new_codec(),
        }
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ProtocolError> {
        match self.inner.decode(src)? {
            Some(frame) => Ok(Some(serde_json::from_slice(&frame)?)),
            None => Ok(None),
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let payload = serde_json::to_vec(&item)?;
        self.inner.encode(Bytes::from(payload), dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::{
        BufMut,
        BytesMut,
    };
    use serde_json::json;
    use tokio_util::codec::{
        Decoder,
        Encoder,
    };
    use crate::{
        error::ProtocolError,
        protocol::{
            Message,
            MessageCodec,
        },
    };

    #[test]
    fn test_encode_layout() -> anyhow::Result<()> {
        let mut codec = MessageCodec::new();
        let mut dst = BytesMut::new();
        codec.encode(Message::new("ok"), &mut dst)?;
        let body = br#"{"message":"ok"}"#;
        assert_eq!(&dst[..4], &(body.len() as u32).to_be_bytes());
        assert_eq!(&dst[4..], body);
        Ok(())
    }

    #[test]
    fn test_decode_partial_frames() -> anyhow::Result<()> {
        let mut codec = MessageCodec::new();
        let body = serde_json::to_vec(&json!({
            "message": "tasks.all",
            "data": "0b5f1f1e-5c1e-4d0c-9d57-5b8fbe3c7a10",
        }))?;
        let mut src = BytesMut::new();
        src.put_u32(body.len() as u32);
        src.extend_from_slice(&body[..10]);
        assert_eq!(codec.decode(&mut src)?, None);
        src.extend_from_slice(&body[10..]);
        let message = codec.decode(&mut src)?
            .expect("complete frame");
        assert_eq!(message.message, "tasks.all");
        assert!(src.is_empty());
        Ok(())
    }

    #[test]
    fn test_decode_two_frames() -> anyhow::Result<()> {
        let mut codec = MessageCodec::new();
        let mut src = BytesMut::new();
        codec.encode(Message::new("jobs.all"), &mut src)?;
        codec.encode(Message::new("workers.all"), &mut src)?;
        assert_eq!(codec.decode(&mut src)?, Some(Message::new("jobs.all")));
        assert_eq!(codec.decode(&mut src)?, Some(Message::new("workers.all")));
        assert_eq!(codec.decode(&mut src)?, None);
        Ok(())
    }

    #[test]
    fn test_decode_malformed_json() {
        let mut codec = MessageCodec::new();
        let mut src = BytesMut::new();
        src.put_u32(5);
        src.extend_from_slice(b"{nope");
        assert!(matches!(
            codec.decode(&mut src),
            Err(ProtocolError::Malformed(_)),
        ));
    }

    #[test]
    fn test_decode_oversized_frame() {
        let mut codec = MessageCodec::with_max_frame_length(16);
        let mut src = BytesMut::new();
        src.put_u32(1024);
        src.extend_from_slice(&[b' '; 32]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(ProtocolError::Io(_)),
        ));
    }
}
