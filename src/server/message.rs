//! Framing of hashkv requests and responses over TCP.
//!
//! Both directions use the same frame, integers in big endian:
//!
//! ```text
//! | cmd_id: u8 | request_id len: u32 | request_id (utf8) | payload len: u32 | payload (json) |
//! ```
//!
//! A response carries the `cmd_id` and `request_id` of the request it answers, which lets the
//! caller detect a stale or foreign response on a reused connection.
use std::mem::size_of;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{event, instrument, Level};

use crate::{
    cmd::CommandId,
    error::{Error, InvalidRequest, Result},
};

use super::REQUEST_ID;

/// Upper bound for `request_id` plus payload bytes in a single frame.
/// Keys and values travel hex encoded, so a value can use at most half of it.
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

/// A single frame exchanged between a client and a node
#[derive(Debug)]
pub struct Message {
    /// Tells the receiver which request/response type the payload holds
    pub cmd_id: CommandId,
    /// Generated by the client, echoed by the node
    pub request_id: String,
    /// json payload, absent when the frame carries no body
    pub payload: Option<Bytes>,
}

/// Implemented by every request and response that can be sent as a [`Message`]
pub trait IntoMessage {
    fn cmd_id(&self) -> CommandId;

    fn payload(&self) -> Option<Bytes> {
        None
    }

    /// Inside a node, the id of the request being served (see [`REQUEST_ID`])
    fn request_id(&self) -> String {
        REQUEST_ID
            .try_with(|rid| rid.clone())
            .unwrap_or_else(|_| "NOT_SET".to_string())
    }
}

fn size_exceeded(got: usize) -> Error {
    Error::InvalidRequest(InvalidRequest::MaxMessageSizeExceeded {
        max: MAX_MESSAGE_SIZE,
        got: u32::try_from(got).unwrap_or(u32::MAX),
    })
}

impl Message {
    pub fn new(cmd_id: CommandId, request_id: String, payload: Option<Bytes>) -> Self {
        Self {
            cmd_id,
            request_id,
            payload,
        }
    }

    /// Reads one frame from `reader`.
    ///
    /// # Errors
    ///  - [`Error::Io`] if the stream ends or breaks mid frame
    ///  - [`InvalidRequest::UnrecognizedCommand`] for an unknown `cmd_id`
    ///  - [`InvalidRequest::MessageReceivedWithoutRequestId`] / [`InvalidRequest::MessageRequestIdMustBeUtf8Encoded`]
    ///  - [`InvalidRequest::MaxMessageSizeExceeded`] if the announced lengths add up to more than [`MAX_MESSAGE_SIZE`].
    ///    Nothing past the length prefix is read in that case.
    #[instrument(level = "debug", skip(reader))]
    pub async fn try_from_async_read<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let raw_cmd_id = reader.read_u8().await?;
        let cmd_id = CommandId::from_repr(raw_cmd_id).ok_or(Error::InvalidRequest(
            InvalidRequest::UnrecognizedCommand { id: raw_cmd_id },
        ))?;

        let request_id_len = reader.read_u32().await? as usize;
        if request_id_len == 0 {
            return Err(Error::InvalidRequest(
                InvalidRequest::MessageReceivedWithoutRequestId,
            ));
        }
        if request_id_len > MAX_MESSAGE_SIZE as usize {
            return Err(size_exceeded(request_id_len));
        }

        let mut request_id = vec![0u8; request_id_len];
        reader.read_exact(&mut request_id).await?;
        let request_id = String::from_utf8(request_id).map_err(|_| {
            Error::InvalidRequest(InvalidRequest::MessageRequestIdMustBeUtf8Encoded)
        })?;

        let payload_len = reader.read_u32().await? as usize;
        if request_id_len.saturating_add(payload_len) > MAX_MESSAGE_SIZE as usize {
            return Err(size_exceeded(payload_len));
        }

        let payload = if payload_len == 0 {
            None
        } else {
            event!(Level::TRACE, "reading payload of {} bytes", payload_len);
            let mut buf = vec![0u8; payload_len];
            reader.read_exact(&mut buf).await?;
            Some(Bytes::from(buf))
        };

        Ok(Self {
            cmd_id,
            request_id,
            payload,
        })
    }

    /// Fails with [`InvalidRequest::MaxMessageSizeExceeded`] if the receiving side would reject
    /// this frame. Callers check this before writing so that an oversized request is reported
    /// as such instead of as a dropped connection.
    pub fn ensure_within_size_limit(&self) -> Result<()> {
        let size = self.request_id.len() + self.payload.as_ref().map_or(0, Bytes::len);
        if size > MAX_MESSAGE_SIZE as usize {
            return Err(size_exceeded(size));
        }

        Ok(())
    }

    /// Encodes the frame (see the module docs for the layout)
    pub fn serialize(self) -> Bytes {
        let payload_len = self.payload.as_ref().map_or(0, Bytes::len);
        let mut buf = BytesMut::with_capacity(
            size_of::<u8>() + 2 * size_of::<u32>() + self.request_id.len() + payload_len,
        );

        buf.put_u8(self.cmd_id as u8);
        buf.put_u32(self.request_id.len() as u32);
        buf.put(self.request_id.as_bytes());
        buf.put_u32(payload_len as u32);
        if let Some(payload) = self.payload {
            buf.put(payload);
        }

        buf.freeze()
    }
}

impl<M: IntoMessage> From<M> for Message {
    fn from(v: M) -> Self {
        Self {
            cmd_id: v.cmd_id(),
            request_id: v.request_id(),
            payload: v.payload(),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, Bytes, BytesMut};
    use tokio::io::AsyncRead;

    use crate::{
        cmd::CommandId,
        error::{Error, InvalidRequest},
        server::message::{Message, MAX_MESSAGE_SIZE},
    };

    #[derive(Default)]
    struct MaxMessageSizeExceededAsyncRead {
        state: State,
    }

    #[derive(Default)]
    enum State {
        #[default]
        Idle,
        ReadCommandId,
        ReadMessageSize,
    }

    impl AsyncRead for MaxMessageSizeExceededAsyncRead {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            match &self.state {
                State::Idle => {
                    buf.put_u8(CommandId::Get as u8);
                    self.get_mut().state = State::ReadCommandId;
                }
                State::ReadCommandId => {
                    buf.put_u32(MAX_MESSAGE_SIZE + 1);
                    self.get_mut().state = State::ReadMessageSize;
                }
                State::ReadMessageSize => {
                    return std::task::Poll::Ready(Err(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "mock".to_string(),
                    )));
                }
            }

            std::task::Poll::Ready(std::io::Result::Ok(()))
        }
    }

    #[tokio::test]
    async fn test_max_message_size_exceeded() {
        let mut reader = MaxMessageSizeExceededAsyncRead::default();
        let err = Message::try_from_async_read(&mut reader)
            .await
            .err()
            .unwrap();

        match err {
            Error::InvalidRequest(InvalidRequest::MaxMessageSizeExceeded { max, got }) => {
                assert_eq!(max, MAX_MESSAGE_SIZE);
                assert_eq!(got, MAX_MESSAGE_SIZE + 1);
            }
            _ => {
                panic!("Unexpected error: {}", err);
            }
        }
    }

    #[tokio::test]
    async fn test_unrecognized_command_id() {
        let mut buf = BytesMut::new();
        buf.put_u8(200);
        buf.put_u32(2);
        buf.put_slice(b"id");
        buf.put_u32(0);
        let mut reader = &buf[..];

        let err = Message::try_from_async_read(&mut reader)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::InvalidRequest(InvalidRequest::UnrecognizedCommand { id: 200 })
        ));
    }

    #[tokio::test]
    async fn test_missing_request_id() {
        let mut buf = BytesMut::new();
        buf.put_u8(CommandId::Put as u8);
        buf.put_u32(0);
        let mut reader = &buf[..];

        let err = Message::try_from_async_read(&mut reader)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::InvalidRequest(InvalidRequest::MessageReceivedWithoutRequestId)
        ));
    }

    #[tokio::test]
    async fn test_serialized_layout() {
        let message = Message::new(
            CommandId::Delete,
            "rid".to_string(),
            Some(Bytes::from("{}")),
        );
        let serialized = message.serialize();
        assert_eq!(
            &serialized[..],
            &[3u8, 0, 0, 0, 3, b'r', b'i', b'd', 0, 0, 0, 2, b'{', b'}'][..]
        );

        let mut reader = &serialized[..];
        let parsed = Message::try_from_async_read(&mut reader).await.unwrap();
        assert_eq!(parsed.cmd_id, CommandId::Delete);
        assert_eq!(parsed.request_id, "rid");
        assert_eq!(parsed.payload, Some(Bytes::from("{}")));
    }

    #[test]
    fn oversized_frame_is_detected_before_sending() {
        let max = MAX_MESSAGE_SIZE as usize;
        let fits = Message::new(
            CommandId::Put,
            "rid".to_string(),
            Some(Bytes::from(vec![b'a'; max - 3])),
        );
        fits.ensure_within_size_limit().unwrap();

        let too_big = Message::new(
            CommandId::Put,
            "rid".to_string(),
            Some(Bytes::from(vec![b'a'; max - 2])),
        );
        match too_big.ensure_within_size_limit().err().unwrap() {
            Error::InvalidRequest(InvalidRequest::MaxMessageSizeExceeded { max, got }) => {
                assert_eq!(max, MAX_MESSAGE_SIZE);
                assert_eq!(got, MAX_MESSAGE_SIZE + 1);
            }
            err => panic!("Unexpected error: {}", err),
        }
    }
}
