//! Framed I/O for LDAP messages.
//!
//! Every LDAP message is one BER element, so a frame is complete once the
//! bytes announced by its header have arrived. The reader peeks at the header
//! to learn the frame size before the whole frame is buffered.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::{Bytes, BytesMut};
use ldapkit_ber::DecoderConfig;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::config::Config;
use crate::message::LdapMessage;
use crate::{Error, Result};

/// Buffered reader and writer of complete LDAP messages.
///
/// Reading needs `S: AsyncRead`, writing needs `S: AsyncWrite`, so the two
/// halves of a split stream can each be wrapped on their own.
pub struct FramedStream<S> {
    stream: S,
    buffer: BytesMut,
    write_buffer: BytesMut,
    decoder: DecoderConfig,
    max_message_size: usize,
}

impl<S> FramedStream<S> {
    /// Creates a framed stream with default limits.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, &Config::default())
    }

    /// Creates a framed stream with the given limits.
    pub fn with_config(stream: S, config: &Config) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(config.read_buffer_size),
            write_buffer: BytesMut::new(),
            decoder: config.decoder_config(),
            max_message_size: config.max_message_size,
        }
    }

    /// Returns the decoder limits used for inbound messages.
    #[must_use]
    pub const fn decoder_config(&self) -> &DecoderConfig {
        &self.decoder
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Gets a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Note: Any buffered data will be lost.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Size of the frame at the front of the buffer, if its header is
    /// complete.
    fn frame_len(&self) -> Result<Option<usize>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        match self.decoder.peek_header(&self.buffer) {
            Ok((_, header, content)) => {
                let size = header.saturating_add(content);
                if size > self.max_message_size {
                    return Err(Error::MessageTooLarge {
                        size,
                        max: self.max_message_size,
                    });
                }
                Ok(Some(size))
            }
            Err(ldapkit_ber::Error::Truncated { .. }) => Ok(None),
            Err(ldapkit_ber::Error::LengthOverflow { length, max }) => Err(Error::MessageTooLarge {
                size: length,
                max,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl<S> FramedStream<S>
where
    S: AsyncRead + Unpin,
{
    /// Reads the bytes of one complete message.
    ///
    /// Returns `None` when the peer closes the stream between messages. A
    /// close in the middle of a message is an I/O error.
    pub async fn read_frame(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(size) = self.frame_len()? {
                if self.buffer.len() >= size {
                    return Ok(Some(self.buffer.split_to(size).freeze()));
                }
                self.buffer.reserve(size - self.buffer.len());
            }

            let read = self.stream.read_buf(&mut self.buffer).await?;
            if read == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "connection closed with {} bytes of a partial message",
                        self.buffer.len()
                    ),
                )));
            }
        }
    }

    /// Reads and decodes one message.
    pub async fn read_message(&mut self) -> Result<Option<LdapMessage>> {
        match self.read_frame().await? {
            Some(frame) => LdapMessage::decode_with(&frame, &self.decoder).map(Some),
            None => Ok(None),
        }
    }
}

impl<S> FramedStream<S>
where
    S: AsyncWrite + Unpin,
{
    /// Encodes and writes one message, then flushes.
    pub async fn write_message(&mut self, message: &LdapMessage) -> Result<()> {
        self.write_buffer.clear();
        message.to_element().encode_to(&mut self.write_buffer);

        self.stream.write_all(&self.write_buffer).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::message::ProtocolOp;
    use crate::types::MessageId;
    use tokio_test::io::Builder;

    fn unbind(n: i32) -> LdapMessage {
        LdapMessage::new(MessageId::new(n).unwrap(), ProtocolOp::UnbindRequest)
    }

    #[tokio::test]
    async fn test_read_whole_frame() {
        let bytes = unbind(1).encode();
        let mock = Builder::new().read(&bytes).build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_message().await.unwrap(), Some(unbind(1)));
        assert_eq!(framed.read_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_frame_split_across_reads() {
        let bytes = unbind(300).encode();
        let mock = Builder::new()
            .read(&bytes[..1])
            .read(&bytes[1..4])
            .read(&bytes[4..])
            .build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(framed.read_message().await.unwrap(), Some(unbind(300)));
    }

    #[tokio::test]
    async fn test_two_frames_in_one_read() {
        let mut bytes = unbind(1).encode().to_vec();
        bytes.extend_from_slice(&unbind(2).encode());
        let mock = Builder::new().read(&bytes).build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_message().await.unwrap(), Some(unbind(1)));
        assert_eq!(framed.read_message().await.unwrap(), Some(unbind(2)));
    }

    #[tokio::test]
    async fn test_frame_split_inside_high_tag() {
        let mock = Builder::new()
            .read(&[0x7F, 0x81])
            .read(&[0x01, 0x02, 0x05, 0x00])
            .build();
        let mut framed = FramedStream::new(mock);
        let frame = framed.read_frame().await.unwrap().unwrap();
        assert_eq!(&frame[..], &[0x7F, 0x81, 0x01, 0x02, 0x05, 0x00]);
    }

    #[tokio::test]
    async fn test_eof_mid_frame() {
        let bytes = unbind(1).encode();
        let mock = Builder::new().read(&bytes[..3]).build();
        let mut framed = FramedStream::new(mock);
        assert!(matches!(framed.read_frame().await, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected_from_header() {
        // SEQUENCE announcing 70000 content bytes
        let mock = Builder::new().read(&[0x30, 0x83, 0x01, 0x11, 0x70]).build();
        let config = Config::builder().max_message_size(1024).build();
        let mut framed = FramedStream::with_config(mock, &config);
        assert!(matches!(
            framed.read_frame().await,
            Err(Error::MessageTooLarge { max: 1024, .. })
        ));
    }

    #[tokio::test]
    async fn test_indefinite_length_is_framing_error() {
        let mock = Builder::new().read(&[0x30, 0x80, 0x00, 0x00]).build();
        let mut framed = FramedStream::new(mock);
        let err = framed.read_frame().await.unwrap_err();
        assert!(matches!(err, Error::Ber(ref e) if e.is_framing()), "{err}");
    }

    #[tokio::test]
    async fn test_write_message() {
        let message = unbind(3);
        let mock = Builder::new().write(&message.encode()).build();
        let mut framed = FramedStream::new(mock);
        framed.write_message(&message).await.unwrap();
    }
}
