//! Per-connection stream reader.
//!
//! [`MessageStream`] owns the connection buffer. Each poll reads whatever
//! bytes are available, runs the partitioner over them until it needs more
//! data, and yields one [`Message`] per complete frame in arrival order.
//!
//! The stream ends cleanly when the source closes on a frame boundary. A
//! [`CodecError`] item is terminal: the framing error is unrecoverable, and
//! after a [`CodecError::Eof`] the trailing bytes have already been
//! discarded.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use crate::{
    codec::{CodecError, FrameDecoder},
    message::{Message, StreamId},
    partition::Partitioner,
};

/// Lazy sequence of messages read from one byte source.
#[derive(Debug)]
pub struct MessageStream<R> {
    frames: FramedRead<R, FrameDecoder>,
    stream: StreamId,
}

/// Read `source` into messages tagged with `stream`.
///
/// # Examples
///
/// ```
/// use futures::StreamExt;
/// use relayframe::{Partitioner, StreamId, pull};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source: &[u8] = b"one\ntwo\n";
/// let partitioner = Partitioner::delimiter(b"\n".to_vec()).expect("non-empty delimiter");
/// let mut messages = pull(source, partitioner, StreamId::from("logs"));
/// let first = messages.next().await.expect("message").expect("well formed");
/// assert_eq!(first.payload().as_ref(), b"one\n");
/// assert_eq!(first.stream().as_str(), "logs");
/// # }
/// ```
pub fn pull<R>(source: R, partitioner: Partitioner, stream: StreamId) -> MessageStream<R>
where
    R: AsyncRead + Unpin,
{
    MessageStream::new(source, partitioner, stream)
}

impl<R> MessageStream<R>
where
    R: AsyncRead + Unpin,
{
    #[must_use]
    pub fn new(source: R, partitioner: Partitioner, stream: StreamId) -> Self {
        Self {
            frames: FramedRead::new(source, FrameDecoder::new(partitioner)),
            stream,
        }
    }

    /// Bytes read from the source that are not yet part of a message.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.frames.read_buffer().len() }

    /// The routing key attached to every message.
    #[must_use]
    pub fn stream(&self) -> &StreamId { &self.stream }

    /// Recover the byte source, dropping any buffered bytes.
    #[must_use]
    pub fn into_inner(self) -> R { self.frames.into_inner() }
}

impl<R> Stream for MessageStream<R>
where
    R: AsyncRead + Unpin,
{
    type Item = Result<Message, CodecError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let stream = &this.stream;
        Pin::new(&mut this.frames).poll_next(cx).map(|item| {
            item.map(|frame| frame.map(|f| Message::new(f.into_bytes(), stream.clone())))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;
    use futures::{StreamExt, stream};
    use rstest::rstest;
    use tokio_util::io::StreamReader;

    use super::*;
    use crate::{codec::EofError, partition::LengthFormat};

    /// A byte source delivering `chunks` as separate reads.
    fn chunked(chunks: Vec<&'static [u8]>) -> impl AsyncRead + Unpin {
        StreamReader::new(stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<_, io::Error>(Bytes::from_static(chunk))),
        ))
    }

    async fn collect(
        source: impl AsyncRead + Unpin,
        partitioner: Partitioner,
    ) -> Vec<Result<Message, CodecError>> {
        pull(source, partitioner, StreamId::from("test")).collect().await
    }

    #[tokio::test]
    async fn messages_follow_frame_order_across_reads() {
        let source = chunked(vec![
            b"al".as_slice(),
            b"pha\nbe".as_slice(),
            b"ta\n".as_slice(),
            b"gamma\n".as_slice(),
        ]);
        let partitioner = Partitioner::delimiter(b"\n".to_vec()).expect("non-empty delimiter");
        let payloads: Vec<_> = collect(source, partitioner)
            .await
            .into_iter()
            .map(|m| m.expect("well formed").payload().clone())
            .collect();
        assert_eq!(payloads, vec![
            Bytes::from_static(b"alpha\n"),
            Bytes::from_static(b"beta\n"),
            Bytes::from_static(b"gamma\n"),
        ]);
    }

    #[rstest]
    #[case(vec![b"abcdef".as_slice()], 2, 0)]
    #[case(vec![b"abc".as_slice(), b"defg".as_slice()], 2, 1)]
    #[case(vec![b"ab".as_slice()], 0, 2)]
    #[tokio::test]
    async fn fixed_frames_discard_the_trailing_fragment(
        #[case] chunks: Vec<&'static [u8]>,
        #[case] whole: usize,
        #[case] remainder: usize,
    ) {
        let partitioner = Partitioner::fixed(3).expect("non-zero size");
        let items = collect(chunked(chunks), partitioner).await;

        let messages = items.iter().filter(|item| item.is_ok()).count();
        assert_eq!(messages, whole);
        match items.last() {
            Some(Err(CodecError::Eof(EofError::TrailingData { bytes }))) => {
                assert_eq!(*bytes, remainder);
            }
            _ => assert_eq!(remainder, 0),
        }
    }

    #[tokio::test]
    async fn malformed_frame_ends_the_stream() {
        let mut wire = 2_u32.to_le_bytes().to_vec();
        wire.extend_from_slice(b"ok");
        wire.extend_from_slice(&u32::MAX.to_le_bytes());
        wire.extend_from_slice(b"never read");
        let partitioner = Partitioner::binary(0, LengthFormat::u32_le()).with_max_message_size(64);

        let mut messages = pull(wire.as_slice(), partitioner, StreamId::from("test"));
        let first = messages.next().await.expect("item").expect("well formed");
        assert_eq!(first.payload().as_ref(), &[2, 0, 0, 0, b'o', b'k']);
        let err = messages.next().await.expect("item").expect_err("malformed");
        assert!(err.is_malformed());
    }

    #[tokio::test]
    async fn buffered_len_reports_unconsumed_bytes() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut messages = pull(
            reader,
            Partitioner::delimiter(b"\n".to_vec()).expect("non-empty delimiter"),
            StreamId::from("t"),
        );
        tokio::io::AsyncWriteExt::write_all(&mut writer, b"done\npartial")
            .await
            .expect("write");
        let first = messages.next().await.expect("item").expect("well formed");
        assert_eq!(first.payload().as_ref(), b"done\n");
        assert_eq!(messages.buffered_len(), b"partial".len());
    }
}
