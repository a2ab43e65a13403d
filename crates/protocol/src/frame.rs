//! Fixed-size reads over a byte stream.
//!
//! Peers frequently deliver a single message across several socket writes,
//! so every field read loops until the requested number of bytes has been
//! accumulated. End of stream is reported in two distinct ways: before the
//! first byte of a frame it means "no more data" and yields `None`, while
//! after a partial frame the short buffer is handed back untouched so the
//! decoder can classify the shortfall itself.

use std::collections::TryReserveError;
use std::future::poll_fn;
use std::io;
use std::pin::Pin;
use std::task::Poll;

use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt};

fn map_allocation_error(err: TryReserveError) -> io::Error {
    io::Error::new(io::ErrorKind::OutOfMemory, err)
}

/// Reads up to `size` bytes from `reader`.
///
/// Returns `Ok(None)` when the stream ends before any byte of the frame was
/// read, and `Ok(Some(buffer))` otherwise. The buffer holds exactly `size`
/// bytes unless the stream ended mid-frame, in which case it holds whatever
/// arrived. A zero-sized request returns an empty buffer without reading.
///
/// Capacity for `size` bytes is reserved once up front and only filled as
/// bytes arrive. An allocation failure surfaces as
/// [`io::ErrorKind::OutOfMemory`].
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> std::io::Result<()> {
/// let mut input: &[u8] = b"00003abc";
/// let length = protocol::read_frame(&mut input, 5).await?;
/// assert_eq!(length.as_deref(), Some(&b"00003"[..]));
///
/// let partial = protocol::read_frame(&mut input, 10).await?;
/// assert_eq!(partial.as_deref(), Some(&b"abc"[..]));
///
/// assert_eq!(protocol::read_frame(&mut input, 1).await?, None);
/// # Ok(())
/// # }
/// ```
pub async fn read_frame<R>(reader: &mut R, size: usize) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    if size == 0 {
        return Ok(Some(buffer));
    }

    buffer.try_reserve_exact(size).map_err(map_allocation_error)?;

    while buffer.len() < size {
        let remaining = (size - buffer.len()) as u64;
        match (&mut *reader).take(remaining).read_buf(&mut buffer).await {
            Ok(0) => {
                if buffer.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(buffer));
            }
            Ok(_) => {}
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }

    Ok(Some(buffer))
}

/// Reports whether more input can be consumed from `reader` without waiting.
///
/// The check polls the buffered reader exactly once. Bytes that are already
/// buffered or immediately readable yield `true`; end of stream and a read
/// that would block both yield `false`. No bytes are consumed.
pub async fn has_pending_input<R>(reader: &mut R) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    poll_fn(|cx| match Pin::new(&mut *reader).poll_fill_buf(cx) {
        Poll::Ready(Ok(buffered)) => Poll::Ready(Ok(!buffered.is_empty())),
        Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
        Poll::Pending => Poll::Ready(Ok(false)),
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::Context;

    use tokio::io::{AsyncWriteExt, BufReader, ReadBuf};

    /// Reader that hands out its data one byte per call and injects an
    /// `Interrupted` error before every byte.
    struct Trickle {
        data: Vec<u8>,
        position: usize,
        interrupt_next: bool,
    }

    impl Trickle {
        fn new(data: &[u8]) -> Self {
            Self {
                data: data.to_vec(),
                position: 0,
                interrupt_next: true,
            }
        }
    }

    impl AsyncRead for Trickle {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.interrupt_next {
                self.interrupt_next = false;
                return Poll::Ready(Err(io::ErrorKind::Interrupted.into()));
            }
            self.interrupt_next = true;
            if self.position < self.data.len() && buf.remaining() > 0 {
                let byte = self.data[self.position];
                self.position += 1;
                buf.put_slice(&[byte]);
            }
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn reads_exact_frame_and_leaves_remainder() {
        let mut input: &[u8] = b"700003./a";
        let frame = read_frame(&mut input, 1).await.unwrap();
        assert_eq!(frame.as_deref(), Some(&b"7"[..]));
        assert_eq!(input, b"00003./a");
    }

    #[tokio::test]
    async fn empty_stream_yields_none() {
        let mut input: &[u8] = b"";
        assert_eq!(read_frame(&mut input, 5).await.unwrap(), None);
    }

    #[tokio::test]
    async fn short_stream_yields_partial_buffer() {
        let mut input: &[u8] = b"000";
        let frame = read_frame(&mut input, 5).await.unwrap();
        assert_eq!(frame.as_deref(), Some(&b"000"[..]));
    }

    #[tokio::test]
    async fn large_declared_frame_holds_only_what_arrived() {
        let mut input: &[u8] = b"abc";
        let frame = read_frame(&mut input, 16 << 20).await.unwrap().unwrap();
        assert_eq!(frame, b"abc");
        assert!(frame.capacity() >= 16 << 20);
    }

    #[tokio::test]
    async fn frame_never_reads_past_its_size() {
        let mut reader = BufReader::new(&b"0000000011fileContent"[..]);
        let length = read_frame(&mut reader, 10).await.unwrap();
        assert_eq!(length.as_deref(), Some(&b"0000000011"[..]));
        assert!(has_pending_input(&mut reader).await.unwrap());
    }

    #[tokio::test]
    async fn zero_sized_request_does_not_consume_input() {
        let mut input: &[u8] = b"abc";
        let frame = read_frame(&mut input, 0).await.unwrap();
        assert_eq!(frame, Some(Vec::new()));
        assert_eq!(input, b"abc");
    }

    #[tokio::test]
    async fn fragmented_delivery_is_reassembled() {
        let mut reader = Trickle::new(b"0000000011fileContent");
        let length = read_frame(&mut reader, 10).await.unwrap();
        assert_eq!(length.as_deref(), Some(&b"0000000011"[..]));
        let content = read_frame(&mut reader, 11).await.unwrap();
        assert_eq!(content.as_deref(), Some(&b"fileContent"[..]));
        assert_eq!(read_frame(&mut reader, 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn frames_split_across_socket_writes_are_reassembled() {
        let (mut client, mut server) = tokio::io::duplex(4);
        let writer = tokio::spawn(async move {
            for chunk in [&b"80"[..], b"00", b"07./a.", b"txt"] {
                client.write_all(chunk).await.unwrap();
                tokio::task::yield_now().await;
            }
        });

        let frame = read_frame(&mut server, 13).await.unwrap();
        assert_eq!(frame.as_deref(), Some(&b"800007./a.txt"[..]));
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn pending_input_reports_buffered_bytes() {
        let mut reader = BufReader::new(&b"7"[..]);
        assert!(has_pending_input(&mut reader).await.unwrap());
        // The check must not consume anything.
        assert_eq!(read_frame(&mut reader, 1).await.unwrap().as_deref(), Some(&b"7"[..]));
        assert!(!has_pending_input(&mut reader).await.unwrap());
    }

    #[tokio::test]
    async fn pending_input_does_not_wait_for_an_idle_peer() {
        let (_client, server) = tokio::io::duplex(16);
        let mut reader = BufReader::new(server);
        assert!(!has_pending_input(&mut reader).await.unwrap());
    }
}
