use std::io::{self, Cursor};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use super::error::StorageError;
use super::probe::{self, ImageInfo};
use super::traits::BoxReader;

/// Bytes buffered on the first attempt to decode an image header.
pub const HEAD_WINDOW: u64 = 128 * 1024;

/// Read from the front of `reader` until the image header decodes.
///
/// The window starts at [`HEAD_WINDOW`] and doubles while the header is
/// incomplete, which covers JPEG metadata segments that push the frame
/// header far into the file. The returned reader replays every consumed
/// byte before the rest of the stream.
///
/// Fails with [`StorageError::Malformed`] once the stream is exhausted, or
/// as soon as the leading bytes carry no known image signature.
pub async fn split_image_header(
    mut reader: BoxReader,
) -> Result<(ImageInfo, BoxReader), StorageError> {
    let mut head = Vec::with_capacity(8 * 1024);
    let mut window = HEAD_WINDOW;

    loop {
        let want = window - head.len() as u64;
        let read = (&mut reader).take(want).read_to_end(&mut head).await? as u64;
        let exhausted = read < want;

        match probe::inspect(&head) {
            Ok(info) => {
                let replay: BoxReader = Box::new(Cursor::new(head).chain(reader));
                return Ok((info, replay));
            }
            Err(e) if exhausted || probe::sniff(&head).is_none() => return Err(e),
            Err(_) => window = window.saturating_mul(2),
        }
    }
}

/// Counts the bytes that pass through an inner reader.
pub struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }

    /// Bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.count
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for CountingReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            self.count += (buf.filled().len() - before) as u64;
        }
        poll
    }
}
