use crate::events::Output;
use crate::types::OutputLine;
use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

/// Forward `pipe` to `output_tx` one line at a time until the pipe closes or nobody is
/// listening any more.
pub fn spawn<R>(pipe: R, output_tx: mpsc::UnboundedSender<Output>, tag: fn(OutputLine) -> Output)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = Lines::new(pipe);
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if output_tx.send(tag(line)).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    debug!(%err, "output pipe failed");
                    break;
                }
            }
        }
    });
}

/// Splits a byte stream on `\n`, `\r\n` and a lone `\r`, so progress bars that redraw
/// in place come out as one line per redraw.
struct Lines<R> {
    reader: BufReader<R>,
    pending: BytesMut,
    /// The last line ended in `\r`; a `\n` right after it belongs to the same break.
    after_cr: bool,
}

impl<R: AsyncRead + Unpin> Lines<R> {
    fn new(pipe: R) -> Self {
        Self {
            reader: BufReader::new(pipe),
            pending: BytesMut::with_capacity(4096),
            after_cr: false,
        }
    }

    async fn next_line(&mut self) -> io::Result<Option<OutputLine>> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.pending.split().freeze()));
            }

            let skip = usize::from(self.after_cr && available[0] == b'\n');
            self.after_cr = false;
            let rest = &available[skip..];
            match rest.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(end) => {
                    self.after_cr = rest[end] == b'\r';
                    self.pending.extend_from_slice(&rest[..end]);
                    self.reader.consume(skip + end + 1);
                    return Ok(Some(self.pending.split().freeze()));
                }
                None => {
                    let len = available.len();
                    self.pending.extend_from_slice(rest);
                    self.reader.consume(len);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &'static [u8]) -> Vec<String> {
        let (output_tx, mut output_rx) = mpsc::unbounded_channel();
        spawn(input, output_tx, Output::Stdout);

        let mut lines = vec![];
        while let Some(output) = output_rx.recv().await {
            assert_eq!(output.stream_name(), "stdout");
            lines.push(String::from_utf8_lossy(output.line()).into_owned());
        }
        lines
    }

    #[tokio::test]
    async fn splits_lines_and_keeps_an_unterminated_tail() {
        assert_eq!(
            collect(b"first\r\nsecond\nlast").await,
            vec!["first", "second", "last"]
        );
    }

    #[tokio::test]
    async fn carriage_returns_end_progress_lines() {
        assert_eq!(
            collect(b" 10%|#    |\r 50%|#####|\r100%|#########|\ndone\n").await,
            vec![" 10%|#    |", " 50%|#####|", "100%|#########|", "done"]
        );
    }

    /// Hands out one chunk per read, so line breaks can straddle reads.
    struct Chunked(std::collections::VecDeque<&'static [u8]>);

    impl AsyncRead for Chunked {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            if let Some(chunk) = self.0.pop_front() {
                buf.put_slice(chunk);
            }
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn crlf_split_across_reads_is_one_break() {
        let chunks = [&b"frame 1\r"[..], &b"\nframe 2\r"[..], &b"frame 3"[..]];
        let mut lines = Lines::new(Chunked(chunks.into()));
        let mut collected = vec![];
        while let Some(line) = lines.next_line().await.unwrap() {
            collected.push(String::from_utf8_lossy(&line).into_owned());
        }
        assert_eq!(collected, vec!["frame 1", "frame 2", "frame 3"]);
    }
}
