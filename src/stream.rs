//! Stream adapter over a [`Tailer`].

use crate::error::{Error, Result};
use crate::tailer::{Line, Tailer};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A stream of lines from a tailed file.
///
/// The stream is driven by the task that polls it; nothing is spawned.
/// Decode errors are yielded and reading continues; any other error,
/// including [`Error::Cancelled`], is yielded once and ends the stream.
/// A compressed file ends the stream once it has been read.
pub struct LineStream {
    tailer: Arc<Tailer>,
    inner: BoxStream<'static, Result<Line>>,
}

impl LineStream {
    pub(crate) fn new(tailer: Tailer) -> Self {
        let tailer = Arc::new(tailer);
        let inner = stream::unfold(Some(Arc::clone(&tailer)), |state| async move {
            let tailer = state?;
            match tailer.next_line().await {
                Ok(line) => Some((Ok(line), Some(tailer))),
                Err(e @ Error::Decode { .. }) => Some((Err(e), Some(tailer))),
                Err(Error::EndOfInput) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
        .boxed();

        Self { tailer, inner }
    }

    /// The underlying tailer, e.g. to [`stop`](Tailer::stop) it from
    /// another task or to read its offset.
    pub fn tailer(&self) -> Arc<Tailer> {
        Arc::clone(&self.tailer)
    }
}

impl Drop for LineStream {
    fn drop(&mut self) {
        // Wake up anything still waiting on the file.
        self.tailer.cancel();
    }
}

impl Stream for LineStream {
    type Item = Result<Line>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
