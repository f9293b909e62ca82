//! Cancellable exponential backoff shared by the watcher and reopen loops.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub(crate) struct Backoff<'a> {
    token: &'a CancellationToken,
    max: Duration,
    current: Duration,
    retries: u32,
    max_retries: Option<u32>,
}

impl<'a> Backoff<'a> {
    pub(crate) fn new(token: &'a CancellationToken, min: Duration, max: Duration) -> Self {
        Self {
            token,
            max,
            current: min,
            retries: 0,
            max_retries: None,
        }
    }

    pub(crate) fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// True while neither the token has fired nor the retry budget is spent.
    pub(crate) fn ongoing(&self) -> bool {
        !self.token.is_cancelled() && self.max_retries.is_none_or(|max| self.retries < max)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns the delay for the current attempt and grows the next one.
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Sleeps for the next delay. Returns false if the token fired during
    /// the sleep or the retry budget is now exhausted.
    pub(crate) async fn wait(&mut self) -> bool {
        self.retries += 1;
        let delay = self.next_delay();
        tokio::select! {
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(delay) => self.ongoing(),
        }
    }
}
