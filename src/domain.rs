use crate::sink::Sink;
use std::time::Duration;
use tokio::time::Instant;

/// A single probe that is invoked once per scrape and publishes its
/// measurements into the shared [`Sink`].
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    async fn update(&self, sink: &Sink, deadline: Deadline) -> anyhow::Result<()>;
}

/// Point in time after which a scrape's external work must be abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }

    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}
