use crate::bootstrap::NamedCollector;
use crate::domain::Deadline;
use crate::sink;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use prometheus::proto::MetricFamily;
use std::time::Duration;
use tokio::time::Instant;

/// Runs one scrape: every collector is updated concurrently against a shared sink,
/// bounded by `timeout`. A failing or slow collector is logged and does not affect
/// the others.
#[tracing::instrument(level = "debug", skip_all)]
pub async fn scrape(collectors: &[NamedCollector], timeout: Duration) -> Vec<MetricFamily> {
    let deadline = Deadline::after(timeout);
    let (sink, receiver) = sink::channel();

    let mut futures = FuturesUnordered::new();
    for named in collectors {
        let sink = &sink;
        futures.push(async move {
            let started = Instant::now();
            let result = tokio::time::timeout_at(
                deadline.instant(),
                named.collector.update(sink, deadline),
            )
            .await;

            (named.name.as_str(), started.elapsed(), result)
        });
    }

    while let Some((name, elapsed, result)) = futures.next().await {
        match result {
            Ok(Ok(())) => {
                tracing::debug!(collector = name, ?elapsed, "Collector finished");
            }
            Ok(Err(error)) => {
                tracing::error!(collector = name, ?elapsed, ?error, "A metrics collector failed");
            }
            Err(_) => {
                tracing::error!(collector = name, ?elapsed, "A metrics collector timed out");
            }
        }
    }

    drop(futures);
    drop(sink);

    receiver.gather().await
}
