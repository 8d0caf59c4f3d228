use crate::domain::{Collector, Deadline};
use crate::registry::CollectorContext;
use crate::sink::{Metric, MetricDescriptor, Sink};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, Span};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overrides the collector's default-enabled state when set.
    pub enabled: Option<bool>,
    pub process: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: None,
            process: "rsyslog".to_owned(),
        }
    }
}

pub trait ProcessTable: Send + Sync {
    /// Returns whether a process whose command name is exactly `name` is running.
    fn is_running(
        &self,
        name: &str,
        deadline: Deadline,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Up,
    Down,
    /// The process table could not be queried.
    Unknown,
}

impl Liveness {
    pub fn value(self) -> f64 {
        match self {
            Liveness::Up => 1.0,
            Liveness::Down | Liveness::Unknown => 0.0,
        }
    }
}

pub async fn probe<P>(table: &P, process: &str, deadline: Deadline) -> Liveness
where
    P: ProcessTable,
{
    match table.is_running(process, deadline).await {
        Ok(true) => Liveness::Up,
        Ok(false) => {
            tracing::debug!(process, "Process is not running");
            Liveness::Down
        }
        Err(error) => {
            tracing::warn!(
                process,
                error = ?error,
                "Could not determine whether the process is running"
            );
            Liveness::Unknown
        }
    }
}

pub fn up_descriptor(ctx: &CollectorContext, process: &str) -> anyhow::Result<MetricDescriptor> {
    MetricDescriptor::new(
        ctx.namespace(),
        ctx.name(),
        "up",
        &format!("Value is 1 if {} process is 'up', 0 otherwise.", process),
        &["process_name"],
    )
}

/// Reports whether a single named process is running.
pub struct ProcessCollector<P> {
    process: String,
    up: MetricDescriptor,
    table: P,
    span: Span,
}

impl<P> ProcessCollector<P>
where
    P: ProcessTable + 'static,
{
    pub fn new(ctx: &CollectorContext, config: &Config, table: P) -> anyhow::Result<Self> {
        Ok(Self {
            process: config.process.clone(),
            up: up_descriptor(ctx, &config.process)?,
            table,
            span: ctx.span().clone(),
        })
    }
}

#[async_trait::async_trait]
impl<P> Collector for ProcessCollector<P>
where
    P: ProcessTable + 'static,
{
    async fn update(&self, sink: &Sink, deadline: Deadline) -> anyhow::Result<()> {
        async {
            let liveness = probe(&self.table, &self.process, deadline).await;
            sink.send(Metric::gauge(&self.up, liveness.value(), &[self.process.as_str()])?)
        }
        .instrument(self.span.clone())
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::ScriptedProcessTable;
    use crate::sink;
    use std::time::Duration;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(1))
    }

    fn collector(table: ScriptedProcessTable) -> ProcessCollector<ScriptedProcessTable> {
        let ctx = CollectorContext::new("rsyslog", "node");
        ProcessCollector::new(&ctx, &Config::default(), table).unwrap()
    }

    async fn update_once(collector: &ProcessCollector<ScriptedProcessTable>) -> Vec<Metric> {
        let (sink, receiver) = sink::channel();
        collector.update(&sink, deadline()).await.unwrap();
        drop(sink);
        receiver.drain().await
    }

    #[tokio::test]
    async fn test_running_process_is_up() {
        let metrics = update_once(&collector(ScriptedProcessTable::always(true))).await;

        assert_eq!(metrics.len(), 1);
        let up = &metrics[0];
        assert_eq!(up.desc().fq_name(), "node_rsyslog_up");
        assert_eq!(
            up.desc().help(),
            "Value is 1 if rsyslog process is 'up', 0 otherwise."
        );
        assert_eq!(up.label("process_name"), Some("rsyslog"));
        assert_eq!(up.value(), 1.0);
    }

    #[tokio::test]
    async fn test_missing_process_is_down() {
        let metrics = update_once(&collector(ScriptedProcessTable::always(false))).await;

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].label("process_name"), Some("rsyslog"));
        assert_eq!(metrics[0].value(), 0.0);
    }

    #[tokio::test]
    async fn test_failed_query_reports_zero_without_error() {
        let table = ScriptedProcessTable::new([Err(anyhow::anyhow!("permission denied"))]);
        let metrics = update_once(&collector(table)).await;

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].value(), 0.0);
    }

    #[tokio::test]
    async fn test_every_update_queries_the_process_table() {
        let table = ScriptedProcessTable::new([Ok(true), Ok(false), Ok(true)]);
        let collector = collector(table);

        let values = [
            update_once(&collector).await[0].value(),
            update_once(&collector).await[0].value(),
            update_once(&collector).await[0].value(),
        ];
        assert_eq!(values, [1.0, 0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_probe_distinguishes_unknown() {
        let table = ScriptedProcessTable::new([Ok(true), Ok(false), Err(anyhow::anyhow!("boom"))]);

        assert_eq!(probe(&table, "x", deadline()).await, Liveness::Up);
        assert_eq!(probe(&table, "x", deadline()).await, Liveness::Down);
        assert_eq!(probe(&table, "x", deadline()).await, Liveness::Unknown);
        assert_eq!(Liveness::Unknown.value(), Liveness::Down.value());
    }

    #[tokio::test]
    async fn test_closed_sink_fails_the_update() {
        let (sink, receiver) = sink::channel();
        drop(receiver);

        let collector = collector(ScriptedProcessTable::always(true));
        assert!(collector.update(&sink, deadline()).await.is_err());
    }
}
