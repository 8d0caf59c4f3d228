use crate::domain::{Collector, Deadline};
use crate::metrics::harvester::{self, LogWindow};
use crate::metrics::process::{self, ProcessTable};
use crate::registry::CollectorContext;
use crate::sink::{Metric, MetricDescriptor, Sink};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, Span};

pub const DEFAULT_JOURNAL_LINES: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enabled: Option<bool>,
    pub process: String,
    /// systemd unit whose journal carries the monitoring reports
    pub unit: String,
    pub journal_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: None,
            process: "filebeat".to_owned(),
            unit: "filebeat".to_owned(),
            journal_lines: DEFAULT_JOURNAL_LINES,
        }
    }
}

/// Reports whether filebeat is running and how many harvesters it has open.
pub struct FilebeatCollector<P, L> {
    config: Config,
    up: MetricDescriptor,
    open_files: MetricDescriptor,
    processes: P,
    journal: L,
    span: Span,
}

impl<P, L> FilebeatCollector<P, L>
where
    P: ProcessTable + 'static,
    L: LogWindow + 'static,
{
    pub fn new(
        ctx: &CollectorContext,
        config: &Config,
        processes: P,
        journal: L,
    ) -> anyhow::Result<Self> {
        let open_files = MetricDescriptor::new(
            ctx.namespace(),
            ctx.name(),
            "openfiles",
            "Filebeat monitoring log harvester openfiles running.",
            &[],
        )?;

        Ok(Self {
            config: config.clone(),
            up: process::up_descriptor(ctx, &config.process)?,
            open_files,
            processes,
            journal,
            span: ctx.span().clone(),
        })
    }
}

#[async_trait::async_trait]
impl<P, L> Collector for FilebeatCollector<P, L>
where
    P: ProcessTable + 'static,
    L: LogWindow + 'static,
{
    async fn update(&self, sink: &Sink, deadline: Deadline) -> anyhow::Result<()> {
        async {
            let name = self.config.process.as_str();
            let liveness = process::probe(&self.processes, name, deadline).await;
            sink.send(Metric::gauge(&self.up, liveness.value(), &[name])?)?;

            let open_files = harvester::open_files(
                &self.journal,
                &self.config.unit,
                self.config.journal_lines,
                deadline,
            )
            .await;
            sink.send(Metric::gauge(&self.open_files, open_files, &[])?)
        }
        .instrument(self.span.clone())
        .await
    }
}
