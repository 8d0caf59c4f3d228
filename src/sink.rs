//! The channel collectors publish their measurements into.
//!
//! Any number of collectors may hold a reference to the same [`Sink`] and send
//! concurrently. Only the scheduler owns the [`SinkReceiver`], and only the
//! scheduler decides when the channel is drained.

use crate::metrics::util::{family, gauge_sample, into_labels};
use anyhow::{Context, bail};
use prometheus::Opts;
use prometheus::core::{Desc, Describer};
use prometheus::proto::{MetricFamily, MetricType};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Name, help text and label names of a metric.
///
/// Two descriptors are the same metric if they share the fully-qualified name.
#[derive(Debug, Clone)]
pub struct MetricDescriptor {
    desc: Arc<Desc>,
}

impl MetricDescriptor {
    pub fn new(
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> anyhow::Result<Self> {
        let desc = Opts::new(name, help)
            .namespace(namespace)
            .subsystem(subsystem)
            .variable_labels(label_names.iter().map(|l| (*l).to_owned()).collect())
            .describe()
            .with_context(|| format!("Invalid metric descriptor [{}_{}]", subsystem, name))?;

        Ok(Self {
            desc: Arc::new(desc),
        })
    }

    pub fn fq_name(&self) -> &str {
        &self.desc.fq_name
    }

    pub fn help(&self) -> &str {
        &self.desc.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.desc.variable_labels
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Gauge,
}

impl ValueKind {
    fn metric_type(self) -> MetricType {
        match self {
            ValueKind::Gauge => MetricType::GAUGE,
        }
    }
}

/// A single measurement produced by a collector.
#[derive(Debug, Clone)]
pub struct Metric {
    desc: MetricDescriptor,
    kind: ValueKind,
    value: f64,
    label_values: Vec<String>,
}

impl Metric {
    pub fn gauge(
        desc: &MetricDescriptor,
        value: f64,
        label_values: &[&str],
    ) -> anyhow::Result<Self> {
        if label_values.len() != desc.label_names().len() {
            bail!(
                "Metric [{}] expects {} label values, got {}",
                desc.fq_name(),
                desc.label_names().len(),
                label_values.len()
            );
        }

        Ok(Self {
            desc: desc.clone(),
            kind: ValueKind::Gauge,
            value,
            label_values: label_values.iter().map(|v| (*v).to_owned()).collect(),
        })
    }

    pub fn desc(&self) -> &MetricDescriptor {
        &self.desc
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// Returns the value of the label called `name`, if the descriptor has one.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .label_names()
            .iter()
            .position(|l| l == name)
            .map(|idx| self.label_values[idx].as_str())
    }
}

/// Creates a connected sink/receiver pair.
pub fn channel() -> (Sink, SinkReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Sink { tx }, SinkReceiver { rx })
}

/// Producer side of the metrics channel. Cheap to clone and safe to share across
/// tasks and threads.
#[derive(Debug, Clone)]
pub struct Sink {
    tx: mpsc::UnboundedSender<Metric>,
}

impl Sink {
    /// Publishes a metric. Fails only if the consumer has gone away, in which case
    /// nothing the collector produces can be observed any more.
    pub fn send(&self, metric: Metric) -> anyhow::Result<()> {
        self.tx.send(metric).map_err(|e| {
            anyhow::anyhow!("Metrics sink is closed, dropping [{}]", e.0.desc.fq_name())
        })
    }
}

#[derive(Debug)]
pub struct SinkReceiver {
    rx: mpsc::UnboundedReceiver<Metric>,
}

impl SinkReceiver {
    /// Takes whatever has been published so far without waiting for producers.
    pub fn try_drain(&mut self) -> Vec<Metric> {
        let mut metrics = Vec::new();
        while let Ok(metric) = self.rx.try_recv() {
            metrics.push(metric);
        }
        metrics
    }

    /// Waits until every [`Sink`] clone has been dropped and returns all metrics.
    pub async fn drain(mut self) -> Vec<Metric> {
        let mut metrics = Vec::new();
        while let Some(metric) = self.rx.recv().await {
            metrics.push(metric);
        }
        metrics
    }

    /// Like [`SinkReceiver::drain`], but groups the metrics into families.
    pub async fn gather(self) -> Vec<MetricFamily> {
        into_families(self.drain().await)
    }
}

/// Groups metrics by fully-qualified name. Families come out sorted by name.
///
/// A metric whose label names disagree with the first metric seen under the same
/// name is dropped.
pub fn into_families(metrics: Vec<Metric>) -> Vec<MetricFamily> {
    let mut grouped: BTreeMap<String, (MetricDescriptor, ValueKind, Vec<_>)> = BTreeMap::new();

    for metric in metrics {
        let name = metric.desc.fq_name().to_owned();
        let (desc, kind, samples) = grouped
            .entry(name)
            .or_insert_with(|| (metric.desc.clone(), metric.kind, Vec::new()));

        if desc.label_names() != metric.desc.label_names() || *kind != metric.kind {
            tracing::error!(
                metric = %desc.fq_name(),
                expected = ?desc.label_names(),
                actual = ?metric.desc.label_names(),
                "Conflicting descriptors for the same metric name, dropping sample"
            );
            continue;
        }

        let labels = into_labels(
            metric
                .desc
                .label_names()
                .iter()
                .cloned()
                .zip(metric.label_values),
        );

        samples.push(gauge_sample(labels, metric.value));
    }

    grouped
        .into_values()
        .map(|(desc, kind, samples)| {
            family(desc.fq_name(), desc.help(), kind.metric_type(), samples)
        })
        .collect()
}
