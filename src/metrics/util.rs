use prometheus::proto::{LabelPair, MetricFamily, MetricType};

pub fn into_labels<K, V>(kv: impl IntoIterator<Item = (K, V)>) -> Vec<LabelPair>
where
    K: Into<String>,
    V: Into<String>,
{
    kv.into_iter()
        .map(|(k, v)| {
            let mut lp = LabelPair::default();
            lp.set_name(k.into());
            lp.set_value(v.into());
            lp
        })
        .collect()
}

pub fn gauge_sample(label_values: Vec<LabelPair>, value: f64) -> prometheus::proto::Metric {
    let mut m = prometheus::proto::Metric::default();
    m.set_label(label_values);

    let mut g = prometheus::proto::Gauge::default();
    g.set_value(value);
    m.set_gauge(g);

    m
}

pub fn family(
    name: &str,
    help: &str,
    kind: MetricType,
    samples: Vec<prometheus::proto::Metric>,
) -> MetricFamily {
    let mut mf = MetricFamily::default();
    mf.set_name(name.to_owned());
    mf.set_help(help.to_owned());
    mf.set_field_type(kind);
    mf.set_metric(samples);
    mf
}
