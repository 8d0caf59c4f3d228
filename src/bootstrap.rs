use crate::config::Configuration;
use crate::datasource::TokioCommandRunner;
use crate::datasource::journald::Journalctl;
use crate::datasource::pgrep::Pgrep;
use crate::domain::Collector;
use crate::metrics::filebeat::FilebeatCollector;
use crate::metrics::process::ProcessCollector;
use crate::registry::{CollectorContext, CollectorRegistry};

pub const RSYSLOG: &str = "rsyslog";
pub const FILEBEAT: &str = "filebeat";

/// A constructed collector together with the name it was registered under.
pub struct NamedCollector {
    pub name: String,
    pub collector: Box<dyn Collector>,
}

/// Registers every collector this binary ships with.
pub fn default_registry(config: &Configuration) -> anyhow::Result<CollectorRegistry> {
    let mut registry = CollectorRegistry::new();

    let rsyslog = config.collectors.rsyslog.clone();
    registry.register(RSYSLOG, true, move |ctx: &CollectorContext| {
        let processes = Pgrep::new(TokioCommandRunner::new());
        let collector = ProcessCollector::new(ctx, &rsyslog, processes)?;
        Ok(Box::new(collector) as Box<dyn Collector>)
    })?;

    let filebeat = config.collectors.filebeat.clone();
    registry.register(FILEBEAT, true, move |ctx: &CollectorContext| {
        let processes = Pgrep::new(TokioCommandRunner::new());
        let journal = Journalctl::new(TokioCommandRunner::new());
        let collector = FilebeatCollector::new(ctx, &filebeat, processes, journal)?;
        Ok(Box::new(collector) as Box<dyn Collector>)
    })?;

    Ok(registry)
}

/// Builds every collector that is enabled, either explicitly in the configuration
/// or by its registration default.
pub fn init_collectors(
    config: &Configuration,
    registry: &CollectorRegistry,
) -> anyhow::Result<Vec<NamedCollector>> {
    let mut collectors = vec![];

    for registration in registry.registrations() {
        let enabled = config
            .collectors
            .enabled(registration.name())
            .unwrap_or(registration.default_enabled());

        if !enabled {
            tracing::info!(collector = registration.name(), "Collector is disabled");
            continue;
        }

        let collector = registration.build(&config.scrape.namespace)?;
        tracing::info!(collector = registration.name(), "Collector is enabled");

        collectors.push(NamedCollector {
            name: registration.name().to_owned(),
            collector,
        });
    }

    Ok(collectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() -> anyhow::Result<()> {
        let registry = default_registry(&Configuration::default())?;

        let names = registry.registrations().map(|r| r.name()).collect::<Vec<_>>();
        assert_eq!(names, vec![RSYSLOG, FILEBEAT]);
        assert!(registry.registrations().all(|r| r.default_enabled()));
        Ok(())
    }

    #[test]
    fn test_all_collectors_enabled_by_default() -> anyhow::Result<()> {
        let config = Configuration::default();
        let registry = default_registry(&config)?;

        let collectors = init_collectors(&config, &registry)?;
        let names = collectors.iter().map(|c| c.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec![RSYSLOG, FILEBEAT]);
        Ok(())
    }

    #[test]
    fn test_config_disables_collector() -> anyhow::Result<()> {
        let mut config = Configuration::default();
        config.collectors.rsyslog.enabled = Some(false);
        let registry = default_registry(&config)?;

        let collectors = init_collectors(&config, &registry)?;
        let names = collectors.iter().map(|c| c.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec![FILEBEAT]);
        Ok(())
    }

    #[test]
    fn test_invalid_namespace_fails_construction() -> anyhow::Result<()> {
        let mut config = Configuration::default();
        config.scrape.namespace = "not a namespace".to_owned();
        let registry = default_registry(&config)?;

        assert!(init_collectors(&config, &registry).is_err());
        Ok(())
    }
}
