use crate::metrics::{filebeat, process};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const PRINT_CONFIG_FLAG: &str = "--print-config";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Console logging goes to stderr, stdout carries the scrape output.
    pub enable_stderr: bool,
    pub enable_log_file: bool,
    pub log_file_directory: Option<String>,
    pub level: String,
    pub directives: Vec<String>,
    pub max_log_files: usize,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            enable_stderr: true,
            enable_log_file: false,
            log_file_directory: Some("/var/log/argus/".to_owned()),
            level: "INFO".to_owned(),
            directives: vec![],
            max_log_files: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scrape {
    pub namespace: String,
    /// Upper bound for a whole scrape, in milliseconds.
    pub timeout: u64,
}

impl Default for Scrape {
    fn default() -> Self {
        Self {
            namespace: "node".to_owned(),
            timeout: Duration::from_secs(10).as_millis() as u64,
        }
    }
}

impl Scrape {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Collectors {
    pub rsyslog: process::Config,
    pub filebeat: filebeat::Config,
}

impl Collectors {
    /// Configured enable override for the collector called `name`, if any.
    pub fn enabled(&self, name: &str) -> Option<bool> {
        match name {
            "rsyslog" => self.rsyslog.enabled,
            "filebeat" => self.filebeat.enabled,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default = "Log::default")]
    pub log: Log,

    #[serde(default = "Scrape::default")]
    pub scrape: Scrape,

    #[serde(default = "Collectors::default")]
    pub collectors: Collectors,
}

impl Configuration {
    pub fn load(base_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base_path = base_path.as_ref();

        let builder = Config::builder()
            .add_source(
                config::File::from(base_path.join("config.toml"))
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::File::from(base_path.join("config.json"))
                    .format(FileFormat::Json)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix("CFG").separator("__"));

        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}

/// The first positional argument, `./` if there is none.
pub fn get_config_base_path(args: impl IntoIterator<Item = String>) -> PathBuf {
    args.into_iter()
        .skip(1)
        .find(|arg| !arg.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./"))
}

pub fn should_print_config_and_exit(args: impl IntoIterator<Item = String>) -> bool {
    args.into_iter().any(|arg| arg == PRINT_CONFIG_FLAG)
}

pub fn print_config(cfg: &Configuration) -> anyhow::Result<()> {
    println!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| (*a).to_owned()).collect()
    }

    #[test]
    fn test_defaults() -> anyhow::Result<()> {
        let cfg = Configuration::build(Config::builder())?;

        assert_eq!(cfg.scrape.namespace, "node");
        assert_eq!(cfg.scrape.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.collectors.rsyslog.process, "rsyslog");
        assert_eq!(cfg.collectors.filebeat.unit, "filebeat");
        assert_eq!(cfg.collectors.filebeat.journal_lines, 100);
        assert_eq!(cfg.collectors.enabled("rsyslog"), None);
        assert_eq!(cfg.collectors.enabled("filebeat"), None);
        Ok(())
    }

    #[test]
    fn test_partial_toml_overrides() -> anyhow::Result<()> {
        let toml = r#"
            [scrape]
            namespace = "edge"

            [log]
            level = "DEBUG"

            [collectors.rsyslog]
            enabled = false
            process = "rsyslogd"

            [collectors.filebeat]
            journal_lines = 250
        "#;

        let cfg = Configuration::build(
            Config::builder().add_source(config::File::from_str(toml, FileFormat::Toml)),
        )?;

        assert_eq!(cfg.scrape.namespace, "edge");
        assert_eq!(cfg.scrape.timeout, 10_000);
        assert_eq!(cfg.log.level, "DEBUG");
        assert!(cfg.log.enable_stderr);
        assert_eq!(cfg.collectors.enabled("rsyslog"), Some(false));
        assert_eq!(cfg.collectors.rsyslog.process, "rsyslogd");
        assert_eq!(cfg.collectors.filebeat.journal_lines, 250);
        assert_eq!(cfg.collectors.filebeat.process, "filebeat");
        Ok(())
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() -> anyhow::Result<()> {
        let cfg = Configuration::load("/definitely/not/a/config/dir")?;
        assert_eq!(cfg.scrape.namespace, "node");
        Ok(())
    }

    #[test]
    fn test_printed_config_round_trips() -> anyhow::Result<()> {
        let printed = toml::to_string_pretty(&Configuration::default())?;
        let cfg = Configuration::build(
            Config::builder().add_source(config::File::from_str(&printed, FileFormat::Toml)),
        )?;
        assert_eq!(cfg.collectors.filebeat.unit, "filebeat");
        Ok(())
    }

    #[test]
    fn test_command_line() {
        assert_eq!(get_config_base_path(args(&["argus"])), PathBuf::from("./"));
        assert_eq!(
            get_config_base_path(args(&["argus", "--print-config", "/etc/argus"])),
            PathBuf::from("/etc/argus")
        );
        assert!(should_print_config_and_exit(args(&["argus", "--print-config"])));
        assert!(!should_print_config_and_exit(args(&["argus", "/etc/argus"])));
    }
}
