use crate::datasource::CommandRunner;
use crate::domain::Deadline;
use crate::metrics::harvester::LogWindow;
use anyhow::{Context, bail};

const JOURNALCTL: &str = "journalctl";

/// Reads the tail of a systemd unit's journal through `journalctl`.
pub struct Journalctl<R> {
    runner: R,
}

impl<R> Journalctl<R>
where
    R: CommandRunner,
{
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R> LogWindow for Journalctl<R>
where
    R: CommandRunner,
{
    #[tracing::instrument(level = "debug", skip(self, deadline))]
    async fn recent_lines(
        &self,
        unit: &str,
        lines: usize,
        deadline: Deadline,
    ) -> anyhow::Result<Vec<String>> {
        let count = lines.to_string();
        let output = self
            .runner
            .run(
                JOURNALCTL,
                &[
                    "--unit",
                    unit,
                    "--lines",
                    count.as_str(),
                    "--no-pager",
                    "--output",
                    "cat",
                ],
                deadline,
            )
            .await
            .with_context(|| format!("Failed to execute [{}]", JOURNALCTL))?;

        if !output.success() {
            bail!(
                "[{}] exited with status {:?}: {}",
                JOURNALCTL,
                output.code,
                output.stderr.lines().next().unwrap_or("").trim()
            );
        }

        let window = output
            .stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_owned)
            .collect::<Vec<_>>();

        tracing::debug!(lines = window.len(), "Read journal window");
        Ok(window)
    }
}
