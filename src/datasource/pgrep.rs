use crate::datasource::CommandRunner;
use crate::domain::Deadline;
use crate::metrics::process::ProcessTable;
use anyhow::{Context, anyhow};

const PGREP: &str = "pgrep";

/// Queries the process table through `pgrep --exact`.
pub struct Pgrep<R> {
    runner: R,
}

impl<R> Pgrep<R>
where
    R: CommandRunner,
{
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R> ProcessTable for Pgrep<R>
where
    R: CommandRunner,
{
    #[tracing::instrument(level = "debug", skip(self, deadline))]
    async fn is_running(&self, name: &str, deadline: Deadline) -> anyhow::Result<bool> {
        let output = self
            .runner
            .run(PGREP, &["--exact", name], deadline)
            .await
            .with_context(|| format!("Failed to execute [{}]", PGREP))?;

        // pgrep: 0 = matched, 1 = nothing matched, 2 = syntax error, 3 = fatal error
        match output.code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            code => Err(anyhow!(
                "[{}] exited with status {:?}: {}",
                PGREP,
                code,
                output.stderr.trim()
            )),
        }
    }
}
