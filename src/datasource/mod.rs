use crate::domain::Deadline;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::process::Command;

pub mod journald;
pub mod pgrep;

/// Captured result of an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        deadline: Deadline,
    ) -> impl Future<Output = std::io::Result<CommandOutput>> + Send;
}

pub struct TokioCommandRunner {}

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        deadline: Deadline,
    ) -> std::io::Result<CommandOutput> {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);
        let child = command.output();

        // the child is killed when the output future is dropped on timeout
        let output = tokio::time::timeout_at(deadline.instant(), child)
            .await
            .map_err(|_| {
                std::io::Error::new(
                    ErrorKind::TimedOut,
                    format!("[{}] did not finish before the scrape deadline", program),
                )
            })??;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays canned command results in order and records every invocation.
    #[derive(Default)]
    pub struct HardcodedRunner {
        responses: Mutex<VecDeque<std::io::Result<CommandOutput>>>,
        invocations: Mutex<Vec<Vec<String>>>,
    }

    impl HardcodedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn exit(self, code: i32, stdout: &str, stderr: &str) -> Self {
            self.respond(Ok(CommandOutput {
                code: Some(code),
                stdout: stdout.to_owned(),
                stderr: stderr.to_owned(),
            }))
        }

        pub fn fail(self, kind: ErrorKind) -> Self {
            self.respond(Err(std::io::Error::from(kind)))
        }

        pub fn respond(self, response: std::io::Result<CommandOutput>) -> Self {
            self.responses.lock().unwrap().push_back(response);
            self
        }

        pub fn invocations(&self) -> Vec<Vec<String>> {
            self.invocations.lock().unwrap().clone()
        }
    }

    impl CommandRunner for HardcodedRunner {
        fn run(
            &self,
            program: &str,
            args: &[&str],
            _: Deadline,
        ) -> impl Future<Output = std::io::Result<CommandOutput>> + Send {
            let mut invocation = vec![program.to_owned()];
            invocation.extend(args.iter().map(|a| (*a).to_owned()));
            self.invocations.lock().unwrap().push(invocation);

            let response = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(std::io::Error::from(ErrorKind::NotFound)));

            async move { response }
        }
    }

    #[tokio::test]
    async fn test_tokio_runner_captures_output() -> anyhow::Result<()> {
        let runner = TokioCommandRunner::new();
        let deadline = Deadline::after(Duration::from_secs(10));

        let output = runner.run("sh", &["-c", "echo out; echo err >&2; exit 3"], deadline).await?;
        assert_eq!(output.code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        Ok(())
    }

    #[tokio::test]
    async fn test_tokio_runner_missing_program() {
        let runner = TokioCommandRunner::new();
        let deadline = Deadline::after(Duration::from_secs(10));

        let result = runner.run("definitely-not-a-real-binary-4711", &[], deadline).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_tokio_runner_honours_deadline() {
        let runner = TokioCommandRunner::new();
        let deadline = Deadline::after(Duration::from_millis(100));

        let result = runner.run("sleep", &["5"], deadline).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::TimedOut);
    }
}
