use crate::core::forwarder::{ForwardStats, Forwarder};
use crate::domain::ports::{ConfigProvider, Submitter};
use crate::utils::error::{BridgeError, Result};
use std::future::Future;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdout, Command};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtlSettings {
    pub command: String,
    pub frequency: u64,
    pub extra_args: Vec<String>,
    pub restart_delay: Duration,
}

impl RtlSettings {
    /// `-f <frequency> -F json` followed by any extra arguments.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            self.frequency.to_string(),
            "-F".to_string(),
            "json".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// A running rtl_433 child. Killed when dropped.
pub struct RtlProcess {
    child: Child,
    stdout: Option<ChildStdout>,
}

impl RtlProcess {
    pub fn spawn(settings: &RtlSettings) -> Result<Self> {
        let mut child = Command::new(&settings.command)
            .args(settings.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BridgeError::ProcessError {
                message: format!("failed to start {}: {}", settings.command, e),
            })?;

        let stdout = child.stdout.take();
        tracing::info!(
            "Started {} {} (pid {:?})",
            settings.command,
            settings.args().join(" "),
            child.id()
        );
        Ok(Self { child, stdout })
    }

    pub fn take_stdout(&mut self) -> Result<BufReader<ChildStdout>> {
        self.stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| BridgeError::ProcessError {
                message: "rtl_433 stdout is not available".to_string(),
            })
    }

    pub async fn wait(&mut self) -> Result<ExitStatus> {
        Ok(self.child.wait().await?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorReport {
    pub runs: u64,
    pub stats: ForwardStats,
}

/// Keeps rtl_433 running: whenever it exits or its stream fails, wait and start it again.
pub struct RtlSupervisor {
    settings: RtlSettings,
}

impl RtlSupervisor {
    pub fn new(settings: RtlSettings) -> Self {
        Self { settings }
    }

    pub async fn run_until<C, S, F>(&self, forwarder: &Forwarder<C, S>, shutdown: F) -> SupervisorReport
    where
        C: ConfigProvider,
        S: Submitter,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut report = SupervisorReport::default();

        loop {
            report.runs += 1;
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping rtl_433");
                    break;
                }
                outcome = self.run_once(forwarder) => match outcome {
                    Ok(stats) => {
                        report.stats += stats;
                        tracing::error!("rtl_433 stopped producing data, restarting");
                    }
                    Err(e) => {
                        tracing::error!("Something went wrong when forwarding RTL data: {}", e);
                        tracing::error!("💡 {}", e.recovery_suggestion());
                    }
                },
            }

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(self.settings.restart_delay) => {}
            }
        }

        report
    }

    async fn run_once<C: ConfigProvider, S: Submitter>(&self, forwarder: &Forwarder<C, S>) -> Result<ForwardStats> {
        let mut process = RtlProcess::spawn(&self.settings)?;
        let stdout = process.take_stdout()?;
        let stats = forwarder.forward_from_stream(stdout).await?;
        let status = process.wait().await?;
        tracing::warn!("rtl_433 exited with {}", status);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(command: &str) -> RtlSettings {
        RtlSettings {
            command: command.to_string(),
            frequency: 915_000_000,
            extra_args: vec!["-R".to_string(), "142".to_string()],
            restart_delay: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_args_include_frequency_and_json_output() {
        assert_eq!(
            settings("rtl_433").args(),
            vec!["-f", "915000000", "-F", "json", "-R", "142"]
        );
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_is_process_error() {
        let result = RtlProcess::spawn(&settings("/nonexistent/rtl_433"));
        assert!(matches!(result, Err(BridgeError::ProcessError { .. })));
    }
}
