//! Source formatters.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::error::FormatError;
use crate::config::FormatterConfig;

/// Formats source text after id injection.
#[async_trait]
pub trait Formatter: Send + Sync {
    async fn format(&self, path: &str, content: &str) -> Result<String, FormatError>;
}

/// Returns content unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityFormatter;

#[async_trait]
impl Formatter for IdentityFormatter {
    async fn format(&self, _path: &str, content: &str) -> Result<String, FormatError> {
        Ok(content.to_string())
    }
}

/// Pipes content through an external program (stdin → stdout).
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandFormatter {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &FormatterConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn args_for(&self, path: &str) -> Vec<String> {
        self.args.iter().map(|a| a.replace("{path}", path)).collect()
    }

    async fn run(&self, path: &str, content: &str) -> Result<String, FormatError> {
        let mut child = Command::new(&self.command)
            .args(self.args_for(path))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FormatError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A formatter may exit before draining stdin; its status says why.
            if let Err(e) = stdin.write_all(content.as_bytes()).await
                && e.kind() != std::io::ErrorKind::BrokenPipe
            {
                return Err(e.into());
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(FormatError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        String::from_utf8(output.stdout).map_err(|_| FormatError::InvalidOutput)
    }
}

#[async_trait]
impl Formatter for CommandFormatter {
    #[tracing::instrument(skip(self, content), fields(command = %self.command))]
    async fn format(&self, path: &str, content: &str) -> Result<String, FormatError> {
        tokio::time::timeout(self.timeout, self.run(path, content))
            .await
            .map_err(|_| FormatError::Timeout(self.timeout.as_secs()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identity() {
        let out = IdentityFormatter.format("a.tsx", "let a=1").await.unwrap();
        assert_eq!(out, "let a=1");
    }

    #[test]
    fn test_path_placeholder() {
        let formatter = CommandFormatter::new(
            "prettier",
            vec!["--stdin-filepath".into(), "{path}".into()],
            Duration::from_secs(1),
        );
        assert_eq!(
            formatter.args_for("app/page.tsx"),
            vec!["--stdin-filepath", "app/page.tsx"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_pipes_stdin() {
        let formatter = CommandFormatter::new("cat", Vec::new(), Duration::from_secs(5));
        let out = formatter.format("a.tsx", "<div />").await.unwrap();
        assert_eq!(out, "<div />");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_failure() {
        let formatter = CommandFormatter::new("false", Vec::new(), Duration::from_secs(5));
        assert!(matches!(
            formatter.format("a.tsx", "x").await,
            Err(FormatError::Exit { .. })
        ));

        let missing =
            CommandFormatter::new("tessera-no-such-formatter", Vec::new(), Duration::from_secs(5));
        assert!(matches!(
            missing.format("a.tsx", "x").await,
            Err(FormatError::Spawn { .. })
        ));
    }
}
