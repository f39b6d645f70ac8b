//! Narration seam

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use tokio::process::Command;

/// Speaks a line of text
///
/// Failures are the implementation's to log; narration never fails the
/// caller.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn speak(&self, text: &str);
}

#[derive(Debug, Default)]
pub struct LogNarrator;

#[async_trait]
impl Narrator for LogNarrator {
    async fn speak(&self, text: &str) {
        tracing::info!(%text, "Narration");
    }
}

/// Runs an external program with the text as its last argument
///
/// The command string is split on whitespace, so `"say -v Mei-Jia"` works.
#[derive(Debug, Clone)]
pub struct CommandNarrator {
    program: String,
    args: Vec<String>,
}

impl CommandNarrator {
    /// `None` for a blank command
    pub fn new(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Narrator for CommandNarrator {
    async fn speak(&self, text: &str) {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .kill_on_drop(true)
            .status()
            .await;

        match status {
            Ok(status) if status.success() => {
                tracing::debug!(program = %self.program, "Narrated");
            }
            Ok(status) => {
                tracing::warn!(program = %self.program, %status, "Narration command failed");
            }
            Err(e) => {
                tracing::warn!(program = %self.program, error = %e, "Narration command not runnable");
            }
        }
    }
}

/// Keeps everything spoken in memory
#[derive(Debug, Default)]
pub struct RecordingNarrator {
    spoken: Mutex<Vec<String>>,
}

impl RecordingNarrator {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Narrator for RecordingNarrator {
    async fn speak(&self, text: &str) {
        self.spoken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
    }
}
