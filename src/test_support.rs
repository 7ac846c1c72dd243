//! Test doubles shared by unit tests

use crate::core::traits::{ProcessOutput, ProcessRunner};
use crate::security::command_executor::CommandError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

type Responder = Box<dyn Fn(&str) -> Option<Result<ProcessOutput, CommandError>> + Send + Sync>;

/// Recording process runner.
///
/// Queued responses are consumed first; otherwise the first responder that
/// recognizes the command line answers; otherwise the call succeeds with empty output.
#[derive(Default)]
pub struct SpyRunner {
    calls: Mutex<Vec<String>>,
    queued: Mutex<VecDeque<Result<ProcessOutput, CommandError>>>,
    responders: Vec<Responder>,
    delays: Vec<(&'static str, Duration)>,
}

impl SpyRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: Result<ProcessOutput, CommandError>) {
        self.queued.lock().unwrap().push_back(response);
    }

    pub fn push_stdout(&self, stdout: &str) {
        self.push_response(Ok(ProcessOutput::stdout(stdout)));
    }

    pub fn respond_when_contains(mut self, needle: &'static str, stdout: &'static str) -> Self {
        self.responders.push(Box::new(move |line| {
            line.contains(needle).then(|| Ok(ProcessOutput::stdout(stdout)))
        }));
        self
    }

    /// Hold back answers to matching command lines
    pub fn delay_when_contains(mut self, needle: &'static str, delay: Duration) -> Self {
        self.delays.push((needle, delay));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcessRunner for SpyRunner {
    async fn run(&self, command_line: &str) -> Result<ProcessOutput, CommandError> {
        self.calls.lock().unwrap().push(command_line.to_string());

        let delay = self
            .delays
            .iter()
            .find(|(needle, _)| command_line.contains(needle))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(response) = self.queued.lock().unwrap().pop_front() {
            return response;
        }
        for responder in &self.responders {
            if let Some(response) = responder(command_line) {
                return response;
            }
        }
        Ok(ProcessOutput::default())
    }
}

pub fn busy_file_error(command: &str) -> CommandError {
    CommandError::Failed {
        command: command.to_string(),
        exit_code: Some(1),
        signal: None,
        stdout: "error MSB3027: Could not copy \"obj/App.dll\". The process cannot access the file because it is being used by another process.".to_string(),
        stderr: String::new(),
    }
}

pub fn failure(command: &str, stderr: &str) -> CommandError {
    CommandError::Failed {
        command: command.to_string(),
        exit_code: Some(1),
        signal: None,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}
