//! Scripted runner for tests.
//!
//! Records every invocation and replays queued responses in order. Once the
//! queue is empty every call succeeds with empty output.

use crate::error::{Error, Result};
use crate::runner::Runner;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Arguments passed to the runner
    pub args: Vec<String>,
    /// Data written to stdin, if any
    pub stdin: Option<String>,
}

impl Call {
    /// First argument, i.e. the kubectl subcommand.
    pub fn subcommand(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or_default()
    }
}

/// Runner that returns scripted responses instead of spawning processes.
#[derive(Debug, Default)]
pub struct MockRunner {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<Call>>,
}

impl MockRunner {
    /// Create a runner with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response with the given stdout.
    pub fn respond(self, stdout: impl Into<String>) -> Self {
        self.push(Ok(stdout.into()));
        self
    }

    /// Queue a failure.
    pub fn fail(self, err: Error) -> Self {
        self.push(Err(err));
        self
    }

    /// All invocations seen so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, response: Result<String>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }
}

impl Runner for MockRunner {
    fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Call {
                args: args.iter().map(|a| (*a).to_string()).collect(),
                stdin: stdin.map(str::to_string),
            });
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}
