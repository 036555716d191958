// Mock implementations for testing - no side effects

use async_trait::async_trait;
use std::sync::Mutex;

use super::command::{CommandError, CommandExecutor, CommandOutput, Invocation, StdinPayload};
use secrecy::ExposeSecret;

/// A call observed by `RecordingExecutor`
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub rendered: String,
    /// Raw stdin as the child would have received it
    pub stdin: Option<String>,
}

impl RecordedCall {
    /// Program followed by its arguments, with `sudo` stripped
    pub fn command_line(&self) -> Vec<&str> {
        let mut parts: Vec<&str> = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect();
        if parts.first() == Some(&"sudo") {
            parts.remove(0);
        }
        parts
    }

    pub fn matches(&self, program: &str, first_arg: Option<&str>) -> bool {
        let parts = self.command_line();
        parts.first() == Some(&program)
            && first_arg.map_or(true, |arg| parts.get(1) == Some(&arg))
    }
}

struct Rule {
    program: String,
    first_arg: Option<String>,
    output: CommandOutput,
}

/// Executor that records every invocation and answers from scripted rules.
///
/// Unscripted commands succeed with empty output.
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<RecordedCall>>,
    rules: Mutex<Vec<Rule>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `program [first_arg ...]` with the given output
    pub fn respond(self, program: &str, first_arg: Option<&str>, output: CommandOutput) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                program: program.to_string(),
                first_arg: first_arg.map(str::to_string),
                output,
            });
        }
        self
    }

    /// Make `program [first_arg ...]` exit with `status_code`
    pub fn fail(self, program: &str, first_arg: Option<&str>, status_code: i32) -> Self {
        self.respond(
            program,
            first_arg,
            CommandOutput {
                status_code,
                stdout: Vec::new(),
                stderr: format!("{program}: scripted failure"),
            },
        )
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn was_called(&self, program: &str, first_arg: Option<&str>) -> bool {
        self.calls().iter().any(|c| c.matches(program, first_arg))
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn execute(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        let call = RecordedCall {
            program: invocation.program.clone(),
            args: invocation.args.clone(),
            rendered: invocation.to_string(),
            stdin: invocation.stdin.as_ref().map(|payload| match payload {
                StdinPayload::Secret(secret) => secret.expose_secret().to_string(),
                StdinPayload::Piped(data) => String::from_utf8_lossy(data).into_owned(),
            }),
        };

        let response = self
            .rules
            .lock()
            .ok()
            .and_then(|rules| {
                rules
                    .iter()
                    .find(|rule| call.matches(&rule.program, rule.first_arg.as_deref()))
                    .map(|rule| rule.output.clone())
            })
            .unwrap_or_else(CommandOutput::ok);

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        Ok(response)
    }
}
