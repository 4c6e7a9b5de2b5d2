//! Command runner that replays queued outputs

use crate::command::{CommandOutput, CommandRunner};
use nvmefs_core::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// [`CommandRunner`] returning pre-programmed outputs in FIFO order.
///
/// When the queue is empty every command succeeds with empty output.
/// Each invocation is recorded as `[program, args...]`.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Mutex<VecDeque<CommandOutput>>,
    invocations: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    /// Empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the output of the next command
    pub fn push(&self, output: CommandOutput) {
        self.responses.lock().push_back(output);
    }

    /// Every invocation so far
    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let mut call = Vec::with_capacity(args.len() + 1);
        call.push(program.to_string());
        call.extend(args.iter().cloned());
        self.invocations.lock().push(call);

        Ok(self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| CommandOutput::success(Vec::new())))
    }
}
