//! Purpose: Boundary for launching the external Kaggle CLI.
//! Exports: `CommandRunner`, `CommandOutput`, `SystemRunner`.
//! Role: Mockable seam: (program, args, env) -> (exit code, stdout, stderr).
//! Invariants: `run` blocks until the child exits; no timeout, no cancellation.
//! Invariants: Output streams are captured, never inherited.
//! Invariants: `envs` are added on top of the inherited environment.

use std::ffi::{OsStr, OsString};
use std::io;
use std::process::Command;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the child was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner {
    /// Launch failures (e.g. program not found) surface as `Err`.
    fn run(
        &self,
        program: &OsStr,
        args: &[OsString],
        envs: &[(OsString, OsString)],
    ) -> io::Result<CommandOutput>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &OsStr,
        args: &[OsString],
        envs: &[(OsString, OsString)],
    ) -> io::Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .envs(envs.iter().map(|(key, value)| (key, value)))
            .output()?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
