// Utility functions for Exliar Quickpass

use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Runs external programs on behalf of the installer and system detection.
///
/// The real implementation spawns processes; tests substitute a recorder.
pub trait CommandRunner {
    /// Runs a program and returns its trimmed stdout on success
    fn run(&self, program: &str, args: &[String]) -> Result<String>;

    /// Runs a program with `input` written to its stdin
    fn run_with_stdin(&self, program: &str, args: &[String], input: &[u8]) -> Result<String>;
}

/// Spawns real processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String> {
        tracing::debug!(program, ?args, "running command");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::io(program, e))?;
        into_stdout(program, args, output)
    }

    fn run_with_stdin(&self, program: &str, args: &[String], input: &[u8]) -> Result<String> {
        tracing::debug!(program, ?args, "running command with stdin");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::io(program, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input).map_err(|e| Error::io(program, e))?;
            stdin.write_all(b"\n").map_err(|e| Error::io(program, e))?;
        }

        let output = child.wait_with_output().map_err(|e| Error::io(program, e))?;
        into_stdout(program, args, output)
    }
}

fn into_stdout(program: &str, args: &[String], output: std::process::Output) -> Result<String> {
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(Error::CommandFailed {
            command: format_command(program, args),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Renders a command line for logs and error messages
pub fn format_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Looks a program up on `PATH`
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// Builds the timestamped backup name used before overwriting a host file
pub fn timestamped_backup_path(file_path: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_filename = format!(
        "{}.backup_{}",
        file_path.file_name().unwrap_or_default().to_string_lossy(),
        timestamp
    );
    file_path.with_file_name(backup_filename)
}
