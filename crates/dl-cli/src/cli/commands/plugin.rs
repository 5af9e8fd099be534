//! `dl <other> [args...]` – hand over to a `dl-<other>` executable on PATH.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::process::Command;

/// Replace this process with `<self_name>-<argv[0]>`. Only returns on failure.
pub fn run_plugin(self_name: &str, argv: Vec<OsString>) -> Result<()> {
    let mut argv = argv.into_iter();
    let sub = argv.next().context("missing subcommand")?;

    let mut program = OsString::from(format!("{self_name}-"));
    program.push(&sub);
    tracing::debug!(plugin = %program.to_string_lossy(), "exec");

    let err = Command::new(&program).args(argv).exec();
    Err(err).with_context(|| format!("exec '{}'", program.to_string_lossy()))
}
