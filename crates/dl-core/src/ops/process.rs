//! Running one external program and classifying how it ended.

use std::process::ExitStatus;

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ProcessError {
    /// The assembled command vector had no program.
    #[error("empty command")]
    EmptyCommand,

    #[error("spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but did not exit successfully.
    #[error("{program} {status}")]
    Failed { program: String, status: ExitStatus },
}

/// Run `cmd` to completion. Only a zero exit status counts as success.
pub async fn run(mut cmd: Command) -> Result<(), ProcessError> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let args: Vec<_> = cmd.as_std().get_args().collect();
    tracing::debug!(program = %program, ?args, "spawn");

    let status = cmd
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(ProcessError::Failed { program, status })
    }
}
