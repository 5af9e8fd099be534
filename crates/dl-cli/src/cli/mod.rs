//! CLI for dl: per-project marker scripts and the downloads they register.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dl_core::config;
use dl_core::ops;
use dl_core::scheduler::resolve_job_budget;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use commands::{run_add, run_fetcher, run_gen, run_plugin, run_save, self_name};

/// Top-level CLI. Without a subcommand, runs `parse` and then `fetch`.
#[derive(Debug, Parser)]
#[command(name = "dl")]
#[command(
    about = "dl: run every project's .dl script, then fetch the downloads they registered",
    long_about = None
)]
pub struct Cli {
    /// Log at debug level to stderr instead of the log file. Only recognized
    /// before the subcommand, so `save`/`gen` arguments pass through untouched.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Register a download in the current project.
    Add {
        /// Output file, relative to the project directory.
        #[arg(short = 'o', value_name = "OUTPUT")]
        output: PathBuf,
        /// Name of a fetcher registered with `dl fetcher`.
        #[arg(short = 'f', value_name = "FETCHER")]
        fetcher: String,
        /// Extra arguments appended to the fetcher's.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// Register (or replace) a named fetcher command in the current project.
    Fetcher {
        name: String,
        /// Program and base arguments.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// Run every `.dl` script below the current directory.
    Parse {
        /// Maximum number of scripts running at once.
        #[arg(short = 'j', long = "jobs", value_name = "N")]
        jobs: Option<usize>,
    },

    /// Run every registered download below the current directory.
    Fetch {
        /// Maximum number of fetch commands running at once.
        #[arg(short = 'j', long = "jobs", value_name = "N")]
        jobs: Option<usize>,
    },

    /// Save the arguments passed to this project's `.dl` script.
    Save {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// Write a `.dl` script that re-invokes dl with the given arguments.
    Gen {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// Any other subcommand runs `dl-<name>` from PATH.
    #[command(external_subcommand)]
    External(Vec<OsString>),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let root = Path::new(".");

        match self.command {
            None => ops::run_all(root, job_budget(None)).await?,
            Some(CliCommand::Add {
                output,
                fetcher,
                args,
            }) => run_add(root, &output, &fetcher, args).context("add")?,
            Some(CliCommand::Fetcher { name, args }) => {
                run_fetcher(root, &name, args).context("fetcher")?
            }
            Some(CliCommand::Parse { jobs }) => ops::run_parse(root, job_budget(jobs)).await?,
            Some(CliCommand::Fetch { jobs }) => ops::run_fetch(root, job_budget(jobs)).await?,
            Some(CliCommand::Save { args }) => run_save(root, &args).context("save")?,
            Some(CliCommand::Gen { args }) => run_gen(root, &self_name(), &args).context("gen")?,
            Some(CliCommand::External(argv)) => run_plugin(&self_name(), argv)?,
        }

        Ok(())
    }
}

/// Job budget for one operation; the config file is only read when `-j` is absent.
fn job_budget(flag: Option<usize>) -> usize {
    let configured = match flag {
        Some(_) => None,
        None => match config::load_or_init() {
            Ok(cfg) => {
                tracing::debug!("loaded config: {:?}", cfg);
                cfg.jobs
            }
            Err(err) => {
                tracing::warn!("config unavailable, using defaults: {:#}", err);
                None
            }
        },
    };
    resolve_job_budget(flag, configured)
}

#[cfg(test)]
mod tests;
