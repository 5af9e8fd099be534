//! Tests for the tree-wide subcommands, global flags and plugin delegation.

use super::{command, parse};
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::ffi::OsString;

#[test]
fn cli_parse_no_subcommand_runs_everything() {
    let cli = parse(&["dl"]);
    assert!(cli.command.is_none());
    assert!(!cli.verbose);
}

#[test]
fn cli_parse_verbose_precedes_the_subcommand() {
    assert!(parse(&["dl", "-v"]).verbose);
    let cli = parse(&["dl", "--verbose", "fetch"]);
    assert!(cli.verbose);
    assert!(matches!(cli.command, Some(CliCommand::Fetch { jobs: None })));
    assert!(Cli::try_parse_from(["dl", "fetch", "-v"]).is_err());
}

#[test]
fn cli_parse_parse_jobs() {
    match command(&["dl", "parse", "-j", "4"]) {
        CliCommand::Parse { jobs } => assert_eq!(jobs, Some(4)),
        _ => panic!("expected Parse"),
    }
    match command(&["dl", "parse"]) {
        CliCommand::Parse { jobs } => assert_eq!(jobs, None),
        _ => panic!("expected Parse"),
    }
}

#[test]
fn cli_parse_fetch_jobs() {
    match command(&["dl", "fetch", "--jobs", "2"]) {
        CliCommand::Fetch { jobs } => assert_eq!(jobs, Some(2)),
        _ => panic!("expected Fetch"),
    }
    assert!(Cli::try_parse_from(["dl", "fetch", "-j", "many"]).is_err());
}

#[test]
fn cli_parse_unknown_subcommand_is_external() {
    match command(&["dl", "rss", "--feed", "x"]) {
        CliCommand::External(argv) => {
            let expected: Vec<OsString> =
                ["rss", "--feed", "x"].iter().map(OsString::from).collect();
            assert_eq!(argv, expected);
        }
        _ => panic!("expected External"),
    }
}
