//! Thin entry point: parses the command line, drives one discovery run,
//! and hands the result back to `main` for printing.

pub mod config;

use anyhow::Context;
use discovery::{Client, Report};

use crate::config::Cli;

pub fn startup(cli: &Cli) -> anyhow::Result<Report> {
    let client = Client::new(&cli.host, cli.port, cli.timeout)
        .context("failed to resolve server address or bind a local socket")?;

    client.discover().context("discovery procedure failed")
}
