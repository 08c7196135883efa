//! `buildmatrix completions` command

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::generate;

use crate::cli::{Cli, CompletionsArgs};

pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();

    let mut script = Vec::new();
    generate(args.shell, &mut cmd, bin, &mut script);

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&script)
        .and_then(|_| stdout.flush())
        .with_context(|| format!("failed to write {} completions", args.shell))
}
