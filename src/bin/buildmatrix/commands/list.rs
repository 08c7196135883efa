//! `buildmatrix list` command

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use buildmatrix::builder::fingerprint::output_path;
use buildmatrix::builder::toolchain::Toolchains;
use buildmatrix::ops::run::plan_matrix;
use buildmatrix::util::SystemRunner;
use buildmatrix::BuildConfig;

use crate::cli::{GlobalArgs, ListArgs};

#[derive(Serialize)]
struct ListEntry {
    config: BuildConfig,
    path: String,
}

pub fn execute(args: ListArgs, global: &GlobalArgs) -> Result<()> {
    let (_, mut opts) = super::load_options(global)?;
    if let Some(dir) = args.toolchain_dir {
        opts.toolchain_dir = Some(super::cli_path(&dir)?);
    }

    let locator = opts.locator();
    let runner = SystemRunner;
    let toolchains = Toolchains::new(&locator, &runner);
    let configs = plan_matrix(&opts, Utc::now(), &toolchains).context("invalid build matrix")?;

    let entries = configs
        .into_iter()
        .map(|config| -> Result<ListEntry> {
            let path = output_path(&opts.settings.out_dir, &config)?;
            Ok(ListEntry {
                config,
                path: path.display().to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            println!("{}", entry.path);
        }
    }

    Ok(())
}
