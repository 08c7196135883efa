//! `buildmatrix build` command

use anyhow::Result;

use buildmatrix::ops::run::{install_options, run_matrix, FailurePolicy};
use buildmatrix::ops::report::REPORT_FILE;
use buildmatrix::util::SystemRunner;

use crate::cli::{BuildArgs, GlobalArgs};

pub fn execute(args: BuildArgs, global: &GlobalArgs) -> Result<()> {
    let (config, mut opts) = super::load_options(global)?;

    // CLI flags override the configuration
    if let Some(jobs) = args.jobs {
        opts.jobs = jobs.max(1);
    }
    if args.no_compress {
        opts.compress = None;
    }
    if args.keep_going {
        opts.policy = FailurePolicy::KeepGoing;
    }
    if let Some(out_dir) = args.out_dir {
        opts.settings.out_dir = super::cli_path(&out_dir)?;
    }
    if let Some(dir) = args.toolchain_dir {
        opts.toolchain_dir = Some(super::cli_path(&dir)?);
    }
    if args.install_missing && opts.install.is_none() {
        opts.install = Some(install_options(&config));
    }
    opts.progress = !global.verbose;

    let report = run_matrix(&opts, &SystemRunner)?;

    eprintln!(
        "    Finished {} artifact(s) -> {}",
        report.artifacts.len(),
        opts.settings.out_dir.join(REPORT_FILE).display()
    );

    Ok(())
}
