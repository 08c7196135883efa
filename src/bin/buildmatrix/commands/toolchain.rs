//! `buildmatrix toolchain` command

use anyhow::Result;

use buildmatrix::builder::toolchain::{Toolchains, VersionProbe};
use buildmatrix::ops::install::install_missing_toolchains;
use buildmatrix::ops::run::install_options;
use buildmatrix::util::SystemRunner;
use buildmatrix::MatrixOptions;

use crate::cli::{GlobalArgs, ToolchainArgs, ToolchainCommands};

pub fn execute(args: ToolchainArgs, global: &GlobalArgs) -> Result<()> {
    let (config, opts) = super::load_options(global)?;

    match args.command {
        ToolchainCommands::Show => show_toolchains(&opts),
        ToolchainCommands::Install => {
            let installed = install_missing_toolchains(
                &opts.axes.versions,
                &opts.locator(),
                &SystemRunner,
                &install_options(&config),
            )?;
            if installed.is_empty() {
                eprintln!("All {} toolchain(s) already installed", opts.axes.versions.len());
            } else {
                eprintln!("Installed {}", installed.join(", "));
            }
            Ok(())
        }
    }
}

fn show_toolchains(opts: &MatrixOptions) -> Result<()> {
    let locator = opts.locator();
    let runner = SystemRunner;
    let toolchains = Toolchains::new(&locator, &runner);

    println!("Toolchains:");
    println!();

    for version in &opts.axes.versions {
        let status = match toolchains.reported_version(version) {
            Ok(reported) if &reported == version => "ok".to_string(),
            Ok(reported) => format!("reports {}", reported),
            Err(e) => format!("unavailable ({})", e),
        };
        println!(
            "  {:<12} {:<8} {}",
            version,
            status,
            locator.executable(version).display()
        );
    }

    println!();
    println!("  Host:   {}", opts.host);

    Ok(())
}
