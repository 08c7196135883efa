//! Running the build matrix.
//!
//! [`Scheduler`] runs one build task per configuration on a worker pool,
//! with an [`AdmissionGate`] bounding how many tasks have external
//! processes running at once. [`run_matrix`] is the top-level run: probe the
//! compressor, optionally install toolchains, enumerate, build, report.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::builder::command::{BuildSettings, DEFAULT_ENTRY, DEFAULT_PLATFORM_ENV, DEFAULT_SYMBOL};
use crate::builder::compress::{Compressor, DEFAULT_TOOL};
use crate::builder::executor::{Artifact, BuildExecutor};
use crate::builder::toolchain::{ToolchainLocator, Toolchains, VersionProbe};
use crate::core::axes::MatrixAxes;
use crate::core::config::BuildConfig;
use crate::core::error::MatrixError;
use crate::core::platform::host_platform;
use crate::ops::install::{install_missing_toolchains, InstallOptions, DEFAULT_BOOTSTRAP};
use crate::ops::matrix::MatrixEnumerator;
use crate::ops::report::BuildReport;
use crate::util::config::Config;
use crate::util::fs::ensure_dir;
use crate::util::gate::AdmissionGate;
use crate::util::process::CommandRunner;

/// Artifact name used when none is configured.
pub const DEFAULT_NAME: &str = "hello";

/// What happens to the rest of the matrix when a task fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop dispatching new tasks after the first failure, let running
    /// tasks finish, and report that failure.
    #[default]
    FailFast,
    /// Run every task and report all failures together.
    KeepGoing,
}

/// Number of parallel jobs when none is configured.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Runs build tasks with bounded concurrency.
pub struct Scheduler<'a> {
    executor: &'a BuildExecutor<'a>,
    jobs: usize,
    policy: FailurePolicy,
    progress: bool,
}

impl<'a> Scheduler<'a> {
    /// Create a scheduler running at most `jobs` tasks at once.
    pub fn new(executor: &'a BuildExecutor<'a>, jobs: usize) -> Self {
        Scheduler {
            executor,
            jobs: jobs.max(1),
            policy: FailurePolicy::default(),
            progress: false,
        }
    }

    /// Set the failure policy.
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Show a progress bar.
    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Build every configuration.
    ///
    /// Returns the artifacts in the order of `configs`. Returns only after
    /// every started task has finished, whether the run succeeded or not.
    pub fn run(&self, configs: &[BuildConfig]) -> Result<Vec<Artifact>, MatrixError> {
        let gate = AdmissionGate::new(self.jobs);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(gate.capacity())
            .thread_name(|i| format!("buildmatrix-worker-{}", i))
            .build()?;

        let pb = self.progress_bar(configs.len());
        let stop = AtomicBool::new(false);

        let results: Vec<Option<Result<Artifact, MatrixError>>> = pool.install(|| {
            configs
                .par_iter()
                .map(|config| {
                    if self.policy == FailurePolicy::FailFast && stop.load(Ordering::SeqCst) {
                        return None;
                    }

                    let result = {
                        let _permit = gate.acquire();
                        tracing::debug!(
                            "admitted {} ({}/{} slots)",
                            config,
                            gate.in_use(),
                            gate.capacity()
                        );
                        self.executor.execute(config)
                    };

                    // Log around the bar so its line is not torn.
                    pb.suspend(|| match &result {
                        Ok(artifact) => log_artifact(artifact),
                        Err(e) => tracing::error!("{}: {}", config, e),
                    });
                    if result.is_err() {
                        stop.store(true, Ordering::SeqCst);
                    }
                    pb.inc(1);
                    Some(result)
                })
                .collect()
        });

        // Every admitted task has released its slot by now.
        gate.drain();
        pb.finish_and_clear();

        let mut artifacts = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results.into_iter().flatten() {
            match result {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => failures.push(e),
            }
        }

        match self.policy {
            FailurePolicy::FailFast => {
                if let Some(first) = failures.into_iter().next() {
                    return Err(first);
                }
            }
            FailurePolicy::KeepGoing => {
                if !failures.is_empty() {
                    return Err(MatrixError::TasksFailed { failures });
                }
            }
        }

        Ok(artifacts)
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.progress || total <= 1 {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(total as u64).with_style(style)
    }
}

fn log_artifact(artifact: &Artifact) {
    tracing::info!("{}", artifact.path.display());
    if let Some(ref compressed) = artifact.compressed {
        tracing::info!("{}", compressed.display());
    }
}

/// Everything a matrix run needs, resolved from configuration and flags.
#[derive(Debug, Clone)]
pub struct MatrixOptions {
    /// Artifact base name
    pub name: String,

    /// Matrix axes
    pub axes: MatrixAxes,

    /// Platform the run executes on
    pub host: String,

    /// Compiler command settings
    pub settings: BuildSettings,

    /// Directory holding toolchain executables (None = PATH)
    pub toolchain_dir: Option<PathBuf>,

    /// Compressor tool and suffix; None disables compression
    pub compress: Option<(String, Option<String>)>,

    /// Maximum number of concurrent tasks
    pub jobs: usize,

    /// Failure policy
    pub policy: FailurePolicy,

    /// Install missing toolchains first
    pub install: Option<InstallOptions>,

    /// Show a progress bar
    pub progress: bool,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        MatrixOptions {
            name: DEFAULT_NAME.to_string(),
            axes: MatrixAxes::default(),
            host: host_platform().to_string(),
            settings: BuildSettings::default(),
            toolchain_dir: None,
            compress: Some((DEFAULT_TOOL.to_string(), None)),
            jobs: default_jobs(),
            policy: FailurePolicy::FailFast,
            install: None,
            progress: false,
        }
    }
}

impl MatrixOptions {
    /// Resolve options from a configuration file rooted at `root`.
    ///
    /// Relative paths in the configuration are relative to `root`.
    pub fn from_config(config: &Config, root: &Path) -> Self {
        let defaults = MatrixOptions::default();
        let default_axes = defaults.axes;
        let m = &config.matrix;

        let axes = MatrixAxes {
            versions: m.versions.clone().unwrap_or(default_axes.versions),
            platforms: m.platforms.clone().unwrap_or(default_axes.platforms),
            trim_path: m.trim_path.clone().unwrap_or(default_axes.trim_path),
            link_modes: m.link_modes.clone().unwrap_or(default_axes.link_modes),
            strip: m.strip.clone().unwrap_or(default_axes.strip),
        };

        let b = &config.build;
        let settings = BuildSettings {
            entry: b.entry.clone().unwrap_or_else(|| DEFAULT_ENTRY.to_string()),
            out_dir: root.join(b.out_dir.clone().unwrap_or_else(|| PathBuf::from("dist"))),
            symbol: b.symbol.clone().unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
            platform_env: b
                .platform_env
                .clone()
                .unwrap_or_else(|| DEFAULT_PLATFORM_ENV.to_string()),
            workdir: Some(root.to_path_buf()),
        };

        let c = &config.compress;
        let compress = if c.enabled.unwrap_or(true) {
            Some((
                c.tool.clone().unwrap_or_else(|| DEFAULT_TOOL.to_string()),
                c.suffix.clone(),
            ))
        } else {
            None
        };

        let t = &config.toolchain;
        let install = if t.install_missing.unwrap_or(false) {
            Some(install_options(config))
        } else {
            None
        };

        let policy = if b.keep_going.unwrap_or(false) {
            FailurePolicy::KeepGoing
        } else {
            FailurePolicy::FailFast
        };

        MatrixOptions {
            name: m.name.clone().unwrap_or(defaults.name),
            axes,
            host: defaults.host,
            settings,
            toolchain_dir: t.dir.as_ref().map(|d| root.join(d)),
            compress,
            jobs: b.jobs.unwrap_or(defaults.jobs).max(1),
            policy,
            install,
            progress: false,
        }
    }

    /// Locator for the configured toolchains.
    pub fn locator(&self) -> ToolchainLocator {
        ToolchainLocator::new(self.toolchain_dir.clone())
    }
}

/// Installation settings from the `[toolchain]` table.
pub fn install_options(config: &Config) -> InstallOptions {
    let t = &config.toolchain;
    InstallOptions {
        bootstrap: t
            .bootstrap
            .clone()
            .unwrap_or_else(|| DEFAULT_BOOTSTRAP.to_string()),
        timeout: t
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(InstallOptions::default().timeout),
    }
}

/// Enumerate the feasible configurations, checking each toolchain's
/// self-reported version.
pub fn plan_matrix(
    opts: &MatrixOptions,
    build_time: DateTime<Utc>,
    probe: &dyn VersionProbe,
) -> Result<Vec<BuildConfig>, MatrixError> {
    MatrixEnumerator::new(
        &opts.axes,
        opts.name.as_str(),
        opts.host.as_str(),
        build_time,
    )
    .with_probe(probe)
    .collect()
}

/// Run the whole matrix and write the report.
pub fn run_matrix(opts: &MatrixOptions, runner: &dyn CommandRunner) -> Result<BuildReport> {
    let start = Instant::now();
    let build_time = Utc::now();
    let locator = opts.locator();

    let compressor = opts
        .compress
        .as_ref()
        .and_then(|(tool, suffix)| Compressor::probe(runner, tool, suffix.clone()));
    if let Some(ref c) = compressor {
        tracing::debug!("compressing artifacts with {}", c.tool());
    }

    if let Some(ref install) = opts.install {
        install_missing_toolchains(&opts.axes.versions, &locator, runner, install)?;
    }

    let toolchains = Toolchains::new(&locator, runner);
    let configs = plan_matrix(opts, build_time, &toolchains).context("invalid build matrix")?;
    tracing::debug!(
        "{} of {} combinations are feasible",
        configs.len(),
        opts.axes.product_len()
    );

    let out_dir = &opts.settings.out_dir;
    ensure_dir(out_dir)?;

    let executor =
        BuildExecutor::new(runner, &opts.settings, &locator).compressor(compressor.as_ref());
    let artifacts = Scheduler::new(&executor, opts.jobs)
        .policy(opts.policy)
        .progress(opts.progress)
        .run(&configs)?;

    let report = BuildReport::from_artifacts(build_time, &artifacts)?;
    report.write(out_dir)?;

    tracing::info!(
        "built {} artifact(s) in {:.2}s",
        report.artifacts.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LinkMode;
    use crate::ops::report::REPORT_FILE;
    use crate::test_support::FakeRunner;
    use crate::util::process::ProcessOutput;
    use tempfile::TempDir;

    fn configs(count: usize) -> Vec<BuildConfig> {
        (0..count)
            .map(|i| BuildConfig {
                name: format!("app{}", i),
                toolchain_version: "go1.14".to_string(),
                target_platform: "linux".to_string(),
                link_mode: LinkMode::Internal,
                strip_debug: false,
                trim_path: false,
                build_time: Utc::now(),
            })
            .collect()
    }

    fn settings(dir: &Path) -> BuildSettings {
        BuildSettings {
            out_dir: dir.join("dist"),
            ..BuildSettings::default()
        }
    }

    fn locator() -> ToolchainLocator {
        ToolchainLocator::new(Some(PathBuf::from("/tc")))
    }

    #[test]
    fn test_admission_bound() {
        let runner = FakeRunner::new()
            .on("go1.14", |_| ProcessOutput::success(""))
            .with_delay(Duration::from_millis(20));
        let tmp = TempDir::new().unwrap();
        let settings = settings(tmp.path());
        let locator = locator();
        let executor = BuildExecutor::new(&runner, &settings, &locator);

        let artifacts = Scheduler::new(&executor, 3).run(&configs(24)).unwrap();

        assert_eq!(artifacts.len(), 24);
        assert!(runner.peak_concurrency() <= 3);
        assert!(runner.peak_concurrency() >= 1);
    }

    #[test]
    fn test_artifacts_keep_matrix_order() {
        let runner = FakeRunner::new().on("go1.14", |_| ProcessOutput::success(""));
        let tmp = TempDir::new().unwrap();
        let settings = settings(tmp.path());
        let locator = locator();
        let executor = BuildExecutor::new(&runner, &settings, &locator);

        let input = configs(10);
        let artifacts = Scheduler::new(&executor, 4).run(&input).unwrap();

        let names: Vec<_> = artifacts.iter().map(|a| a.config.name.clone()).collect();
        let expected: Vec<_> = input.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_progress_bar_run_logs_every_artifact() {
        let runner = FakeRunner::new()
            .on("go1.14", |_| ProcessOutput::success(""))
            .on("upx", |_| ProcessOutput::success(""));
        let tmp = TempDir::new().unwrap();
        let settings = settings(tmp.path());
        let locator = locator();
        let upx = Compressor::new("upx", None);
        let executor = BuildExecutor::new(&runner, &settings, &locator).compressor(Some(&upx));

        let artifacts = Scheduler::new(&executor, 2)
            .progress(true)
            .run(&configs(5))
            .unwrap();

        assert_eq!(artifacts.len(), 5);
        assert!(artifacts.iter().all(|a| a.compressed.is_some()));
        assert_eq!(runner.invocations().len(), 10);
    }

    #[test]
    fn test_fail_fast_stops_dispatch() {
        let runner = FakeRunner::new().on("go1.14", |cmd| {
            if cmd.display_command().contains("app0-") {
                ProcessOutput::failure(1, "broken")
            } else {
                ProcessOutput::success("")
            }
        });
        let tmp = TempDir::new().unwrap();
        let settings = settings(tmp.path());
        let locator = locator();
        let executor = BuildExecutor::new(&runner, &settings, &locator);

        let err = Scheduler::new(&executor, 1).run(&configs(8)).unwrap_err();

        assert!(matches!(err, MatrixError::ProcessFailed { .. }));
        assert!(err.to_string().contains("broken"));
        assert!(runner.invocations().len() < 8);
    }

    #[test]
    fn test_keep_going_reports_all_failures() {
        let runner = FakeRunner::new().on("go1.14", |cmd| {
            let line = cmd.display_command();
            if line.contains("app1-") || line.contains("app4-") {
                ProcessOutput::failure(1, "broken")
            } else {
                ProcessOutput::success("")
            }
        });
        let tmp = TempDir::new().unwrap();
        let settings = settings(tmp.path());
        let locator = locator();
        let executor = BuildExecutor::new(&runner, &settings, &locator);

        let err = Scheduler::new(&executor, 2)
            .policy(FailurePolicy::KeepGoing)
            .run(&configs(6))
            .unwrap_err();

        match err {
            MatrixError::TasksFailed { failures } => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(runner.invocations().len(), 6);
    }

    #[test]
    fn test_empty_matrix() {
        let runner = FakeRunner::new();
        let tmp = TempDir::new().unwrap();
        let settings = settings(tmp.path());
        let locator = locator();
        let executor = BuildExecutor::new(&runner, &settings, &locator);

        assert!(Scheduler::new(&executor, 4).run(&[]).unwrap().is_empty());
    }

    fn fake_toolchains() -> FakeRunner {
        let mut runner = FakeRunner::new().creating_outputs();
        for version in ["go1.12.17", "go1.13.8"] {
            runner = runner.on(version, move |cmd| {
                if cmd.get_args().first().map(String::as_str) == Some("version") {
                    ProcessOutput::success(format!("go version {} linux/amd64\n", version))
                } else {
                    ProcessOutput::success("")
                }
            });
        }
        runner
    }

    fn options(tmp: &Path) -> MatrixOptions {
        MatrixOptions {
            axes: MatrixAxes {
                versions: vec!["go1.12.17".to_string(), "go1.13.8".to_string()],
                platforms: vec!["linux".to_string(), "windows".to_string()],
                trim_path: vec![false, true],
                link_modes: vec![LinkMode::Internal],
                strip: vec![false],
            },
            host: "linux".to_string(),
            settings: settings(tmp),
            toolchain_dir: Some(PathBuf::from("/tc")),
            jobs: 2,
            ..MatrixOptions::default()
        }
    }

    #[test]
    fn test_run_matrix_end_to_end() {
        let runner = fake_toolchains().on("upx", |_| ProcessOutput::success(""));
        let tmp = TempDir::new().unwrap();
        let opts = options(tmp.path());

        let report = run_matrix(&opts, &runner).unwrap();

        assert_eq!(report.artifacts.len(), 6);
        for entry in &report.artifacts {
            assert!(entry.path.exists());
            let compressed = entry.compressed.as_ref().unwrap();
            assert!(compressed.exists());
        }
        assert_eq!(runner.count_matching("upx -V"), 1);
        assert_eq!(runner.count_matching(" version"), 2);
        assert!(opts.settings.out_dir.join(REPORT_FILE).exists());
    }

    #[test]
    fn test_rebuild_overwrites_same_paths() {
        let runner = fake_toolchains();
        let tmp = TempDir::new().unwrap();
        let opts = MatrixOptions {
            compress: None,
            ..options(tmp.path())
        };

        let first = run_matrix(&opts, &runner).unwrap();
        let second = run_matrix(&opts, &runner).unwrap();

        let paths = |r: &BuildReport| {
            r.artifacts
                .iter()
                .map(|a| a.path.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(paths(&first), paths(&second));

        let files = std::fs::read_dir(&opts.settings.out_dir).unwrap().count();
        assert_eq!(files, 6 + 1);
    }

    #[test]
    fn test_run_matrix_without_compressor() {
        let runner = fake_toolchains();
        let tmp = TempDir::new().unwrap();
        let opts = options(tmp.path());

        let report = run_matrix(&opts, &runner).unwrap();
        assert!(report.artifacts.iter().all(|a| a.compressed.is_none()));
    }

    #[test]
    fn test_run_matrix_version_mismatch_builds_nothing() {
        let runner = FakeRunner::new()
            .on("go1.12.17", |_| ProcessOutput::success("go version go1.12.16 linux/amd64"))
            .on("go1.13.8", |_| ProcessOutput::success("go version go1.13.8 linux/amd64"));
        let tmp = TempDir::new().unwrap();
        let opts = MatrixOptions {
            compress: None,
            ..options(tmp.path())
        };

        let err = run_matrix(&opts, &runner).unwrap_err();
        let matrix_err = err.downcast_ref::<MatrixError>().unwrap();
        assert!(matches!(matrix_err, MatrixError::VersionMismatch { .. }));
        assert_eq!(runner.count_matching(" build "), 0);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.matrix.name = Some("server".to_string());
        config.matrix.versions = Some(vec!["go1.14".to_string()]);
        config.build.out_dir = Some(PathBuf::from("out"));
        config.build.jobs = Some(0);
        config.build.keep_going = Some(true);
        config.compress.enabled = Some(false);
        config.toolchain.dir = Some(PathBuf::from("toolchains"));
        config.toolchain.install_missing = Some(true);
        config.toolchain.timeout_secs = Some(5);

        let opts = MatrixOptions::from_config(&config, Path::new("/project"));

        assert_eq!(opts.name, "server");
        assert_eq!(opts.axes.versions, vec!["go1.14".to_string()]);
        assert_eq!(opts.axes.platforms, MatrixAxes::default().platforms);
        assert_eq!(opts.settings.out_dir, PathBuf::from("/project/out"));
        assert_eq!(opts.settings.workdir, Some(PathBuf::from("/project")));
        assert_eq!(opts.jobs, 1);
        assert_eq!(opts.policy, FailurePolicy::KeepGoing);
        assert!(opts.compress.is_none());
        assert_eq!(opts.toolchain_dir, Some(PathBuf::from("/project/toolchains")));
        assert_eq!(opts.install.unwrap().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_options_defaults() {
        let opts = MatrixOptions::from_config(&Config::default(), Path::new("/p"));
        assert_eq!(opts.name, DEFAULT_NAME);
        assert_eq!(opts.axes, MatrixAxes::default());
        assert_eq!(opts.settings.symbol, DEFAULT_SYMBOL);
        assert_eq!(opts.compress, Some(("upx".to_string(), None)));
        assert!(opts.install.is_none());
        assert_eq!(opts.policy, FailurePolicy::FailFast);
    }
}
