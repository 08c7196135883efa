//! Test utilities for buildmatrix unit tests.
//!
//! Provides [`FakeRunner`], a [`CommandRunner`] that answers commands from
//! registered handlers instead of spawning processes.
//!
//! # Example
//!
//! ```rust,ignore
//! use buildmatrix::test_support::FakeRunner;
//!
//! let runner = FakeRunner::new()
//!     .on("go1.13.8", |_| ProcessOutput::success("go version go1.13.8 linux/amd64"))
//!     .creating_outputs();
//! ```

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::util::process::{CommandRunner, ProcessBuilder, ProcessOutput};

type Handler = Arc<dyn Fn(&ProcessBuilder) -> ProcessOutput + Send + Sync>;

/// Scripted command runner.
///
/// Handlers are keyed by the program's file name (without `.exe`). Commands
/// for unknown programs fail to spawn with `NotFound`, like a missing
/// executable would.
#[derive(Clone, Default)]
pub struct FakeRunner {
    handlers: HashMap<String, Handler>,
    create_outputs: bool,
    delay: Option<Duration>,
    invocations: Arc<Mutex<Vec<String>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl FakeRunner {
    /// Create a runner that knows no programs.
    pub fn new() -> Self {
        FakeRunner::default()
    }

    /// Answer commands for `program` with `handler`.
    pub fn on<F>(mut self, program: &str, handler: F) -> Self
    where
        F: Fn(&ProcessBuilder) -> ProcessOutput + Send + Sync + 'static,
    {
        self.handlers.insert(program.to_string(), Arc::new(handler));
        self
    }

    /// Write a placeholder file at the `-o` path of every successful command.
    pub fn creating_outputs(mut self) -> Self {
        self.create_outputs = true;
        self
    }

    /// Sleep for `delay` inside every command, to overlap concurrent tasks.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every command run so far, in display form.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// Number of commands whose display form contains `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.invocations()
            .iter()
            .filter(|cmd| cmd.contains(needle))
            .count()
    }

    /// Highest number of commands observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn program_key(cmd: &ProcessBuilder) -> String {
        let name = cmd
            .get_program()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.strip_suffix(".exe").map(str::to_string).unwrap_or(name)
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, cmd: &ProcessBuilder) -> io::Result<ProcessOutput> {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(cmd.display_command());
        }

        let handler = self
            .handlers
            .get(&Self::program_key(cmd))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "program not found"))?;

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        let output = handler(cmd);
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.create_outputs && output.is_success() {
            if let Some(path) = arg_after(cmd, "-o") {
                let path = Path::new(path);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, cmd.display_command())?;
            }
        }

        Ok(output)
    }
}

/// Value following `flag` in the argument list of `cmd`.
fn arg_after<'a>(cmd: &'a ProcessBuilder, flag: &str) -> Option<&'a str> {
    let args = cmd.get_args();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
