//! Error types for matrix enumeration and execution.

use std::fmt;

use thiserror::Error;

/// Error raised while enumerating or building the matrix.
///
/// Every variant that involves a build configuration carries its canonical
/// JSON so the failing combination can be reproduced by hand.
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("malformed toolchain version `{version}`: expected a dot-separated minor number")]
    MalformedVersion { version: String },

    #[error("inconsistent toolchain version: exe={expected:?}, version={reported:?}")]
    VersionMismatch { expected: String, reported: String },

    #[error("`{toolchain} version` failed ({status})\n{output}")]
    VersionQueryFailed {
        toolchain: String,
        status: ExitCode,
        output: String,
    },

    #[error("unexpected `version` output from `{toolchain}`: {output:?}")]
    UnexpectedVersionOutput { toolchain: String, output: String },

    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{what} failed ({status})\n$ {command}\n{output}\n^^^\nconfiguration:\n{config}")]
    ProcessFailed {
        what: String,
        command: String,
        status: ExitCode,
        output: String,
        config: String,
    },

    #[error("failed to serialize build configuration")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to start worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{} build task(s) failed:\n{}", .failures.len(), render_failures(.failures))]
    TasksFailed { failures: Vec<MatrixError> },
}

/// Exit code of an external process, if it exited normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub Option<i32>);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

fn render_failures(failures: &[MatrixError]) -> String {
    failures
        .iter()
        .map(|e| format!("- {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

impl MatrixError {
    /// Whether this error comes from inconsistent matrix input data rather
    /// than from a failing external process.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MatrixError::MalformedVersion { .. }
                | MatrixError::VersionMismatch { .. }
                | MatrixError::UnexpectedVersionOutput { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_failed_message_includes_context() {
        let err = MatrixError::ProcessFailed {
            what: "build".to_string(),
            command: "go1.13.8 build -o dist/x main.go".to_string(),
            status: ExitCode(Some(2)),
            output: "main.go:3: syntax error".to_string(),
            config: "{\"name\":\"hello\"}".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("exit code 2"));
        assert!(msg.contains("$ go1.13.8 build"));
        assert!(msg.contains("syntax error"));
        assert!(msg.contains("\"name\":\"hello\""));
    }

    #[test]
    fn test_tasks_failed_lists_every_failure() {
        let err = MatrixError::TasksFailed {
            failures: vec![
                MatrixError::MalformedVersion {
                    version: "go1".to_string(),
                },
                MatrixError::VersionMismatch {
                    expected: "go1.13".to_string(),
                    reported: "go1.14".to_string(),
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.starts_with("2 build task(s) failed"));
        assert!(msg.contains("`go1`"));
        assert!(msg.contains("exe=\"go1.13\""));
    }

    #[test]
    fn test_is_config_error() {
        assert!(MatrixError::MalformedVersion {
            version: "x".to_string()
        }
        .is_config_error());
        assert!(!MatrixError::TasksFailed { failures: vec![] }.is_config_error());
    }

    #[test]
    fn test_signal_exit_code_display() {
        assert_eq!(ExitCode(None).to_string(), "terminated by signal");
    }
}
