use crate::exec::{RunResult, Termination};

use coderun_protocol::run::{StatusKind, Verdict};

pub const EXECUTION_TIMED_OUT: &str = "Execution timed out";
pub const EXECUTION_CANCELLED: &str = "Execution cancelled";

/// Which ids are used for failures other than plain runtime errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Compile errors and timeouts are reported as runtime errors.
    Collapsed,
    /// Compile errors and timeouts get their own ids.
    Distinct,
}

impl StatusPolicy {
    pub fn from_flag(distinct_statuses: bool) -> Self {
        if distinct_statuses {
            StatusPolicy::Distinct
        } else {
            StatusPolicy::Collapsed
        }
    }

    fn timeout(self) -> StatusKind {
        match self {
            StatusPolicy::Collapsed => StatusKind::RuntimeError,
            StatusPolicy::Distinct => StatusKind::TimeLimitExceeded,
        }
    }

    fn compile_error(self) -> StatusKind {
        match self {
            StatusPolicy::Collapsed => StatusKind::RuntimeError,
            StatusPolicy::Distinct => StatusKind::CompilationError,
        }
    }
}

pub fn evaluate(run: &RunResult, expected_output: &str, policy: StatusPolicy) -> Verdict {
    let time = run.elapsed_ms();

    if let Some((kind, message)) = failure(run, policy) {
        return failed(kind, message, time);
    }

    let actual = run.stdout.trim();
    let kind = if actual == expected_output.trim() {
        StatusKind::Accepted
    } else {
        StatusKind::WrongAnswer
    };

    Verdict {
        stdout: Some(actual.to_owned()),
        stderr: None,
        time,
        status: kind.into(),
    }
}

fn failure(run: &RunResult, policy: StatusPolicy) -> Option<(StatusKind, String)> {
    let stderr = run.stderr.trim();
    let message = match run.termination {
        Termination::TimedOut => return Some((policy.timeout(), EXECUTION_TIMED_OUT.to_owned())),
        Termination::Cancelled => EXECUTION_CANCELLED.to_owned(),
        Termination::SpawnError(ref msg) => msg.clone(),
        Termination::Exited { code: Some(0), .. } => {
            // any byte on stderr fails the run, blank output included
            if run.stderr.is_empty() {
                return None;
            }
            if stderr.is_empty() {
                run.stderr.clone()
            } else {
                stderr.to_owned()
            }
        }
        Termination::Exited { code, signal } => {
            if !stderr.is_empty() {
                stderr.to_owned()
            } else if let Some(code) = code {
                format!("Process exited with code {}", code)
            } else {
                format!("Process terminated by signal {}", signal.unwrap_or(0))
            }
        }
    };
    Some((StatusKind::RuntimeError, message))
}

pub fn compile_error(diagnostics: &str, policy: StatusPolicy) -> Verdict {
    failed(policy.compile_error(), diagnostics.trim().to_owned(), 0)
}

/// A failure of the runner itself, e.g. the workspace could not be created.
pub fn system_error(message: impl Into<String>) -> Verdict {
    failed(StatusKind::RuntimeError, message.into(), 0)
}

fn failed(kind: StatusKind, message: String, time: u64) -> Verdict {
    Verdict {
        stdout: None,
        stderr: Some(message),
        time,
        status: kind.into(),
    }
}
