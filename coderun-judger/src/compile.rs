use crate::config::Executor;
use crate::exec::{self, RunLimit, Termination};
use crate::lang::Language;
use crate::workspace::Workspace;

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info};

pub const COMPILE_FAILED: &str = "Compilation failed";
pub const COMPILE_TIMED_OUT: &str = "Compilation timed out";
pub const COMPILE_CANCELLED: &str = "Compilation cancelled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileResult {
    Compiled { elapsed: Duration },
    Failed { diagnostics: String, elapsed: Duration },
    Cancelled,
}

/// Builds the workspace source. Languages without a compile step always succeed.
pub async fn compile<C>(
    workspace: &Workspace,
    lang: &dyn Language,
    executor: &Executor,
    cancel: C,
) -> CompileResult
where
    C: Future<Output = ()>,
{
    let cmd = match lang.compile(workspace, executor) {
        Some(cmd) => cmd,
        None => {
            return CompileResult::Compiled {
                elapsed: Duration::from_millis(0),
            }
        }
    };

    let limit = RunLimit {
        time: executor.compile_time_limit(),
        output: executor.output_limit.as_u64(),
    };

    let output = exec::run_process(&cmd, workspace.dir(), None, &limit, cancel).await;
    let elapsed = output.elapsed;

    let diagnostics = match output.termination {
        Termination::Exited { code: Some(0), .. } => {
            debug!(lang = lang.lang_name(), ?elapsed, "compiled");
            return CompileResult::Compiled { elapsed };
        }
        Termination::Cancelled => return CompileResult::Cancelled,
        Termination::TimedOut => COMPILE_TIMED_OUT.to_owned(),
        Termination::SpawnError(msg) => msg,
        Termination::Exited { .. } => {
            let stderr = output.stderr.trim();
            let stdout = output.stdout.trim();
            if !stderr.is_empty() {
                stderr.to_owned()
            } else if !stdout.is_empty() {
                stdout.to_owned()
            } else {
                COMPILE_FAILED.to_owned()
            }
        }
    };

    info!(lang = lang.lang_name(), ?elapsed, "compile error");
    CompileResult::Failed {
        diagnostics,
        elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang;
    use crate::workspace::WorkspaceManager;

    use futures::future;

    fn executor_with_c_compiler(cc: &str) -> Executor {
        let mut executor = Executor::default();
        executor.compilers.c = cc.into();
        executor
    }

    #[tokio::test]
    async fn interpreted_languages_skip_compilation() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path()).unwrap();
        let python = lang::resolve(lang::PYTHON_ID).unwrap();
        let ws = manager.acquire(python).unwrap();

        let result = compile(&ws, python, &Executor::default(), future::pending()).await;
        assert!(matches!(result, CompileResult::Compiled { .. }));
    }

    #[tokio::test]
    async fn silent_failure_gets_a_generic_diagnostic() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path()).unwrap();
        let c = lang::resolve(lang::C_ID).unwrap();
        let ws = manager.acquire(c).unwrap();
        ws.write_source("int main() {}").unwrap();

        let executor = executor_with_c_compiler("/bin/false");
        match compile(&ws, c, &executor, future::pending()).await {
            CompileResult::Failed { diagnostics, .. } => assert_eq!(diagnostics, COMPILE_FAILED),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_compiler_is_a_failure() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path()).unwrap();
        let c = lang::resolve(lang::C_ID).unwrap();
        let ws = manager.acquire(c).unwrap();

        let executor = executor_with_c_compiler("/nonexistent/cc");
        match compile(&ws, c, &executor, future::pending()).await {
            CompileResult::Failed { diagnostics, .. } => {
                assert!(diagnostics.contains("/nonexistent/cc"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
