use crate::compile::{self, CompileResult, COMPILE_CANCELLED};
use crate::config::Executor;
use crate::exec::{self, RunLimit, Termination};
use crate::lang::{self, Language};
use crate::verdict::{self, StatusPolicy};
use crate::workspace::{Workspace, WorkspaceManager};

use coderun_protocol::run::{RunCasesRequest, RunCodeRequest, TestPolicy, Verdict};

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

use anyhow::Result;
use futures::future;
use serde::Serialize;
use tracing::{error, info};

pub struct Runner {
    executor: Executor,
    workspaces: WorkspaceManager,
    policy: StatusPolicy,
    counter: Counter,
}

#[derive(Debug, Default)]
struct Counter {
    requests: AtomicU64,
    compile_errors: AtomicU64,
    executions: AtomicU64,
    timeouts: AtomicU64,
    spawn_errors: AtomicU64,
    workspace_errors: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerStats {
    pub requests: u64,
    pub compile_errors: u64,
    pub executions: u64,
    pub timeouts: u64,
    pub spawn_errors: u64,
    pub workspace_errors: u64,
}

struct Case<'a> {
    input: &'a str,
    expected_output: &'a str,
}

impl Runner {
    pub fn new(executor: Executor) -> Result<Self> {
        let workspaces = WorkspaceManager::new(&executor.workspace_root)?;
        let policy = StatusPolicy::from_flag(executor.distinct_statuses);
        info!(root = %workspaces.root().display(), ?policy, "runner is initialized");
        Ok(Self {
            executor,
            workspaces,
            policy,
            counter: Counter::default(),
        })
    }

    pub fn stats(&self) -> RunnerStats {
        let c = &self.counter;
        RunnerStats {
            requests: c.requests.load(Relaxed),
            compile_errors: c.compile_errors.load(Relaxed),
            executions: c.executions.load(Relaxed),
            timeouts: c.timeouts.load(Relaxed),
            spawn_errors: c.spawn_errors.load(Relaxed),
            workspace_errors: c.workspace_errors.load(Relaxed),
        }
    }

    /// Runs one submission against one test case.
    ///
    /// Fails only when the language is not supported; every other problem is
    /// reported inside the verdict.
    pub async fn execute(&self, req: &RunCodeRequest) -> Result<Verdict> {
        self.execute_with_cancel(req, future::pending()).await
    }

    /// Like `execute`, but the run is killed as soon as `cancel` completes.
    #[tracing::instrument(skip(self, req, cancel), fields(lang = req.language_id))]
    pub async fn execute_with_cancel<C>(&self, req: &RunCodeRequest, cancel: C) -> Result<Verdict>
    where
        C: Future<Output = ()>,
    {
        let lang = lang::resolve(req.language_id)?;
        let cases = [Case {
            input: &req.input,
            expected_output: &req.expected_output,
        }];
        let verdicts = self
            .run_cases(lang, &req.code, &cases, TestPolicy::Fuse, cancel)
            .await;
        let verdict = verdicts
            .into_iter()
            .next()
            .unwrap_or_else(|| verdict::system_error("no verdict was produced"));
        Ok(verdict)
    }

    /// Compiles once and runs the submission against every test case.
    pub async fn judge(&self, req: &RunCasesRequest) -> Result<Vec<Verdict>> {
        self.judge_with_cancel(req, future::pending()).await
    }

    #[tracing::instrument(skip(self, req, cancel), fields(lang = req.language_id, cases = req.cases.len()))]
    pub async fn judge_with_cancel<C>(&self, req: &RunCasesRequest, cancel: C) -> Result<Vec<Verdict>>
    where
        C: Future<Output = ()>,
    {
        let lang = lang::resolve(req.language_id)?;
        let cases: Vec<Case<'_>> = req
            .cases
            .iter()
            .map(|case| Case {
                input: &case.input,
                expected_output: &case.expected_output,
            })
            .collect();
        Ok(self
            .run_cases(lang, &req.code, &cases, req.policy, cancel)
            .await)
    }

    async fn run_cases<C>(
        &self,
        lang: &dyn Language,
        code: &str,
        cases: &[Case<'_>],
        policy: TestPolicy,
        cancel: C,
    ) -> Vec<Verdict>
    where
        C: Future<Output = ()>,
    {
        self.counter.requests.fetch_add(1, Relaxed);
        tokio::pin!(cancel);

        let mut workspace = match self.prepare(lang, code) {
            Ok(ws) => ws,
            Err(err) => {
                error!(%err, "failed to prepare workspace");
                self.counter.workspace_errors.fetch_add(1, Relaxed);
                let verdict = verdict::system_error(format!("failed to prepare workspace: {}", err));
                return repeat(verdict, cases.len(), policy);
            }
        };

        let verdicts = self
            .pipeline(&workspace, lang, cases, policy, cancel.as_mut())
            .await;

        workspace.release();

        let accepted = verdicts.iter().filter(|v| v.is_accepted()).count();
        info!(lang = lang.lang_name(), total = cases.len(), judged = verdicts.len(), accepted, "finished");

        verdicts
    }

    fn prepare(&self, lang: &dyn Language, code: &str) -> io::Result<Workspace> {
        let workspace = self.workspaces.acquire(lang)?;
        workspace.write_source(code)?;
        Ok(workspace)
    }

    async fn pipeline<C>(
        &self,
        workspace: &Workspace,
        lang: &dyn Language,
        cases: &[Case<'_>],
        policy: TestPolicy,
        mut cancel: Pin<&mut C>,
    ) -> Vec<Verdict>
    where
        C: Future<Output = ()>,
    {
        if lang.needs_compile() {
            match compile::compile(workspace, lang, &self.executor, cancel.as_mut()).await {
                CompileResult::Compiled { .. } => {}
                CompileResult::Failed { diagnostics, .. } => {
                    self.counter.compile_errors.fetch_add(1, Relaxed);
                    let verdict = verdict::compile_error(&diagnostics, self.policy);
                    return repeat(verdict, cases.len(), policy);
                }
                CompileResult::Cancelled => return vec![verdict::system_error(COMPILE_CANCELLED)],
            }
        }

        let cmd = lang.run(workspace, &self.executor);
        let limit = RunLimit {
            time: self.executor.time_limit(),
            output: self.executor.output_limit.as_u64(),
        };

        let mut verdicts = Vec::with_capacity(cases.len());
        for case in cases {
            let verdict = match workspace.write_stdin(case.input) {
                Ok(()) => {
                    self.counter.executions.fetch_add(1, Relaxed);
                    let run = exec::run_process(
                        &cmd,
                        workspace.dir(),
                        Some(workspace.stdin_path()),
                        &limit,
                        cancel.as_mut(),
                    )
                    .await;

                    match run.termination {
                        Termination::TimedOut => {
                            self.counter.timeouts.fetch_add(1, Relaxed);
                        }
                        Termination::SpawnError(_) => {
                            self.counter.spawn_errors.fetch_add(1, Relaxed);
                        }
                        Termination::Cancelled => {
                            verdicts.push(verdict::evaluate(&run, case.expected_output, self.policy));
                            break;
                        }
                        Termination::Exited { .. } => {}
                    }

                    verdict::evaluate(&run, case.expected_output, self.policy)
                }
                Err(err) => {
                    error!(%err, "failed to write stdin");
                    verdict::system_error(format!("failed to write stdin: {}", err))
                }
            };

            let accepted = verdict.is_accepted();
            verdicts.push(verdict);
            if policy == TestPolicy::Fuse && !accepted {
                break;
            }
        }
        verdicts
    }
}

fn repeat(verdict: Verdict, case_count: usize, policy: TestPolicy) -> Vec<Verdict> {
    let n = match policy {
        TestPolicy::Fuse => 1,
        TestPolicy::All => case_count.max(1),
    };
    vec![verdict; n]
}

#[cfg(test)]
mod tests {
    use super::*;

    use coderun_protocol::error::{ErrorCode, ErrorInfo};
    use coderun_protocol::run::TestCase;

    use std::fs;
    use std::path::Path;

    fn runner_in(root: &Path, customize: impl FnOnce(&mut Executor)) -> Runner {
        let mut executor = Executor {
            workspace_root: root.to_owned(),
            ..Executor::default()
        };
        customize(&mut executor);
        Runner::new(executor).unwrap()
    }

    fn request(language_id: u32, code: &str) -> RunCodeRequest {
        RunCodeRequest {
            code: code.into(),
            input: String::new(),
            expected_output: String::new(),
            language_id,
        }
    }

    fn is_empty(dir: &Path) -> bool {
        fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn unsupported_language_allocates_nothing() {
        let root = tempfile::tempdir().unwrap();
        let runner = runner_in(root.path(), |_| {});

        let err = runner.execute(&request(9999, "")).await.unwrap_err();
        let info = err.downcast_ref::<ErrorInfo>().unwrap();
        assert_eq!(info.code, ErrorCode::UnsupportedLanguage);

        assert!(is_empty(root.path()));
        assert_eq!(runner.stats().requests, 0);
    }

    #[tokio::test]
    async fn compile_failure_skips_execution() {
        let root = tempfile::tempdir().unwrap();
        let runner = runner_in(root.path(), |e| e.compilers.c = "/bin/false".into());

        let verdict = runner.execute(&request(lang::C_ID, "int main(")).await.unwrap();
        assert_eq!(verdict.status.id, 11);
        assert_eq!(verdict.stdout, None);
        assert_eq!(verdict.stderr.as_deref(), Some(compile::COMPILE_FAILED));

        let stats = runner.stats();
        assert_eq!(stats.compile_errors, 1);
        assert_eq!(stats.executions, 0);
        assert!(is_empty(root.path()));
    }

    #[tokio::test]
    async fn distinct_compile_error_status() {
        let root = tempfile::tempdir().unwrap();
        let runner = runner_in(root.path(), |e| {
            e.compilers.cpp = "/bin/false".into();
            e.distinct_statuses = true;
        });

        let verdict = runner.execute(&request(lang::CPP_ID, "")).await.unwrap();
        assert_eq!(verdict.status.id, 6);
    }

    #[tokio::test]
    async fn missing_runtime_is_a_runtime_error() {
        let root = tempfile::tempdir().unwrap();
        let runner = runner_in(root.path(), |e| {
            e.runtimes.python = "/nonexistent/python3".into()
        });

        let verdict = runner.execute(&request(lang::PYTHON_ID, "print(1)")).await.unwrap();
        assert_eq!(verdict.status.id, 11);
        assert!(verdict.stderr.unwrap().contains("/nonexistent/python3"));
        assert_eq!(runner.stats().spawn_errors, 1);
        assert!(is_empty(root.path()));
    }

    #[tokio::test]
    async fn compile_failure_fills_every_case_unless_fused() {
        let root = tempfile::tempdir().unwrap();
        let runner = runner_in(root.path(), |e| e.compilers.javac = "/bin/false".into());

        let case = TestCase {
            input: String::new(),
            expected_output: String::new(),
        };
        let mut req = RunCasesRequest {
            code: String::new(),
            language_id: lang::JAVA_ID,
            cases: vec![case.clone(), case.clone(), case],
            policy: TestPolicy::All,
        };

        let verdicts = runner.judge(&req).await.unwrap();
        assert_eq!(verdicts.len(), 3);
        assert!(verdicts.iter().all(|v| v.status.id == 11));

        req.policy = TestPolicy::Fuse;
        let verdicts = runner.judge(&req).await.unwrap();
        assert_eq!(verdicts.len(), 1);

        assert!(is_empty(root.path()));
    }

    #[tokio::test]
    async fn unusable_workspace_root_is_a_runtime_error() {
        let root = tempfile::tempdir().unwrap();
        let runner = runner_in(root.path(), |_| {});

        // the manager created the root; removing it makes every acquire fail
        fs::remove_dir(root.path()).unwrap();

        let verdict = runner.execute(&request(lang::PYTHON_ID, "print(1)")).await.unwrap();
        assert_eq!(verdict.status.id, 11);
        assert!(verdict.stderr.unwrap().starts_with("failed to prepare workspace"));
        assert_eq!(runner.stats().workspace_errors, 1);
    }
}
