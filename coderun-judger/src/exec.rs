use coderun_utils::os_cmd::OsCmd;

use std::future::Future;
use std::io;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::task::{self, JoinHandle};
use tokio::{fs, time};
use tracing::{debug, error, warn};

const READ_CHUNK_SIZE: usize = 8192;

/// How long the output readers may lag behind a settled process.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },
    TimedOut,
    Cancelled,
    SpawnError(String),
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub stdout: String,
    pub stderr: String,
    pub termination: Termination,
    pub elapsed: Duration,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(
            self.termination,
            Termination::Exited { code: Some(0), .. }
        )
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

pub struct RunLimit {
    pub time: Duration,
    pub output: u64, // bytes, per stream
}

/// Runs `cmd` to completion, timeout or cancellation.
///
/// The child leads a new process group which is killed as soon as the
/// run settles, so nothing it started outlives this call.
pub async fn run_process<C>(
    cmd: &OsCmd,
    cwd: &Path,
    stdin: Option<&Path>,
    limit: &RunLimit,
    cancel: C,
) -> RunResult
where
    C: Future<Output = ()>,
{
    let mut std_cmd = cmd.to_command(cwd);
    std_cmd.process_group(0);

    let mut command = Command::from(std_cmd);
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(?cmd, "spawning process");

    let t0 = Instant::now();
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            let msg = format!("failed to spawn {}: {}", cmd.bin.display(), err);
            error!(%msg, "spawn error, the host toolchain may be misconfigured");
            return RunResult {
                stdout: String::new(),
                stderr: String::new(),
                termination: Termination::SpawnError(msg),
                elapsed: t0.elapsed(),
            };
        }
    };

    let pgid = child.id().map(|pid| Pid::from_raw(pid as i32));
    let group_guard = scopeguard::guard(pgid, |pgid| {
        if let Some(pgid) = pgid {
            kill_group(pgid)
        }
    });

    let feeder = task::spawn(feed_stdin(child.stdin.take(), stdin.map(Path::to_path_buf)));
    let stdout_buf = SharedBuf::default();
    let stderr_buf = SharedBuf::default();
    let stdout_reader = task::spawn(read_capped(child.stdout.take(), limit.output, stdout_buf.clone()));
    let stderr_reader = task::spawn(read_capped(child.stderr.take(), limit.output, stderr_buf.clone()));

    tokio::pin!(cancel);

    let termination = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => Termination::Exited {
                code: status.code(),
                signal: status.signal(),
            },
            Err(err) => Termination::SpawnError(format!(
                "failed to wait for {}: {}",
                cmd.bin.display(),
                err
            )),
        },
        _ = time::sleep(limit.time) => Termination::TimedOut,
        _ = &mut cancel => Termination::Cancelled,
    };
    let elapsed = t0.elapsed();

    drop(group_guard);

    if !matches!(termination, Termination::Exited { .. }) {
        if let Err(err) = child.kill().await {
            warn!(%err, "failed to kill child process");
        }
    }

    feeder.abort();
    let stdout = join_reader(stdout_reader, &stdout_buf).await;
    let stderr = join_reader(stderr_reader, &stderr_buf).await;

    debug!(?termination, ?elapsed, "process settled");

    RunResult {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        termination,
        elapsed,
    }
}

fn kill_group(pgid: Pid) {
    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(err) => warn!(%err, ?pgid, "failed to kill process group"),
    }
}

async fn feed_stdin(pipe: Option<ChildStdin>, src: Option<PathBuf>) {
    let pipe = match pipe {
        Some(pipe) => pipe,
        None => return,
    };
    if let Some(src) = src {
        if let Err(err) = copy_file_into(&src, pipe).await {
            // the program may exit without reading its input
            debug!(%err, "stdin is not fully consumed");
        }
    }
}

async fn copy_file_into(src: &Path, mut pipe: ChildStdin) -> io::Result<()> {
    let mut file = fs::File::open(src).await?;
    tokio::io::copy(&mut file, &mut pipe).await?;
    pipe.shutdown().await
}

/// Output collected so far, readable even after the reader task is aborted.
#[derive(Debug, Default, Clone)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    /// Appends at most `limit - len` bytes and returns how many were kept.
    fn append_capped(&self, data: &[u8], limit: usize) -> usize {
        let mut buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let keep = data.len().min(limit.saturating_sub(buf.len()));
        buf.extend_from_slice(&data[..keep]);
        keep
    }

    fn take(&self) -> Vec<u8> {
        let mut buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *buf)
    }
}

async fn read_capped<R>(reader: Option<R>, limit: u64, buf: SharedBuf)
where
    R: AsyncRead + Unpin,
{
    let mut reader = match reader {
        Some(r) => r,
        None => return,
    };

    let limit = limit as usize;
    let mut chunk = vec![0; READ_CHUNK_SIZE];
    let mut discarded: u64 = 0;

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let keep = buf.append_capped(&chunk[..n], limit);
                discarded += (n - keep) as u64;
            }
            Err(err) => {
                warn!(%err, "failed to read process output");
                break;
            }
        }
    }

    if discarded > 0 {
        warn!(discarded, limit, "process output exceeds the limit");
    }
}

/// Waits for the reader, then hands back whatever it captured.
async fn join_reader(mut handle: JoinHandle<()>, buf: &SharedBuf) -> Vec<u8> {
    match time::timeout(DRAIN_GRACE, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(%err, "output reader failed"),
        Err(_) => {
            // a detached descendant still holds the pipe
            handle.abort();
            warn!("output pipe is still open after the process settled");
        }
    }
    buf.take()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use futures::future;

    fn sh(script: &str) -> OsCmd {
        let mut cmd = OsCmd::new("/bin/sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    fn limit(ms: u64) -> RunLimit {
        RunLimit {
            time: Duration::from_millis(ms),
            output: 1024 * 1024,
        }
    }

    /// A zombie waiting for its reaper counts as gone.
    fn is_running(pid: i32) -> bool {
        match fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => {
                let state = stat.rsplit(')').next().unwrap().trim_start();
                !state.starts_with('Z')
            }
            Err(_) => false,
        }
    }

    #[tokio::test]
    async fn echoes_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("stdin.txt");
        fs::write(&input, "1 2 3\n").unwrap();

        let result = run_process(
            &sh("cat; echo err >&2"),
            dir.path(),
            Some(&input),
            &limit(5000),
            future::pending(),
        )
        .await;

        assert!(result.is_success());
        assert_eq!(result.stdout, "1 2 3\n");
        assert_eq!(result.stderr, "err\n");
    }

    #[tokio::test]
    async fn runs_in_the_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_process(&sh("pwd"), dir.path(), None, &limit(5000), future::pending()).await;
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(result.stdout.trim(), expected.to_str().unwrap());
    }

    #[tokio::test]
    async fn reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_process(&sh("exit 3"), dir.path(), None, &limit(5000), future::pending()).await;
        assert_eq!(
            result.termination,
            Termination::Exited {
                code: Some(3),
                signal: None
            }
        );
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn reports_signal() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_process(&sh("kill -9 $$"), dir.path(), None, &limit(5000), future::pending()).await;
        assert_eq!(
            result.termination,
            Termination::Exited {
                code: None,
                signal: Some(9)
            }
        );
    }

    #[tokio::test]
    async fn spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = OsCmd::new("/nonexistent/coderun-interpreter");
        let result = run_process(&cmd, dir.path(), None, &limit(5000), future::pending()).await;
        match result.termination {
            Termination::SpawnError(msg) => assert!(msg.contains("/nonexistent/coderun-interpreter")),
            other => panic!("unexpected termination: {:?}", other),
        }
    }

    #[tokio::test]
    async fn timeout_kills_the_process_group() {
        let dir = tempfile::tempdir().unwrap();

        // a background child in the same group keeps running after the shell loops
        let script = "sleep 30 & echo $$ $!; while :; do :; done";
        let t0 = Instant::now();
        let result = run_process(&sh(script), dir.path(), None, &limit(300), future::pending()).await;
        let waited = t0.elapsed();

        assert_eq!(result.termination, Termination::TimedOut);
        assert!(result.elapsed >= Duration::from_millis(300));
        assert!(waited < Duration::from_millis(300) + Duration::from_secs(2));

        let pids: Vec<i32> = result
            .stdout
            .split_whitespace()
            .map(|s| s.parse().unwrap())
            .collect();
        assert_eq!(pids.len(), 2);

        assert!(!is_running(pids[0]));
        let mut sleep_running = true;
        for _ in 0..50 {
            sleep_running = is_running(pids[1]);
            if !sleep_running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!sleep_running);
    }

    #[tokio::test]
    async fn cancellation_reuses_the_kill_path() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = tokio::time::sleep(Duration::from_millis(100));
        let result = run_process(&sh("sleep 30"), dir.path(), None, &limit(5000), cancel).await;
        assert_eq!(result.termination, Termination::Cancelled);
        assert!(result.elapsed < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn output_is_capped_without_blocking_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let limit = RunLimit {
            time: Duration::from_secs(10),
            output: 1000,
        };
        let script = "head -c 1000000 /dev/zero; echo done >&2";
        let result = run_process(&sh(script), dir.path(), None, &limit, future::pending()).await;
        assert!(result.is_success());
        assert_eq!(result.stdout.len(), 1000);
        assert_eq!(result.stderr, "done\n");
    }

    #[tokio::test]
    async fn output_survives_a_detached_pipe_holder() {
        if !Path::new("/usr/bin/setsid").exists() && !Path::new("/bin/setsid").exists() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();

        // the setsid child escapes the group kill and keeps stdout open
        let script = "echo partial; setsid sleep 3 &";
        let t0 = Instant::now();
        let result = run_process(&sh(script), dir.path(), None, &limit(5000), future::pending()).await;

        assert!(result.is_success());
        assert_eq!(result.stdout, "partial\n");
        assert!(t0.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn large_stdin_does_not_deadlock() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("stdin.txt");
        fs::write(&input, "x".repeat(4 * 1024 * 1024)).unwrap();

        let result = run_process(
            &sh("wc -c"),
            dir.path(),
            Some(&input),
            &limit(10000),
            future::pending(),
        )
        .await;
        assert!(result.is_success());
        assert_eq!(result.stdout.trim(), "4194304");
    }
}
