use crate::lang::Language;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use tracing::{debug, warn};

const STDIN_NAME: &str = "stdin.txt";
const MAX_NAME_ATTEMPTS: u32 = 16;

static SEQ: AtomicU64 = AtomicU64::new(0);

pub struct WorkspaceManager {
    root: PathBuf,
}

/// The scratch directory of one execution.
///
/// Released exactly once, either by `release` or on drop.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    src_path: PathBuf,
    stdin_path: PathBuf,
    exe_path: Option<PathBuf>,
    released: bool,
}

impl WorkspaceManager {
    pub fn new(root: &Path) -> Result<Self> {
        if !root.exists() {
            fs::create_dir_all(root).with_context(|| {
                format!("failed to create workspace root: path = {}", root.display())
            })?;
        }
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generate_name() -> String {
        let timestamp = Utc::now().timestamp_millis();
        let seq = SEQ.fetch_add(1, Relaxed);
        let salt: u32 = rand::thread_rng().gen();
        format!("run_{}_{}_{:08x}", timestamp, seq, salt)
    }

    pub fn acquire(&self, lang: &dyn Language) -> io::Result<Workspace> {
        let mut attempts = 0;
        let dir = loop {
            let dir = self.root.join(Self::generate_name());
            match fs::create_dir(&dir) {
                Ok(()) => break dir,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    attempts += 1;
                    if attempts >= MAX_NAME_ATTEMPTS {
                        return Err(err);
                    }
                }
                Err(err) => return Err(err),
            }
        };

        debug!(dir = %dir.display(), "workspace acquired");

        Ok(Workspace {
            src_path: dir.join(lang.src_name()),
            stdin_path: dir.join(STDIN_NAME),
            exe_path: lang.exe_name().map(|name| dir.join(name)),
            dir,
            released: false,
        })
    }
}

impl Workspace {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn src_path(&self) -> &Path {
        &self.src_path
    }

    pub fn stdin_path(&self) -> &Path {
        &self.stdin_path
    }

    pub fn exe_path(&self) -> Option<&Path> {
        self.exe_path.as_deref()
    }

    pub fn write_source(&self, code: &str) -> io::Result<()> {
        fs::write(&self.src_path, code)
    }

    pub fn write_stdin(&self, input: &str) -> io::Result<()> {
        fs::write(&self.stdin_path, input)
    }

    /// Removes every artifact and the directory itself. Never fails.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let artifacts = [
            Some(self.src_path.as_path()),
            Some(self.stdin_path.as_path()),
            self.exe_path.as_deref(),
        ];
        for path in artifacts.iter().flatten() {
            remove_artifact(path, |p| fs::remove_file(p));
        }

        // compilers may leave more files behind, e.g. `Solution$1.class`
        remove_artifact(&self.dir, |p| fs::remove_dir_all(p));

        debug!(dir = %self.dir.display(), "workspace released");
    }
}

fn remove_artifact(path: &Path, remove: impl FnOnce(&Path) -> io::Result<()>) {
    match remove(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), %err, "failed to remove workspace artifact"),
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.release()
    }
}
