use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ubyte::{ByteUnit, ToByteUnit};
use validator::Validate;

/// Missing keys take the values of `Executor::default()`.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct Executor {
    pub workspace_root: PathBuf,

    #[validate(range(min = 100, max = 60000))]
    pub time_limit: u64, // milliseconds

    #[validate(range(min = 100, max = 120000))]
    pub compile_time_limit: u64, // milliseconds

    pub output_limit: ByteUnit,

    #[serde(default)]
    pub distinct_statuses: bool,

    #[validate]
    pub compilers: Compilers,

    #[validate]
    pub runtimes: Runtimes,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct Compilers {
    pub c: PathBuf,
    pub cpp: PathBuf,
    pub javac: PathBuf,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct Runtimes {
    pub python: PathBuf,
    pub node: PathBuf,
    pub java: PathBuf,
}

fn default_workspace_root() -> PathBuf {
    env::temp_dir()
}

impl Default for Executor {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            time_limit: 5000,
            compile_time_limit: 10000,
            output_limit: 16.mebibytes(),
            distinct_statuses: false,
            compilers: Compilers {
                c: "gcc".into(),
                cpp: "g++".into(),
                javac: "javac".into(),
            },
            runtimes: Runtimes {
                python: "python3".into(),
                node: "node".into(),
                java: "java".into(),
            },
        }
    }
}

impl Executor {
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit)
    }

    pub fn compile_time_limit(&self) -> Duration {
        Duration::from_millis(self.compile_time_limit)
    }
}
