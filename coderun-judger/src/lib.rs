#![deny(clippy::all)]

macro_rules! reject_error {
    ($code: expr, $msg: expr) => {
        return Err(ErrorInfo {
            code: $code,
            message: $msg,
        }
        .into())
    };
}

pub mod compile;
pub mod config;
pub mod exec;
pub mod lang;
pub mod runner;
pub mod verdict;
pub mod workspace;

pub use self::config::Executor;
pub use self::runner::{Runner, RunnerStats};
