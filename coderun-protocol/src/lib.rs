#![deny(clippy::all)]

pub mod error;
pub mod lang;
pub mod run;
