pub mod c_cpp;
pub mod java;
pub mod javascript;
pub mod python;

use self::c_cpp::{CCpp, CCppStd};
use self::java::Java;
use self::javascript::JavaScript;
use self::python::Python;

use crate::config::Executor;
use crate::workspace::Workspace;

use coderun_protocol::error::{ErrorCode, ErrorInfo};
use coderun_protocol::lang::LanguageInfo;
use coderun_utils::os_cmd::OsCmd;

use anyhow::Result;

pub const PYTHON_ID: u32 = 71;
pub const JAVASCRIPT_ID: u32 = 63;
pub const C_ID: u32 = 50;
pub const CPP_ID: u32 = 54;
pub const JAVA_ID: u32 = 62;

/// How to build and start programs written in one language.
///
/// Every path handed to a command is absolute and points into the workspace;
/// processes also run with the workspace directory as their working directory.
pub trait Language: Send + Sync {
    fn id(&self) -> u32;
    fn lang_name(&self) -> &str;
    fn display_name(&self) -> &str;
    fn extension(&self) -> &str;

    fn needs_compile(&self) -> bool;
    fn src_name(&self) -> &str;

    /// The file produced by the compiler, if it is a single known file.
    fn exe_name(&self) -> Option<&str> {
        None
    }

    fn scaffold(&self) -> &str;

    fn compile(&self, workspace: &Workspace, executor: &Executor) -> Option<OsCmd>;
    fn run(&self, workspace: &Workspace, executor: &Executor) -> OsCmd;

    fn info(&self) -> LanguageInfo {
        LanguageInfo {
            id: self.id(),
            name: self.display_name().to_owned(),
            extension: self.extension().to_owned(),
            compiled: self.needs_compile(),
            scaffold: self.scaffold().to_owned(),
        }
    }
}

static LANGUAGES: [&dyn Language; 5] = [
    &Python {},
    &CCpp {
        std: CCppStd::Cpp17,
    },
    &CCpp { std: CCppStd::C11 },
    &Java {},
    &JavaScript {},
];

pub fn languages() -> impl Iterator<Item = &'static dyn Language> {
    LANGUAGES.iter().copied()
}

pub fn resolve(id: u32) -> Result<&'static dyn Language> {
    match languages().find(|lang| lang.id() == id) {
        Some(lang) => Ok(lang),
        None => reject_error!(
            ErrorCode::UnsupportedLanguage,
            Some(format!("unsupported language id: {}", id))
        ),
    }
}
