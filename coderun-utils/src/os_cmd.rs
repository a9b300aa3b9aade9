use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Variables a spawned toolchain may see from the host environment.
pub const INHERITED_ENV: &[&str] = &["PATH", "HOME", "LANG", "TMPDIR"];

/// A program invocation with an explicit environment.
///
/// Entries of `env` are either `KEY=VALUE` or a bare `KEY`, which copies the
/// value of `KEY` from the current process when the command is built.
#[derive(Clone, PartialEq, Eq)]
pub struct OsCmd {
    pub bin: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<OsString>,
}

impl OsCmd {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        let mut cmd = Self {
            bin: bin.into(),
            args: Vec::new(),
            env: Vec::new(),
        };
        for k in INHERITED_ENV {
            cmd.inherit_env(k);
        }
        cmd
    }

    pub fn arg(&mut self, a: impl Into<OsString>) -> &mut Self {
        self.args.push(a.into());
        self
    }

    pub fn arg_if(&mut self, cond: bool, a: impl Into<OsString>) -> &mut Self {
        if cond {
            self.arg(a)
        } else {
            self
        }
    }

    pub fn inherit_env(&mut self, k: impl Into<OsString>) -> &mut Self {
        self.env.push(k.into());
        self
    }

    pub fn add_env(&mut self, k: impl Into<OsString>, v: impl AsRef<OsStr>) -> &mut Self {
        let mut e: OsString = k.into();
        e.push(OsStr::from_bytes(b"="));
        e.push(v.as_ref());
        self.env.push(e);
        self
    }

    /// Builds a `std::process::Command` with a cleared environment, running in `cwd`.
    pub fn to_command(&self, cwd: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(&self.args);
        cmd.current_dir(cwd);
        cmd.env_clear();
        for e in &self.env {
            let bytes = e.as_bytes();
            match bytes.iter().position(|&b| b == b'=') {
                Some(pos) => {
                    let k = OsStr::from_bytes(&bytes[..pos]);
                    let v = OsStr::from_bytes(&bytes[pos + 1..]);
                    cmd.env(k, v);
                }
                None => {
                    if let Some(v) = std::env::var_os(e) {
                        cmd.env(e, v);
                    }
                }
            }
        }
        cmd
    }
}

impl fmt::Debug for OsCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bin.display())?;
        for a in &self.args {
            write!(f, " {}", a.to_string_lossy())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_env_overrides_and_bare_keys_inherit() {
        let mut cmd = OsCmd::new("/bin/true");
        cmd.arg("-x").arg_if(false, "-y").arg_if(true, "-z");
        cmd.add_env("FOO", "a=b");

        assert_eq!(cmd.args, vec![OsString::from("-x"), OsString::from("-z")]);
        assert_eq!(format!("{:?}", cmd), "/bin/true -x -z");

        let built = cmd.to_command(Path::new("/"));
        let envs: Vec<_> = built.get_envs().collect();
        assert!(envs.contains(&(OsStr::new("FOO"), Some(OsStr::new("a=b")))));
        if std::env::var_os("PATH").is_some() {
            assert!(envs.iter().any(|(k, _)| *k == OsStr::new("PATH")));
        }
        assert_eq!(built.get_current_dir(), Some(Path::new("/")));
    }
}
