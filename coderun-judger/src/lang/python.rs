use super::*;

pub struct Python {}

impl Language for Python {
    fn id(&self) -> u32 {
        PYTHON_ID
    }

    fn lang_name(&self) -> &str {
        "python"
    }

    fn display_name(&self) -> &str {
        "Python"
    }

    fn extension(&self) -> &str {
        "py"
    }

    fn needs_compile(&self) -> bool {
        false
    }

    fn src_name(&self) -> &str {
        "main.py"
    }

    fn scaffold(&self) -> &str {
        "# Write your code here\n"
    }

    fn compile(&self, _: &Workspace, _: &Executor) -> Option<OsCmd> {
        None
    }

    fn run(&self, workspace: &Workspace, executor: &Executor) -> OsCmd {
        let mut cmd = OsCmd::new(&executor.runtimes.python);
        cmd.add_env("PYTHONDONTWRITEBYTECODE", "1");
        cmd.arg(workspace.src_path());
        cmd
    }
}
