use super::*;

pub struct JavaScript {}

impl Language for JavaScript {
    fn id(&self) -> u32 {
        JAVASCRIPT_ID
    }

    fn lang_name(&self) -> &str {
        "javascript"
    }

    fn display_name(&self) -> &str {
        "JavaScript"
    }

    fn extension(&self) -> &str {
        "js"
    }

    fn needs_compile(&self) -> bool {
        false
    }

    fn src_name(&self) -> &str {
        "main.js"
    }

    fn scaffold(&self) -> &str {
        "// Write your code here\n"
    }

    fn compile(&self, _: &Workspace, _: &Executor) -> Option<OsCmd> {
        None
    }

    fn run(&self, workspace: &Workspace, executor: &Executor) -> OsCmd {
        let mut cmd = OsCmd::new(&executor.runtimes.node);
        cmd.arg(workspace.src_path());
        cmd
    }
}
