use super::*;

/// Sources must declare `public class Solution` with a `main` method.
pub struct Java {}

impl Java {
    const ENTRY_CLASS: &'static str = "Solution";
}

impl Language for Java {
    fn id(&self) -> u32 {
        JAVA_ID
    }

    fn lang_name(&self) -> &str {
        "java"
    }

    fn display_name(&self) -> &str {
        "Java"
    }

    fn extension(&self) -> &str {
        "java"
    }

    fn needs_compile(&self) -> bool {
        true
    }

    fn src_name(&self) -> &str {
        "Solution.java"
    }

    fn scaffold(&self) -> &str {
        concat!(
            "public class Solution {\n",
            "    public static void main(String[] args) {\n",
            "        // Write your code here\n",
            "    }\n",
            "}\n",
        )
    }

    fn compile(&self, workspace: &Workspace, executor: &Executor) -> Option<OsCmd> {
        let mut cmd = OsCmd::new(&executor.compilers.javac);

        cmd.arg("-J-Xms64m");
        cmd.arg("-J-Xmx512m");
        cmd.arg("-encoding").arg("UTF-8");
        cmd.arg("-d").arg(workspace.dir());
        cmd.arg(workspace.src_path());

        Some(cmd)
    }

    fn run(&self, workspace: &Workspace, executor: &Executor) -> OsCmd {
        let mut cmd = OsCmd::new(&executor.runtimes.java);
        cmd.arg("-cp").arg(workspace.dir());
        cmd.arg("-Xms64m");
        cmd.arg("-Xmx512m");
        cmd.arg(Self::ENTRY_CLASS);
        cmd
    }
}
