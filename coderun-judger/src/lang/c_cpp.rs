use super::*;

pub struct CCpp {
    pub std: CCppStd,
}

const EXE_NAME: &str = "main";

pub enum CCppStd {
    C11,
    Cpp17,
}

impl CCppStd {
    fn as_str_gnu(&self) -> &str {
        match self {
            CCppStd::C11 => "gnu11",
            CCppStd::Cpp17 => "gnu++17",
        }
    }

    fn is_cpp(&self) -> bool {
        matches!(self, CCppStd::Cpp17)
    }
}

impl Language for CCpp {
    fn id(&self) -> u32 {
        if self.std.is_cpp() {
            CPP_ID
        } else {
            C_ID
        }
    }

    fn lang_name(&self) -> &str {
        if self.std.is_cpp() {
            "cpp"
        } else {
            "c"
        }
    }

    fn display_name(&self) -> &str {
        if self.std.is_cpp() {
            "C++"
        } else {
            "C"
        }
    }

    fn extension(&self) -> &str {
        if self.std.is_cpp() {
            "cpp"
        } else {
            "c"
        }
    }

    fn needs_compile(&self) -> bool {
        true
    }

    fn src_name(&self) -> &str {
        if self.std.is_cpp() {
            "main.cpp"
        } else {
            "main.c"
        }
    }

    fn exe_name(&self) -> Option<&str> {
        Some(EXE_NAME)
    }

    fn scaffold(&self) -> &str {
        if self.std.is_cpp() {
            concat!(
                "#include <iostream>\n",
                "using namespace std;\n",
                "\n",
                "int main() {\n",
                "    // Write your code here\n",
                "    return 0;\n",
                "}\n",
            )
        } else {
            concat!(
                "#include <stdio.h>\n",
                "\n",
                "int main() {\n",
                "    // Write your code here\n",
                "    return 0;\n",
                "}\n",
            )
        }
    }

    fn compile(&self, workspace: &Workspace, executor: &Executor) -> Option<OsCmd> {
        let is_cpp = self.std.is_cpp();

        let cc = if is_cpp {
            &executor.compilers.cpp
        } else {
            &executor.compilers.c
        };

        let mut cmd = OsCmd::new(cc);

        cmd.arg(format!("-std={}", self.std.as_str_gnu()));
        cmd.arg("-O2");
        cmd.arg(workspace.src_path());
        cmd.arg("-o").arg(workspace.dir().join(EXE_NAME));

        // https://stackoverflow.com/questions/5419366/why-do-i-have-to-explicitly-link-with-libm
        cmd.arg_if(!is_cpp, "-lm");

        Some(cmd)
    }

    fn run(&self, workspace: &Workspace, _: &Executor) -> OsCmd {
        OsCmd::new(workspace.dir().join(EXE_NAME))
    }
}
