use std::ffi::OsString;
use std::io;

/// What a finished child process left behind.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a fixed program (plus fixed leading arguments) with per-call
/// arguments appended.
#[derive(Debug, Clone)]
pub struct Invoker {
    program: OsString,
    base_args: Vec<OsString>,
}

impl Invoker {
    pub fn new<I, S>(program: impl Into<OsString>, base_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            base_args: base_args.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds an invoker from a `program arg...` list, as read from config.
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, base_args) = command.split_first()?;
        Some(Self::new(program, base_args))
    }

    pub async fn run<S: AsRef<std::ffi::OsStr>>(&self, args: &[S]) -> io::Result<ProcessOutput> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.base_args)
            .args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        log::trace!("[run] Spawning {:?} with {} argument(s)", self.program, args.len());
        let output = cmd.output().await?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let invoker = Invoker::new("echo", ["get"]);
        let output = invoker.run(&["42"]).await.unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, "get 42\n");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn captures_stderr_of_failing_process() {
        // `sh -c SCRIPT NAME ARGS...`, appended args land in $1..
        let invoker = Invoker::new("sh", ["-c", "echo \"no such id $1\" >&2; exit 3", "oj"]);
        let output = invoker.run(&["7"]).await.unwrap();

        assert!(!output.success());
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stderr, "no such id 7\n");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let invoker = Invoker::new("/nonexistent/judgebot-test-binary", Vec::<String>::new());
        assert!(invoker.run(&["get"]).await.is_err());
    }

    #[test]
    fn command_line_must_name_a_program() {
        assert!(Invoker::from_command_line(&[]).is_none());
        let invoker = Invoker::from_command_line(&[
            String::from("python3"),
            String::from("-m"),
            String::from("oj"),
        ])
        .unwrap();
        assert_eq!(invoker.program, OsString::from("python3"));
        assert_eq!(invoker.base_args, vec![OsString::from("-m"), OsString::from("oj")]);
    }
}
