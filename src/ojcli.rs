mod invoker;
mod verdict;

pub use invoker::{Invoker, ProcessOutput};
pub use verdict::parse_verdict;

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;

use crate::models::Verdict;

const LOGIN_URL: &str = "https://vjudge.net/user/login";
const PROBLEM_URL_BASE: &str = "https://vjudge.net/problem";

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("oj login failed:\n{0}")]
    FailedLogin(String),

    #[error("oj submit failed:\n{0}")]
    FailedSubmit(String),

    #[error("oj submit printed no submission id")]
    MissingSubmissionId,

    #[error("oj get failed:\n{0}")]
    FailedQuery(String),

    #[error("could not run oj: {0}")]
    Spawn(#[from] std::io::Error),
}

/// The three things the bot needs from a remote judge.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<(), JudgeError>;

    /// Returns the submission identifier.
    async fn submit(&self, problem_url: &str, source: &Path, language: &str)
        -> Result<String, JudgeError>;

    async fn status(&self, submission_id: &str) -> Result<Verdict, JudgeError>;
}

/// URL of a problem on VJudge, e.g. `CF` + `123A`.
pub fn problem_url(judge: &str, problem_id: &str) -> String {
    format!("{PROBLEM_URL_BASE}/{judge}-{problem_id}")
}

/// [`JudgeClient`] backed by the `oj` command-line tool.
#[derive(Debug, Clone)]
pub struct OjClient {
    invoker: Invoker,
}

impl OjClient {
    pub fn new(invoker: Invoker) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl JudgeClient for OjClient {
    async fn login(&self, username: &str, password: &str) -> Result<(), JudgeError> {
        log::trace!("[login] Logging in as {username}");
        let output = self
            .invoker
            .run(&["login", LOGIN_URL, "--username", username, "--password", password])
            .await?;

        if !output.success() {
            return Err(JudgeError::FailedLogin(output.stderr));
        }
        Ok(())
    }

    async fn submit(&self, problem_url: &str, source: &Path, language: &str)
        -> Result<String, JudgeError>
    {
        log::trace!("[submit] Submitting {} to {problem_url}", source.display());
        let output = self
            .invoker
            .run(&[
                OsStr::new("submit"),
                OsStr::new(problem_url),
                OsStr::new("--language"),
                OsStr::new(language),
                source.as_os_str(),
            ])
            .await?;

        if !output.success() {
            return Err(JudgeError::FailedSubmit(output.stderr));
        }

        submission_id_from(&output.stdout).ok_or(JudgeError::MissingSubmissionId)
    }

    async fn status(&self, submission_id: &str) -> Result<Verdict, JudgeError> {
        let output = self.invoker.run(&["get", submission_id]).await?;

        if !output.success() {
            return Err(JudgeError::FailedQuery(output.stderr));
        }
        Ok(parse_verdict(&output.stdout, submission_id))
    }
}

/// The tool prints the new submission's id as the last token of its output.
fn submission_id_from(stdout: &str) -> Option<String> {
    stdout.split_whitespace().last().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_url_joins_judge_and_problem() {
        assert_eq!(problem_url("CF", "123A"), "https://vjudge.net/problem/CF-123A");
    }

    #[test]
    fn submission_id_is_last_token() {
        assert_eq!(
            submission_id_from("[*] submitted\n[+] run id: 5512345\n").as_deref(),
            Some("5512345")
        );
        assert_eq!(submission_id_from("  \n"), None);
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        /// An `oj` stand-in: `sh -c SCRIPT oj <subcommand> ...`.
        fn fake_oj(script: &str) -> OjClient {
            OjClient::new(Invoker::new("sh", ["-c", script, "oj"]))
        }

        #[tokio::test]
        async fn login_failure_carries_stderr() {
            let client = fake_oj("echo 'bad password' >&2; exit 1");
            let err = client.login("alice", "hunter2").await.unwrap_err();
            assert!(matches!(err, JudgeError::FailedLogin(ref stderr) if stderr == "bad password\n"));
        }

        #[tokio::test]
        async fn login_passes_credentials_as_flags() {
            let client = fake_oj(r#"[ "$1 $3 $4 $5 $6" = "login --username alice --password hunter2" ]"#);
            client.login("alice", "hunter2").await.unwrap();
        }

        #[tokio::test]
        async fn submit_returns_last_stdout_token() {
            let client = fake_oj(r#"[ "$1 $3 $4" = "submit --language C++17" ] && echo "accepted as 9001""#);
            let id = client
                .submit("https://vjudge.net/problem/CF-1A", Path::new("/tmp/a.cpp"), "C++17")
                .await
                .unwrap();
            assert_eq!(id, "9001");
        }

        #[tokio::test]
        async fn submit_without_output_has_no_id() {
            let client = fake_oj("exit 0");
            let err = client
                .submit("https://vjudge.net/problem/CF-1A", Path::new("/tmp/a.cpp"), "C++17")
                .await
                .unwrap_err();
            assert!(matches!(err, JudgeError::MissingSubmissionId));
        }

        #[tokio::test]
        async fn status_parses_row_for_id() {
            let client = fake_oj(r#"echo "header"; echo "$2 2024-01-01 1A Accepted 15ms 2048KB""#);
            let verdict = client.status("77").await.unwrap();
            assert!(verdict.is_accepted());
            assert_eq!(verdict.time, "15ms");
        }

        #[tokio::test]
        async fn status_failure_is_query_error() {
            let client = fake_oj("exit 2");
            assert!(matches!(client.status("77").await, Err(JudgeError::FailedQuery(_))));
        }
    }
}
