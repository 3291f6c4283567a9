use std::io::Write;
use std::sync::Arc;

use crate::config::PollConfig;
use crate::jbdb::Store;
use crate::models::{self, SubmissionReport, Verdict};
use crate::ojcli::{self, JudgeClient, JudgeError};

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("no judge credentials linked")]
    NotLinked,

    #[error("{0}")]
    LoginFailed(JudgeError),

    #[error("{0}")]
    SubmitFailed(JudgeError),

    #[error("{0}")]
    QueryFailed(JudgeError),

    #[error("could not stage source file: {0}")]
    Stage(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// One submission as requested by a user.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub user_id: models::UserId,
    pub judge: String,
    pub problem_id: String,
    pub language: String,
    pub code: String,
}

/// Drives a submission from credential lookup to the final verdict.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn Store>,
    judge: Arc<dyn JudgeClient>,
    poll: PollConfig,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, judge: Arc<dyn JudgeClient>, poll: PollConfig) -> Self {
        Self { store, judge, poll }
    }

    pub async fn submit(&self, request: SubmissionRequest) -> Result<SubmissionReport, SubmissionError> {
        let cred = self
            .store
            .credentials(request.user_id)
            .await?
            .ok_or(SubmissionError::NotLinked)?;

        self.judge
            .login(&cred.username, &cred.password)
            .await
            .map_err(SubmissionError::LoginFailed)?;

        // Deleted when `staged` drops, whichever way we leave this function.
        let staged = stage_source(&request.code, &request.language)?;

        let url = ojcli::problem_url(&request.judge, &request.problem_id);
        let submission_id = self
            .judge
            .submit(&url, staged.path(), &request.language)
            .await
            .map_err(SubmissionError::SubmitFailed)?;
        log::info!(
            "User {} submitted {} as {submission_id}",
            request.user_id, request.problem_id
        );

        let verdict = self.poll_verdict(&submission_id).await?;
        log::info!("Submission {submission_id} finished: {verdict}");

        if verdict.is_accepted() {
            let solve = models::Solve {
                user_id: request.user_id,
                judge: request.judge.clone(),
                problem_id: request.problem_id.clone(),
            };
            if self.store.record_solve(&solve).await? {
                log::info!("New solve for {}: {}", request.user_id, url);
            }
        }

        Ok(SubmissionReport {
            judge: request.judge,
            problem_id: request.problem_id,
            language: request.language,
            code: request.code,
            verdict,
        })
    }

    /// Queries the judge until the verdict leaves the in-progress states,
    /// giving up with [`Verdict::timeout`] after `poll.attempts` queries.
    async fn poll_verdict(&self, submission_id: &str) -> Result<Verdict, SubmissionError> {
        for attempt in 1..=self.poll.attempts {
            let verdict = self
                .judge
                .status(submission_id)
                .await
                .map_err(SubmissionError::QueryFailed)?;

            if !verdict.is_in_progress() {
                return Ok(verdict);
            }

            log::trace!(
                "[poll_verdict] {submission_id} still {} ({attempt}/{})",
                verdict.verdict, self.poll.attempts
            );
            if attempt < self.poll.attempts {
                tokio::time::sleep(self.poll.interval).await;
            }
        }

        log::warn!("Gave up waiting on submission {submission_id}");
        Ok(Verdict::timeout())
    }
}

/// Extension for the staged source file, guessed from the language label.
fn source_extension(language: &str) -> &'static str {
    let language = language.to_lowercase();
    if ["c++", "cpp", "g++"].iter().any(|tag| language.contains(tag)) {
        ".cpp"
    } else {
        ".txt"
    }
}

fn stage_source(code: &str, language: &str) -> std::io::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("judgebot-")
        .suffix(source_extension(language))
        .tempfile()?;
    file.write_all(code.as_bytes())?;
    file.flush()?;
    Ok(file)
}
