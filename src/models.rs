/// Discord snowflake of the user who issued a command.
pub type UserId = u64;

/// Verdicts the judge reports while a submission is still being evaluated.
pub const IN_PROGRESS_VERDICTS: [&str; 2] = ["running", "judging"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCredential {
    pub user_id: UserId,

    pub username: String,
    pub password: String,
}

/// A user's first accepted submission for a (judge, problem) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solve {
    pub user_id: UserId,
    pub judge: String,
    pub problem_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub solves: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub verdict: String,
    pub time: String,
    pub memory: String,
}

impl Verdict {
    /// Returned when the tool's output has no row for the submission.
    pub fn unknown() -> Self {
        Self::sentinel("Unknown")
    }

    /// Returned when polling gives up before a terminal verdict.
    pub fn timeout() -> Self {
        Self::sentinel("Timeout")
    }

    fn sentinel(verdict: &str) -> Self {
        Self {
            verdict: verdict.to_string(),
            time: String::from("N/A"),
            memory: String::from("N/A"),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.verdict.eq_ignore_ascii_case("accepted")
    }

    pub fn is_in_progress(&self) -> bool {
        IN_PROGRESS_VERDICTS
            .iter()
            .any(|marker| self.verdict.eq_ignore_ascii_case(marker))
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.verdict, self.time, self.memory)
    }
}

/// Everything the bot needs to render the outcome of one submission.
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    pub judge: String,
    pub problem_id: String,
    pub language: String,
    pub code: String,

    pub verdict: Verdict,
}

impl SubmissionReport {
    pub fn title(&self) -> String {
        format!("{}-{}", self.judge, self.problem_id)
    }

    pub fn accepted(&self) -> bool {
        self.verdict.is_accepted()
    }

    /// The submitted source wrapped in a code block, cut down to at most
    /// `limit` characters so it fits in an embed field.
    pub fn code_block(&self, limit: usize) -> String {
        let lang = self.language.to_lowercase();
        let fence_len = "```".len() * 2 + lang.chars().count() + 2;
        let budget = limit.saturating_sub(fence_len);

        let code = if self.code.chars().count() > budget {
            let mut cut: String = self.code.chars().take(budget.saturating_sub(4)).collect();
            cut.push_str("\n...");
            cut
        } else {
            self.code.clone()
        };

        format!("```{lang}\n{code}\n```")
    }
}
