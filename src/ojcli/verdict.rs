use crate::models::Verdict;

// Column positions in a `get` result row:
// <id> <date> <problem> <verdict> <time> <memory> ...
const VERDICT_COLUMN: usize = 3;
const TIME_COLUMN: usize = 4;
const MEMORY_COLUMN: usize = 5;

/// Picks the verdict for `submission_id` out of the tool's tabular output.
///
/// Best effort: anything that doesn't look like a row for this submission
/// yields [`Verdict::unknown`] rather than an error.
pub fn parse_verdict(stdout: &str, submission_id: &str) -> Verdict {
    let Some(line) = stdout.lines().find(|line| line.contains(submission_id)) else {
        log::debug!("[parse_verdict] No row for submission {submission_id}");
        return Verdict::unknown();
    };

    let columns = line.split_whitespace().collect::<Vec<_>>();
    match (
        columns.get(VERDICT_COLUMN),
        columns.get(TIME_COLUMN),
        columns.get(MEMORY_COLUMN),
    ) {
        (Some(verdict), Some(time), Some(memory)) => Verdict {
            verdict: verdict.to_string(),
            time: time.to_string(),
            memory: memory.to_string(),
        },
        _ => {
            log::warn!("[parse_verdict] Row for submission {submission_id} is too short: {line}");
            Verdict::unknown()
        }
    }
}
