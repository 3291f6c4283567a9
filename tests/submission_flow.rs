#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use judgebot::config::PollConfig;
use judgebot::jbdb::{CredentialStore, SolveLedger, SqliteStore};
use judgebot::models::{LeaderboardEntry, UserCredential};
use judgebot::ojcli::{Invoker, OjClient};
use judgebot::submission::{Orchestrator, SubmissionError, SubmissionRequest};

// Stands in for `python3 -m oj`. `get` reports the submission as judging
// until it has been asked twice, using a counter file next to the database.
const FAKE_OJ: &str = r#"
state="$JUDGEBOT_TEST_DIR/polls"
case "$1" in
  login)
    [ "$6" = "secret" ] || { echo "invalid password" >&2; exit 1; } ;;
  submit)
    [ -s "$5" ] || { echo "empty source" >&2; exit 1; }
    echo "[+] submitted, run id: 555" ;;
  get)
    polls=$(cat "$state" 2>/dev/null || echo 0)
    echo $((polls + 1)) > "$state"
    echo "RunID Date Problem Verdict Time Memory"
    if [ "$polls" -lt 2 ]; then
      echo "$2 2024-01-01 CF-4A Judging - -"
    else
      echo "$2 2024-01-01 CF-4A Accepted 31ms 1024KB"
    fi ;;
esac
"#;

async fn orchestrator(dir: &tempfile::TempDir) -> (Arc<SqliteStore>, Orchestrator) {
    let store = Arc::new(SqliteStore::open(dir.path().join("bot.db")).await.unwrap());

    let script = format!("JUDGEBOT_TEST_DIR='{}'\n{FAKE_OJ}", dir.path().display());
    let judge = Arc::new(OjClient::new(Invoker::new("sh", ["-c", script.as_str(), "oj"])));

    let poll = PollConfig { attempts: 5, interval: Duration::from_millis(10) };
    (store.clone(), Orchestrator::new(store, judge, poll))
}

fn request(user_id: u64) -> SubmissionRequest {
    SubmissionRequest {
        user_id,
        judge: String::from("CF"),
        problem_id: String::from("4A"),
        language: String::from("C++17"),
        code: String::from("int main() {}"),
    }
}

#[tokio::test]
async fn linked_user_gets_verdict_and_solve() {
    let dir = tempfile::tempdir().unwrap();
    let (store, orchestrator) = orchestrator(&dir).await;

    store
        .upsert_credentials(&UserCredential {
            user_id: 42,
            username: String::from("alice"),
            password: String::from("secret"),
        })
        .await
        .unwrap();

    let report = orchestrator.submit(request(42)).await.unwrap();

    assert_eq!(report.verdict.verdict, "Accepted");
    assert_eq!(report.verdict.time, "31ms");
    assert_eq!(report.verdict.memory, "1024KB");
    assert_eq!(
        store.leaderboard().await.unwrap(),
        vec![LeaderboardEntry { user_id: 42, solves: 1 }]
    );
}

#[tokio::test]
async fn wrong_password_surfaces_tool_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let (store, orchestrator) = orchestrator(&dir).await;

    store
        .upsert_credentials(&UserCredential {
            user_id: 7,
            username: String::from("bob"),
            password: String::from("guess"),
        })
        .await
        .unwrap();

    let err = orchestrator.submit(request(7)).await.unwrap_err();

    assert!(matches!(err, SubmissionError::LoginFailed(_)));
    assert!(err.to_string().contains("invalid password"));
    assert!(store.leaderboard().await.unwrap().is_empty());
}
